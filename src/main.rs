mod cli;

use mkvshrink::{
    batch::{self, BatchRunner},
    config,
    job::{self, JobContext},
    naming::NameTransformer,
};
use mkvshrink_av::{run_probe, ProbeParser, StreamSelector, ToolRegistry};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mkvshrink=debug,mkvshrink_av=debug,mkvshrink_core=debug".to_string()
        } else {
            "mkvshrink=info,mkvshrink_av=info,mkvshrink_core=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            dir,
            jobs,
            output_dir,
            dry_run,
            overwrite,
        } => {
            let options = RunOptions {
                dir,
                jobs,
                output_dir,
                dry_run,
                overwrite,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_batch(options, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, json, cli.config.as_deref()))
        }
        Commands::Rename { names } => rename(&names, cli.config.as_deref()),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Version => {
            println!("mkvshrink {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

struct RunOptions {
    dir: PathBuf,
    jobs: Option<usize>,
    output_dir: Option<PathBuf>,
    dry_run: bool,
    overwrite: bool,
}

async fn run_batch(options: RunOptions, config_path: Option<&Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags override the config file
    if let Some(jobs) = options.jobs {
        config.batch.max_jobs = Some(jobs);
    }
    if let Some(dir) = options.output_dir {
        config.batch.output_dir = Some(dir);
    }
    if options.overwrite {
        config.encode.overwrite = true;
    }
    config.validate().context("Invalid command-line options")?;

    if let Some(ref out) = config.batch.output_dir {
        std::fs::create_dir_all(out)
            .with_context(|| format!("Failed to create output directory: {:?}", out))?;
    }

    let tools = ToolRegistry::discover(&config.tools);
    let ctx = Arc::new(JobContext::new(&config, &tools)?.with_dry_run(options.dry_run));

    let mut inputs = batch::discover_inputs(&options.dir, &config.batch.extension)?;
    inputs.retain(|p| {
        let name = p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let converted = ctx.namer.is_converted(&name);
        if converted {
            tracing::debug!("Skipping already converted file {:?}", p);
        }
        !converted
    });

    if inputs.is_empty() {
        println!(
            "No .{} files found in {}",
            config.batch.extension.trim_start_matches('.'),
            options.dir.display()
        );
        return Ok(());
    }

    let limit = config.batch.max_jobs.unwrap_or_else(|| {
        batch::concurrency_limit(num_cpus::get(), config.batch.concurrency_factor)
    });

    println!(
        "Converting {} file(s) from {} ({} at a time){}",
        inputs.len(),
        options.dir.display(),
        limit,
        if options.dry_run { " [DRY RUN]" } else { "" }
    );

    let runner = BatchRunner::new(limit).on_complete(|n, total, outcome| {
        println!("[{n}/{total}] {outcome}");
    });

    let summary = runner
        .run(inputs, |input| {
            let ctx = Arc::clone(&ctx);
            async move {
                let report = job::run_job(&ctx, &input).await?;
                if !report.encoded {
                    println!("  ffmpeg {}", report.command);
                }
                Ok::<_, mkvshrink_core::Error>(report.output)
            }
        })
        .await;

    println!("\n{summary}");

    if !summary.is_success() {
        anyhow::bail!("{} of {} files failed", summary.failed(), summary.total());
    }

    Ok(())
}

async fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools);
    let ffprobe = tools.require("ffprobe")?;

    let parser = ProbeParser::new()?;
    let table = run_probe(ffprobe, &parser, file, config.tools.scratch_dir.as_deref()).await?;
    let selected = StreamSelector::from_config(&config.selection).select(&table);

    if json {
        let value = serde_json::json!({
            "file": file,
            "streams": table,
            "selected": selected,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    println!("\nStreams: {}", table.records().len());
    for record in table.records() {
        print!("  #{} {}", record.container_index, record.kind);
        if let Some(rel) = table.relative_index(record) {
            print!(" (0:{}:{})", record.kind.map_specifier(), rel);
        }
        if let Some(ref lang) = record.language {
            print!(" [{}]", lang);
        }
        println!();
    }

    println!(
        "\nSelected ({} / {}): {}",
        config.selection.primary_language, config.selection.secondary_language, selected
    );
    if !selected.has_audio() {
        println!("No usable audio: this file would be skipped.");
    }

    Ok(())
}

fn rename(names: &[String], config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let namer = NameTransformer::new(&config.naming.suffix)?;

    let mut failed = 0;
    for name in names {
        match namer.transform(name) {
            Ok(new_name) => println!("{name} -> {new_name}"),
            Err(e) => {
                failed += 1;
                eprintln!("{name}: {e}");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} name(s) did not match any naming pattern");
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to convert files.");
    }

    Ok(())
}
