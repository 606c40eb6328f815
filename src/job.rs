//! Conversion of a single file.
//!
//! A job walks `Pending -> Probing -> Selecting -> Naming -> Encoding` and
//! ends in `Succeeded` or `Failed`. Any error ends that job only.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashSet;
use mkvshrink_av::tools::ToolConfig;
use mkvshrink_av::{
    run_encode, run_probe, EncodeArgs, EncodeProfile, ProbeParser, StreamSelector, ToolRegistry,
};
use mkvshrink_core::config::Config;
use mkvshrink_core::{Error, SelectedStreams};

use crate::naming::NameTransformer;

/// Lifecycle of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Probing,
    Selecting,
    Naming,
    Encoding,
    Succeeded,
    Failed(String),
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Probing => write!(f, "probing"),
            Self::Selecting => write!(f, "selecting"),
            Self::Naming => write!(f, "naming"),
            Self::Encoding => write!(f, "encoding"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Immutable state shared by every job of a batch.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub ffprobe: ToolConfig,
    pub ffmpeg: ToolConfig,
    pub parser: ProbeParser,
    pub selector: StreamSelector,
    pub namer: NameTransformer,
    pub profile: EncodeProfile,
    /// Where probe scratch files go. `None` puts them next to the input.
    pub scratch_dir: Option<PathBuf>,
    /// Where outputs go. `None` puts them next to the input.
    pub output_dir: Option<PathBuf>,
    /// Stop after building the encoder command.
    pub dry_run: bool,
    /// Outputs already taken by jobs sharing this context.
    claimed: Arc<DashSet<PathBuf>>,
}

impl JobContext {
    /// Resolve tools and compile patterns for `config`.
    ///
    /// # Errors
    ///
    /// [`Error::ToolNotFound`] if ffmpeg or ffprobe is missing, which is
    /// fatal for the whole run.
    pub fn new(config: &Config, tools: &ToolRegistry) -> mkvshrink_core::Result<Self> {
        let ffprobe = tools.require("ffprobe")?.clone();
        let ffmpeg = tools.require("ffmpeg")?.clone();

        let parser =
            ProbeParser::new().map_err(|e| Error::Config(format!("probe pattern: {e}")))?;
        let namer = NameTransformer::new(&config.naming.suffix)
            .map_err(|e| Error::Config(format!("naming pattern: {e}")))?;

        Ok(Self {
            ffprobe,
            ffmpeg,
            parser,
            selector: StreamSelector::from_config(&config.selection),
            namer,
            profile: EncodeProfile::from_config(&config.encode),
            scratch_dir: config.tools.scratch_dir.clone(),
            output_dir: config.batch.output_dir.clone(),
            dry_run: false,
            claimed: Arc::new(DashSet::new()),
        })
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reserve `output` for one job. Each output can be claimed once per
    /// context, so two inputs that name the same file never write it
    /// concurrently.
    ///
    /// # Errors
    ///
    /// [`Error::OutputConflict`] if another job already holds `output`.
    pub fn claim_output(&self, output: &Path) -> mkvshrink_core::Result<()> {
        if self.claimed.insert(output.to_path_buf()) {
            Ok(())
        } else {
            Err(Error::OutputConflict {
                output: output.to_path_buf(),
            })
        }
    }
}

/// Whether `a` and `b` name the same file, following symlinks.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// What a finished job produced.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub streams: SelectedStreams,
    pub command: EncodeArgs,
    /// False when the job stopped before encoding (dry run).
    pub encoded: bool,
}

/// One file moving through the pipeline.
#[derive(Debug)]
pub struct Job {
    input: PathBuf,
    state: JobState,
}

impl Job {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            state: JobState::Pending,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    fn advance(&mut self, next: JobState) {
        tracing::debug!(
            input = %self.input.display(),
            from = %self.state,
            to = %next,
            "Job state change"
        );
        self.state = next;
    }

    /// Run the job to completion.
    pub async fn run(&mut self, ctx: &JobContext) -> mkvshrink_core::Result<JobReport> {
        match self.execute(ctx).await {
            Ok(report) => {
                self.advance(JobState::Succeeded);
                Ok(report)
            }
            Err(e) => {
                self.advance(JobState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn execute(&mut self, ctx: &JobContext) -> mkvshrink_core::Result<JobReport> {
        let input = self.input.clone();

        self.advance(JobState::Probing);
        let table =
            run_probe(&ctx.ffprobe, &ctx.parser, &input, ctx.scratch_dir.as_deref()).await?;

        self.advance(JobState::Selecting);
        let streams = ctx.selector.select(&table);
        tracing::debug!(input = %input.display(), %streams, "Selected streams");

        self.advance(JobState::Naming);
        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output_name = ctx.namer.transform(&file_name)?;
        let output_dir = match &ctx.output_dir {
            Some(dir) => dir.clone(),
            None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        let output = output_dir.join(output_name);
        if same_file(&input, &output) {
            return Err(Error::OutputIsInput { path: input });
        }
        ctx.claim_output(&output)?;

        let command = EncodeArgs::build(&ctx.profile, &streams, &input, &output)?;

        if ctx.dry_run {
            return Ok(JobReport {
                input,
                output,
                streams,
                command,
                encoded: false,
            });
        }

        self.advance(JobState::Encoding);
        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            "Encoding"
        );
        run_encode(&ctx.ffmpeg, &command).await?;

        Ok(JobReport {
            input,
            output,
            streams,
            command,
            encoded: true,
        })
    }
}

/// Convert `input` using the shared context.
pub async fn run_job(ctx: &JobContext, input: &Path) -> mkvshrink_core::Result<JobReport> {
    Job::new(input).run(ctx).await
}
