//! Bounded-concurrency execution of many jobs.
//!
//! A permit is taken from a [`Semaphore`] *before* each job is spawned, so at
//! most `limit` jobs exist at once and the launch loop itself applies
//! back-pressure. Every spawned job is joined before [`BatchRunner::run`]
//! returns.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mkvshrink_core::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// List the regular files in `dir` whose extension matches `extension`.
///
/// Not recursive. The comparison ignores ASCII case and a leading dot on
/// `extension`. Results are sorted by path.
///
/// # Errors
///
/// [`Error::DirectoryRead`] if the directory cannot be listed.
pub fn discover_inputs(dir: &Path, extension: &str) -> mkvshrink_core::Result<Vec<PathBuf>> {
    let wanted = extension.trim_start_matches('.');
    let read_err = |source: std::io::Error| Error::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(wanted));
        if matches {
            inputs.push(path);
        }
    }

    inputs.sort();
    tracing::debug!(dir = %dir.display(), count = inputs.len(), "Discovered inputs");
    Ok(inputs)
}

/// Concurrent job limit for `cores` CPUs: `cores * factor`, at least 1.
pub fn concurrency_limit(cores: usize, factor: usize) -> usize {
    cores.saturating_mul(factor).max(1)
}

/// Result of one job.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Succeeded {
        input: PathBuf,
        output: PathBuf,
        elapsed: Duration,
    },
    Failed {
        input: PathBuf,
        reason: String,
        elapsed: Duration,
    },
}

impl JobOutcome {
    pub fn input(&self) -> &Path {
        match self {
            Self::Succeeded { input, .. } | Self::Failed { input, .. } => input,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Succeeded { elapsed, .. } | Self::Failed { elapsed, .. } => *elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    fn file_name(&self) -> String {
        let input = self.input();
        input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string())
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded { elapsed, .. } => {
                write!(f, "ok {} ({})", self.file_name(), format_elapsed(*elapsed))
            }
            Self::Failed {
                reason, elapsed, ..
            } => write!(
                f,
                "FAILED {} ({}): {reason}",
                self.file_name(),
                format_elapsed(*elapsed)
            ),
        }
    }
}

/// Aggregate of a finished batch, outcomes in completion order.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<JobOutcome>,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed in {}",
            self.succeeded(),
            self.failed(),
            format_elapsed(self.elapsed)
        )
    }
}

/// `1h02m03s`, `2m05s`, or `4.2s`.
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{h}h{m:02}m{s:02}s")
    } else if m > 0 {
        format!("{m}m{s:02}s")
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

/// Called once per finished job with its 1-based completion number and the
/// batch size.
pub type ProgressFn = dyn Fn(usize, usize, &JobOutcome) + Send + Sync;

/// Runs jobs with at most `limit` in flight.
pub struct BatchRunner {
    limit: usize,
    on_complete: Option<Arc<ProgressFn>>,
}

impl BatchRunner {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            on_complete: None,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Report each job as it finishes.
    pub fn on_complete(
        mut self,
        f: impl Fn(usize, usize, &JobOutcome) + Send + Sync + 'static,
    ) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }

    /// Run `job_fn` for every input and wait for all of them.
    ///
    /// A job that returns an error or panics is recorded as failed; the
    /// remaining jobs are unaffected.
    pub async fn run<F, Fut>(&self, inputs: Vec<PathBuf>, job_fn: F) -> BatchSummary
    where
        F: Fn(PathBuf) -> Fut,
        Fut: Future<Output = mkvshrink_core::Result<PathBuf>> + Send + 'static,
    {
        let started = Instant::now();
        let total = inputs.len();
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let completed = Arc::new(AtomicUsize::new(0));
        let mut set = JoinSet::new();

        tracing::info!(files = total, limit = self.limit, "Starting batch");

        for input in inputs {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                // The semaphore is never closed.
                break;
            };
            let job = job_fn(input.clone());
            let completed = completed.clone();
            let on_complete = self.on_complete.clone();

            set.spawn(async move {
                let job_started = Instant::now();
                // Run in a nested task so a panic is caught and tied to its input.
                let result = match tokio::spawn(job).await {
                    Ok(r) => r.map_err(|e| e.to_string()),
                    Err(e) => Err(format!("job panicked: {e}")),
                };
                let elapsed = job_started.elapsed();
                drop(permit);

                let outcome = match result {
                    Ok(output) => JobOutcome::Succeeded {
                        input,
                        output,
                        elapsed,
                    },
                    Err(reason) => {
                        tracing::warn!(input = %input.display(), %reason, "Job failed");
                        JobOutcome::Failed {
                            input,
                            reason,
                            elapsed,
                        }
                    }
                };

                let n = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(cb) = on_complete {
                    cb(n, total, &outcome);
                }
                outcome
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!("Batch task failed to join: {e}"),
            }
        }

        let summary = BatchSummary {
            outcomes,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "Batch finished"
        );
        summary
    }
}
