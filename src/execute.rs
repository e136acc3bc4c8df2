//! Build execution: scanned jobs → worker pool → artifacts.
//!
//! [`run_build`] fills a [`WorkQueue`] with every job of a [`Scan`], starts a
//! [`WorkerPool`] sized from the processing config and blocks until all
//! workers have drained the queue. Each worker runs a job in three steps:
//!
//! 1. **Prepare**: [`Job::invocation`], which may write a derived source file
//! 2. **Render**: [`Renderer::render`], which blocks on the external process
//! 3. **Clean up**: [`Job::finish`], which removes the derived source file
//!
//! Clean-up runs whenever preparation succeeded, including after a failed
//! render, so derived files are not left behind. A failure in any step is
//! recorded against that job; the worker carries on with the next one.
//! Nothing is retried.
//!
//! Progress is reported as [`BuildEvent`]s on an optional channel, the same
//! way the CLI's printer thread consumes them.

use crate::config::{self, BuildConfig};
use crate::job::{Invocation, Job, JobError};
use crate::pool::{PoolError, WorkerId, WorkerPool};
use crate::queue::WorkQueue;
use crate::render::{RenderError, RenderRequest, Renderer};
use crate::scan::{RejectedFile, Scan};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Name of the artifact directory inside the destination.
pub const OUT_DIR: &str = "out";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Why a single job did not produce its artifact.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("cannot prepare input: {0}")]
    Prepare(#[source] JobError),
    #[error("{0}")]
    Render(#[from] RenderError),
    #[error("cannot remove derived input: {0}")]
    Cleanup(#[source] JobError),
}

/// Immutable inputs shared by every worker.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub source_dir: PathBuf,
    /// `<destination>/out`
    pub output_dir: PathBuf,
    pub config: BuildConfig,
}

impl BuildContext {
    pub fn new(source_dir: &Path, destination_dir: &Path, config: BuildConfig) -> Self {
        Self {
            source_dir: source_dir.to_path_buf(),
            output_dir: destination_dir.join(OUT_DIR),
            config,
        }
    }

    /// Absolute renderer request for a job's invocation.
    fn request(&self, invocation: Invocation) -> RenderRequest {
        RenderRequest {
            output: self.output_dir.join(&invocation.output_name),
            input: self.source_dir.join(&invocation.input_file),
            variables: invocation.variables,
        }
    }
}

/// Progress events emitted while a build runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    Started {
        jobs: usize,
        workers: usize,
    },
    JobStarted {
        worker: WorkerId,
        output_name: String,
    },
    JobFinished {
        worker: WorkerId,
        output_name: String,
        /// `None` on success, the error message otherwise.
        error: Option<String>,
    },
}

#[derive(Debug)]
pub struct JobFailure {
    pub output_name: String,
    pub source_file: PathBuf,
    pub error: ExecError,
}

/// Outcome of a whole build.
#[derive(Debug, Default)]
pub struct RunReport {
    pub workers: usize,
    /// Artifact names written, sorted.
    pub rendered: Vec<String>,
    /// Jobs that failed, sorted by artifact name.
    pub failures: Vec<JobFailure>,
    /// Source files that produced no jobs because they could not be parsed.
    pub rejected: Vec<RejectedFile>,
}

impl RunReport {
    pub fn total_jobs(&self) -> usize {
        self.rendered.len() + self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.rejected.is_empty()
    }
}

/// Run every job of `scan` and wait for all of them to finish.
pub fn run_build(
    ctx: &BuildContext,
    scan: Scan,
    renderer: &dyn Renderer,
    events: Option<Sender<BuildEvent>>,
) -> Result<RunReport, BuildError> {
    let workers = config::effective_threads(&ctx.config.processing);
    let pool = WorkerPool::new(workers)?;
    let queue: WorkQueue<Job> = scan.jobs.into_iter().collect();

    tracing::info!(
        jobs = queue.len(),
        workers = pool.threads(),
        "starting render pool"
    );
    emit(
        &events,
        BuildEvent::Started {
            jobs: queue.len(),
            workers: pool.threads(),
        },
    );

    let outcomes = pool.run(&queue, |worker, job| {
        let output_name = job.output_name(&ctx.config.render);
        emit(
            &events,
            BuildEvent::JobStarted {
                worker,
                output_name: output_name.clone(),
            },
        );
        tracing::debug!(worker, output = %output_name, "job started");

        let result = execute_job(ctx, renderer, &job);

        match &result {
            Ok(()) => tracing::debug!(worker, output = %output_name, "job rendered"),
            Err(error) => tracing::warn!(worker, output = %output_name, %error, "job failed"),
        }
        emit(
            &events,
            BuildEvent::JobFinished {
                worker,
                output_name: output_name.clone(),
                error: result.as_ref().err().map(|e| e.to_string()),
            },
        );
        (job, output_name, result)
    });

    let mut report = RunReport {
        workers: pool.threads(),
        rejected: scan.rejected,
        ..RunReport::default()
    };
    for (job, output_name, result) in outcomes {
        match result {
            Ok(()) => report.rendered.push(output_name),
            Err(error) => report.failures.push(JobFailure {
                output_name,
                source_file: job.source_file().to_path_buf(),
                error,
            }),
        }
    }
    report.rendered.sort();
    report
        .failures
        .sort_by(|a, b| a.output_name.cmp(&b.output_name));

    tracing::info!(
        rendered = report.rendered.len(),
        failed = report.failures.len(),
        rejected = report.rejected.len(),
        "build finished"
    );
    Ok(report)
}

/// Prepare, render and clean up a single job.
fn execute_job(ctx: &BuildContext, renderer: &dyn Renderer, job: &Job) -> Result<(), ExecError> {
    let settings = &ctx.config.render;
    let invocation = job
        .invocation(settings, &ctx.source_dir)
        .map_err(ExecError::Prepare)?;

    let rendered = renderer.render(&ctx.request(invocation));
    let cleaned = job.finish(settings, &ctx.source_dir);

    match (rendered, cleaned) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(render), Ok(())) => Err(ExecError::Render(render)),
        (Ok(()), Err(cleanup)) => Err(ExecError::Cleanup(cleanup)),
        (Err(render), Err(cleanup)) => {
            tracing::error!(
                source = %job.source_file().display(),
                error = %cleanup,
                "cannot remove derived input after failed render"
            );
            Err(ExecError::Render(render))
        }
    }
}

fn emit(events: &Option<Sender<BuildEvent>>, event: BuildEvent) {
    if let Some(tx) = events {
        // The receiver going away only means nobody is watching progress.
        let _ = tx.send(event);
    }
}
