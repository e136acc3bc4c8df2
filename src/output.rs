//! CLI output formatting for planning and building.
//!
//! # Output Format
//!
//! ## Plan
//!
//! Every source file is listed with its positional index and the directives
//! it declared, followed by one line per job: artifact name, renderer input
//! and `-D` variables.
//!
//! ```text
//! 001 bracket.scad
//!     bracket.stl ← bracket.scad
//! 002 knob.scad (RENDER_WITH=64)
//!     knob.stl ← knob_temp.scad
//! 003 lid.scad (AVAILABLE_MODES=2, TEST_MODE=0)
//!     lid_0.stl ← lid.scad -D EXPORT_MODE=0 -D TEST_MODE=0
//!     lid_1.stl ← lid.scad -D EXPORT_MODE=1 -D TEST_MODE=0
//!
//! Rejected
//!     broken.scad: invalid directive: ...
//!
//! 4 jobs from 3 files, 1 rejected
//! ```
//!
//! ## Build
//!
//! ```text
//! Rendering 4 jobs with 2 workers
//!     knob.stl: rendered
//!     lid_1.stl: FAILED renderer exited with exit status: 1: ERROR: ...
//!     bracket.stl: rendered
//!     lid_0.stl: rendered
//!
//! Failed
//!     lid_1.stl (lid.scad): renderer exited with exit status: 1: ERROR: ...
//!
//! Rendered 3 of 4 jobs
//! ```
//!
//! Progress lines appear in completion order, which varies between runs.
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::RenderSettings;
use crate::directive::DirectiveSet;
use crate::execute::{BuildEvent, RunReport};
use crate::job::Invocation;
use crate::scan::{RejectedFile, Scan};
use serde::Serialize;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Directives a file declared, as shown after its name.
///
/// ```text
/// (AVAILABLE_MODES=3, RENDER_WITH=50, TEST_MODE=0)
/// ```
fn directive_summary(directives: &DirectiveSet) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(n) = directives.mode_count {
        parts.push(format!("AVAILABLE_MODES={n}"));
    }
    if let Some(acc) = directives.accuracy {
        parts.push(format!("RENDER_WITH={acc}"));
    }
    if directives.test_mode_disabled {
        parts.push("TEST_MODE=0".to_string());
    }
    (!parts.is_empty()).then(|| format!("({})", parts.join(", ")))
}

/// One job line: `lid_0.stl ← lid.scad -D EXPORT_MODE=0`.
fn invocation_line(invocation: &Invocation) -> String {
    let mut line = format!(
        "{} ← {}",
        invocation.output_name,
        invocation.input_file.display()
    );
    for var in &invocation.variables {
        line.push_str(" -D ");
        line.push_str(var);
    }
    line
}

fn rejected_lines(rejected: &[RejectedFile]) -> Vec<String> {
    let mut lines = Vec::new();
    if rejected.is_empty() {
        return lines;
    }
    lines.push(String::new());
    lines.push("Rejected".to_string());
    for r in rejected {
        lines.push(format!("{}{}: {}", indent(1), r.file.display(), r.error));
    }
    lines
}

// ============================================================================
// Plan
// ============================================================================

/// Format the jobs a build would run, grouped by source file.
pub fn format_plan(scan: &Scan, settings: &RenderSettings) -> Vec<String> {
    let mut lines = Vec::new();
    let mut jobs = scan.jobs.iter();

    for (i, file) in scan.files.iter().enumerate() {
        let header = format!("{} {}", format_index(i + 1), file.file.display());
        match directive_summary(&file.directives) {
            Some(summary) => lines.push(format!("{header} {summary}")),
            None => lines.push(header),
        }
        if file.job_count == 0 {
            lines.push(format!("{}(no jobs)", indent(1)));
        }
        for job in jobs.by_ref().take(file.job_count) {
            lines.push(format!(
                "{}{}",
                indent(1),
                invocation_line(&job.plan(settings))
            ));
        }
    }

    lines.extend(rejected_lines(&scan.rejected));

    lines.push(String::new());
    let mut total = format!(
        "{} from {}",
        plural(scan.jobs.len(), "job"),
        plural(scan.files.len() + scan.rejected.len(), "file")
    );
    if !scan.rejected.is_empty() {
        total.push_str(&format!(", {} rejected", scan.rejected.len()));
    }
    lines.push(total);
    lines
}

/// Print the plan to stdout.
pub fn print_plan(scan: &Scan, settings: &RenderSettings) {
    for line in format_plan(scan, settings) {
        println!("{}", line);
    }
}

/// A job as it appears in `plan --json`.
#[derive(Debug, Serialize)]
pub struct PlannedJob<'a> {
    pub source_file: &'a Path,
    #[serde(flatten)]
    pub invocation: Invocation,
}

/// The jobs a build would run, as pretty-printed JSON.
pub fn format_plan_json(scan: &Scan, settings: &RenderSettings) -> serde_json::Result<String> {
    let planned: Vec<PlannedJob> = scan
        .jobs
        .iter()
        .map(|job| PlannedJob {
            source_file: job.source_file(),
            invocation: job.plan(settings),
        })
        .collect();
    serde_json::to_string_pretty(&planned)
}

// ============================================================================
// Build
// ============================================================================

/// Format a single build progress event as display lines.
///
/// Job starts are not shown; a job appears once, when it finishes.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::Started { jobs, workers } => vec![format!(
            "Rendering {} with {}",
            plural(*jobs, "job"),
            plural(*workers, "worker")
        )],
        BuildEvent::JobStarted { .. } => Vec::new(),
        BuildEvent::JobFinished {
            output_name,
            error: None,
            ..
        } => vec![format!("{}{}: rendered", indent(1), output_name)],
        BuildEvent::JobFinished {
            output_name,
            error: Some(error),
            ..
        } => vec![format!("{}{}: FAILED {}", indent(1), output_name, error)],
    }
}

/// Format the end-of-build summary.
pub fn format_report(report: &RunReport) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.failures.is_empty() {
        lines.push(String::new());
        lines.push("Failed".to_string());
        for failure in &report.failures {
            lines.push(format!(
                "{}{} ({}): {}",
                indent(1),
                failure.output_name,
                failure.source_file.display(),
                failure.error
            ));
        }
    }

    lines.extend(rejected_lines(&report.rejected));

    lines.push(String::new());
    let mut total = format!(
        "Rendered {} of {}",
        report.rendered.len(),
        plural(report.total_jobs(), "job")
    );
    if !report.rejected.is_empty() {
        total.push_str(&format!(
            ", {} rejected",
            plural(report.rejected.len(), "file")
        ));
    }
    lines.push(total);
    lines
}

/// Print the end-of-build summary to stdout.
pub fn print_report(report: &RunReport) {
    for line in format_report(report) {
        println!("{}", line);
    }
}
