//! # scad-batch
//!
//! Parallel batch rendering of OpenSCAD models. Every source file in a
//! directory is rendered to an artifact by the OpenSCAD command-line binary;
//! a comment block inside the file can ask for several variants or a higher
//! render accuracy.
//!
//! # Architecture: Scan, Expand, Execute
//!
//! ```text
//! 1. Scan      models/  →  DirectiveSet per file   (filesystem → directives)
//! 2. Expand    directives  →  Jobs                 (pure)
//! 3. Execute   Jobs  →  WorkQueue  →  WorkerPool  →  out/*.stl
//! ```
//!
//! Scanning and expansion never touch the renderer, so `scad-batch plan` can
//! show exactly what a build would do. Execution is the only stage with side
//! effects: derived sources written next to the originals, renderer
//! processes, artifacts.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`directive`] | Parses the `//PARALLEL-PROPS` block of a source file |
//! | [`expand`] | Turns a file's directives into jobs |
//! | [`job`] | A single renderer invocation and its derived-source lifecycle |
//! | [`naming`] | Artifact and derived-source file names |
//! | [`scan`] | Lists a source directory and expands every file |
//! | [`queue`] | Thread-safe FIFO shared by workers |
//! | [`pool`] | Fixed-size worker pool that drains a queue |
//! | [`render`] | The [`render::Renderer`] seam and the OpenSCAD implementation |
//! | [`execute`] | Runs a scan through the pool and aggregates a report |
//! | [`config`] | `scad-batch.toml` loading, validation and defaults |
//! | [`paths`] | Source/destination checks and output directory reset |
//! | [`output`] | CLI output formatting for plans, progress and reports |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! # Design Decisions
//!
//! ## One Derived File Per Job
//!
//! An accuracy override is applied by writing a copy of the source with the
//! marker lines rewritten. The copy's name carries the render index
//! (`gear_temp_3.scad`), so variants of the same file rendered concurrently
//! never share, overwrite or delete each other's input.
//!
//! ## Failures Are Collected, Not Fatal
//!
//! A renderer failure is recorded against its job and the worker moves on.
//! The build finishes every job it can, then reports all failures at once and
//! exits non-zero. A file with a malformed directive block is rejected the
//! same way without stopping the rest of the directory.
//!
//! ## Blocking Workers
//!
//! Each worker blocks on its renderer process. The pool size, not an async
//! runtime, bounds how many renders run at once; OpenSCAD is CPU-bound and
//! single-threaded, so one worker per core is the natural limit.

pub mod config;
pub mod directive;
pub mod execute;
pub mod expand;
pub mod job;
pub mod logging;
pub mod naming;
pub mod output;
pub mod paths;
pub mod pool;
pub mod queue;
pub mod render;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
