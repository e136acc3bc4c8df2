//! The external renderer.
//!
//! The [`Renderer`] trait is the seam between job execution and the process
//! that actually produces an artifact. [`OpenScadRenderer`] is the production
//! implementation; it is invoked once per job as
//!
//! ```text
//! <executable> -o <output> [-D <key=value>]* <input>
//! ```
//!
//! and blocks until the process exits. Stdout and stderr are captured; a
//! non-zero exit status is an error carrying the tail of stderr.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// How many trailing stderr lines to keep in a failure.
const STDERR_TAIL_LINES: usize = 8;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot start {}: {source}", .executable.display())]
    Spawn {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("renderer exited with {status}{}", format_stderr(.stderr))]
    Failed { status: String, stderr: String },
    #[error("OpenSCAD executable not found; pass --openscad or set OPENSCAD")]
    NotFound,
}

fn format_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// One renderer call with absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub output: PathBuf,
    pub input: PathBuf,
    pub variables: Vec<String>,
}

impl RenderRequest {
    /// Command-line arguments, without the executable.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-o".into(), self.output.clone().into()];
        for var in &self.variables {
            args.push("-D".into());
            args.push(var.into());
        }
        args.push(self.input.clone().into());
        args
    }
}

/// Something that can turn a source file into an artifact.
///
/// Implementations are shared by all workers and must be `Sync`.
pub trait Renderer: Sync {
    fn render(&self, request: &RenderRequest) -> Result<(), RenderError>;
}

/// Renders by spawning the OpenSCAD command-line binary.
#[derive(Debug, Clone)]
pub struct OpenScadRenderer {
    executable: PathBuf,
}

impl OpenScadRenderer {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl Renderer for OpenScadRenderer {
    fn render(&self, request: &RenderRequest) -> Result<(), RenderError> {
        let output = Command::new(&self.executable)
            .args(request.args())
            .output()
            .map_err(|source| RenderError::Spawn {
                executable: self.executable.clone(),
                source,
            })?;

        if !output.stdout.is_empty() {
            tracing::trace!(
                output = %request.output.display(),
                stdout = %String::from_utf8_lossy(&output.stdout),
                "renderer stdout"
            );
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(RenderError::Failed {
                status: output.status.to_string(),
                stderr: stderr_tail(&String::from_utf8_lossy(&output.stderr)),
            })
        }
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Where OpenSCAD is installed by default on this platform.
pub fn platform_default() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        Some(PathBuf::from(
            "/Applications/OpenSCAD.app/Contents/MacOS/OpenSCAD",
        ))
    } else if cfg!(target_os = "linux") {
        Some(PathBuf::from("/usr/bin/openscad"))
    } else if cfg!(windows) {
        Some(PathBuf::from(r"C:\Program Files\OpenSCAD\openscad.exe"))
    } else {
        None
    }
}

/// Find an executable by name in the directories of `path_var`.
pub fn find_on_path(name: &str, path_var: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    let path_var = path_var?;
    let candidates: Vec<String> = if cfg!(windows) {
        vec![format!("{name}.exe"), name.to_string()]
    } else {
        vec![name.to_string()]
    };
    std::env::split_paths(path_var)
        .flat_map(|dir| candidates.iter().map(move |c| dir.join(c)))
        .find(|p| p.is_file())
}

/// Resolve the renderer executable.
///
/// An explicit path wins (and must exist). Otherwise the platform default is
/// tried, then `openscad` on `PATH`.
pub fn resolve_executable(explicit: Option<&Path>) -> Result<PathBuf, RenderError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(RenderError::NotFound)
        };
    }
    platform_default()
        .filter(|p| p.is_file())
        .or_else(|| find_on_path("openscad", std::env::var_os("PATH").as_deref()))
        .ok_or(RenderError::NotFound)
}
