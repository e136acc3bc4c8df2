//! A single renderer invocation.
//!
//! A [`Job`] is a plain value describing *what* to render. Calling
//! [`Job::invocation`] turns it into an [`Invocation`] (the concrete output
//! name, input file and `-D` variables) and, when the job carries an
//! accuracy override, writes the derived source file the renderer will read.
//! [`Job::finish`] removes that file again.
//!
//! The derived file is created by `invocation` and removed by `finish`; the
//! two must be called exactly once each, in that order, by the worker that
//! owns the job.

use crate::config::RenderSettings;
use crate::naming;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl JobError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| JobError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    source_file: PathBuf,
    render_index: Option<u32>,
    accuracy: Option<u32>,
    disable_test: bool,
}

/// Everything needed to call the renderer for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    /// Artifact file name, relative to the output directory.
    pub output_name: String,
    /// Renderer input, relative to the source directory.
    pub input_file: PathBuf,
    /// `key=value` pairs, each passed as `-D <pair>`.
    pub variables: Vec<String>,
    /// Whether `input_file` is a derived copy owned by this job.
    pub derived_input: bool,
}

impl Job {
    pub fn new(
        source_file: impl Into<PathBuf>,
        render_index: Option<u32>,
        accuracy: Option<u32>,
        disable_test: bool,
    ) -> Self {
        Self {
            source_file: source_file.into(),
            render_index,
            accuracy,
            disable_test,
        }
    }

    pub fn source_file(&self) -> &Path {
        &self.source_file
    }

    pub fn render_index(&self) -> Option<u32> {
        self.render_index
    }

    pub fn accuracy(&self) -> Option<u32> {
        self.accuracy
    }

    pub fn disable_test(&self) -> bool {
        self.disable_test
    }

    pub fn output_name(&self, settings: &RenderSettings) -> String {
        naming::artifact_name(
            &self.source_file,
            self.render_index,
            &settings.artifact_extension,
        )
    }

    /// Renderer variables in the order they are passed.
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        if let Some(i) = self.render_index {
            vars.push(format!("EXPORT_MODE={i}"));
        }
        if self.disable_test {
            vars.push("TEST_MODE=0".to_string());
        }
        vars
    }

    /// Name of the derived source file, if this job needs one.
    pub fn temp_file(&self, settings: &RenderSettings) -> Option<PathBuf> {
        self.accuracy?;
        let name = naming::temp_source_name(
            &self.source_file,
            self.render_index,
            &settings.temp_suffix,
            &settings.source_extension,
        );
        Some(match self.source_file.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        })
    }

    /// Describe the invocation without touching the filesystem.
    pub fn plan(&self, settings: &RenderSettings) -> Invocation {
        let temp = self.temp_file(settings);
        Invocation {
            output_name: self.output_name(settings),
            derived_input: temp.is_some(),
            input_file: temp.unwrap_or_else(|| self.source_file.clone()),
            variables: self.variables(),
        }
    }

    /// Compute the invocation, writing the derived source file into
    /// `source_dir` when an accuracy override is set. An existing file of
    /// the same name is overwritten.
    pub fn invocation(
        &self,
        settings: &RenderSettings,
        source_dir: &Path,
    ) -> Result<Invocation, JobError> {
        let invocation = self.plan(settings);
        if let Some(accuracy) = self.accuracy {
            let source_path = source_dir.join(&self.source_file);
            let text = fs::read_to_string(&source_path).map_err(JobError::io(&source_path))?;
            let derived = substitute_accuracy(&text, &settings.accuracy_marker, accuracy);
            let temp_path = source_dir.join(&invocation.input_file);
            if let Err(source) = fs::write(&temp_path, derived) {
                // A partial write would otherwise be orphaned: `finish` is
                // never called for a job whose preparation failed.
                if fs::remove_file(&temp_path).is_ok() {
                    tracing::debug!(path = %temp_path.display(), "removed partial derived source");
                }
                return Err(JobError::Io {
                    path: temp_path,
                    source,
                });
            }
            tracing::debug!(path = %temp_path.display(), accuracy, "wrote derived source");
        }
        Ok(invocation)
    }

    /// Remove the derived source file written by [`Job::invocation`].
    ///
    /// A missing file is an error: it means the lifecycle was broken.
    pub fn finish(&self, settings: &RenderSettings, source_dir: &Path) -> Result<(), JobError> {
        if let Some(temp) = self.temp_file(settings) {
            let temp_path = source_dir.join(temp);
            fs::remove_file(&temp_path).map_err(JobError::io(&temp_path))?;
            tracing::debug!(path = %temp_path.display(), "removed derived source");
        }
        Ok(())
    }
}

/// Replace every line containing `marker` with `<marker>=<accuracy>;`.
///
/// Other lines are copied byte-for-byte, including their terminators.
pub fn substitute_accuracy(text: &str, marker: &str, accuracy: u32) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if line.contains(marker) {
            out.push_str(&format!("{marker}={accuracy};\n"));
        } else {
            out.push_str(line);
        }
    }
    out
}
