//! Source directory scanning.
//!
//! Lists the top level of the source directory, parses the directive block
//! of every file with the configured source extension and expands it into
//! jobs. Files are visited in sorted order so the plan is stable between
//! runs (execution order is not).
//!
//! ```text
//! models/
//! ├── scad-batch.toml      # Optional config (see config module)
//! ├── bracket.scad         # No directives          → bracket.stl
//! ├── lid.scad             # AVAILABLE_MODES=2;     → lid_0.stl, lid_1.stl
//! ├── sensor_temp.scad     # Just another source    → sensor_temp.stl
//! ├── notes.txt            # Other extension        → ignored
//! └── part.SCAD            # Extension case differs → ignored
//! ```
//!
//! A file is *rejected* when its directives cannot be parsed, or when one of
//! the names it would write is already taken: an artifact or derived source
//! claimed by an earlier file, or a derived source that already exists in
//! the directory (typically left behind by an interrupted run). A rejected
//! file contributes no jobs and is reported, but the rest of the directory
//! is still expanded.

use crate::config::RenderSettings;
use crate::directive::{self, DirectiveError, DirectiveSet};
use crate::expand::expand_jobs;
use crate::job::Job;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot list source directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Why a single source file produced no jobs.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("invalid directive: {0}")]
    Directive(#[from] DirectiveError),
    #[error("cannot read file: {0}")]
    Io(#[from] io::Error),
    #[error("{name} is also written for {}", .owner.display())]
    NameTaken { name: String, owner: PathBuf },
    #[error("derived source {name} would overwrite an existing file; remove it if it is a leftover")]
    DerivedSourceExists { name: String },
}

/// A source file that was parsed successfully.
#[derive(Debug)]
pub struct ScannedFile {
    /// Path relative to the source directory.
    pub file: PathBuf,
    pub directives: DirectiveSet,
    pub job_count: usize,
}

#[derive(Debug)]
pub struct RejectedFile {
    pub file: PathBuf,
    pub error: FileError,
}

/// Result of scanning a source directory.
#[derive(Debug, Default)]
pub struct Scan {
    pub files: Vec<ScannedFile>,
    pub rejected: Vec<RejectedFile>,
    pub jobs: Vec<Job>,
}

/// Names already written by accepted files, mapped to the file that owns them.
#[derive(Default)]
struct Claims {
    artifacts: HashMap<String, PathBuf>,
    derived: HashMap<String, PathBuf>,
}

impl Claims {
    /// Claim every name `jobs` would write for `file`, or claim nothing.
    fn claim(
        &mut self,
        source_dir: &Path,
        file: &Path,
        jobs: &[Job],
        settings: &RenderSettings,
    ) -> Result<(), FileError> {
        let mut artifacts = Vec::new();
        let mut derived = Vec::new();
        for job in jobs {
            let invocation = job.plan(settings);
            if let Some(owner) = self.artifacts.get(&invocation.output_name) {
                return Err(FileError::NameTaken {
                    name: invocation.output_name,
                    owner: owner.clone(),
                });
            }
            artifacts.push(invocation.output_name);

            if invocation.derived_input {
                let name = invocation.input_file.to_string_lossy().into_owned();
                if let Some(owner) = self.derived.get(&name) {
                    return Err(FileError::NameTaken {
                        name,
                        owner: owner.clone(),
                    });
                }
                if fs::symlink_metadata(source_dir.join(&invocation.input_file)).is_ok() {
                    return Err(FileError::DerivedSourceExists { name });
                }
                derived.push(name);
            }
        }
        for name in artifacts {
            self.artifacts.insert(name, file.to_path_buf());
        }
        for name in derived {
            self.derived.insert(name, file.to_path_buf());
        }
        Ok(())
    }
}

pub fn scan(source_dir: &Path, settings: &RenderSettings) -> Result<Scan, ScanError> {
    let mut result = Scan::default();
    let mut claims = Claims::default();

    for file in list_sources(source_dir, settings)? {
        let expanded = scan_file(source_dir, &file).and_then(|directives| {
            let jobs = expand_jobs(&file, &directives);
            claims.claim(source_dir, &file, &jobs, settings)?;
            Ok((directives, jobs))
        });
        match expanded {
            Ok((directives, jobs)) => {
                if jobs.is_empty() {
                    tracing::warn!(
                        file = %file.display(),
                        "AVAILABLE_MODES=0 declared, nothing to render"
                    );
                }
                result.files.push(ScannedFile {
                    file,
                    directives,
                    job_count: jobs.len(),
                });
                result.jobs.extend(jobs);
            }
            Err(error) => {
                tracing::error!(file = %file.display(), %error, "rejecting source file");
                result.rejected.push(RejectedFile { file, error });
            }
        }
    }

    tracing::info!(
        files = result.files.len(),
        rejected = result.rejected.len(),
        jobs = result.jobs.len(),
        "scanned {}",
        source_dir.display()
    );
    Ok(result)
}

fn scan_file(source_dir: &Path, file: &Path) -> Result<DirectiveSet, FileError> {
    let text = fs::read_to_string(source_dir.join(file))?;
    Ok(directive::parse_directives(&text)?)
}

/// Source file names (relative to `source_dir`), sorted.
fn list_sources(source_dir: &Path, settings: &RenderSettings) -> Result<Vec<PathBuf>, ScanError> {
    let read_err = |source| ScanError::ReadDir {
        path: source_dir.to_path_buf(),
        source,
    };
    let entries = fs::read_dir(source_dir).map_err(read_err)?.map(|entry| -> io::Result<_> {
        let entry = entry?;
        Ok((PathBuf::from(entry.file_name()), entry.path().is_file()))
    });
    select_sources(entries, settings).map_err(read_err)
}

/// Keep regular files whose extension is exactly the source extension.
fn select_sources(
    entries: impl IntoIterator<Item = io::Result<(PathBuf, bool)>>,
    settings: &RenderSettings,
) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in entries {
        let (name, is_file) = entry?;
        let matches = name
            .extension()
            .is_some_and(|ext| ext == settings.source_extension.as_str());
        if is_file && matches {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn fixtures_expand_to_expected_outputs() {
        let tmp = setup_fixtures();
        let scan = scan(tmp.path(), &RenderSettings::default()).unwrap();
        assert!(scan.rejected.is_empty());
        assert_eq!(
            output_names(&scan.jobs),
            vec![
                "bracket.stl",
                "knob.stl",
                "lid_0.stl",
                "lid_1.stl",
                "lid_2.stl",
            ]
        );
    }

    #[test]
    fn only_source_extension_is_scanned() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.scad", "cube(1);");
        write(tmp.path(), "notes.txt", "hello");
        write(tmp.path(), "b.SCAD", "cube(2);");
        fs::create_dir(tmp.path().join("dir.scad")).unwrap();

        let scan = scan(tmp.path(), &RenderSettings::default()).unwrap();
        let files: Vec<_> = scan.files.iter().map(|f| f.file.clone()).collect();
        assert_eq!(files, vec![PathBuf::from("a.scad")]);
    }

    #[test]
    fn extension_case_variants_do_not_share_outputs() {
        let tmp = TempDir::new().unwrap();
        let accurate = "//PARALLEL-PROPS\nRENDER_WITH=40;\n//END-PARALLEL-PROPS\n$fn=4;\n";
        write(tmp.path(), "a.scad", accurate);
        write(tmp.path(), "a.SCAD", accurate);

        let scan = scan(tmp.path(), &RenderSettings::default()).unwrap();
        let settings = RenderSettings::default();
        let planned: Vec<_> = scan
            .jobs
            .iter()
            .map(|j| {
                let inv = j.plan(&settings);
                (inv.output_name, inv.input_file)
            })
            .collect();
        assert_eq!(
            planned,
            vec![("a.stl".to_string(), PathBuf::from("a_temp.scad"))]
        );
    }

    #[test]
    fn source_named_like_a_derived_file_is_rendered() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "sensor_temp.scad", "cube(1);");
        write(tmp.path(), "probe_temp_2.scad", "cube(2);");

        let scan = scan(tmp.path(), &RenderSettings::default()).unwrap();
        assert!(scan.rejected.is_empty());
        assert_eq!(
            output_names(&scan.jobs),
            vec!["probe_temp_2.stl", "sensor_temp.stl"]
        );
    }

    #[test]
    fn existing_derived_file_rejects_its_owner() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "lid.scad",
            "//PARALLEL-PROPS\nRENDER_WITH=50;\n//END-PARALLEL-PROPS\n$fn=4;\n",
        );
        write(tmp.path(), "lid_temp.scad", "cube(1);");

        let scan = scan(tmp.path(), &RenderSettings::default()).unwrap();

        // The existing file is left alone and rendered in its own right
        assert_eq!(output_names(&scan.jobs), vec!["lid_temp.stl"]);
        assert_eq!(scan.rejected.len(), 1);
        assert_eq!(scan.rejected[0].file, PathBuf::from("lid.scad"));
        assert!(matches!(
            &scan.rejected[0].error,
            FileError::DerivedSourceExists { name } if name == "lid_temp.scad"
        ));
    }

    #[test]
    fn artifact_claimed_by_earlier_file_rejects_later_one() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "b.scad",
            "//PARALLEL-PROPS\nAVAILABLE_MODES=2;\n//END-PARALLEL-PROPS\n",
        );
        write(tmp.path(), "b_0.scad", "cube(1);");

        let scan = scan(tmp.path(), &RenderSettings::default()).unwrap();

        assert_eq!(output_names(&scan.jobs), vec!["b_0.stl", "b_1.stl"]);
        assert_eq!(scan.rejected.len(), 1);
        assert_eq!(scan.rejected[0].file, PathBuf::from("b_0.scad"));
        match &scan.rejected[0].error {
            FileError::NameTaken { name, owner } => {
                assert_eq!(name, "b_0.stl");
                assert_eq!(owner, &PathBuf::from("b.scad"));
            }
            other => panic!("expected NameTaken, got {other:?}"),
        }
    }

    #[test]
    fn rejected_file_claims_nothing() {
        let tmp = TempDir::new().unwrap();
        // `a.scad` sorts first and is rejected, so `a_0.scad` keeps `a_0.stl`
        write(
            tmp.path(),
            "a.scad",
            "//PARALLEL-PROPS\nAVAILABLE_MODES=2;\nRENDER_WITH=x;\n//END-PARALLEL-PROPS\n",
        );
        write(tmp.path(), "a_0.scad", "cube(1);");

        let scan = scan(tmp.path(), &RenderSettings::default()).unwrap();
        assert_eq!(output_names(&scan.jobs), vec!["a_0.stl"]);
        assert_eq!(scan.rejected[0].file, PathBuf::from("a.scad"));
    }

    #[test]
    fn unreadable_entry_fails_the_listing() {
        let entries = vec![
            Ok((PathBuf::from("a.scad"), true)),
            Err(io::Error::other("entry vanished")),
        ];
        assert!(select_sources(entries, &RenderSettings::default()).is_err());
    }

    #[test]
    fn bad_directive_rejects_only_that_file() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "good.scad", "cube(1);");
        write(
            tmp.path(),
            "bad.scad",
            "//PARALLEL-PROPS\nAVAILABLE_MODES=two;\n//END-PARALLEL-PROPS\n",
        );

        let scan = scan(tmp.path(), &RenderSettings::default()).unwrap();
        assert_eq!(output_names(&scan.jobs), vec!["good.stl"]);
        assert_eq!(scan.rejected.len(), 1);
        assert_eq!(scan.rejected[0].file, PathBuf::from("bad.scad"));
        assert!(matches!(scan.rejected[0].error, FileError::Directive(_)));
    }

    #[test]
    fn zero_modes_file_is_scanned_with_no_jobs() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "empty.scad",
            "//PARALLEL-PROPS\nAVAILABLE_MODES=0;\n//END-PARALLEL-PROPS\n",
        );

        let scan = scan(tmp.path(), &RenderSettings::default()).unwrap();
        assert!(scan.jobs.is_empty());
        assert!(scan.rejected.is_empty());
        assert_eq!(scan.files.len(), 1);
        assert_eq!(scan.files[0].job_count, 0);
    }

    #[test]
    fn custom_extension() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.scad", "cube(1);");
        write(tmp.path(), "b.model", "cube(1);");
        let settings = RenderSettings {
            source_extension: "model".to_string(),
            ..Default::default()
        };

        let scan = scan(tmp.path(), &settings).unwrap();
        assert_eq!(output_names(&scan.jobs), vec!["b.stl"]);
    }

    #[test]
    fn missing_directory_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = scan(&tmp.path().join("nope"), &RenderSettings::default());
        assert!(matches!(result, Err(ScanError::ReadDir { .. })));
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        let scan = scan(tmp.path(), &RenderSettings::default()).unwrap();
        assert!(scan.jobs.is_empty());
        assert!(scan.files.is_empty());
    }
}
