//! Shared test utilities for the scad-batch test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let scan = scan(tmp.path(), &RenderSettings::default()).unwrap();
//! assert_eq!(output_names(&scan.jobs), vec!["bracket.stl", /* ... */]);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::config::RenderSettings;
use crate::job::Job;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/models/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate (derived sources are written
/// next to the originals) without affecting other tests.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/models");
    for entry in std::fs::read_dir(&fixtures).unwrap() {
        let entry = entry.unwrap();
        std::fs::copy(entry.path(), tmp.path().join(entry.file_name())).unwrap();
    }
    tmp
}

// =========================================================================
// Extractors
// =========================================================================

/// Artifact names of `jobs` with default settings, in order.
pub fn output_names(jobs: &[Job]) -> Vec<String> {
    let settings = RenderSettings::default();
    jobs.iter().map(|j| j.output_name(&settings)).collect()
}

/// File names in `dir`, sorted.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
