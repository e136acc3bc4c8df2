//! File names derived from a source file name.
//!
//! All names are built from the source *stem* (file name minus its last
//! extension):
//!
//! - `gear.scad` → `gear.stl`, or `gear_2.stl` for render index 2
//! - `gear.scad` + accuracy → `gear_temp.scad`, or `gear_temp_2.scad` for
//!   render index 2
//!
//! Including the render index in the temp name keeps concurrently running
//! variants of one source from sharing a derived file.

use std::path::Path;

/// Stem of a source file name (`"gear.scad"` → `"gear"`).
pub fn source_stem(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<stem>[_<index>]`
fn indexed(stem: &str, render_index: Option<u32>) -> String {
    match render_index {
        Some(i) => format!("{stem}_{i}"),
        None => stem.to_string(),
    }
}

/// Artifact file name: `<stem>[_<index>].<artifact_ext>`.
pub fn artifact_name(file: &Path, render_index: Option<u32>, artifact_ext: &str) -> String {
    format!("{}.{}", indexed(&source_stem(file), render_index), artifact_ext)
}

/// Derived source file name: `<stem><suffix>[_<index>].<source_ext>`.
pub fn temp_source_name(
    file: &Path,
    render_index: Option<u32>,
    temp_suffix: &str,
    source_ext: &str,
) -> String {
    let stem = format!("{}{}", source_stem(file), temp_suffix);
    format!("{}.{}", indexed(&stem, render_index), source_ext)
}
