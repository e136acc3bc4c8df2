//! Filesystem preconditions checked before a build starts.
//!
//! The source and destination must be existing directories, and the
//! destination must accept new files. An `out/` directory left by a previous
//! build is only removed after explicit confirmation (`--force` or typing
//! `DELETE`).

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Word the user must type to confirm removal of an existing output dir.
pub const CONFIRM_WORD: &str = "DELETE";

#[derive(Error, Debug)]
pub enum PathError {
    #[error("{} path not found: {}", .role, .path.display())]
    NotFound { role: &'static str, path: PathBuf },
    #[error("{} path is not a directory: {}", .role, .path.display())]
    NotADirectory { role: &'static str, path: PathBuf },
    #[error("unable to write to {} path: {}", .role, .path.display())]
    ReadOnly { role: &'static str, path: PathBuf },
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Check that `path` is an existing directory.
pub fn check_dir(role: &'static str, path: &Path) -> Result<(), PathError> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(PathError::NotFound {
                role,
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(PathError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if !metadata.is_dir() {
        return Err(PathError::NotADirectory {
            role,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Name of the file created to check that a directory accepts writes.
const WRITE_CHECK_FILE: &str = ".scad-batch-write-check";

/// Check that `path` is an existing directory the current user can create
/// files in. Permission bits alone do not answer that (ownership, ACLs,
/// read-only mounts), so a file is created and removed again.
pub fn check_writable_dir(role: &'static str, path: &Path) -> Result<(), PathError> {
    check_dir(role, path)?;
    let check_file = path.join(format!("{WRITE_CHECK_FILE}-{}", std::process::id()));
    match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&check_file)
    {
        Ok(file) => {
            drop(file);
            fs::remove_file(&check_file).map_err(|source| PathError::Io {
                path: check_file,
                source,
            })
        }
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem
            ) =>
        {
            Err(PathError::ReadOnly {
                role,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(PathError::Io {
            path: check_file,
            source,
        }),
    }
}

/// Ask the user to confirm removal of `dir`. Returns `true` only when they
/// type the confirmation word exactly.
pub fn confirm_removal(
    dir: &Path,
    mut input: impl BufRead,
    mut output: impl Write,
) -> io::Result<bool> {
    writeln!(
        output,
        "There is already a directory {} - type '{CONFIRM_WORD}' to remove it:",
        dir.display()
    )?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim() == CONFIRM_WORD)
}

/// Create `dir` empty, removing any previous contents.
pub fn reset_dir(dir: &Path) -> Result<(), PathError> {
    let io_err = |source| PathError::Io {
        path: dir.to_path_buf(),
        source,
    };
    if dir.exists() {
        tracing::info!(path = %dir.display(), "removing previous output");
        fs::remove_dir_all(dir).map_err(io_err)?;
    }
    fs::create_dir_all(dir).map_err(io_err)
}
