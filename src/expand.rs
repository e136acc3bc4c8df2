//! Job expansion: one source file + its directives → zero or more jobs.

use crate::directive::DirectiveSet;
use crate::job::Job;
use std::path::Path;

/// Expand a file's directives into jobs.
///
/// Without a mode count the file renders once, unindexed. With
/// `AVAILABLE_MODES=M` it renders once per index `0..M`; `M = 0` therefore
/// yields no jobs at all.
pub fn expand_jobs(file: &Path, directives: &DirectiveSet) -> Vec<Job> {
    match directives.mode_count {
        None => vec![Job::new(
            file,
            None,
            directives.accuracy,
            directives.test_mode_disabled,
        )],
        Some(count) => (0..count)
            .map(|i| {
                Job::new(
                    file,
                    Some(i),
                    directives.accuracy,
                    directives.test_mode_disabled,
                )
            })
            .collect(),
    }
}
