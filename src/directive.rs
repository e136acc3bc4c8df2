//! Embedded render directives.
//!
//! A source file may declare how it wants to be rendered in a comment block
//! delimited by two marker lines:
//!
//! ```text
//! //PARALLEL-PROPS
//! AVAILABLE_MODES=3;
//! RENDER_WITH=50;
//! TEST_MODE=0;
//! //END-PARALLEL-PROPS
//! ```
//!
//! | Key | Effect |
//! |---|---|
//! | `AVAILABLE_MODES` | Render once per mode index `0..N`, passing `EXPORT_MODE=<i>` (`N` ≤ [`MAX_MODES`]) |
//! | `RENDER_WITH` | Render from a copy with the accuracy marker line set to this value |
//! | `TEST_MODE` | Any assignment disables test mode (`TEST_MODE=0` is passed) |
//!
//! Every key is optional and order-independent. Only the first block is
//! honored: parsing stops at the first end marker. A file with no start
//! marker gets the default [`DirectiveSet`].

use thiserror::Error;

pub const START_MARKER: &str = "//PARALLEL-PROPS";
pub const END_MARKER: &str = "//END-PARALLEL-PROPS";

const KEY_MODES: &str = "AVAILABLE_MODES";
const KEY_ACCURACY: &str = "RENDER_WITH";
const KEY_TEST_MODE: &str = "TEST_MODE";

/// Largest accepted `AVAILABLE_MODES`; each mode is a separate render.
pub const MAX_MODES: u32 = 10_000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("line {line}: {key} expects a non-negative integer, got {value:?}")]
    InvalidNumber {
        key: &'static str,
        value: String,
        line: usize,
    },
    #[error("line {line}: AVAILABLE_MODES={value} exceeds the limit of {max} modes", max = MAX_MODES)]
    TooManyModes { value: u32, line: usize },
}

/// Render parameters declared by a single source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectiveSet {
    /// Number of render modes; `None` means a single, unindexed render.
    pub mode_count: Option<u32>,
    /// Accuracy override substituted into a derived copy of the source.
    pub accuracy: Option<u32>,
    pub test_mode_disabled: bool,
}

/// Parse the first directive block of `text`.
pub fn parse_directives(text: &str) -> Result<DirectiveSet, DirectiveError> {
    let mut set = DirectiveSet::default();
    let mut in_block = false;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line == END_MARKER {
            break;
        }
        if line == START_MARKER {
            in_block = true;
            continue;
        }
        if !in_block {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        let value = value.strip_suffix(';').unwrap_or(value).trim();

        match key {
            KEY_MODES => {
                let count = parse_number(KEY_MODES, value, idx + 1)?;
                if count > MAX_MODES {
                    return Err(DirectiveError::TooManyModes {
                        value: count,
                        line: idx + 1,
                    });
                }
                set.mode_count = Some(count);
            }
            KEY_ACCURACY => set.accuracy = Some(parse_number(KEY_ACCURACY, value, idx + 1)?),
            KEY_TEST_MODE => set.test_mode_disabled = true,
            other => tracing::debug!(key = other, line = idx + 1, "ignoring unknown directive"),
        }
    }

    Ok(set)
}

fn parse_number(key: &'static str, value: &str, line: usize) -> Result<u32, DirectiveError> {
    value.parse::<u32>().map_err(|_| DirectiveError::InvalidNumber {
        key,
        value: value.to_string(),
        line,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_block_yields_defaults() {
        let text = "cube(10);\nsphere(5, $fn=20);\n";
        assert_eq!(parse_directives(text).unwrap(), DirectiveSet::default());
    }

    #[test]
    fn empty_text_yields_defaults() {
        assert_eq!(parse_directives("").unwrap(), DirectiveSet::default());
    }

    #[test]
    fn full_block() {
        let text = "\
//PARALLEL-PROPS
AVAILABLE_MODES=3;
RENDER_WITH=50;
TEST_MODE=false;
//END-PARALLEL-PROPS
cube(1);
";
        let set = parse_directives(text).unwrap();
        assert_eq!(set.mode_count, Some(3));
        assert_eq!(set.accuracy, Some(50));
        assert!(set.test_mode_disabled);
    }

    #[test]
    fn keys_are_order_independent() {
        let a = "//PARALLEL-PROPS\nRENDER_WITH=10;\nAVAILABLE_MODES=2;\n//END-PARALLEL-PROPS\n";
        let b = "//PARALLEL-PROPS\nAVAILABLE_MODES=2;\nRENDER_WITH=10;\n//END-PARALLEL-PROPS\n";
        assert_eq!(parse_directives(a).unwrap(), parse_directives(b).unwrap());
    }

    #[test]
    fn markers_match_trimmed_lines() {
        let text = "  //PARALLEL-PROPS  \n  AVAILABLE_MODES = 4 ;\n\t//END-PARALLEL-PROPS\n";
        assert_eq!(parse_directives(text).unwrap().mode_count, Some(4));
    }

    #[test]
    fn lines_outside_block_are_ignored() {
        let text = "\
AVAILABLE_MODES=9;
//PARALLEL-PROPS
RENDER_WITH=12;
//END-PARALLEL-PROPS
";
        let set = parse_directives(text).unwrap();
        assert_eq!(set.mode_count, None);
        assert_eq!(set.accuracy, Some(12));
    }

    #[test]
    fn only_first_block_is_honored() {
        let text = "\
//PARALLEL-PROPS
AVAILABLE_MODES=2;
//END-PARALLEL-PROPS
//PARALLEL-PROPS
AVAILABLE_MODES=7;
TEST_MODE=0;
//END-PARALLEL-PROPS
";
        let set = parse_directives(text).unwrap();
        assert_eq!(set.mode_count, Some(2));
        assert!(!set.test_mode_disabled);
    }

    #[test]
    fn end_marker_before_start_stops_parsing() {
        let text = "//END-PARALLEL-PROPS\n//PARALLEL-PROPS\nAVAILABLE_MODES=2;\n";
        assert_eq!(parse_directives(text).unwrap(), DirectiveSet::default());
    }

    #[test]
    fn unterminated_block_runs_to_end_of_file() {
        let text = "//PARALLEL-PROPS\nAVAILABLE_MODES=2;\n";
        assert_eq!(parse_directives(text).unwrap().mode_count, Some(2));
    }

    #[test]
    fn test_mode_any_value_disables() {
        for value in ["0", "1", "", "whatever"] {
            let text = format!("//PARALLEL-PROPS\nTEST_MODE={value};\n//END-PARALLEL-PROPS\n");
            assert!(parse_directives(&text).unwrap().test_mode_disabled);
        }
    }

    #[test]
    fn zero_modes_is_parsed_not_rejected() {
        let text = "//PARALLEL-PROPS\nAVAILABLE_MODES=0;\n//END-PARALLEL-PROPS\n";
        assert_eq!(parse_directives(text).unwrap().mode_count, Some(0));
    }

    #[test]
    fn non_numeric_modes_is_error() {
        let text = "//PARALLEL-PROPS\nAVAILABLE_MODES=three;\n//END-PARALLEL-PROPS\n";
        let err = parse_directives(text).unwrap_err();
        assert_eq!(
            err,
            DirectiveError::InvalidNumber {
                key: "AVAILABLE_MODES",
                value: "three".to_string(),
                line: 2,
            }
        );
    }

    #[test]
    fn fractional_accuracy_is_error() {
        let text = "//PARALLEL-PROPS\nRENDER_WITH=12.5;\n//END-PARALLEL-PROPS\n";
        assert!(matches!(
            parse_directives(text),
            Err(DirectiveError::InvalidNumber { key: "RENDER_WITH", .. })
        ));
    }

    #[test]
    fn mode_count_above_limit_is_error() {
        let text = "//PARALLEL-PROPS\nAVAILABLE_MODES=4000000000;\n//END-PARALLEL-PROPS\n";
        assert_eq!(
            parse_directives(text).unwrap_err(),
            DirectiveError::TooManyModes {
                value: 4_000_000_000,
                line: 2,
            }
        );
    }

    #[test]
    fn mode_count_at_limit_is_accepted() {
        let text = format!("//PARALLEL-PROPS\nAVAILABLE_MODES={MAX_MODES};\n//END-PARALLEL-PROPS\n");
        assert_eq!(parse_directives(&text).unwrap().mode_count, Some(MAX_MODES));
    }

    #[test]
    fn negative_modes_is_error() {
        let text = "//PARALLEL-PROPS\nAVAILABLE_MODES=-1;\n//END-PARALLEL-PROPS\n";
        assert!(parse_directives(text).is_err());
    }

    #[test]
    fn malformed_value_after_end_marker_is_not_seen() {
        let text = "//PARALLEL-PROPS\n//END-PARALLEL-PROPS\nAVAILABLE_MODES=x;\n";
        assert!(parse_directives(text).is_ok());
    }

    #[test]
    fn comment_lines_inside_block_are_skipped() {
        let text = "//PARALLEL-PROPS\n// modes for the lid\nAVAILABLE_MODES=2;\n//END-PARALLEL-PROPS\n";
        assert_eq!(parse_directives(text).unwrap().mode_count, Some(2));
    }

    #[test]
    fn parsing_is_idempotent() {
        let text = "//PARALLEL-PROPS\nAVAILABLE_MODES=5;\nRENDER_WITH=80;\n//END-PARALLEL-PROPS\n";
        assert_eq!(parse_directives(text), parse_directives(text));
    }
}
