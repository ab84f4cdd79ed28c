//! Input validation for ledger writes.
//!
//! # Invariants
//! - Lengths are counted in `char`s.
//! - The lower bound applies to the trimmed input; the upper bound applies to
//!   the raw input, so whitespace padding can neither reach a minimum nor slip
//!   past a maximum.
//! - Validation never mutates the caller's value; stored text is the input
//!   as submitted.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;

/// Allowed length for experiment names.
pub const NAME_LEN: RangeInclusive<usize> = 3..=100;
/// Allowed length for step titles.
pub const TITLE_LEN: RangeInclusive<usize> = 3..=200;
/// Allowed length for step content.
pub const CONTENT_LEN: RangeInclusive<usize> = 3..=5000;

/// Rejected ledger input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Experiment name is empty, too short, or too long.
    NameLength { len: usize },
    /// Step title is out of bounds.
    TitleLength { len: usize },
    /// Step content is out of bounds.
    ContentLength { len: usize },
    /// Caller identity is blank.
    BlankPrincipal,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NameLength { len } => write!(
                f,
                "experiment name must be {}-{} characters, got {len}",
                NAME_LEN.start(),
                NAME_LEN.end()
            ),
            Self::TitleLength { len } => write!(
                f,
                "step title must be {}-{} characters, got {len}",
                TITLE_LEN.start(),
                TITLE_LEN.end()
            ),
            Self::ContentLength { len } => write!(
                f,
                "step content must be {}-{} characters, got {len}",
                CONTENT_LEN.start(),
                CONTENT_LEN.end()
            ),
            Self::BlankPrincipal => write!(f, "principal must not be blank"),
        }
    }
}

impl Error for ValidationError {}

/// Checks an experiment name.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    check_len(name, &NAME_LEN).map_err(|len| ValidationError::NameLength { len })
}

/// Checks a step title.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    check_len(title, &TITLE_LEN).map_err(|len| ValidationError::TitleLength { len })
}

/// Checks step content.
pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    check_len(content, &CONTENT_LEN).map_err(|len| ValidationError::ContentLength { len })
}

/// Returns the offending length when `value` is out of `bounds`.
fn check_len(value: &str, bounds: &RangeInclusive<usize>) -> Result<(), usize> {
    let raw_len = value.chars().count();
    if raw_len > *bounds.end() {
        return Err(raw_len);
    }
    let trimmed_len = value.trim().chars().count();
    if trimmed_len < *bounds.start() {
        return Err(trimmed_len);
    }
    Ok(())
}
