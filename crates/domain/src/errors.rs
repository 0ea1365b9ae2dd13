use thiserror::Error;

/// Failure while interpreting a due date. Fatal to the single render or
/// edit operation that triggered it; callers abort that operation and
/// leave the entity as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateFormatError {
    #[error("could not parse due date: {0}")]
    Unrecognized(String),

    #[error("no such calendar date: {0}")]
    InvalidDate(String),
}
