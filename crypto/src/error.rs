use thiserror::Error;

/// Failure to turn one armored blob into a key.
///
/// Always scoped to a single blob; callers importing many keys skip the
/// offending one and continue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("armored text is empty")]
    Empty,

    #[error("malformed armored key: {0}")]
    Malformed(String),

    #[error("key has no usable primary key")]
    NoPrimaryKey,
}
