//! Error types for scene construction and vehicle queries.

use thiserror::Error;

/// Errors surfaced by the simulation core.
#[derive(Debug, Error)]
pub enum Error {
    /// A construction parameter is invalid (e.g. negative mass, zero-size shape).
    ///
    /// These are rejected at construction time rather than silently clamped.
    /// Note that *unset* values with a documented default (mass -> 0,
    /// friction -> 1) are not errors.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A wheel (or similar) index query is out of range.
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
