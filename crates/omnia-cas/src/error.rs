//! Errors from certificate construction, persistence and diffing.

/// Errors from CAS operations.
#[derive(Debug, thiserror::Error)]
pub enum CasError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("invalid config: {field} ({reason})")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
}

impl CasError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CasError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
