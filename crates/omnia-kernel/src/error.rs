//! Error types for OMNIA kernel operations.

/// Errors arising from invalid configuration or auxiliary score failures.
///
/// Measurement itself never fails: numeric anomalies are clamped and
/// auxiliary failures are replaced by their documented defaults. Only
/// configuration is rejected, and only at construction time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OmniaError {
    /// A tunable is outside its admissible domain.
    #[error("invalid config: {field} = {value} ({reason})")]
    InvalidConfig {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    /// The SNRC aggregation mode is not one of `max` / `mean`.
    #[error("unknown snrc aggregation mode `{0}` (expected `max` or `mean`)")]
    UnknownAggregation(String),

    /// A trend score could not be computed for the current history.
    #[error("trend score `{name}` unavailable: {reason}")]
    TrendUnavailable { name: &'static str, reason: String },
}

impl OmniaError {
    pub(crate) fn invalid(field: &'static str, value: f64, reason: &'static str) -> Self {
        OmniaError::InvalidConfig {
            field,
            value: value.to_string(),
            reason,
        }
    }
}

/// Reject NaN/inf and negative values for a tolerance-like field.
pub(crate) fn check_non_negative(field: &'static str, value: f64) -> Result<(), OmniaError> {
    if !value.is_finite() {
        return Err(OmniaError::invalid(field, value, "must be finite"));
    }
    if value < 0.0 {
        return Err(OmniaError::invalid(field, value, "must be non-negative"));
    }
    Ok(())
}

/// Reject values outside the closed unit interval.
pub(crate) fn check_unit_interval(field: &'static str, value: f64) -> Result<(), OmniaError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(OmniaError::invalid(field, value, "must lie in [0, 1]"));
    }
    Ok(())
}
