//! Auxiliary trend scores over an Omega history.
//!
//! SEI tracks whether invariance is still moving (1 = still yielding,
//! 0 = saturated). IRI tracks how much invariance has been lost relative to
//! the best seen so far and not recovered.
//!
//! Both are optional collaborators of the estimator. A score that fails is
//! replaced by its default; it never fails the estimate.

use crate::error::OmniaError;
use crate::omega::OmegaReport;
use crate::superposition::SuperpositionReport;

pub const DEFAULT_SEI: f64 = 1.0;
pub const DEFAULT_IRI: f64 = 0.0;

const FLAT: f64 = 1e-12;

/// A score computed from the prior history and the current superposition.
pub trait TrendScore: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(
        &self,
        history: &[OmegaReport],
        current: &SuperpositionReport,
    ) -> Result<f64, OmniaError>;
}

/// SEI as the ratio of the latest invariance step to the step before it.
#[derive(Debug, Clone, Copy, Default)]
pub struct GainRatioSei;

impl TrendScore for GainRatioSei {
    fn name(&self) -> &'static str {
        "sei.gain_ratio"
    }

    fn score(
        &self,
        history: &[OmegaReport],
        current: &SuperpositionReport,
    ) -> Result<f64, OmniaError> {
        let [.., before, last] = history else {
            return Ok(DEFAULT_SEI);
        };
        let latest = (current.invariance - last.invariance).abs();
        let previous = (last.invariance - before.invariance).abs();
        if !latest.is_finite() || !previous.is_finite() {
            return Err(OmniaError::TrendUnavailable {
                name: self.name(),
                reason: "non-finite invariance in history".to_string(),
            });
        }
        if previous < FLAT {
            return Ok(if latest < FLAT { 0.0 } else { 1.0 });
        }
        Ok((latest / previous).clamp(0.0, 1.0))
    }
}

/// IRI as the fraction of the best prior invariance that is now lost.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvarianceLossIri;

impl TrendScore for InvarianceLossIri {
    fn name(&self) -> &'static str {
        "iri.invariance_loss"
    }

    fn score(
        &self,
        history: &[OmegaReport],
        current: &SuperpositionReport,
    ) -> Result<f64, OmniaError> {
        let best = history
            .iter()
            .map(|report| report.invariance)
            .fold(f64::NAN, f64::max);
        if best.is_nan() {
            return Err(OmniaError::TrendUnavailable {
                name: self.name(),
                reason: "empty history".to_string(),
            });
        }
        if best <= 0.0 {
            return Ok(DEFAULT_IRI);
        }
        Ok(((best - current.invariance).max(0.0) / best).clamp(0.0, 1.0))
    }
}
