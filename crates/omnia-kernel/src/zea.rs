//! ZEA: Zone of Admissible Expansion.
//!
//! Classifies a candidate text against a baseline from two signals:
//!
//! - ΔΩ, the change in invariant residue (`omega_after − omega_before`);
//! - SNRC pressure, how much more unstable the candidate is than the
//!   baseline under one transformed view per lens family, relative to the
//!   baseline's own instability.
//!
//! Precedence is fixed: regression, then collapse, then saturation, then
//! admissible. ZEA never generates content and never interprets it.

use crate::error::{OmniaError, check_non_negative, check_unit_interval};
use crate::lenses::LensSet;
use crate::omega::OmegaEstimator;
use crate::representation::Metadata;
use crate::superposition::SuperpositionKernel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Added to the baseline instability before dividing, so a perfectly
/// stable baseline still yields a finite relative pressure.
pub const DEFAULT_PRESSURE_FLOOR: f64 = 1e-6;

/// Pressure above which a non-admissible candidate is flagged as SNRC.
const SNRC_FLAG_PRESSURE: f64 = 0.5;

pub const NOTE_REGRESSION: &str =
    "ΔΩ < floor: candidate reduces invariant residue (structural regression).";
pub const NOTE_COLLAPSE: &str =
    "SNRC pressure at max: candidate collapses under superposition (noise regime).";
pub const NOTE_SATURATED: &str =
    "Near boundary: admissible but at saturation edge (high fragility).";
pub const NOTE_ADMISSIBLE: &str =
    "Within admissible expansion zone: ΔΩ non-negative and stable under lenses.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZeaStatus {
    Admissible,
    Saturated,
    Illegitimate,
}

impl ZeaStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ZeaStatus::Admissible => "ADMISSIBLE",
            ZeaStatus::Saturated => "SATURATED",
            ZeaStatus::Illegitimate => "ILLEGITIMATE",
        }
    }
}

impl fmt::Display for ZeaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How per-family relative pressures reduce to one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SnrcAggregation {
    /// Worst family wins.
    #[default]
    Max,
    Mean,
}

impl SnrcAggregation {
    pub fn aggregate(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            SnrcAggregation::Max => values.iter().copied().fold(0.0, f64::max),
            SnrcAggregation::Mean => values.iter().sum::<f64>() / values.len() as f64,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SnrcAggregation::Max => "max",
            SnrcAggregation::Mean => "mean",
        }
    }
}

impl FromStr for SnrcAggregation {
    type Err = OmniaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "max" => Ok(SnrcAggregation::Max),
            "mean" => Ok(SnrcAggregation::Mean),
            other => Err(OmniaError::UnknownAggregation(other.to_string())),
        }
    }
}

impl fmt::Display for SnrcAggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZeaConfig {
    /// Numeric tolerance applied to every threshold comparison.
    pub eps: f64,
    /// ΔΩ below this (minus `eps`) is a structural regression.
    pub delta_omega_floor: f64,
    /// Margins at or below this (plus `eps`) are saturated.
    pub saturated_margin_max: f64,
    pub snrc_agg: SnrcAggregation,
    pub pressure_floor: f64,
}

impl Default for ZeaConfig {
    fn default() -> Self {
        Self {
            eps: 1e-9,
            delta_omega_floor: 0.0,
            saturated_margin_max: 0.08,
            snrc_agg: SnrcAggregation::Max,
            pressure_floor: DEFAULT_PRESSURE_FLOOR,
        }
    }
}

impl ZeaConfig {
    pub fn validate(&self) -> Result<(), OmniaError> {
        check_non_negative("zea.eps", self.eps)?;
        check_non_negative("zea.pressure_floor", self.pressure_floor)?;
        if !self.delta_omega_floor.is_finite() {
            return Err(OmniaError::invalid(
                "zea.delta_omega_floor",
                self.delta_omega_floor,
                "must be finite",
            ));
        }
        check_unit_interval("zea.saturated_margin_max", self.saturated_margin_max)
    }
}

/// Per-family instability scores behind one pressure value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureDetails {
    pub baseline_scores: BTreeMap<String, f64>,
    pub candidate_scores: BTreeMap<String, f64>,
    pub relative_pressure: BTreeMap<String, f64>,
    pub agg: SnrcAggregation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeaDetails {
    pub meta: Metadata,
    pub snrc_pressure: f64,
    pub pressure_details: PressureDetails,
}

/// Outcome of one (baseline, candidate) classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeaReport {
    pub status: ZeaStatus,
    pub delta_omega: f64,
    pub omega_before: f64,
    pub omega_after: f64,
    pub snrc_candidate: bool,
    pub saturation_margin: f64,
    pub notes: String,
    pub details: ZeaDetails,
}

impl ZeaReport {
    pub fn snrc_pressure(&self) -> f64 {
        self.details.snrc_pressure
    }
}

/// Apply the fixed precedence to already-computed signals.
pub fn classify(
    delta_omega: f64,
    snrc_pressure: f64,
    saturation_margin: f64,
    config: &ZeaConfig,
) -> (ZeaStatus, &'static str) {
    if delta_omega < config.delta_omega_floor - config.eps {
        (ZeaStatus::Illegitimate, NOTE_REGRESSION)
    } else if snrc_pressure >= 1.0 - config.eps {
        (ZeaStatus::Illegitimate, NOTE_COLLAPSE)
    } else if saturation_margin <= config.saturated_margin_max + config.eps {
        (ZeaStatus::Saturated, NOTE_SATURATED)
    } else {
        (ZeaStatus::Admissible, NOTE_ADMISSIBLE)
    }
}

/// The admissibility classifier.
#[derive(Debug, Clone)]
pub struct Zea {
    omega: OmegaEstimator,
    kernel: SuperpositionKernel,
    lenses: LensSet,
    config: ZeaConfig,
}

impl Zea {
    /// Classifier measuring with `omega`'s kernel and lens set.
    pub fn new(omega: OmegaEstimator, config: ZeaConfig) -> Result<Self, OmniaError> {
        config.validate()?;
        Ok(Self {
            kernel: omega.kernel().clone(),
            lenses: *omega.lens_set(),
            omega,
            config,
        })
    }

    /// Use a different kernel for the SNRC instability distances.
    pub fn with_kernel(mut self, kernel: SuperpositionKernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Use different lens families for the SNRC pressure.
    pub fn with_lenses(mut self, lenses: LensSet) -> Self {
        self.lenses = lenses;
        self
    }

    pub fn config(&self) -> &ZeaConfig {
        &self.config
    }

    pub fn evaluate(&self, baseline: &str, candidate: &str, meta: Metadata) -> ZeaReport {
        let omega_before = self.omega.estimate_text(baseline);
        let omega_after = self.omega.estimate_text(candidate);
        let delta_omega = omega_after - omega_before;

        let (snrc_pressure, pressure_details) = self.pressure(baseline, candidate);
        let saturation_margin = (1.0 - snrc_pressure).max(0.0);

        let (status, notes) = classify(delta_omega, snrc_pressure, saturation_margin, &self.config);
        let snrc_candidate = status != ZeaStatus::Admissible && snrc_pressure > SNRC_FLAG_PRESSURE;

        tracing::debug!(
            %status,
            delta_omega,
            snrc_pressure,
            saturation_margin,
            "zea classification"
        );

        ZeaReport {
            status,
            delta_omega,
            omega_before,
            omega_after,
            snrc_candidate,
            saturation_margin,
            notes: notes.to_string(),
            details: ZeaDetails {
                meta,
                snrc_pressure,
                pressure_details,
            },
        }
    }

    /// Relative SNRC pressure of `candidate` over `baseline`, in [0,1].
    pub fn pressure(&self, baseline: &str, candidate: &str) -> (f64, PressureDetails) {
        let baseline_scores = self.instability(baseline);
        let candidate_scores = self.instability(candidate);

        let relative_pressure: BTreeMap<String, f64> = candidate_scores
            .iter()
            .map(|(family, &c)| {
                let b = baseline_scores.get(family).copied().unwrap_or(0.0);
                let denom = self.config.eps.max(b + self.config.pressure_floor);
                (family.clone(), ((c - b) / denom).clamp(0.0, 1.0))
            })
            .collect();

        let values: Vec<f64> = relative_pressure.values().copied().collect();
        let pressure = self.config.snrc_agg.aggregate(&values);

        (
            pressure,
            PressureDetails {
                baseline_scores,
                candidate_scores,
                relative_pressure,
                agg: self.config.snrc_agg,
            },
        )
    }

    /// Distance between `text` and each family's primary transform.
    pub fn instability(&self, text: &str) -> BTreeMap<String, f64> {
        self.lenses
            .as_slice()
            .into_iter()
            .map(|lens| {
                let transformed = lens.transform(text);
                (
                    lens.id().to_string(),
                    self.kernel.text_distance(text, &transformed),
                )
            })
            .collect()
    }
}

impl Default for Zea {
    fn default() -> Self {
        let omega = OmegaEstimator::default();
        Self {
            kernel: omega.kernel().clone(),
            lenses: *omega.lens_set(),
            omega,
            config: ZeaConfig::default(),
        }
    }
}
