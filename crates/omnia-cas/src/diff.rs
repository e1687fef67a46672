//! CAS-DIFF: compare two certificates (A = older, B = newer).
//!
//! The verdict answers one question: did the newer run progress, regress,
//! or stall? Independently, a four-number signature per certificate flags
//! loops, where a new run is structurally indistinguishable from the last.

use crate::certificate::{CertItem, Certificate, Counts, Summary};
use crate::error::CasError;
use crate::persist;
use omnia_kernel::Metadata;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const DIFF_SCHEMA: &str = "CAS-DIFF-1.0";

pub const REASON_PROGRESS: &str = "accepted_up_and_margin_up_and_delta_omega_not_down";
pub const REASON_STALL: &str = "no_significant_change";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    pub eps: f64,
    pub min_count_delta: usize,
    pub min_margin_delta: f64,
    /// Signature distances at or below this are loop-like.
    pub loop_tol: f64,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            eps: 1e-9,
            min_count_delta: 1,
            min_margin_delta: 0.02,
            loop_tol: 0.02,
        }
    }
}

impl DiffConfig {
    pub fn validate(&self) -> Result<(), CasError> {
        for (field, value) in [("diff.eps", self.eps), ("diff.loop_tol", self.loop_tol)] {
            if !value.is_finite() || value < 0.0 {
                return Err(CasError::invalid(field, format!("{value} must be finite and non-negative")));
            }
        }
        // A zero threshold would flag every unchanged run as a regression.
        if !self.min_margin_delta.is_finite() || self.min_margin_delta <= 0.0 {
            return Err(CasError::invalid(
                "diff.min_margin_delta",
                format!("{} must be finite and positive", self.min_margin_delta),
            ));
        }
        if self.min_count_delta == 0 {
            return Err(CasError::invalid("diff.min_count_delta", "must be at least 1"));
        }
        Ok(())
    }
}

/// Means and minima over one bucket; absent fields are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BucketStats {
    pub mean_margin: f64,
    pub min_margin: f64,
    pub mean_delta_omega: f64,
    pub min_delta_omega: f64,
    pub mean_snrc_pressure: f64,
}

impl BucketStats {
    pub fn of(items: &[CertItem]) -> Self {
        let margins: Vec<f64> = items.iter().filter_map(|i| i.saturation_margin).collect();
        let deltas: Vec<f64> = items.iter().filter_map(|i| i.delta_omega).collect();
        let pressures: Vec<f64> = items.iter().filter_map(CertItem::snrc_pressure).collect();
        Self {
            mean_margin: mean(&margins),
            min_margin: min(&margins),
            mean_delta_omega: mean(&deltas),
            min_delta_omega: min(&deltas),
            mean_snrc_pressure: mean(&pressures),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::min).unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CertStats {
    pub counts: Counts,
    pub accepted: BucketStats,
    pub saturated: BucketStats,
    pub rejected: BucketStats,
}

impl CertStats {
    pub fn of(cert: &Certificate) -> Self {
        Self {
            counts: cert.counts(),
            accepted: BucketStats::of(&cert.buckets.accepted),
            saturated: BucketStats::of(&cert.buckets.saturated),
            rejected: BucketStats::of(&cert.buckets.rejected),
        }
    }
}

/// Compact fingerprint of a run used for loop detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub acc_rate: f64,
    pub sat_rate: f64,
    pub acc_mean_margin: f64,
    pub acc_mean_delta_omega: f64,
}

impl Signature {
    pub fn of(stats: &CertStats) -> Self {
        let total = stats.counts.total().max(1) as f64;
        Self {
            acc_rate: stats.counts.accepted as f64 / total,
            sat_rate: stats.counts.saturated as f64 / total,
            acc_mean_margin: stats.accepted.mean_margin,
            acc_mean_delta_omega: stats.accepted.mean_delta_omega,
        }
    }

    fn values(&self) -> [f64; 4] {
        [
            self.acc_rate,
            self.sat_rate,
            self.acc_mean_margin,
            self.acc_mean_delta_omega,
        ]
    }

    /// Mean absolute difference over the signature keys.
    pub fn distance(&self, other: &Signature) -> f64 {
        let pairs = self.values().into_iter().zip(other.values());
        pairs.map(|(a, b)| (a - b).abs()).sum::<f64>() / 4.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Side {
    pub timestamp_utc: Option<String>,
    pub summary: Summary,
    pub stats: CertStats,
    pub signature: Signature,
}

impl Side {
    fn of(cert: &Certificate) -> Self {
        let stats = CertStats::of(cert);
        Self {
            timestamp_utc: cert.timestamp_utc.clone(),
            summary: cert.summary.clone(),
            signature: Signature::of(&stats),
            stats,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub accepted: i64,
    pub accepted_mean_margin: f64,
    pub accepted_mean_delta_omega: f64,
    pub accepted_mean_snrc_pressure: f64,
    pub signature_distance: f64,
    pub loop_like: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictLabel {
    Progress,
    Regression,
    Stall,
}

impl VerdictLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            VerdictLabel::Progress => "PROGRESS",
            VerdictLabel::Regression => "REGRESSION",
            VerdictLabel::Stall => "STALL",
        }
    }
}

impl fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: VerdictLabel,
    pub reason: String,
    pub loop_warning: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateDiff {
    pub schema: String,
    pub timestamp_utc: Option<String>,
    pub meta: Metadata,
    pub a: Side,
    pub b: Side,
    pub delta: Delta,
    pub verdict: Verdict,
}

impl CertificateDiff {
    /// Whether a CI gate should fail on this diff.
    pub fn fails_gate(&self, fail_on_loop: bool) -> bool {
        self.verdict.label == VerdictLabel::Regression || (fail_on_loop && self.verdict.loop_warning)
    }

    pub fn to_json_pretty(&self) -> Result<String, CasError> {
        persist::to_json_pretty(self)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CasError> {
        persist::write_json(path, self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CasError> {
        persist::read_json(path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Differ {
    config: DiffConfig,
}

impl Differ {
    pub fn new(config: DiffConfig) -> Result<Self, CasError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    pub fn compare(&self, a: &Certificate, b: &Certificate, meta: Metadata) -> CertificateDiff {
        let side_a = Side::of(a);
        let side_b = Side::of(b);

        let delta_accepted = side_b.stats.counts.accepted as i64 - side_a.stats.counts.accepted as i64;
        let delta_margin = side_b.stats.accepted.mean_margin - side_a.stats.accepted.mean_margin;
        let delta_omega =
            side_b.stats.accepted.mean_delta_omega - side_a.stats.accepted.mean_delta_omega;
        let delta_pressure =
            side_b.stats.accepted.mean_snrc_pressure - side_a.stats.accepted.mean_snrc_pressure;

        let signature_distance = side_a.signature.distance(&side_b.signature);
        let loop_like = signature_distance <= self.config.loop_tol;

        let (label, reason) = self.verdict(delta_accepted, delta_margin, delta_omega);

        tracing::debug!(
            %label,
            reason = %reason,
            delta_accepted,
            delta_margin,
            delta_omega,
            signature_distance,
            "certificate diff"
        );

        CertificateDiff {
            schema: DIFF_SCHEMA.to_string(),
            timestamp_utc: b.timestamp_utc.clone(),
            meta,
            a: side_a,
            b: side_b,
            delta: Delta {
                accepted: delta_accepted,
                accepted_mean_margin: delta_margin,
                accepted_mean_delta_omega: delta_omega,
                accepted_mean_snrc_pressure: delta_pressure,
                signature_distance,
                loop_like,
            },
            verdict: Verdict {
                label,
                reason,
                loop_warning: loop_like,
            },
        }
    }

    fn verdict(&self, accepted: i64, margin: f64, delta_omega: f64) -> (VerdictLabel, String) {
        let count_step = i64::try_from(self.config.min_count_delta).unwrap_or(i64::MAX);
        let margin_step = self.config.min_margin_delta;
        let eps = self.config.eps;

        let regressions: Vec<&str> = [
            (accepted <= -count_step, "accepted_count_down"),
            (margin <= -margin_step, "accepted_margin_down"),
            (delta_omega < -eps, "accepted_delta_omega_down"),
        ]
        .into_iter()
        .filter_map(|(hit, reason)| hit.then_some(reason))
        .collect();

        if !regressions.is_empty() {
            return (VerdictLabel::Regression, regressions.join("+"));
        }
        if accepted >= count_step && margin >= margin_step && delta_omega >= -eps {
            return (VerdictLabel::Progress, REASON_PROGRESS.to_string());
        }
        (VerdictLabel::Stall, REASON_STALL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::{Buckets, CertStatus};
    use serde_json::json;

    fn item(margin: f64, delta_omega: f64, pressure: f64) -> CertItem {
        CertItem {
            op: "make_measurable".to_string(),
            text: "x".to_string(),
            delta_omega: Some(delta_omega),
            saturation_margin: Some(margin),
            details: json!({"snrc_pressure": pressure}),
            ..CertItem::default()
        }
    }

    fn cert(accepted: Vec<CertItem>, rejected: usize) -> Certificate {
        let buckets = Buckets {
            accepted,
            saturated: Vec::new(),
            rejected: vec![item(1.0, -0.01, 0.0); rejected],
        };
        let counts = buckets.counts();
        Certificate {
            summary: Summary {
                status: CertStatus::from_counts(&counts),
                counts: Some(counts),
                ..Summary::default()
            },
            buckets,
            ..Certificate::default()
        }
    }

    #[test]
    fn stats_skip_absent_fields() {
        let mut sparse = item(0.5, 0.2, 0.1);
        sparse.saturation_margin = None;
        sparse.details = serde_json::Value::Null;
        let stats = BucketStats::of(&[item(0.9, 0.1, 0.3), sparse]);
        assert_eq!(stats.mean_margin, 0.9);
        assert_eq!(stats.min_margin, 0.9);
        assert!((stats.mean_delta_omega - 0.15).abs() < 1e-12);
        assert_eq!(stats.min_delta_omega, 0.1);
        assert_eq!(stats.mean_snrc_pressure, 0.3);
        assert_eq!(BucketStats::of(&[]), BucketStats::default());
    }

    #[test]
    fn signature_rates_use_run_counts() {
        let c = cert(vec![item(1.0, 0.0, 0.0); 3], 1);
        let sig = Signature::of(&CertStats::of(&c));
        assert_eq!(sig.acc_rate, 0.75);
        assert_eq!(sig.sat_rate, 0.0);
        assert_eq!(sig.acc_mean_margin, 1.0);
    }

    #[test]
    fn progress_needs_count_and_margin_together() {
        let differ = Differ::default();
        let a = cert(vec![item(0.5, 0.01, 0.0)], 2);
        let b = cert(vec![item(0.8, 0.01, 0.0); 2], 1);
        let diff = differ.compare(&a, &b, Metadata::new());
        assert_eq!(diff.verdict.label, VerdictLabel::Progress);
        assert_eq!(diff.verdict.reason, REASON_PROGRESS);
        assert_eq!(diff.delta.accepted, 1);

        let flat_margin = cert(vec![item(0.5, 0.01, 0.0); 2], 1);
        let diff = differ.compare(&a, &flat_margin, Metadata::new());
        assert_eq!(diff.verdict.label, VerdictLabel::Stall);
        assert_eq!(diff.verdict.reason, REASON_STALL);
    }

    #[test]
    fn regression_reasons_accumulate() {
        let a = cert(vec![item(0.9, 0.02, 0.0); 3], 0);
        let b = cert(vec![item(0.5, 0.01, 0.0); 2], 0);
        let diff = Differ::default().compare(&a, &b, Metadata::new());
        assert_eq!(diff.verdict.label, VerdictLabel::Regression);
        assert_eq!(
            diff.verdict.reason,
            "accepted_count_down+accepted_margin_down+accepted_delta_omega_down"
        );
        assert!(diff.fails_gate(false));
    }

    #[test]
    fn loop_warning_only_fails_gate_on_request() {
        let a = cert(vec![item(1.0, 0.0, 0.0); 2], 1);
        let diff = Differ::default().compare(&a, &a, Metadata::new());
        assert!(diff.verdict.loop_warning);
        assert!(!diff.fails_gate(false));
        assert!(diff.fails_gate(true));
    }

    #[test]
    fn diff_carries_newer_timestamp_and_meta() {
        let mut a = cert(vec![item(1.0, 0.0, 0.0)], 0);
        a.timestamp_utc = Some("2026-01-01T00:00:00+00:00".to_string());
        let mut b = a.clone();
        b.timestamp_utc = Some("2026-01-02T00:00:00+00:00".to_string());
        let meta = Metadata::from([("job".to_string(), json!("ci"))]);

        let diff = Differ::default().compare(&a, &b, meta.clone());
        assert_eq!(diff.schema, DIFF_SCHEMA);
        assert_eq!(diff.timestamp_utc, b.timestamp_utc);
        assert_eq!(diff.a.timestamp_utc, a.timestamp_utc);
        assert_eq!(diff.meta, meta);
    }

    #[test]
    fn degenerate_thresholds_are_rejected() {
        for bad in [
            DiffConfig {
                min_count_delta: 0,
                ..DiffConfig::default()
            },
            DiffConfig {
                min_margin_delta: 0.0,
                ..DiffConfig::default()
            },
            DiffConfig {
                loop_tol: f64::INFINITY,
                ..DiffConfig::default()
            },
        ] {
            assert!(Differ::new(bad).is_err(), "{bad:?}");
        }
    }
}
