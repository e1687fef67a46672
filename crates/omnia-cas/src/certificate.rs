//! CAS: certificate of admissibility and stop.
//!
//! A certificate freezes one generation run: where expansion was admissible,
//! where it saturated, where it was illegitimate, and whether the run should
//! stop. It does not explain content.
//!
//! Certificates are historical artifacts and may predate later schema
//! additions, so loading is lenient: missing collections are empty, missing
//! or non-numeric item fields are absent, unknown statuses load as
//! [`CertStatus::Unknown`] with their original text.

use crate::error::CasError;
use crate::persist;
use chrono::{DateTime, SecondsFormat, Utc};
use omnia_kernel::{GenerationResult, Metadata, Scored};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::path::Path;

pub const DEFAULT_SCHEMA: &str = "CAS-1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateConfig {
    pub schema_version: String,
    pub engine: String,
    pub artifact: String,
    /// Cap on records kept per bucket, earliest first.
    pub max_items_per_bucket: usize,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            schema_version: DEFAULT_SCHEMA.to_string(),
            engine: "OMNIA".to_string(),
            artifact: "CAS".to_string(),
            max_items_per_bucket: 25,
        }
    }
}

impl CertificateConfig {
    pub fn validate(&self) -> Result<(), CasError> {
        if self.max_items_per_bucket == 0 {
            return Err(CasError::invalid(
                "certificate.max_items_per_bucket",
                "must be at least 1",
            ));
        }
        if self.schema_version.trim().is_empty() {
            return Err(CasError::invalid(
                "certificate.schema_version",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

/// Global status of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CertStatus {
    /// At least one candidate was admissible; expansion may continue.
    Open,
    /// Nothing admissible, something saturated.
    Saturated,
    /// Nothing admissible or saturated.
    Illegitimate,
    /// Any other status text, kept verbatim. Empty when the status was
    /// missing.
    Unknown(String),
}

impl CertStatus {
    /// Status text as it appears in a certificate.
    pub fn as_str(&self) -> &str {
        match self {
            CertStatus::Open => "OPEN",
            CertStatus::Saturated => "SATURATED",
            CertStatus::Illegitimate => "ILLEGITIMATE",
            CertStatus::Unknown(raw) if raw.is_empty() => "UNKNOWN",
            CertStatus::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, CertStatus::Unknown(_))
    }

    pub fn stop_recommended(&self) -> bool {
        matches!(self, CertStatus::Saturated | CertStatus::Illegitimate)
    }

    pub fn stop_reason(&self) -> &'static str {
        match self {
            CertStatus::Saturated => "structural_saturation",
            CertStatus::Illegitimate => "noise_regime",
            CertStatus::Open | CertStatus::Unknown(_) => "continue",
        }
    }

    /// Roll up bucket sizes into a status.
    pub fn from_counts(counts: &Counts) -> Self {
        match (counts.accepted, counts.saturated) {
            (0, 0) => CertStatus::Illegitimate,
            (0, _) => CertStatus::Saturated,
            _ => CertStatus::Open,
        }
    }
}

impl Default for CertStatus {
    fn default() -> Self {
        CertStatus::Unknown(String::new())
    }
}

impl From<String> for CertStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "OPEN" => CertStatus::Open,
            "SATURATED" => CertStatus::Saturated,
            "ILLEGITIMATE" => CertStatus::Illegitimate,
            "UNKNOWN" => CertStatus::default(),
            _ => CertStatus::Unknown(raw),
        }
    }
}

impl fmt::Display for CertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CertStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CertStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(CertStatus::from).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Counts {
    pub accepted: usize,
    pub saturated: usize,
    pub rejected: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.accepted + self.saturated + self.rejected
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Summary {
    pub status: CertStatus,
    pub stop_recommended: bool,
    pub stop_reason: String,
    /// Full bucket sizes before capping. Absent in some older certificates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<Counts>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Baseline {
    pub text: String,
}

/// One packed (candidate, ZEA report) record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CertItem {
    pub op: String,
    pub text: String,
    #[serde(deserialize_with = "lenient_number")]
    pub delta_omega: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub omega_before: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub omega_after: Option<f64>,
    #[serde(deserialize_with = "lenient_bool")]
    pub snrc_candidate: Option<bool>,
    #[serde(deserialize_with = "lenient_number")]
    pub saturation_margin: Option<f64>,
    pub notes: String,
    pub details: Value,
}

impl CertItem {
    pub fn from_scored((candidate, report): &Scored) -> Result<Self, CasError> {
        let details =
            serde_json::to_value(&report.details).map_err(|e| CasError::Serialize(e.to_string()))?;
        Ok(Self {
            op: candidate.op.clone(),
            text: candidate.text.clone(),
            delta_omega: Some(report.delta_omega),
            omega_before: Some(report.omega_before),
            omega_after: Some(report.omega_after),
            snrc_candidate: Some(report.snrc_candidate),
            saturation_margin: Some(report.saturation_margin),
            notes: report.notes.clone(),
            details,
        })
    }

    /// `details.snrc_pressure`, when present and numeric.
    pub fn snrc_pressure(&self) -> Option<f64> {
        self.details
            .get("snrc_pressure")
            .and_then(Value::as_f64)
            .filter(|value| value.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Buckets {
    #[serde(deserialize_with = "null_as_default")]
    pub accepted: Vec<CertItem>,
    #[serde(deserialize_with = "null_as_default")]
    pub saturated: Vec<CertItem>,
    #[serde(deserialize_with = "null_as_default")]
    pub rejected: Vec<CertItem>,
}

impl Buckets {
    pub fn counts(&self) -> Counts {
        Counts {
            accepted: self.accepted.len(),
            saturated: self.saturated.len(),
            rejected: self.rejected.len(),
        }
    }
}

/// A frozen snapshot of one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Certificate {
    pub schema: String,
    pub engine: String,
    pub artifact: String,
    pub timestamp_utc: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub run_meta: Metadata,
    #[serde(deserialize_with = "null_as_default")]
    pub baseline: Baseline,
    #[serde(deserialize_with = "null_as_default")]
    pub summary: Summary,
    #[serde(deserialize_with = "null_as_default")]
    pub buckets: Buckets,
}

impl Certificate {
    /// Run-level counts: the summary's when recorded, else bucket lengths.
    pub fn counts(&self) -> Counts {
        self.summary.counts.unwrap_or_else(|| self.buckets.counts())
    }

    pub fn status(&self) -> &CertStatus {
        &self.summary.status
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CasError> {
        persist::from_json_str(raw)
    }

    pub fn to_json_pretty(&self) -> Result<String, CasError> {
        persist::to_json_pretty(self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CasError> {
        let cert: Certificate = persist::read_json(path.as_ref())?;
        if cert.schema.is_empty() {
            tracing::warn!(path = %path.as_ref().display(), "certificate has no schema id");
        }
        if !cert.status().is_known() {
            tracing::warn!(
                path = %path.as_ref().display(),
                status = %cert.status(),
                "certificate status not recognized"
            );
        }
        Ok(cert)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CasError> {
        persist::write_json(path, self)
    }
}

/// Packs generation results into certificates.
#[derive(Debug, Clone, Default)]
pub struct CertificateBuilder {
    config: CertificateConfig,
}

impl CertificateBuilder {
    pub fn new(config: CertificateConfig) -> Result<Self, CasError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CertificateConfig {
        &self.config
    }

    /// Build a certificate stamped with the current time.
    pub fn build(
        &self,
        result: &GenerationResult,
        run_meta: Metadata,
    ) -> Result<Certificate, CasError> {
        self.build_at(result, run_meta, Utc::now())
    }

    pub fn build_at(
        &self,
        result: &GenerationResult,
        run_meta: Metadata,
        at: DateTime<Utc>,
    ) -> Result<Certificate, CasError> {
        let counts = Counts {
            accepted: result.accepted.len(),
            saturated: result.saturated.len(),
            rejected: result.rejected.len(),
        };
        let status = CertStatus::from_counts(&counts);

        let buckets = Buckets {
            accepted: self.pack(&result.accepted)?,
            saturated: self.pack(&result.saturated)?,
            rejected: self.pack(&result.rejected)?,
        };

        tracing::debug!(
            %status,
            accepted = counts.accepted,
            saturated = counts.saturated,
            rejected = counts.rejected,
            "certificate built"
        );

        Ok(Certificate {
            schema: self.config.schema_version.clone(),
            engine: self.config.engine.clone(),
            artifact: self.config.artifact.clone(),
            timestamp_utc: Some(at.to_rfc3339_opts(SecondsFormat::Secs, false)),
            run_meta,
            baseline: Baseline {
                text: result.baseline.clone(),
            },
            summary: Summary {
                stop_recommended: status.stop_recommended(),
                stop_reason: status.stop_reason().to_string(),
                status,
                counts: Some(counts),
            },
            buckets,
        })
    }

    fn pack(&self, bucket: &[Scored]) -> Result<Vec<CertItem>, CasError> {
        bucket
            .iter()
            .take(self.config.max_items_per_bucket)
            .map(CertItem::from_scored)
            .collect()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|number| number.is_finite()))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_bool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use omnia_kernel::{ConstrainedGenerator, Zea, generator::candidates};

    const BASELINE: &str = "OMNIA measures structural invariants. It does not interpret meaning. It does not make decisions.";

    fn scored(n: usize) -> Vec<Scored> {
        let zea = Zea::default();
        candidates(BASELINE)
            .into_iter()
            .cycle()
            .take(n)
            .map(|candidate| {
                let report = zea.evaluate(BASELINE, &candidate.text, Metadata::new());
                (candidate, report)
            })
            .collect()
    }

    fn result(accepted: usize, saturated: usize, rejected: usize) -> GenerationResult {
        GenerationResult {
            baseline: BASELINE.to_string(),
            accepted: scored(accepted),
            saturated: scored(saturated),
            rejected: scored(rejected),
        }
    }

    #[test]
    fn status_rolls_up_from_bucket_sizes() {
        let builder = CertificateBuilder::default();
        let cases = [
            ((1, 0, 0), CertStatus::Open, false, "continue"),
            ((1, 3, 3), CertStatus::Open, false, "continue"),
            ((0, 2, 1), CertStatus::Saturated, true, "structural_saturation"),
            ((0, 0, 4), CertStatus::Illegitimate, true, "noise_regime"),
            ((0, 0, 0), CertStatus::Illegitimate, true, "noise_regime"),
        ];
        for ((a, s, r), status, stop, reason) in cases {
            let cert = builder
                .build(&result(a, s, r), Metadata::new())
                .expect("certificate builds");
            assert_eq!(cert.summary.status, status, "counts {a}/{s}/{r}");
            assert_eq!(cert.summary.stop_recommended, stop);
            assert_eq!(cert.summary.stop_reason, reason);
        }
    }

    #[test]
    fn buckets_are_capped_but_counts_are_not() {
        let builder = CertificateBuilder::new(CertificateConfig {
            max_items_per_bucket: 2,
            ..CertificateConfig::default()
        })
        .expect("valid config");
        let source = result(5, 0, 3);
        let cert = builder.build(&source, Metadata::new()).expect("certificate builds");

        assert_eq!(cert.buckets.accepted.len(), 2);
        assert_eq!(cert.buckets.rejected.len(), 2);
        assert_eq!(
            cert.counts(),
            Counts {
                accepted: 5,
                saturated: 0,
                rejected: 3
            }
        );
        assert_eq!(cert.buckets.accepted[0].text, source.accepted[0].0.text);
        assert_eq!(cert.buckets.accepted[1].text, source.accepted[1].0.text);
    }

    #[test]
    fn zero_cap_is_rejected() {
        let bad = CertificateConfig {
            max_items_per_bucket: 0,
            ..CertificateConfig::default()
        };
        assert!(matches!(
            CertificateBuilder::new(bad),
            Err(CasError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn timestamp_is_rfc3339_seconds() {
        let at = Utc
            .with_ymd_and_hms(2026, 3, 1, 12, 30, 5)
            .single()
            .expect("valid instant");
        let cert = CertificateBuilder::default()
            .build_at(&result(1, 0, 0), Metadata::new(), at)
            .expect("certificate builds");
        assert_eq!(cert.timestamp_utc.as_deref(), Some("2026-03-01T12:30:05+00:00"));
    }

    #[test]
    fn items_carry_report_fields_and_details() {
        let generated = ConstrainedGenerator::default().generate(BASELINE, 1, 4, &Metadata::new());
        let cert = CertificateBuilder::default()
            .build(&generated, Metadata::new())
            .expect("certificate builds");
        let item = &cert.buckets.accepted[0];
        let (candidate, report) = &generated.accepted[0];
        assert_eq!(item.op, candidate.op);
        assert_eq!(item.saturation_margin, Some(report.saturation_margin));
        assert_eq!(item.snrc_pressure(), Some(report.snrc_pressure()));
        assert_eq!(item.details["meta"]["op"], Value::from(candidate.op.as_str()));
    }

    #[test]
    fn sparse_json_loads_with_defaults() {
        let cert = Certificate::from_json_str(
            r#"{
                "schema": "CAS-0.9",
                "summary": {"status": "PAUSED"},
                "buckets": {
                    "accepted": [{"op": "x", "saturation_margin": "wide", "delta_omega": 0.1}],
                    "rejected": null
                }
            }"#,
        )
        .expect("sparse certificate parses");

        assert_eq!(cert.status(), &CertStatus::Unknown("PAUSED".to_string()));
        assert!(!cert.status().is_known());
        assert!(cert.buckets.saturated.is_empty());
        assert!(cert.buckets.rejected.is_empty());
        assert_eq!(cert.buckets.accepted[0].saturation_margin, None);
        assert_eq!(cert.buckets.accepted[0].delta_omega, Some(0.1));
        assert_eq!(cert.buckets.accepted[0].snrc_pressure(), None);
        assert_eq!(cert.counts().accepted, 1);
        assert_eq!(cert.timestamp_utc, None);
    }

    #[test]
    fn serialized_keys_match_the_certificate_layout() {
        let cert = CertificateBuilder::default()
            .build(&result(1, 0, 1), Metadata::new())
            .expect("certificate builds");
        let json = serde_json::to_value(&cert).expect("certificate serializes");
        let mut keys: Vec<&str> = json
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "artifact",
                "baseline",
                "buckets",
                "engine",
                "run_meta",
                "schema",
                "summary",
                "timestamp_utc"
            ]
        );
        assert_eq!(json["summary"]["status"], Value::from("OPEN"));
        assert_eq!(json["summary"]["counts"]["rejected"], Value::from(1));
        assert_eq!(json["schema"], Value::from(DEFAULT_SCHEMA));
    }
}
