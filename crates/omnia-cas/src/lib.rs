//! # OMNIA CAS
//!
//! Certificates of admissibility and stop (CAS) over generation runs, and
//! the diff between two certificates that a CI gate consumes.
//!
//! ```text
//! GenerationResult ──CertificateBuilder──▶ Certificate ──save/load──▶ JSON
//!                                              │
//!                      Certificate (older) ──Differ──▶ CertificateDiff
//! ```

pub mod certificate;
pub mod diff;
pub mod error;
pub mod persist;

pub use certificate::{
    Baseline, Buckets, CertItem, CertStatus, Certificate, CertificateBuilder, CertificateConfig,
    Counts, Summary,
};
pub use diff::{
    BucketStats, CertStats, CertificateDiff, Delta, DiffConfig, Differ, Signature, Verdict,
    VerdictLabel,
};
pub use error::CasError;
