//! # OMNIA Kernel
//!
//! Structural measurement of text: an object is compared with transformed
//! views of itself, and whatever survives every transformation is its
//! invariant residue Ω̂. The crate never interprets meaning and never
//! decides anything beyond a three-way admissibility label.
//!
//! ## Architecture
//!
//! ```text
//! Lens                   ← views(text) → [Representation], identity first
//!     │
//! SuperpositionKernel    ← pairwise distances → invariance, fractures
//!     │
//! OmegaEstimator         ← Ω̂ per step; history threaded by the caller
//!     │
//! Zea                    ← ΔΩ + SNRC pressure → ADMISSIBLE / SATURATED / ILLEGITIMATE
//!     │
//! ConstrainedGenerator   ← deterministic micro-operators filtered by ZEA
//! ```
//!
//! Everything is synchronous and deterministic: the same text and the same
//! configuration always produce the same reports.

pub mod error;
pub mod generator;
pub mod lens;
pub mod lenses;
pub mod omega;
pub mod representation;
pub mod superposition;
pub mod trend;
pub mod zea;

pub use error::OmniaError;
pub use generator::{
    Candidate, ConstrainedGenerator, GenerationResult, GeneratorConfig, Operator, Scored,
};
pub use lens::Lens;
pub use lenses::{CompressionLens, ConstraintLens, LensConfig, LensSet, PermutationLens};
pub use omega::{OmegaConfig, OmegaEstimator, OmegaMeta, OmegaReport};
pub use representation::{Metadata, Payload, Representation};
pub use superposition::{
    KernelConfig, Metric, MetricFn, ShingleContainment, SuperpositionKernel, SuperpositionReport,
};
pub use trend::{GainRatioSei, InvarianceLossIri, TrendScore};
pub use zea::{SnrcAggregation, Zea, ZeaConfig, ZeaReport, ZeaStatus};
