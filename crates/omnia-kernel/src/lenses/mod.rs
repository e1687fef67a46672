//! Concrete lenses and the default lens set.

pub mod compression;
pub mod constraint;
pub mod permutation;

pub use compression::{CompressionLens, sha256_hex};
pub use constraint::ConstraintLens;
pub use permutation::PermutationLens;

use crate::lens::Lens;
use serde::{Deserialize, Serialize};

/// Parameters of the three standard lens families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LensConfig {
    pub summary_k: usize,
    pub permutation_seed: u64,
    pub max_len: usize,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            summary_k: compression::DEFAULT_SUMMARY_K,
            permutation_seed: 0,
            max_len: constraint::DEFAULT_MAX_LEN,
        }
    }
}

/// One lens of each family: compression, permutation, constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LensSet {
    pub compression: CompressionLens,
    pub permutation: PermutationLens,
    pub constraint: ConstraintLens,
}

impl LensSet {
    pub fn from_config(config: &LensConfig) -> Self {
        Self {
            compression: CompressionLens::new(config.summary_k),
            permutation: PermutationLens::new(config.permutation_seed),
            constraint: ConstraintLens::new(config.max_len),
        }
    }

    /// The families in canonical order.
    pub fn as_slice(&self) -> [&dyn Lens; 3] {
        [&self.compression, &self.permutation, &self.constraint]
    }
}
