//! Permutation lens: order-variant views, used to detect order dependence.
//!
//! The shuffle is a Fisher–Yates pass driven by a 31-bit linear
//! congruential generator, so a given seed reproduces the same permutation
//! byte for byte on every platform.

use crate::lens::Lens;
use crate::representation::{Payload, Representation, meta};
use serde_json::Value;

const LCG_MUL: u64 = 1_103_515_245;
const LCG_INC: u64 = 12_345;
const LCG_MASK: u64 = 0x7FFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermutationLens {
    seed: u64,
}

impl PermutationLens {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The permuted text, or `None` when there are fewer than two segments.
    pub fn permute(&self, text: &str) -> Option<String> {
        let parts = segments(text);
        if parts.len() < 2 {
            return None;
        }
        let order = shuffled_indices(parts.len(), self.seed);
        let joined = order
            .iter()
            .map(|&i| parts[i])
            .collect::<Vec<_>>()
            .join(". ");
        Some(format!("{joined}."))
    }
}

impl Lens for PermutationLens {
    fn id(&self) -> &str {
        "permutation"
    }

    fn views(&self, text: &str) -> Vec<Representation> {
        let mut reps = vec![Representation::identity(text)];
        if let Some(permuted) = self.permute(text) {
            reps.push(Representation::new(
                format!("perm_seed_{}", self.seed),
                Payload::Text(permuted),
                meta([
                    ("seed", Value::from(self.seed)),
                    ("n_parts", Value::from(segments(text).len())),
                ]),
            ));
        }
        reps
    }

    fn transform(&self, text: &str) -> String {
        self.permute(text).unwrap_or_else(|| text.to_string())
    }
}

/// Sentence-level segments: split on `.`, trimmed, empties dropped.
fn segments(text: &str) -> Vec<&str> {
    text.split('.')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

/// Fisher–Yates from the last index down, with `x = (a·x + c) mod 2^31`
/// seeded at `seed + 1`.
fn shuffled_indices(len: usize, seed: u64) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..len).collect();
    let mut x = seed.wrapping_add(1) & LCG_MASK;
    for k in (1..len).rev() {
        x = (LCG_MUL * x + LCG_INC) & LCG_MASK;
        let r = (x % (k as u64 + 1)) as usize;
        idx.swap(k, r);
    }
    idx
}
