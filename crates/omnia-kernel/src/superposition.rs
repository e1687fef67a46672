//! Superposition: compare every view of an object against every other.
//!
//! The kernel reduces a set of N representations to the C(N,2) pairwise
//! distances, their mean, and an invariance score `1 − mean`. Pairs whose
//! distance exceeds the fracture threshold are reported as fractures: the
//! places where structure did not survive the transformation.
//!
//! The distance itself is injected through [`Metric`]. The kernel clamps
//! whatever the metric returns into [0,1]; a NaN counts as maximal
//! distance.

use crate::error::{OmniaError, check_unit_interval};
use crate::representation::{Payload, Representation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_FRACTURE_THRESHOLD: f64 = 0.5;
pub const DEFAULT_SHINGLE: usize = 4;
/// Scale of the Jaccard fallback used when one gram set contains the other.
pub const DEFAULT_NESTED_WEIGHT: f64 = 0.001;
/// Smallest distance between two different texts.
pub const MIN_DISTINCT: f64 = 1e-9;

/// A bounded, symmetric distance between two representations.
pub trait Metric: Send + Sync {
    /// Distance in [0,1]; 0 for structurally identical views.
    fn distance(&self, a: &Representation, b: &Representation) -> f64;

    /// Name of this metric (for diagnostics).
    fn name(&self) -> &str {
        "custom"
    }
}

/// Adapter turning a plain closure into a [`Metric`].
pub struct MetricFn<F>(pub F);

impl<F> Metric for MetricFn<F>
where
    F: Fn(&Representation, &Representation) -> f64 + Send + Sync,
{
    fn distance(&self, a: &Representation, b: &Representation) -> f64 {
        (self.0)(a, b)
    }
}

/// Default distance policy: character n-gram containment.
///
/// Text vs text is `1 − |A ∩ B| / min(|A|, |B|)` over n-gram sets, so
/// reordering and stripping pay for every gram they break. When one set
/// contains the other (a prefix truncation, a repeated tail) the distance
/// falls back to `nested_weight × (1 − |A ∩ B| / |A ∪ B|)`, never below
/// [`MIN_DISTINCT`]. Only identical texts are at distance 0. Opaque payloads
/// compare by equality only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShingleContainment {
    n: usize,
    nested_weight: f64,
}

impl ShingleContainment {
    pub fn new(n: usize) -> Result<Self, OmniaError> {
        if n == 0 {
            return Err(OmniaError::InvalidConfig {
                field: "kernel.shingle",
                value: n.to_string(),
                reason: "must be at least 1",
            });
        }
        Ok(Self {
            n,
            nested_weight: DEFAULT_NESTED_WEIGHT,
        })
    }

    pub fn with_nested_weight(mut self, weight: f64) -> Result<Self, OmniaError> {
        check_unit_interval("kernel.nested_weight", weight)?;
        self.nested_weight = weight;
        Ok(self)
    }

    pub fn text_distance(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 0.0;
        }
        let grams_a = shingles(a, self.n);
        let grams_b = shingles(b, self.n);
        if grams_a.is_empty() || grams_b.is_empty() {
            return 1.0;
        }
        let shared = grams_a.intersection(&grams_b).count() as f64;
        let smaller = grams_a.len().min(grams_b.len()) as f64;
        let containment = 1.0 - shared / smaller;
        if containment > 0.0 {
            return containment;
        }
        let union = (grams_a.len() + grams_b.len()) as f64 - shared;
        (self.nested_weight * (1.0 - shared / union)).max(MIN_DISTINCT)
    }
}

impl Default for ShingleContainment {
    fn default() -> Self {
        Self {
            n: DEFAULT_SHINGLE,
            nested_weight: DEFAULT_NESTED_WEIGHT,
        }
    }
}

impl Metric for ShingleContainment {
    fn distance(&self, a: &Representation, b: &Representation) -> f64 {
        match (a.payload(), b.payload()) {
            (Payload::Text(x), Payload::Text(y)) => self.text_distance(x, y),
            (x, y) => {
                if x == y {
                    0.0
                } else {
                    1.0
                }
            }
        }
    }

    fn name(&self) -> &str {
        "shingle_containment"
    }
}

/// Character n-grams of `text`; texts shorter than `n` are one gram.
fn shingles(text: &str, n: usize) -> HashSet<&str> {
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(text.len()))
        .collect();
    let chars = bounds.len() - 1;
    if chars == 0 {
        return HashSet::new();
    }
    if chars < n {
        return HashSet::from([text]);
    }
    (0..=chars - n)
        .map(|i| &text[bounds[i]..bounds[i + n]])
        .collect()
}

/// Clamp a raw metric value into [0,1]. NaN is treated as maximal distance.
pub fn clamp_distance(value: f64) -> f64 {
    if value.is_nan() {
        return 1.0;
    }
    value.clamp(0.0, 1.0)
}

/// Tunables for the default kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub fracture_threshold: f64,
    pub shingle: usize,
    pub nested_weight: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            fracture_threshold: DEFAULT_FRACTURE_THRESHOLD,
            shingle: DEFAULT_SHINGLE,
            nested_weight: DEFAULT_NESTED_WEIGHT,
        }
    }
}

/// Summary metadata of one superposition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperpositionMeta {
    pub view_count: usize,
}

/// Result of superposing one representation set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperpositionReport {
    /// Distance per `name__name` pair key (names in original order).
    pub pairwise: BTreeMap<String, f64>,
    pub invariance: f64,
    pub fractures: Vec<String>,
    pub meta: SuperpositionMeta,
}

/// Pairwise distance aggregator over a representation set.
#[derive(Clone)]
pub struct SuperpositionKernel {
    metric: Arc<dyn Metric>,
    fracture_threshold: f64,
}

impl SuperpositionKernel {
    pub fn new(metric: impl Metric + 'static) -> Self {
        Self {
            metric: Arc::new(metric),
            fracture_threshold: DEFAULT_FRACTURE_THRESHOLD,
        }
    }

    /// Kernel with the default metric tuned by `config`.
    pub fn from_config(config: &KernelConfig) -> Result<Self, OmniaError> {
        let metric =
            ShingleContainment::new(config.shingle)?.with_nested_weight(config.nested_weight)?;
        Self::new(metric).with_threshold(config.fracture_threshold)
    }

    pub fn with_threshold(mut self, threshold: f64) -> Result<Self, OmniaError> {
        check_unit_interval("kernel.fracture_threshold", threshold)?;
        self.fracture_threshold = threshold;
        Ok(self)
    }

    pub fn fracture_threshold(&self) -> f64 {
        self.fracture_threshold
    }

    /// Clamped distance between two representations.
    pub fn distance(&self, a: &Representation, b: &Representation) -> f64 {
        clamp_distance(self.metric.distance(a, b))
    }

    /// Clamped distance between two plain texts.
    pub fn text_distance(&self, a: &str, b: &str) -> f64 {
        self.distance(&Representation::text("a", a), &Representation::text("b", b))
    }

    /// Superpose `reps`: every unordered pair, in index order.
    pub fn run(&self, reps: &[Representation]) -> SuperpositionReport {
        let mut pairwise = BTreeMap::new();
        let mut scores = Vec::new();
        let mut fractures = Vec::new();

        for (i, left) in reps.iter().enumerate() {
            for right in &reps[i + 1..] {
                let key = format!("{}__{}", left.name(), right.name());
                let d = self.distance(left, right);
                scores.push(d);
                if d > self.fracture_threshold {
                    fractures.push(key.clone());
                }
                pairwise.insert(key, d);
            }
        }

        let mean = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };

        SuperpositionReport {
            pairwise,
            invariance: (1.0 - mean).clamp(0.0, 1.0),
            fractures,
            meta: SuperpositionMeta {
                view_count: reps.len(),
            },
        }
    }
}

impl Default for SuperpositionKernel {
    fn default() -> Self {
        Self::new(ShingleContainment::default())
    }
}

impl fmt::Debug for SuperpositionKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuperpositionKernel")
            .field("metric", &self.metric.name())
            .field("fracture_threshold", &self.fracture_threshold)
            .finish()
    }
}
