//! Ω̂ (Omega-hat): the invariant residue of an object under superposition.
//!
//! One estimation step collects the views of every lens, optionally drops
//! repeated view names, superposes them, and compares the invariance with
//! the last report of the caller's history.
//!
//! The estimator holds no history of its own. Callers thread the history
//! through successive calls by appending each report they receive; two
//! callers sharing one estimator never see each other's steps.

use crate::error::{OmniaError, check_non_negative};
use crate::lens::{Lens, collect_views};
use crate::lenses::LensSet;
use crate::representation::dedupe_by_name;
use crate::superposition::{SuperpositionKernel, SuperpositionReport};
use crate::trend::{DEFAULT_IRI, DEFAULT_SEI, TrendScore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OmegaConfig {
    /// Convergence tolerance on consecutive invariances.
    pub epsilon: f64,
    /// Upper bound on steps taken by [`OmegaEstimator::estimate_incremental`].
    pub max_iters: usize,
    pub dedupe_views: bool,
}

impl Default for OmegaConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-3,
            max_iters: 10,
            dedupe_views: true,
        }
    }
}

impl OmegaConfig {
    pub fn validate(&self) -> Result<(), OmniaError> {
        check_non_negative("omega.epsilon", self.epsilon)?;
        if self.max_iters == 0 {
            return Err(OmniaError::InvalidConfig {
                field: "omega.max_iters",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct OmegaMeta {
    pub view_count: usize,
    pub epsilon: f64,
    pub max_iters: usize,
    pub dedupe_views: bool,
}

/// One estimation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OmegaReport {
    pub invariance: f64,
    /// `|invariance − previous.invariance|`; zero on the first step.
    pub delta_invariance: f64,
    pub fractures: Vec<String>,
    pub sei: f64,
    pub iri: f64,
    pub meta: OmegaMeta,
}

#[derive(Clone)]
pub struct OmegaEstimator {
    kernel: SuperpositionKernel,
    config: OmegaConfig,
    lenses: LensSet,
    sei: Option<Arc<dyn TrendScore>>,
    iri: Option<Arc<dyn TrendScore>>,
}

impl OmegaEstimator {
    pub fn new(kernel: SuperpositionKernel, config: OmegaConfig) -> Result<Self, OmniaError> {
        config.validate()?;
        Ok(Self {
            kernel,
            config,
            lenses: LensSet::default(),
            sei: None,
            iri: None,
        })
    }

    /// Lens set used by [`estimate_text`](Self::estimate_text).
    pub fn with_lens_set(mut self, lenses: LensSet) -> Self {
        self.lenses = lenses;
        self
    }

    pub fn with_sei(mut self, score: impl TrendScore + 'static) -> Self {
        self.sei = Some(Arc::new(score));
        self
    }

    pub fn with_iri(mut self, score: impl TrendScore + 'static) -> Self {
        self.iri = Some(Arc::new(score));
        self
    }

    pub fn kernel(&self) -> &SuperpositionKernel {
        &self.kernel
    }

    pub fn config(&self) -> &OmegaConfig {
        &self.config
    }

    pub fn lens_set(&self) -> &LensSet {
        &self.lenses
    }

    /// One estimation step of `text` under `lenses`, given the caller's history.
    pub fn estimate(
        &self,
        text: &str,
        lenses: &[&dyn Lens],
        history: &[OmegaReport],
    ) -> OmegaReport {
        let mut reps = collect_views(text, lenses);
        if self.config.dedupe_views {
            reps = dedupe_by_name(reps);
        }

        let sp = self.kernel.run(&reps);
        let invariance = sp.invariance.clamp(0.0, 1.0);
        let previous = history.last().map_or(invariance, |last| last.invariance);

        let sei = self.trend(self.sei.as_deref(), DEFAULT_SEI, history, &sp);
        let iri = self.trend(self.iri.as_deref(), DEFAULT_IRI, history, &sp);

        tracing::debug!(
            views = sp.meta.view_count,
            invariance,
            fractures = sp.fractures.len(),
            step = history.len(),
            "omega step"
        );

        OmegaReport {
            invariance,
            delta_invariance: (invariance - previous).abs(),
            fractures: sp.fractures,
            sei,
            iri,
            meta: OmegaMeta {
                view_count: sp.meta.view_count,
                epsilon: self.config.epsilon,
                max_iters: self.config.max_iters,
                dedupe_views: self.config.dedupe_views,
            },
        }
    }

    /// Single-text shortcut: the configured lens set with an empty history.
    pub fn estimate_text(&self, text: &str) -> f64 {
        self.estimate(text, &self.lenses.as_slice(), &[]).invariance
    }

    /// Run a schedule of (typically growing) lens sets over one text.
    ///
    /// Stops after `max_iters` steps or as soon as the trace converges.
    pub fn estimate_incremental(&self, text: &str, schedule: &[&[&dyn Lens]]) -> Vec<OmegaReport> {
        let mut history = Vec::new();
        for lenses in schedule.iter().take(self.config.max_iters) {
            let report = self.estimate(text, lenses, &history);
            history.push(report);
            if self.converged(&history) {
                break;
            }
        }
        history
    }

    /// `|inv_k − inv_{k−1}| < epsilon`; never true with fewer than two steps.
    pub fn converged(&self, history: &[OmegaReport]) -> bool {
        let [.., before, last] = history else {
            return false;
        };
        (last.invariance - before.invariance).abs() < self.config.epsilon
    }

    fn trend(
        &self,
        score: Option<&dyn TrendScore>,
        default: f64,
        history: &[OmegaReport],
        current: &SuperpositionReport,
    ) -> f64 {
        if history.is_empty() {
            return default;
        }
        let Some(score) = score else {
            return default;
        };
        match score.score(history, current) {
            Ok(value) if value.is_finite() => value,
            Ok(value) => {
                tracing::warn!(score = score.name(), value, "non-finite trend score; using default");
                default
            }
            Err(err) => {
                tracing::warn!(score = score.name(), error = %err, "trend score failed; using default");
                default
            }
        }
    }
}

impl Default for OmegaEstimator {
    fn default() -> Self {
        Self {
            kernel: SuperpositionKernel::default(),
            config: OmegaConfig::default(),
            lenses: LensSet::default(),
            sei: None,
            iri: None,
        }
    }
}

impl fmt::Debug for OmegaEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OmegaEstimator")
            .field("kernel", &self.kernel)
            .field("config", &self.config)
            .field("lenses", &self.lenses)
            .field("sei", &self.sei.as_ref().map(|s| s.name()))
            .field("iri", &self.iri.as_ref().map(|s| s.name()))
            .finish()
    }
}
