//! Constrained generation: deterministic micro-operators filtered by ZEA.
//!
//! Each round applies every operator to every text in the pool, classifies
//! each distinct output against the fixed baseline, and carries the accepted
//! texts with the widest saturation margin into the next round. Nothing here
//! interprets meaning; the operators are plain string edits.

use crate::representation::Metadata;
use crate::zea::{Zea, ZeaReport, ZeaStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

const STRUCTURAL_CLAUSE: &str =
    " It measures invariants under transformations and stops at structural saturation.";
const SCOPE_CLAUSE: &str =
    " It is model-agnostic and post-inference: it evaluates outputs, not intentions.";
const MEASURABLE_CLAUSE: &str =
    " Output is a certificate: ADMISSIBLE, SATURATED, or ILLEGITIMATE.";

/// A mechanical edit applied to a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    AddStructuralClauses,
    RemoveRedundancy,
    NormalizeNegations,
    ReorderClauses,
    AddScopeLimits,
    MakeMeasurable,
}

impl Operator {
    /// Application order within one round.
    pub const ALL: [Operator; 6] = [
        Operator::AddStructuralClauses,
        Operator::RemoveRedundancy,
        Operator::NormalizeNegations,
        Operator::ReorderClauses,
        Operator::AddScopeLimits,
        Operator::MakeMeasurable,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Operator::AddStructuralClauses => "add_structural_clauses",
            Operator::RemoveRedundancy => "remove_redundancy",
            Operator::NormalizeNegations => "normalize_negations",
            Operator::ReorderClauses => "reorder_clauses",
            Operator::AddScopeLimits => "add_scope_limits",
            Operator::MakeMeasurable => "make_measurable",
        }
    }

    pub fn apply(self, text: &str) -> String {
        match self {
            Operator::AddStructuralClauses => append_clause(text, STRUCTURAL_CLAUSE),
            Operator::RemoveRedundancy => text
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .replace("does not interpret meaning", "does not interpret semantics")
                .replace(
                    "does not interpret semantics or decide actions",
                    "does not interpret semantics and does not decide actions",
                ),
            Operator::NormalizeNegations => {
                let sentences: Vec<String> = split_sentences(text)
                    .into_iter()
                    .map(|sentence| {
                        sentence
                            .replace("It does not interpret meaning", "It does not interpret semantics")
                            .replace("It does not make decisions", "It does not decide actions")
                    })
                    .collect();
                join_sentences(&sentences)
            }
            Operator::ReorderClauses => reorder_clauses(text),
            Operator::AddScopeLimits => append_clause(text, SCOPE_CLAUSE),
            Operator::MakeMeasurable => append_clause(text, MEASURABLE_CLAUSE),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

fn append_clause(text: &str, clause: &str) -> String {
    let trimmed = text.trim();
    if trimmed.contains(clause.trim()) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{clause}")
    }
}

fn split_sentences(text: &str) -> Vec<String> {
    text.replace('\n', " ")
        .split('.')
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_sentences(sentences: &[String]) -> String {
    format!("{}.", sentences.join(". ").trim())
}

/// Definitions first, then everything else, then negations.
fn reorder_clauses(text: &str) -> String {
    let sentences = split_sentences(text);
    if sentences.len() < 2 {
        return text.to_string();
    }
    let mut definitions = Vec::new();
    let mut negations = Vec::new();
    let mut other = Vec::new();
    for sentence in sentences {
        let lower = sentence.to_lowercase();
        if lower.contains(" is ") || lower.starts_with("omnia") {
            definitions.push(sentence);
        } else if lower.contains("does not") {
            negations.push(sentence);
        } else {
            other.push(sentence);
        }
    }
    definitions.extend(other);
    definitions.extend(negations);
    join_sentences(&definitions)
}

/// A variant of some source text, tagged with what produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    /// Operator tag, or another producer name for externally sourced text.
    pub op: String,
    pub meta: Metadata,
}

impl Candidate {
    /// A candidate produced outside the operator set (e.g. a dataset record).
    pub fn external(text: impl Into<String>, op: impl Into<String>, meta: Metadata) -> Self {
        Self {
            text: text.into(),
            op: op.into(),
            meta,
        }
    }
}

/// Every distinct, changed, non-empty operator output for `text`.
pub fn candidates(text: &str) -> Vec<Candidate> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for op in Operator::ALL {
        let produced = op.apply(text);
        let produced = produced.trim();
        if produced.is_empty() || produced == text || !seen.insert(produced.to_string()) {
            continue;
        }
        out.push(Candidate {
            text: produced.to_string(),
            op: op.tag().to_string(),
            meta: Metadata::from([("op".to_string(), Value::from(op.tag()))]),
        });
    }
    out
}

/// One classified candidate.
pub type Scored = (Candidate, ZeaReport);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub baseline: String,
    pub accepted: Vec<Scored>,
    pub saturated: Vec<Scored>,
    pub rejected: Vec<Scored>,
}

impl GenerationResult {
    pub fn new(baseline: &str) -> Self {
        Self {
            baseline: baseline.to_string(),
            accepted: Vec::new(),
            saturated: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.accepted.len() + self.saturated.len() + self.rejected.len()
    }

    /// Route a classified candidate into the bucket its status names.
    pub fn push(&mut self, candidate: Candidate, report: ZeaReport) {
        let bucket = match report.status {
            ZeaStatus::Admissible => &mut self.accepted,
            ZeaStatus::Saturated => &mut self.saturated,
            ZeaStatus::Illegitimate => &mut self.rejected,
        };
        bucket.push((candidate, report));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub rounds: usize,
    /// Accepted texts carried into the next round (at least one is kept).
    pub top_k: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { rounds: 2, top_k: 8 }
    }
}

/// Next round's pool: texts by descending margin, capped at `top_k`.
///
/// The sort is stable, so equal margins keep generation order.
pub fn next_pool(mut scored: Vec<(String, f64)>, top_k: usize) -> Vec<String> {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k.max(1));
    scored.into_iter().map(|(text, _)| text).collect()
}

#[derive(Debug, Clone, Default)]
pub struct ConstrainedGenerator {
    zea: Zea,
}

impl ConstrainedGenerator {
    pub fn new(zea: Zea) -> Self {
        Self { zea }
    }

    pub fn zea(&self) -> &Zea {
        &self.zea
    }

    pub fn generate_with(
        &self,
        baseline: &str,
        config: &GeneratorConfig,
        meta: &Metadata,
    ) -> GenerationResult {
        self.generate(baseline, config.rounds, config.top_k, meta)
    }

    /// Run exactly `rounds` expansion rounds starting from `baseline`.
    pub fn generate(
        &self,
        baseline: &str,
        rounds: usize,
        top_k: usize,
        meta: &Metadata,
    ) -> GenerationResult {
        let mut result = GenerationResult::new(baseline);
        let mut pool = vec![baseline.to_string()];

        for round in 0..rounds {
            let mut scored = Vec::new();
            let before = result.total();

            for source in &pool {
                for candidate in candidates(source) {
                    let mut zea_meta = Metadata::from([("round".to_string(), Value::from(round))]);
                    zea_meta.extend(candidate.meta.clone());
                    zea_meta.extend(meta.clone());

                    let report = self.zea.evaluate(baseline, &candidate.text, zea_meta);
                    if report.status == ZeaStatus::Admissible {
                        scored.push((candidate.text.clone(), report.saturation_margin));
                    }
                    result.push(candidate, report);
                }
            }

            let admitted = scored.len();
            pool = next_pool(scored, top_k);
            tracing::info!(
                round,
                evaluated = result.total() - before,
                admitted,
                pool = pool.len(),
                "generator round"
            );
        }

        result
    }
}
