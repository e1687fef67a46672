//! Representations: named, immutable views of one object.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Name of the identity view every lens emits first.
pub const ORIG: &str = "orig";

/// Free-form key → value metadata attached to views, candidates and reports.
pub type Metadata = BTreeMap<String, Value>;

/// The concrete content of a view.
///
/// Text payloads carry partial structure and can be compared gram by gram.
/// Bytes and digests are opaque: they either match exactly or they don't.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
    Digest(String),
}

impl Payload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_opaque(&self) -> bool {
        !matches!(self, Payload::Text(_))
    }
}

/// One named view of an object plus the parameters that generated it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Representation {
    name: String,
    payload: Payload,
    #[serde(default)]
    meta: Metadata,
}

impl Representation {
    pub fn new(name: impl Into<String>, payload: Payload, meta: Metadata) -> Self {
        Self {
            name: name.into(),
            payload,
            meta,
        }
    }

    /// A text view with no metadata.
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, Payload::Text(text.into()), Metadata::new())
    }

    /// The identity view of `text`.
    pub fn identity(text: &str) -> Self {
        Self::new(
            ORIG,
            Payload::Text(text.to_string()),
            meta([("transform", Value::from("identity"))]),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    pub fn is_identity(&self) -> bool {
        self.name == ORIG
    }
}

/// Build a metadata map from literal pairs.
pub fn meta<const N: usize>(pairs: [(&str, Value); N]) -> Metadata {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Keep the first representation of every name, preserving order.
pub fn dedupe_by_name(reps: Vec<Representation>) -> Vec<Representation> {
    let mut seen = std::collections::BTreeSet::new();
    reps.into_iter()
        .filter(|rep| seen.insert(rep.name.clone()))
        .collect()
}
