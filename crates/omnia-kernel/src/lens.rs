//! The lens capability: one object in, an ordered sequence of views out.

use crate::representation::{Payload, Representation};

/// A deterministic view-generation policy.
///
/// Implementations must be pure functions of their configuration and the
/// input text, and must emit the identity view (`orig`) first so that
/// views from different lenses always share a stable anchor.
pub trait Lens: Send + Sync {
    /// Family identifier (`compression`, `permutation`, `constraints`, ...).
    fn id(&self) -> &str;

    /// All views of `text`, identity first.
    fn views(&self, text: &str) -> Vec<Representation>;

    /// The lens's primary transformed text.
    ///
    /// Defaults to the first non-identity text view, or `text` itself when
    /// the lens produced no such view.
    fn transform(&self, text: &str) -> String {
        self.views(text)
            .into_iter()
            .filter(|rep| !rep.is_identity())
            .find_map(|rep| match rep.payload() {
                Payload::Text(value) => Some(value.clone()),
                _ => None,
            })
            .unwrap_or_else(|| text.to_string())
    }
}

/// Concatenate the views of every lens, in lens order.
pub fn collect_views(text: &str, lenses: &[&dyn Lens]) -> Vec<Representation> {
    lenses.iter().flat_map(|lens| lens.views(text)).collect()
}

/// First `limit` characters of `text`.
pub(crate) fn take_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
