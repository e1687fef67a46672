//! Constraint lens: does structure survive under restriction?

use crate::lens::{Lens, take_chars};
use crate::representation::{Payload, Representation, meta};
use serde_json::Value;

pub const DEFAULT_MAX_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintLens {
    max_len: usize,
}

impl ConstraintLens {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

impl Default for ConstraintLens {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEN)
    }
}

impl Lens for ConstraintLens {
    fn id(&self) -> &str {
        "constraints"
    }

    fn views(&self, text: &str) -> Vec<Representation> {
        vec![
            Representation::identity(text),
            Representation::new(
                format!("len_cap_{}", self.max_len),
                Payload::Text(take_chars(text, self.max_len)),
                meta([
                    ("max_len", Value::from(self.max_len)),
                    ("constraint", Value::from("truncate")),
                ]),
            ),
            Representation::new(
                "no_whitespace",
                Payload::Text(text.split_whitespace().collect()),
                meta([("constraint", Value::from("strip_whitespace"))]),
            ),
        ]
    }

    /// Whitespace stripped.
    fn transform(&self, text: &str) -> String {
        text.split_whitespace().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_cap_and_strip() {
        let views = ConstraintLens::new(5).views("a b\tc\nd   efgh");
        let names: Vec<&str> = views.iter().map(Representation::name).collect();
        assert_eq!(names, vec!["orig", "len_cap_5", "no_whitespace"]);
        assert_eq!(views[1].payload().as_text(), Some("a b\tc"));
        assert_eq!(views[2].payload().as_text(), Some("abcdefgh"));
    }

    #[test]
    fn transform_strips_whitespace() {
        let lens = ConstraintLens::new(4);
        assert_eq!(lens.transform("struc ture\tholds"), "structureholds");
        assert_eq!(lens.transform("solid"), "solid");
    }
}
