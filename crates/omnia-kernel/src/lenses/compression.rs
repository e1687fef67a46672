//! Compression lens: does structure survive when the object is squeezed?
//!
//! Produces deterministic views only; the goal is survivability under
//! compression, not efficiency.

use crate::lens::{Lens, take_chars};
use crate::representation::{Payload, Representation, meta};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io::Write;

pub const DEFAULT_SUMMARY_K: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLens {
    summary_k: usize,
}

impl CompressionLens {
    pub fn new(summary_k: usize) -> Self {
        Self { summary_k }
    }

    pub fn summary_k(&self) -> usize {
        self.summary_k
    }

    fn summary(&self, text: &str) -> String {
        take_chars(text, self.summary_k)
    }
}

impl Default for CompressionLens {
    fn default() -> Self {
        Self::new(DEFAULT_SUMMARY_K)
    }
}

impl Lens for CompressionLens {
    fn id(&self) -> &str {
        "compression"
    }

    fn views(&self, text: &str) -> Vec<Representation> {
        let gz = gzip_bytes(text);
        let gz_len = gz.len();

        vec![
            Representation::identity(text),
            Representation::new(
                format!("summary_{}", self.summary_k),
                Payload::Text(self.summary(text)),
                meta([
                    ("k", Value::from(self.summary_k)),
                    ("method", Value::from("truncate")),
                ]),
            ),
            Representation::new(
                "gzip_bytes",
                Payload::Bytes(gz),
                meta([("bytes", Value::from(gz_len))]),
            ),
            Representation::new(
                "sha256",
                Payload::Digest(sha256_hex(text)),
                meta([("hash", Value::from("sha256"))]),
            ),
        ]
    }

    /// Leading half of the text, rounded up.
    fn transform(&self, text: &str) -> String {
        take_chars(text, text.chars().count().div_ceil(2))
    }
}

/// Gzip of the UTF-8 bytes. The header carries no timestamp, so the
/// output depends on the input alone.
fn gzip_bytes(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    let result = match encoder.write_all(text.as_bytes()) {
        Ok(()) => encoder.finish(),
        Err(err) => Err(err),
    };
    match result {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, "gzip view failed; emitting empty payload");
            Vec::new()
        }
    }
}

/// Lowercase hex SHA-256 of the UTF-8 bytes of `text`.
pub fn sha256_hex(text: &str) -> String {
    hex_lower(&Sha256::digest(text.as_bytes()))
}

fn hex_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
