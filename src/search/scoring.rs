//! BM25 relevance scoring.

use serde::{Deserialize, Serialize};

/// BM25 parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25 {
    /// Term frequency saturation.
    pub k1: f32,
    /// Length normalization strength, from 0 (none) to 1 (full).
    pub b: f32,
}

impl Default for Bm25 {
    fn default() -> Self {
        Bm25 { k1: 1.2, b: 0.75 }
    }
}

impl Bm25 {
    /// Create with custom parameters.
    pub fn new(k1: f32, b: f32) -> Self {
        Bm25 { k1, b }
    }

    /// Inverse document frequency. Never negative, zero for unseen terms.
    pub fn idf(&self, doc_freq: u64, doc_count: u64) -> f32 {
        if doc_freq == 0 || doc_count == 0 {
            return 0.0;
        }
        let n = doc_count as f32;
        let df = doc_freq as f32;

        // IDF = ln(1 + (N - df + 0.5) / (df + 0.5))
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Term frequency component for a document of `field_length` terms.
    pub fn tf(&self, term_freq: u32, field_length: u32, avg_field_length: f32) -> f32 {
        if term_freq == 0 {
            return 0.0;
        }
        let tf = term_freq as f32;
        let avg = if avg_field_length > 0.0 {
            avg_field_length
        } else {
            1.0
        };
        let norm = 1.0 - self.b + self.b * (field_length as f32 / avg);

        (tf * (self.k1 + 1.0)) / (tf + self.k1 * norm)
    }

    /// Full score of one term in one document.
    pub fn score(
        &self,
        idf: f32,
        term_freq: u32,
        field_length: u32,
        avg_field_length: f32,
    ) -> f32 {
        idf * self.tf(term_freq, field_length, avg_field_length)
    }
}
