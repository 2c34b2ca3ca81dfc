//! Top-N collection of scored documents.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::index::reader::DocAddress;

/// A document with its score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredDoc {
    pub address: DocAddress,
    pub score: f32,
}

/// Heap entry ordered so the worst hit sits on top.
#[derive(Debug)]
struct Worst(ScoredDoc);

impl PartialEq for Worst {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Worst {}

impl PartialOrd for Worst {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Worst {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lower score is "greater"; among equal scores the later address is.
        other
            .0
            .score
            .total_cmp(&self.0.score)
            .then_with(|| self.0.address.cmp(&other.0.address))
    }
}

/// Keeps the `limit` highest-scoring documents.
#[derive(Debug)]
pub struct TopDocsCollector {
    limit: usize,
    hits: BinaryHeap<Worst>,
    total_hits: u64,
}

impl TopDocsCollector {
    /// Collect at most `limit` documents.
    pub fn new(limit: usize) -> Self {
        TopDocsCollector {
            limit,
            hits: BinaryHeap::with_capacity(limit.min(1024)),
            total_hits: 0,
        }
    }

    /// Offer a matching document.
    pub fn collect(&mut self, address: DocAddress, score: f32) {
        self.total_hits += 1;
        if self.limit == 0 {
            return;
        }

        let candidate = Worst(ScoredDoc { address, score });
        if self.hits.len() < self.limit {
            self.hits.push(candidate);
        } else if let Some(worst) = self.hits.peek()
            && candidate < *worst
        {
            self.hits.pop();
            self.hits.push(candidate);
        }
    }

    /// Matching documents offered so far.
    pub fn total_hits(&self) -> u64 {
        self.total_hits
    }

    /// The kept documents, best first.
    pub fn into_sorted(self) -> Vec<ScoredDoc> {
        self.hits
            .into_sorted_vec()
            .into_iter()
            .map(|worst| worst.0)
            .collect()
    }
}
