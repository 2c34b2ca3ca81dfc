//! Segment merge policy.
//!
//! Write-through commits produce one small segment per mutation, so the writer
//! folds segments together as part of each commit. Merging rewrites the live
//! documents of the chosen segments into one new segment and drops their
//! deleted documents.

use serde::{Deserialize, Serialize};

use crate::index::manifest::SegmentEntry;

/// Decides which segments a commit should merge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergePolicy {
    /// Upper bound on segments after a commit.
    pub max_segments: usize,
    /// Segments with more than this fraction deleted are rewritten.
    pub delete_ratio_threshold: f64,
}

impl Default for MergePolicy {
    fn default() -> Self {
        MergePolicy {
            max_segments: 10,
            delete_ratio_threshold: 0.3,
        }
    }
}

impl MergePolicy {
    /// Indices (ascending) of the segments to merge, or `None` if no merge is due.
    pub fn find_merge(&self, segments: &[SegmentEntry]) -> Option<Vec<usize>> {
        let mut chosen: Vec<usize> = segments
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                entry.doc_count > 0
                    && entry.deleted_count as f64 / entry.doc_count as f64
                        > self.delete_ratio_threshold
            })
            .map(|(i, _)| i)
            .collect();

        let limit = self.max_segments.max(1);
        if segments.len() > limit {
            let mut by_size: Vec<usize> = (0..segments.len()).collect();
            by_size.sort_by_key(|&i| segments[i].live_count());
            let needed = (segments.len() - limit + 1).max(2);
            chosen.extend(by_size.into_iter().take(needed));
        }

        chosen.sort_unstable();
        chosen.dedup();
        if chosen.is_empty() { None } else { Some(chosen) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, doc_count: u32, deleted_count: u32) -> SegmentEntry {
        SegmentEntry {
            name: name.to_string(),
            doc_count,
            deleted_count,
            deletion_generation: None,
        }
    }

    #[test]
    fn test_no_merge_under_limit() {
        let policy = MergePolicy::default();
        let segments = vec![entry("seg_1", 10, 0), entry("seg_2", 1, 0)];
        assert_eq!(policy.find_merge(&segments), None);
    }

    #[test]
    fn test_over_limit_merges_smallest() {
        let policy = MergePolicy {
            max_segments: 3,
            ..Default::default()
        };
        let segments = vec![
            entry("seg_1", 100, 0),
            entry("seg_2", 1, 0),
            entry("seg_3", 50, 0),
            entry("seg_4", 2, 0),
        ];
        assert_eq!(policy.find_merge(&segments), Some(vec![1, 3]));
    }

    #[test]
    fn test_high_delete_ratio_is_compacted() {
        let policy = MergePolicy::default();
        let segments = vec![entry("seg_1", 10, 5), entry("seg_2", 10, 1)];
        assert_eq!(policy.find_merge(&segments), Some(vec![0]));
    }
}
