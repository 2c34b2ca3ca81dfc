//! Engine configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GlaiveError, Result};
use crate::index::merge::MergePolicy;
use crate::search::builder::DEFAULT_LIMIT;
use crate::search::highlight::DEFAULT_FRAGMENT_SIZE;
use crate::search::scoring::Bm25;
use crate::storage::StorageConfig;

/// Configuration for a [`ContentIndex`](crate::engine::ContentIndex).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the index. Created if missing.
    pub index_path: PathBuf,

    /// Result limit used when a caller does not give one.
    pub default_max_results: usize,

    /// Highlight fragment size in characters.
    pub fragment_size: usize,

    /// Marker inserted before a highlighted term.
    pub highlight_pre_tag: String,

    /// Marker inserted after a highlighted term.
    pub highlight_post_tag: String,

    /// Storage settings.
    pub storage: StorageConfig,

    /// Ranking parameters.
    pub bm25: Bm25,

    /// Segment merge settings.
    pub merge: MergePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("./search-index"),
            default_max_results: DEFAULT_LIMIT,
            fragment_size: DEFAULT_FRAGMENT_SIZE,
            highlight_pre_tag: "<mark>".to_string(),
            highlight_post_tag: "</mark>".to_string(),
            storage: StorageConfig::default(),
            bm25: Bm25::default(),
            merge: MergePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Default configuration for an index at `index_path`.
    pub fn new<P: Into<PathBuf>>(index_path: P) -> Self {
        Self {
            index_path: index_path.into(),
            ..Default::default()
        }
    }

    /// Load a JSON config file. Missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            GlaiveError::invalid_config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: EngineConfig = serde_json::from_str(&text).map_err(|e| {
            GlaiveError::invalid_config(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_default_max_results(mut self, max_results: usize) -> Self {
        self.default_max_results = max_results;
        self
    }

    pub fn with_fragment_size(mut self, fragment_size: usize) -> Self {
        self.fragment_size = fragment_size;
        self
    }

    pub fn with_highlight_tags<P: Into<String>, S: Into<String>>(mut self, pre: P, post: S) -> Self {
        self.highlight_pre_tag = pre.into();
        self.highlight_post_tag = post.into();
        self
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_bm25(mut self, bm25: Bm25) -> Self {
        self.bm25 = bm25;
        self
    }

    pub fn with_merge_policy(mut self, merge: MergePolicy) -> Self {
        self.merge = merge;
        self
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.default_max_results == 0 {
            return Err(GlaiveError::invalid_config(
                "default_max_results must be positive",
            ));
        }
        if self.fragment_size == 0 {
            return Err(GlaiveError::invalid_config("fragment_size must be positive"));
        }
        if self.highlight_pre_tag.is_empty() || self.highlight_post_tag.is_empty() {
            return Err(GlaiveError::invalid_config("highlight tags must not be empty"));
        }
        if self.bm25.k1.is_nan() || self.bm25.k1 < 0.0 || !(0.0..=1.0).contains(&self.bm25.b) {
            return Err(GlaiveError::invalid_config(format!(
                "bm25 parameters out of range: k1={}, b={}",
                self.bm25.k1, self.bm25.b
            )));
        }
        if self.merge.max_segments == 0 {
            return Err(GlaiveError::invalid_config("merge.max_segments must be positive"));
        }
        Ok(())
    }
}
