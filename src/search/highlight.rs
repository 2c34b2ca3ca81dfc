//! Fragment highlighting for search hits.
//!
//! The text is cut into consecutive fragments of roughly `fragment_size`
//! characters, breaking only between tokens. Each fragment is scored by the
//! number of distinct query terms it contains, then by the number of matches;
//! the best one is returned with every match wrapped in the marker pair.

use std::sync::Arc;

use ahash::AHashSet;
use log::warn;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::standard::StandardAnalyzer;
use crate::error::{GlaiveError, Result};

/// Default fragment size in characters.
pub const DEFAULT_FRAGMENT_SIZE: usize = 200;

/// Characters of body shown when no fragment matches.
pub const BODY_PREVIEW_CHARS: usize = 200;

/// Appended to a truncated body.
pub const ELLIPSIS: &str = "...";

/// Extracts the best matching fragment of a field.
#[derive(Debug, Clone)]
pub struct Highlighter {
    analyzer: Arc<dyn Analyzer>,
    fragment_size: usize,
    pre_tag: String,
    post_tag: String,
}

impl Default for Highlighter {
    fn default() -> Self {
        Highlighter::new(Arc::new(StandardAnalyzer::new()))
    }
}

struct Fragment {
    start: usize,
    end: usize,
    matches: Vec<(usize, usize)>,
    distinct: AHashSet<String>,
}

impl Fragment {
    fn new(start: usize) -> Self {
        Fragment {
            start,
            end: start,
            matches: Vec::new(),
            distinct: AHashSet::new(),
        }
    }

    /// (distinct terms, total matches).
    fn score(&self) -> (usize, usize) {
        (self.distinct.len(), self.matches.len())
    }
}

impl Highlighter {
    /// Highlighter with `<mark>` markers and 200-character fragments.
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Highlighter {
            analyzer,
            fragment_size: DEFAULT_FRAGMENT_SIZE,
            pre_tag: "<mark>".to_string(),
            post_tag: "</mark>".to_string(),
        }
    }

    /// Set the fragment size in characters.
    pub fn with_fragment_size(mut self, fragment_size: usize) -> Self {
        self.fragment_size = fragment_size.max(1);
        self
    }

    /// Set the marker pair wrapped around matches.
    pub fn with_tags<P: Into<String>, S: Into<String>>(mut self, pre: P, post: S) -> Self {
        self.pre_tag = pre.into();
        self.post_tag = post.into();
        self
    }

    /// Fragment size in characters.
    pub fn fragment_size(&self) -> usize {
        self.fragment_size
    }

    /// The best fragment of `text` for `terms`, or `None` if no term occurs.
    pub fn best_fragment(&self, text: &str, terms: &AHashSet<String>) -> Result<Option<String>> {
        if terms.is_empty() || text.is_empty() {
            return Ok(None);
        }

        // Byte offset of every char, for measuring fragments in characters.
        let char_starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let char_pos = |byte: usize| char_starts.partition_point(|&start| start < byte);

        let mut fragments = vec![Fragment::new(0)];
        for token in self.analyzer.analyze(text)? {
            if token.end_offset > text.len()
                || !text.is_char_boundary(token.start_offset)
                || !text.is_char_boundary(token.end_offset)
            {
                return Err(GlaiveError::highlight(format!(
                    "Token '{}' has offsets {}..{} outside the text",
                    token.text, token.start_offset, token.end_offset
                )));
            }

            if let Some(current) = fragments.last_mut()
                && current.start < token.start_offset
                && char_pos(token.end_offset) - char_pos(current.start) > self.fragment_size
            {
                current.end = token.start_offset;
                fragments.push(Fragment::new(token.start_offset));
            }
            if terms.contains(&token.text)
                && let Some(current) = fragments.last_mut()
            {
                current.matches.push((token.start_offset, token.end_offset));
                current.distinct.insert(token.text);
            }
        }
        if let Some(last) = fragments.last_mut() {
            last.end = text.len();
        }

        let best = fragments
            .iter()
            .filter(|fragment| !fragment.matches.is_empty())
            .map(|fragment| (fragment, fragment.score()))
            .fold(None, |best: Option<(&Fragment, (usize, usize))>, (fragment, s)| {
                match best {
                    Some((_, best_score)) if best_score >= s => best,
                    _ => Some((fragment, s)),
                }
            });

        Ok(best.map(|(fragment, _)| self.mark(text, fragment)))
    }

    fn mark(&self, text: &str, fragment: &Fragment) -> String {
        let mut marked = String::with_capacity(
            fragment.end - fragment.start
                + fragment.matches.len() * (self.pre_tag.len() + self.post_tag.len()),
        );
        let mut position = fragment.start;
        for &(start, end) in &fragment.matches {
            if start < position {
                continue;
            }
            marked.push_str(&text[position..start]);
            marked.push_str(&self.pre_tag);
            marked.push_str(&text[start..end]);
            marked.push_str(&self.post_tag);
            position = end;
        }
        marked.push_str(&text[position..fragment.end]);

        // Only whitespace at a cut edge is dropped; the field's own is kept.
        let mut marked = marked.as_str();
        if fragment.start > 0 {
            marked = marked.trim_start();
        }
        if fragment.end < text.len() {
            marked = marked.trim_end();
        }
        marked.to_string()
    }

    /// Highlighted title, falling back to the raw title.
    pub fn highlight_title(&self, title: &str, terms: &AHashSet<String>) -> String {
        match self.best_fragment(title, terms) {
            Ok(Some(fragment)) => fragment,
            Ok(None) => title.to_string(),
            Err(e) => {
                warn!("Title highlighting failed, using raw title: {e}");
                title.to_string()
            }
        }
    }

    /// Highlighted body, falling back to the first [`BODY_PREVIEW_CHARS`]
    /// characters whatever the fragment size.
    pub fn highlight_body(&self, body: &str, terms: &AHashSet<String>) -> String {
        match self.best_fragment(body, terms) {
            Ok(Some(fragment)) => fragment,
            Ok(None) => truncate_with_ellipsis(body, BODY_PREVIEW_CHARS),
            Err(e) => {
                warn!("Body highlighting failed, using truncated body: {e}");
                truncate_with_ellipsis(body, BODY_PREVIEW_CHARS)
            }
        }
    }
}

/// The first `max_chars` characters of `text` plus an ellipsis, or all of
/// `text` if it is no longer than that.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}
