//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{GlaiveArgs, OutputFormat};
use crate::document::{ContentRecord, SearchHit};
use crate::engine::IndexStats;
use crate::error::Result;

/// Something a command can print.
pub trait Report: Serialize {
    /// Lines shown in human-readable mode.
    fn human_lines(&self) -> Vec<String>;
}

/// Result of an `index` run.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexingResult {
    pub records_indexed: usize,
    pub records_failed: usize,
    pub duration_ms: u64,
    pub generation: u64,
}

impl Report for IndexingResult {
    fn human_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Indexed {} records in {}ms (generation {})",
            self.records_indexed, self.duration_ms, self.generation
        )];
        if self.records_failed > 0 {
            lines.push(format!("{} records failed", self.records_failed));
        }
        lines
    }
}

/// Result of a `delete` run.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeletionResult {
    pub id: i64,
    pub generation: u64,
}

impl Report for DeletionResult {
    fn human_lines(&self) -> Vec<String> {
        vec![format!(
            "Deleted record {} (generation {})",
            self.id, self.generation
        )]
    }
}

/// Result of a `search` run.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub duration_ms: u64,
}

impl Report for SearchResults {
    fn human_lines(&self) -> Vec<String> {
        if self.hits.is_empty() {
            return vec!["No results".to_string()];
        }

        let mut lines = vec!["Search Results:".to_string(), "═══════════════".to_string()];
        for (i, hit) in self.hits.iter().enumerate() {
            lines.push(String::new());
            lines.push(format!(
                "Result {}: id={} (Score: {:.3})",
                i + 1,
                hit.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                hit.score
            ));
            lines.push("─────────────".to_string());
            lines.push(format!(
                "title: {}",
                hit.highlighted_title.as_deref().unwrap_or(&hit.title)
            ));
            lines.push(format!(
                "body: {}",
                hit.highlighted_body.as_deref().unwrap_or(&hit.body)
            ));
            for (name, value) in [
                ("category", &hit.category),
                ("author", &hit.author),
                ("tags", &hit.tags),
            ] {
                if !value.is_empty() {
                    lines.push(format!("{name}: {value}"));
                }
            }
        }
        lines.push(String::new());
        lines.push(format!("Returned: {}", self.hits.len()));
        lines.push(format!("Search time: {}ms", self.duration_ms));
        lines
    }
}

/// Result of a `get` run.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordResult {
    pub id: i64,
    pub record: Option<ContentRecord>,
}

impl Report for RecordResult {
    fn human_lines(&self) -> Vec<String> {
        let Some(record) = &self.record else {
            return vec![format!("Record {} is not indexed", self.id)];
        };

        let mut lines = vec![
            format!("id: {}", self.id),
            format!("title: {}", record.title),
            format!("body: {}", record.body),
        ];
        for (name, value) in [
            ("category", &record.category),
            ("author", &record.author),
            ("tags", &record.tags),
        ] {
            if let Some(value) = value {
                lines.push(format!("{name}: {value}"));
            }
        }
        if let Some(created) = record.created_at {
            lines.push(format!("created: {created}"));
        }
        if let Some(updated) = record.updated_at {
            lines.push(format!("updated: {updated}"));
        }
        lines
    }
}

impl Report for IndexStats {
    fn human_lines(&self) -> Vec<String> {
        vec![
            "Index Statistics:".to_string(),
            "════════════════".to_string(),
            format!("Live documents: {}", self.live_docs),
            format!("Segments: {}", self.segments),
            format!("Generation: {}", self.generation),
            format!("Outstanding snapshots: {}", self.outstanding_snapshots),
        ]
    }
}

/// Render a result in the requested format.
pub fn render<T: Report>(result: &T, args: &GlaiveArgs) -> Result<String> {
    match args.output_format {
        OutputFormat::Human => Ok(result.human_lines().join("\n")),
        OutputFormat::Json if args.pretty => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Json => Ok(serde_json::to_string(result)?),
    }
}

/// Print a result in the requested format. Quiet mode suppresses human output.
pub fn output_result<T: Report>(result: &T, args: &GlaiveArgs) -> Result<()> {
    if args.output_format == OutputFormat::Human && args.verbosity() == 0 {
        return Ok(());
    }
    println!("{}", render(result, args)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn args(extra: &[&str]) -> GlaiveArgs {
        let mut argv = vec!["glaive"];
        argv.extend_from_slice(extra);
        argv.push("stats");
        GlaiveArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_render_stats_human() {
        let stats = IndexStats {
            live_docs: 3,
            segments: 1,
            generation: 7,
            outstanding_snapshots: 0,
        };
        let text = render(&stats, &args(&[])).unwrap();
        assert!(text.contains("Live documents: 3"));
        assert!(text.contains("Generation: 7"));
    }

    #[test]
    fn test_render_search_json() {
        let results = SearchResults {
            hits: vec![SearchHit {
                id: Some(1),
                title: "T".to_string(),
                score: 1.5,
                highlighted_title: Some("<mark>T</mark>".to_string()),
                ..Default::default()
            }],
            duration_ms: 2,
        };
        let text = render(&results, &args(&["-f", "json"])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["hits"][0]["id"], 1);
        assert_eq!(value["hits"][0]["highlightedTitle"], "<mark>T</mark>");
    }

    #[test]
    fn test_render_empty_search_human() {
        let results = SearchResults {
            hits: Vec::new(),
            duration_ms: 0,
        };
        assert_eq!(render(&results, &args(&[])).unwrap(), "No results");
    }
}
