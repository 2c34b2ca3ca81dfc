//! Command line argument parsing for the Glaive CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Glaive - near-real-time full-text search over content records
#[derive(Parser, Debug, Clone)]
#[command(name = "glaive")]
#[command(about = "Near-real-time full-text search over content records")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct GlaiveArgs {
    /// Index directory (overrides the config file)
    #[arg(short = 'i', long, env = "GLAIVE_INDEX_PATH", value_name = "DIR")]
    pub index_path: Option<PathBuf>,

    /// Engine configuration file (JSON)
    #[arg(short, long, env = "GLAIVE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl GlaiveArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Upsert records from a JSON lines file, one commit per record
    Index(IndexArgs),

    /// Remove a record from the index
    Delete(DeleteArgs),

    /// Search the index
    Search(SearchArgs),

    /// Show the indexed copy of a record
    Get(GetArgs),

    /// Re-upsert every record of a JSON lines file in a single commit
    Reindex(ReindexArgs),

    /// Show index statistics
    Stats,
}

/// Arguments for indexing records
#[derive(Parser, Debug, Clone)]
pub struct IndexArgs {
    /// JSON lines file, one content record per line
    #[arg(value_name = "RECORDS_FILE")]
    pub records_file: PathBuf,

    /// Stop at the first record that fails
    #[arg(long)]
    pub fail_fast: bool,
}

/// Arguments for deleting a record
#[derive(Parser, Debug, Clone)]
pub struct DeleteArgs {
    /// Record id
    #[arg(value_name = "ID")]
    pub id: i64,
}

/// Arguments for fetching a record
#[derive(Parser, Debug, Clone)]
pub struct GetArgs {
    /// Record id
    #[arg(value_name = "ID")]
    pub id: i64,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Free text matched against title, body and tags
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Exact category filter
    #[arg(long)]
    pub category: Option<String>,

    /// Exact author filter
    #[arg(long)]
    pub author: Option<String>,

    /// Maximum number of results (defaults to the configured limit)
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// Arguments for a full reindex
#[derive(Parser, Debug, Clone)]
pub struct ReindexArgs {
    /// JSON lines file, one content record per line
    #[arg(value_name = "RECORDS_FILE")]
    pub records_file: PathBuf,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_command() {
        let args = GlaiveArgs::try_parse_from([
            "glaive",
            "--index-path",
            "/tmp/idx",
            "search",
            "quarterly report",
            "--category",
            "finance",
            "-n",
            "5",
        ])
        .unwrap();

        assert_eq!(args.index_path, Some(PathBuf::from("/tmp/idx")));
        if let Command::Search(search_args) = args.command {
            assert_eq!(search_args.query.as_deref(), Some("quarterly report"));
            assert_eq!(search_args.category.as_deref(), Some("finance"));
            assert_eq!(search_args.author, None);
            assert_eq!(search_args.limit, Some(5));
        } else {
            panic!("Expected Search command");
        }
    }

    #[test]
    fn test_search_without_text() {
        let args =
            GlaiveArgs::try_parse_from(["glaive", "search", "--author", "alice"]).unwrap();
        if let Command::Search(search_args) = args.command {
            assert_eq!(search_args.query, None);
            assert_eq!(search_args.author.as_deref(), Some("alice"));
        } else {
            panic!("Expected Search command");
        }
    }

    #[test]
    fn test_index_and_delete_commands() {
        let args =
            GlaiveArgs::try_parse_from(["glaive", "index", "records.jsonl", "--fail-fast"])
                .unwrap();
        if let Command::Index(index_args) = args.command {
            assert_eq!(index_args.records_file, PathBuf::from("records.jsonl"));
            assert!(index_args.fail_fast);
        } else {
            panic!("Expected Index command");
        }

        let args = GlaiveArgs::try_parse_from(["glaive", "delete", "42"]).unwrap();
        assert!(matches!(args.command, Command::Delete(DeleteArgs { id: 42 })));

        assert!(GlaiveArgs::try_parse_from(["glaive", "delete", "forty-two"]).is_err());
    }

    #[test]
    fn test_verbosity_levels() {
        let args = GlaiveArgs::try_parse_from(["glaive", "stats"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = GlaiveArgs::try_parse_from(["glaive", "-vv", "stats"]).unwrap();
        assert_eq!(args.verbosity(), 2);

        let args = GlaiveArgs::try_parse_from(["glaive", "-vv", "--quiet", "stats"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args =
            GlaiveArgs::try_parse_from(["glaive", "--format", "json", "--pretty", "stats"])
                .unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
        assert!(args.pretty);

        assert!(GlaiveArgs::try_parse_from(["glaive", "--format", "yaml", "stats"]).is_err());
    }
}
