//! Command implementations for the Glaive CLI.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use log::{debug, info, warn};

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::EngineConfig;
use crate::document::ContentRecord;
use crate::engine::ContentIndex;
use crate::error::{GlaiveError, Result};

/// Resolve the engine configuration from the config file and flags.
pub fn load_config(args: &GlaiveArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            EngineConfig::from_json_file(path)?
        }
        None => EngineConfig::default(),
    };
    if let Some(index_path) = &args.index_path {
        config.index_path = index_path.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Execute a CLI command.
pub fn execute_command(args: &GlaiveArgs) -> Result<()> {
    let config = load_config(args)?;
    let index = ContentIndex::open(config)?;

    let outcome = match &args.command {
        Command::Index(index_args) => index_records(&index, index_args, args),
        Command::Delete(delete_args) => delete_record(&index, delete_args, args),
        Command::Search(search_args) => search_index(&index, search_args, args),
        Command::Get(get_args) => get_record(&index, get_args, args),
        Command::Reindex(reindex_args) => reindex_records(&index, reindex_args, args),
        Command::Stats => show_stats(&index, args),
    };

    // The index is closed on every path; a command failure takes precedence.
    let closed = index.close();
    outcome.and(closed)
}

/// Read content records from a JSON lines file. Blank lines are skipped.
pub fn read_records(path: &Path) -> Result<Vec<(usize, Result<ContentRecord>)>> {
    let file = File::open(path).map_err(|e| {
        GlaiveError::invalid_argument(format!("cannot open {}: {e}", path.display()))
    })?;

    let mut records = Vec::new();
    for (line_num, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed = serde_json::from_str::<ContentRecord>(&line).map_err(|e| {
            GlaiveError::invalid_argument(format!("line {}: {e}", line_num + 1))
        });
        records.push((line_num + 1, parsed));
    }
    Ok(records)
}

fn index_records(index: &ContentIndex, args: &IndexArgs, cli_args: &GlaiveArgs) -> Result<()> {
    info!("Indexing records from {}", args.records_file.display());
    let start_time = Instant::now();
    let mut indexed = 0;
    let mut failed = 0;

    for (line_num, parsed) in read_records(&args.records_file)? {
        let outcome = parsed.and_then(|record| index.index_content(&record));
        match outcome {
            Ok(()) => indexed += 1,
            Err(e) if args.fail_fast => return Err(e),
            Err(e) => {
                warn!("Skipping line {line_num}: {e}");
                failed += 1;
            }
        }
    }

    output_result(
        &IndexingResult {
            records_indexed: indexed,
            records_failed: failed,
            duration_ms: start_time.elapsed().as_millis() as u64,
            generation: index.stats()?.generation,
        },
        cli_args,
    )
}

fn delete_record(index: &ContentIndex, args: &DeleteArgs, cli_args: &GlaiveArgs) -> Result<()> {
    index.delete_content(args.id)?;
    output_result(
        &DeletionResult {
            id: args.id,
            generation: index.stats()?.generation,
        },
        cli_args,
    )
}

fn search_index(index: &ContentIndex, args: &SearchArgs, cli_args: &GlaiveArgs) -> Result<()> {
    let limit = args.limit.unwrap_or(index.config().default_max_results);
    debug!(
        "Searching for {:?} (category {:?}, author {:?}, limit {limit})",
        args.query, args.category, args.author
    );

    let start_time = Instant::now();
    let hits = index.search(
        args.query.as_deref(),
        args.category.as_deref(),
        args.author.as_deref(),
        limit,
    )?;

    output_result(
        &SearchResults {
            hits,
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

fn get_record(index: &ContentIndex, args: &GetArgs, cli_args: &GlaiveArgs) -> Result<()> {
    let record = index.get_indexed(args.id)?;
    output_result(
        &RecordResult {
            id: args.id,
            record,
        },
        cli_args,
    )
}

fn reindex_records(
    index: &ContentIndex,
    args: &ReindexArgs,
    cli_args: &GlaiveArgs,
) -> Result<()> {
    info!("Reindexing records from {}", args.records_file.display());
    let start_time = Instant::now();

    let mut records = Vec::new();
    for (_, parsed) in read_records(&args.records_file)? {
        records.push(parsed?);
    }
    let indexed = index.reindex_all(&records)?;

    output_result(
        &IndexingResult {
            records_indexed: indexed,
            records_failed: 0,
            duration_ms: start_time.elapsed().as_millis() as u64,
            generation: index.stats()?.generation,
        },
        cli_args,
    )
}

fn show_stats(index: &ContentIndex, cli_args: &GlaiveArgs) -> Result<()> {
    output_result(&index.stats()?, cli_args)
}
