//! Glaive CLI binary.

use std::io::Write;
use std::process;

use anyhow::Context;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

use glaive::cli::args::*;
use glaive::cli::commands::*;

fn run(args: &GlaiveArgs) -> anyhow::Result<()> {
    execute_command(args).with_context(|| match &args.index_path {
        Some(path) => format!("glaive failed on index {}", path.display()),
        None => "glaive failed".to_string(),
    })
}

fn main() {
    let args = GlaiveArgs::parse();

    let log_level = match args.verbosity() {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
