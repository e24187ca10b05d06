pub mod cli;
pub mod error;
pub mod formats;
pub mod io_utils;
pub mod llm;
pub mod normalize;
pub mod report;
pub mod resolve;
pub mod rewrite;
pub mod sample;
pub mod table;
pub mod transform;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_rewrite", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Rewrite(args) => rewrite::execute(&args),
        Commands::Normalize(args) => handle_normalize(&args),
        Commands::Preview(args) => handle_preview(&args),
    }
}

fn handle_normalize(args: &cli::NormalizeArgs) -> Result<()> {
    let format = formats::resolve_format(&args.input, args.format.map(Into::into));
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Normalizing '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let raw = formats::read_table(&args.input, format, delimiter, encoding)
        .with_context(|| format!("Parsing {:?}", args.input))?;
    let table = normalize::normalize(raw, args.max_blank_scan);
    info!(
        "Header resolved to {} column(s), {} data row(s)",
        table.columns.len(),
        table.rows.len()
    );
    let output_delimiter = io_utils::resolve_output_delimiter(
        args.output.as_deref(),
        args.output_delimiter,
        delimiter,
    );
    formats::write_csv(&table, args.output.as_deref(), output_delimiter)
        .context("Writing normalized table")?;
    Ok(())
}

fn handle_preview(args: &cli::PreviewArgs) -> Result<()> {
    let format = formats::resolve_format(&args.input, args.format.map(Into::into));
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let raw = formats::read_table(&args.input, format, delimiter, encoding)
        .with_context(|| format!("Parsing {:?}", args.input))?;
    let table = normalize::normalize(raw, args.max_blank_scan);
    if table.columns.is_empty() {
        info!("'{}' contains no data to preview", args.input.display());
        return Ok(());
    }
    let rows = table
        .rows
        .iter()
        .take(args.rows)
        .cloned()
        .collect::<Vec<_>>();
    table::print_table(&table.columns, &rows);
    info!("Displayed {} row(s) from {:?}", rows.len(), args.input);
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
