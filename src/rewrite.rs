//! End-to-end rewrite pipeline: normalize, resolve targets, transform, emit.

use std::{fs, time::Duration};

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::RewriteArgs,
    formats, io_utils,
    llm::{ModelClient, ModelConfig, OpenAiClient},
    normalize::{self, CleanTable},
    report::{self, RewriteReport},
    resolve, transform,
};

pub fn execute(args: &RewriteArgs) -> Result<()> {
    let format = formats::resolve_format(&args.input, args.format.map(Into::into));
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let api_key = std::env::var(&args.api_key_env)
        .with_context(|| format!("Reading API key from ${}", args.api_key_env))?;
    let client = OpenAiClient::new(ModelConfig {
        model: args.model.clone(),
        base_url: args.base_url.clone(),
        api_key,
        timeout: Duration::from_secs(args.timeout_secs),
    })?;

    info!(
        "Rewriting '{}' (delimiter '{}') per instruction: {}",
        args.input.display(),
        crate::printable_delimiter(delimiter),
        args.instruction
    );
    let raw = formats::read_table(&args.input, format, delimiter, encoding)
        .with_context(|| format!("Parsing {:?}", args.input))?;
    let mut table = normalize::normalize(raw, args.max_blank_scan);
    info!(
        "Normalized into {} column(s), {} row(s)",
        table.columns.len(),
        table.rows.len()
    );

    let report = run_pipeline(&mut table, &args.instruction, &client, args.sample_size);

    let output_delimiter = io_utils::resolve_output_delimiter(
        args.output.as_deref(),
        args.output_delimiter,
        delimiter,
    );
    formats::write_output(&table, format, args.output.as_deref(), output_delimiter)
        .context("Writing rewritten table")?;
    if let Some(report_path) = &args.report {
        let json = serde_json::to_string_pretty(&report).context("Serializing rewrite report")?;
        fs::write(report_path, json)
            .with_context(|| format!("Writing report to {report_path:?}"))?;
    }
    info!(
        "Rewrote {} column(s), {} total match(es)",
        report.regex_info.target_columns.len(),
        report.total_matches()
    );
    Ok(())
}

/// Runs calls A and B against an already-normalized table, mutating it in
/// place and returning the assembled report.
///
/// Target columns are processed sequentially in the order the model returned
/// them. There is no rollback: a column rewritten before a later column's
/// rule fails stays rewritten, and the failure is visible in the report.
pub fn run_pipeline(
    table: &mut CleanTable,
    instruction: &str,
    client: &dyn ModelClient,
    sample_size: usize,
) -> RewriteReport {
    let selection = resolve::resolve_selection(client, instruction, &table.columns);
    let targets = resolve::filter_targets(&selection, &table.columns);
    if targets.is_empty() {
        info!("No target columns resolved; returning the table unchanged");
        return report::assemble(selection, targets, Vec::new());
    }
    info!("Resolved target column(s): {}", targets.join(", "));
    let outcomes = targets
        .iter()
        .map(|column| transform::transform_column(client, instruction, table, column, sample_size))
        .collect();
    report::assemble(selection, targets, outcomes)
}
