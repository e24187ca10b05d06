//! Per-column pattern transform engine.
//!
//! Each resolved target column gets one rule-inference call, one compile, one
//! counting pass, and one replacement pass. A bad rule poisons nothing beyond
//! its own column: the error lands in the rule metadata and the column's
//! values stay untouched.

use log::{info, warn};
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::{
    llm::{ModelClient, TransformRule},
    normalize::CleanTable,
    sample,
};

/// Compiled-program size cap. The regex crate's engine is linear-time in the
/// input, so a size cap on the compiled pattern is the remaining guard
/// against pathological model output.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransformOutcome {
    pub column: String,
    pub rule: TransformRule,
    pub match_count: u64,
}

/// Compiles `pattern` with the rule's flag string mapped onto builder
/// toggles: `i` → case-insensitive, `m` → multi-line anchors, `s` →
/// dot-matches-newline. Unrecognized flag characters are ignored.
pub fn compile_pattern(pattern: &str, flags: &str) -> Result<Regex, regex::Error> {
    let flags = flags.to_ascii_lowercase();
    RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
}

/// Counts non-overlapping matches across the whole column, then rewrites
/// every cell in place. Counting happens before replacement, so a rule whose
/// replacement re-creates its own pattern still reports pre-image counts.
pub fn apply_rule(
    table: &mut CleanTable,
    column_index: usize,
    regex: &Regex,
    replacement: &str,
) -> u64 {
    let mut match_count = 0u64;
    for row in &table.rows {
        if let Some(cell) = row.get(column_index) {
            match_count += regex.find_iter(cell).count() as u64;
        }
    }
    for row in &mut table.rows {
        if let Some(cell) = row.get_mut(column_index)
            && regex.is_match(cell)
        {
            *cell = regex.replace_all(cell, replacement).into_owned();
        }
    }
    match_count
}

/// Runs call B for one column and applies the result.
///
/// Failure ladder: a model error yields the inert fallback rule; an empty
/// pattern is a deliberate no-op; a compile failure records `rule.error` and
/// leaves the column untouched. Only a successful compile mutates the table.
pub fn transform_column(
    client: &dyn ModelClient,
    instruction: &str,
    table: &mut CleanTable,
    column: &str,
    sample_size: usize,
) -> TransformOutcome {
    let Some(column_index) = table.column_index(column) else {
        // Targets are pre-filtered against the column set; a miss here means
        // the caller bypassed that filter.
        let mut rule = TransformRule::fallback();
        rule.error = Some(format!("column '{column}' not found"));
        return TransformOutcome {
            column: column.to_string(),
            rule,
            match_count: 0,
        };
    };
    let samples = sample::sample_values(
        table
            .rows
            .iter()
            .filter_map(|row| row.get(column_index).map(String::as_str)),
        sample_size,
    );
    let mut rule = match client.infer_rule(instruction, column, &samples) {
        Ok(rule) => rule,
        Err(err) => {
            warn!("Rule inference for column '{column}' failed, leaving it untouched: {err:#}");
            TransformRule::fallback()
        }
    };
    if rule.pattern.is_empty() {
        return TransformOutcome {
            column: column.to_string(),
            rule,
            match_count: 0,
        };
    }
    match compile_pattern(&rule.pattern, &rule.flags) {
        Ok(regex) => {
            let match_count = apply_rule(table, column_index, &regex, &rule.replacement);
            info!(
                "Column '{column}': pattern '{}' matched {match_count} time(s)",
                rule.pattern
            );
            TransformOutcome {
                column: column.to_string(),
                rule,
                match_count,
            }
        }
        Err(err) => {
            warn!("Column '{column}': pattern '{}' failed to compile", rule.pattern);
            rule.error = Some(format!("Invalid pattern: {err}"));
            TransformOutcome {
                column: column.to_string(),
                rule,
                match_count: 0,
            }
        }
    }
}
