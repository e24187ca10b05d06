//! Aggregation of per-column outcomes into the rewrite report.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    llm::{ColumnSelection, TransformRule},
    transform::TransformOutcome,
};

/// Everything a caller needs to audit a rewrite: which columns were targeted,
/// the rule applied (or the error that made it inert) per column, the raw
/// call-A payload, and per-column match counts.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RewriteReport {
    pub regex_info: RegexInfo,
    pub match_stats: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RegexInfo {
    pub target_columns: Vec<String>,
    pub by_column: BTreeMap<String, TransformRule>,
    pub call_a: ColumnSelection,
}

impl RewriteReport {
    pub fn total_matches(&self) -> u64 {
        self.match_stats.values().sum()
    }
}

/// Pure aggregation. An empty target list still yields a report carrying the
/// raw selection and empty maps.
pub fn assemble(
    selection: ColumnSelection,
    target_columns: Vec<String>,
    outcomes: Vec<TransformOutcome>,
) -> RewriteReport {
    let mut by_column = BTreeMap::new();
    let mut match_stats = BTreeMap::new();
    for outcome in outcomes {
        match_stats.insert(outcome.column.clone(), outcome.match_count);
        by_column.insert(outcome.column, outcome.rule);
    }
    RewriteReport {
        regex_info: RegexInfo {
            target_columns,
            by_column,
            call_a: selection,
        },
        match_stats,
    }
}
