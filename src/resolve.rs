//! Target-column resolution: call A plus ground-truth filtering.

use log::warn;

use crate::llm::{ColumnSelection, ModelClient};

/// Asks the model which columns the instruction targets. Any failure or
/// unparseable response degrades to the empty fallback selection; the
/// pipeline then runs as a no-op rather than erroring.
pub fn resolve_selection(
    client: &dyn ModelClient,
    instruction: &str,
    columns: &[String],
) -> ColumnSelection {
    match client.select_columns(instruction, columns) {
        Ok(selection) => selection,
        Err(err) => {
            warn!("Column selection failed, continuing with no targets: {err:#}");
            ColumnSelection::fallback()
        }
    }
}

/// Keeps only names that exist in the real column set, preserving the order
/// the model returned. The model may hallucinate names; the table is the
/// ground truth.
pub fn filter_targets(selection: &ColumnSelection, columns: &[String]) -> Vec<String> {
    selection
        .target_columns
        .iter()
        .filter(|name| columns.iter().any(|column| column == *name))
        .cloned()
        .collect()
}
