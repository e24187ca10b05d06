//! Header-row detection and table normalization.
//!
//! Input files frequently carry title lines, export timestamps, or plain
//! blank rows above the real header. Normalization scans a bounded window of
//! leading rows, picks the most plausible header, and produces a `CleanTable`
//! whose rows are padded to a uniform width.

use std::collections::HashSet;

/// Parsed rows before a header has been assigned. Blank source rows appear
/// as empty vectors.
pub type RawTable = Vec<Vec<String>>;

/// Number of leading rows scanned for the header by default.
pub const DEFAULT_MAX_BLANK_SCAN: usize = 10;

/// A normalized table: unique, non-empty column names plus positional rows.
///
/// Every cell is a `String`; cells missing from a ragged source row are
/// materialized as empty strings here, so later stages never see an absent
/// value. Rows always have exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CleanTable {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Picks the header row: the scanned row with the strictly greatest count of
/// non-blank cells. Ties keep the earliest row; a window of entirely blank
/// rows falls back to row 0.
pub fn detect_header_row(raw: &[Vec<String>], max_blank_scan: usize) -> usize {
    let mut best_index = None;
    let mut best_count = 0usize;
    for (index, row) in raw.iter().take(max_blank_scan).enumerate() {
        let non_empty = row.iter().filter(|cell| !cell.trim().is_empty()).count();
        if non_empty > best_count {
            best_count = non_empty;
            best_index = Some(index);
        }
    }
    best_index.unwrap_or(0)
}

pub fn normalize(raw: RawTable, max_blank_scan: usize) -> CleanTable {
    let width = raw.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return CleanTable::empty();
    }
    let header_index = detect_header_row(&raw, max_blank_scan);
    let columns = header_names(&raw[header_index], width);
    let rows = raw
        .into_iter()
        .skip(header_index + 1)
        .map(|mut row| {
            row.resize(width, String::new());
            row
        })
        .collect();
    CleanTable { columns, rows }
}

/// Builds the column-name sequence from the header row. Blank cells become
/// `Column_<1-based position>`; a repeated name gets a `_2`, `_3`, … suffix so
/// every name addresses exactly one column.
fn header_names(header_row: &[String], width: usize) -> Vec<String> {
    let mut names = Vec::with_capacity(width);
    let mut seen: HashSet<String> = HashSet::with_capacity(width);
    for position in 0..width {
        let trimmed = header_row
            .get(position)
            .map(|cell| cell.trim())
            .unwrap_or("");
        let base = if trimmed.is_empty() {
            format!("Column_{}", position + 1)
        } else {
            trimmed.to_string()
        };
        let mut candidate = base.clone();
        let mut suffix = 2usize;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        names.push(candidate);
    }
    names
}
