//! Format marshaling: raw-table reading and clean-table writing.
//!
//! Both supported formats funnel into the same `RawTable` shape so header
//! detection and the transform pipeline never care where the bytes came from.
//! Output goes back out in the format the data arrived in.

use std::{
    io::Cursor,
    path::Path,
};

use anyhow::{Context, Result, bail};
use calamine::{DataType, Reader, Xlsx};
use encoding_rs::Encoding;
use rust_xlsxwriter::Workbook;

use crate::{
    error::ParseError,
    io_utils,
    normalize::{CleanTable, RawTable},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

/// Resolves the input format from an explicit override or the file extension.
/// Anything that is not a recognized workbook extension is treated as CSV.
pub fn resolve_format(path: &Path, forced: Option<SourceFormat>) -> SourceFormat {
    if let Some(format) = forced {
        return format;
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext)
            if ext.eq_ignore_ascii_case("xlsx")
                || ext.eq_ignore_ascii_case("xlsm")
                || ext.eq_ignore_ascii_case("xls") =>
        {
            SourceFormat::Xlsx
        }
        _ => SourceFormat::Csv,
    }
}

pub fn read_table(
    path: &Path,
    format: SourceFormat,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<RawTable, ParseError> {
    let bytes = io_utils::read_input_bytes(path)?;
    match format {
        SourceFormat::Csv => read_csv_raw(&bytes, delimiter, encoding),
        SourceFormat::Xlsx => read_xlsx_raw(bytes),
    }
}

/// Reads every CSV record with no header assumption.
///
/// The `csv` crate silently skips blank lines, but blank rows above the real
/// header are exactly what the header scan needs to see. Record line positions
/// let us put them back: a gap between one record's last line and the next
/// record's first line is a run of blank rows. Newlines embedded in quoted
/// fields are accounted for so they never produce phantom blanks.
fn read_csv_raw(
    bytes: &[u8],
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<RawTable, ParseError> {
    let mut reader = io_utils::open_raw_csv_reader(bytes, delimiter);
    let mut rows: RawTable = Vec::new();
    let mut record = csv::ByteRecord::new();
    let mut next_line = 1u64;
    while reader.read_byte_record(&mut record)? {
        let line = record.position().map(|pos| pos.line()).unwrap_or(next_line);
        while next_line < line {
            rows.push(Vec::new());
            next_line += 1;
        }
        let spanned = 1 + record
            .iter()
            .map(|field| field.iter().filter(|byte| **byte == b'\n').count() as u64)
            .sum::<u64>();
        rows.push(io_utils::decode_record(&record, encoding)?);
        next_line = line + spanned;
    }
    Ok(rows)
}

/// Reads the first worksheet of a workbook into raw rows.
///
/// The used range reported by calamine is anchored at the first non-empty
/// cell; rows and columns before that anchor are padded back in so row
/// indices line up with the source sheet during header detection.
fn read_xlsx_raw(bytes: Vec<u8>) -> Result<RawTable, ParseError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let sheet_names = workbook.sheet_names().to_owned();
    let Some(first_sheet) = sheet_names.first() else {
        return Ok(Vec::new());
    };
    let range = match workbook.worksheet_range(first_sheet) {
        Some(result) => result?,
        None => return Ok(Vec::new()),
    };
    let (row_offset, col_offset) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));
    let mut rows: RawTable = vec![Vec::new(); row_offset];
    for sheet_row in range.rows() {
        let mut cells = vec![String::new(); col_offset];
        cells.extend(sheet_row.iter().map(cell_to_string));
        rows.push(cells);
    }
    Ok(rows)
}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Float(f) => {
            if f.fract() == 0.0 {
                format!("{f:.0}")
            } else {
                f.to_string()
            }
        }
        DataType::Int(i) => i.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Writes the table back out in the format the input arrived in.
pub fn write_output(
    table: &CleanTable,
    format: SourceFormat,
    path: Option<&Path>,
    delimiter: u8,
) -> Result<()> {
    match format {
        SourceFormat::Csv => write_csv(table, path, delimiter),
        SourceFormat::Xlsx => write_xlsx(table, path),
    }
}

pub fn write_csv(table: &CleanTable, path: Option<&Path>, delimiter: u8) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(path, delimiter)?;
    if table.columns.is_empty() {
        writer.flush().context("Flushing CSV output")?;
        return Ok(());
    }
    writer
        .write_record(&table.columns)
        .context("Writing header record")?;
    for (index, row) in table.rows.iter().enumerate() {
        writer
            .write_record(row)
            .with_context(|| format!("Writing row {}", index + 1))?;
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(())
}

fn write_xlsx(table: &CleanTable, path: Option<&Path>) -> Result<()> {
    let Some(path) = path.filter(|p| !io_utils::is_dash(p)) else {
        bail!("XLSX output requires --output; stdout is CSV-only");
    };
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (col, name) in table.columns.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, name)
            .with_context(|| format!("Writing header cell '{name}'"))?;
    }
    for (row_index, row) in table.rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            worksheet
                .write_string((row_index + 1) as u32, col as u16, cell)
                .with_context(|| format!("Writing cell at row {}", row_index + 2))?;
        }
    }
    workbook
        .save(path)
        .with_context(|| format!("Saving workbook to {path:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;

    #[test]
    fn resolve_format_prefers_override_then_extension() {
        let path = Path::new("report.xlsx");
        assert_eq!(resolve_format(path, None), SourceFormat::Xlsx);
        assert_eq!(
            resolve_format(path, Some(SourceFormat::Csv)),
            SourceFormat::Csv
        );
        assert_eq!(resolve_format(Path::new("data.csv"), None), SourceFormat::Csv);
        assert_eq!(resolve_format(Path::new("-"), None), SourceFormat::Csv);
    }

    #[test]
    fn csv_reader_preserves_leading_blank_lines() {
        let bytes = b"\n\nName,Email\nAlice,a@x.com\n";
        let rows = read_csv_raw(bytes, b',', UTF_8).unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows[0].is_empty());
        assert!(rows[1].is_empty());
        assert_eq!(rows[2], vec!["Name", "Email"]);
        assert_eq!(rows[3], vec!["Alice", "a@x.com"]);
    }

    #[test]
    fn csv_reader_keeps_delimiter_only_lines_as_empty_cells() {
        let bytes = b",,\na,b,c\n";
        let rows = read_csv_raw(bytes, b',', UTF_8).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["", "", ""]);
        assert_eq!(rows[1], vec!["a", "b", "c"]);
    }

    #[test]
    fn quoted_newlines_do_not_create_phantom_blank_rows() {
        let bytes = b"Name,Note\nAlice,\"line one\nline two\"\nBob,plain\n";
        let rows = read_csv_raw(bytes, b',', UTF_8).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1], "line one\nline two");
        assert_eq!(rows[2], vec!["Bob", "plain"]);
    }

    #[test]
    fn blank_lines_between_records_are_reconstructed() {
        let bytes = b"meta\n\nName,Email\n";
        let rows = read_csv_raw(bytes, b',', UTF_8).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["meta"]);
        assert!(rows[1].is_empty());
        assert_eq!(rows[2], vec!["Name", "Email"]);
    }

    #[test]
    fn empty_input_yields_empty_raw_table() {
        let rows = read_csv_raw(b"", b',', UTF_8).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn cell_to_string_renders_integral_floats_without_fraction() {
        assert_eq!(cell_to_string(&DataType::Float(42.0)), "42");
        assert_eq!(cell_to_string(&DataType::Float(1.5)), "1.5");
        assert_eq!(cell_to_string(&DataType::Int(7)), "7");
        assert_eq!(cell_to_string(&DataType::Empty), "");
    }
}
