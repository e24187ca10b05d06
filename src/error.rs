use thiserror::Error;

/// Fatal input-parsing failures.
///
/// Parsing is the only stage that aborts a rewrite. Every later failure
/// (model outage, unusable selection, invalid pattern) degrades to a recorded
/// fallback in the rewrite report instead of propagating.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to parse workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),
    #[error("failed to decode input as {encoding}")]
    Decode { encoding: &'static str },
}
