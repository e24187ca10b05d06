use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{formats::SourceFormat, normalize, sample};

#[derive(Debug, Parser)]
#[command(author, version, about = "Rewrite tabular columns from natural-language instructions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply a natural-language rewrite instruction to a CSV or XLSX file
    Rewrite(RewriteArgs),
    /// Detect the header row and emit the cleaned table as CSV
    Normalize(NormalizeArgs),
    /// Preview the first few normalized rows in a formatted table
    Preview(PreviewArgs),
}

#[derive(Debug, Args)]
pub struct RewriteArgs {
    /// Input CSV or XLSX file (use '-' for stdin, CSV only)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Natural-language instruction describing the rewrite
    #[arg(short = 'p', long = "instruction")]
    pub instruction: String,
    /// Output file (stdout if omitted; XLSX output requires a path)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// JSON file recording the applied rules and match counts
    #[arg(long = "report")]
    pub report: Option<PathBuf>,
    /// Input format (defaults to the file extension)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
    /// Chat model used for column selection and rule inference
    #[arg(long, default_value = "gpt-4o-mini")]
    pub model: String,
    /// Base URL of the OpenAI-compatible chat endpoint
    #[arg(long = "base-url", default_value = "https://api.openai.com/v1")]
    pub base_url: String,
    /// Environment variable holding the API key
    #[arg(long = "api-key-env", default_value = "OPENAI_API_KEY")]
    pub api_key_env: String,
    /// Per-request timeout for model calls, in seconds
    #[arg(long = "timeout-secs", default_value_t = 30)]
    pub timeout_secs: u64,
    /// Maximum distinct sample values sent as evidence per column
    #[arg(long = "sample-size", default_value_t = sample::DEFAULT_SAMPLE_SIZE)]
    pub sample_size: usize,
    /// Leading rows scanned when locating the header
    #[arg(long = "max-blank-scan", default_value_t = normalize::DEFAULT_MAX_BLANK_SCAN)]
    pub max_blank_scan: usize,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter to use for CSV output (defaults to input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Input CSV or XLSX file (use '-' for stdin, CSV only)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Input format (defaults to the file extension)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
    /// Leading rows scanned when locating the header
    #[arg(long = "max-blank-scan", default_value_t = normalize::DEFAULT_MAX_BLANK_SCAN)]
    pub max_blank_scan: usize,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter to use for CSV output (defaults to input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Input CSV or XLSX file to preview
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Input format (defaults to the file extension)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
    /// Leading rows scanned when locating the header
    #[arg(long = "max-blank-scan", default_value_t = normalize::DEFAULT_MAX_BLANK_SCAN)]
    pub max_blank_scan: usize,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum FormatArg {
    Csv,
    Xlsx,
}

impl From<FormatArg> for SourceFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => SourceFormat::Csv,
            FormatArg::Xlsx => SourceFormat::Xlsx,
        }
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
