use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::oracle::{
    DEFAULT_ENDPOINT, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
    DEFAULT_TIMEOUT_SECS,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Find and replace sensitive values in CSV and Excel files",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replace the data described in plain language and write the result
    Redact(RedactArgs),
    /// Show the first rows of a file together with its text columns
    Preview(PreviewArgs),
    /// List columns with their text classification and sample values
    Columns(ColumnsArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input CSV or Excel file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// File type (csv, xlsx, xls, excel); inferred from the extension when omitted
    #[arg(long)]
    pub format: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of a CSV input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Worksheet name or 0-based index for Excel inputs (defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,
}

#[derive(Debug, Args)]
pub struct RedactArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// What to find, e.g. "emails and phone numbers"
    #[arg(short = 'd', long = "describe")]
    pub description: String,
    /// Value written in place of every match
    #[arg(short = 'r', long = "replacement")]
    pub replacement: String,
    /// Restrict the run to this column
    #[arg(short = 'c', long = "column")]
    pub column: Option<String>,
    /// API key for the pattern oracle (required unless --offline)
    #[arg(long = "api-key", conflicts_with = "offline")]
    pub api_key: Option<String>,
    /// Skip the pattern oracle and use the built-in keyword rules only
    #[arg(long)]
    pub offline: bool,
    /// Base URL of the generative text endpoint
    #[arg(long = "oracle-url", env = "CSV_REDACT_ORACLE_URL", default_value = DEFAULT_ENDPOINT)]
    pub oracle_url: String,
    /// Model name passed to the endpoint
    #[arg(long, env = "CSV_REDACT_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,
    /// Seconds to wait for the oracle before falling back
    #[arg(long = "timeout", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
    /// Token budget for the oracle reply
    #[arg(long = "max-output-tokens", default_value_t = DEFAULT_MAX_OUTPUT_TOKENS)]
    pub max_output_tokens: u32,
    /// Sampling temperature for the oracle
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter to use for CSV output (defaults to ',')
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Emit the full processing outcome as JSON instead of CSV
    #[arg(long, conflicts_with = "table")]
    pub json: bool,
    /// Print replacement statistics and processed rows as a table
    #[arg(long)]
    pub table: bool,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Emit the preview as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    #[command(flatten)]
    pub input: InputArgs,
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
