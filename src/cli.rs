use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Turn spreadsheet rows into a SQL INSERT statement",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the sheets of an .xlsx workbook
    Sheets(SheetsArgs),
    /// Show the source columns found in the header row
    Headers(HeadersArgs),
    /// Preview the first few data rows in a formatted table
    Preview(PreviewArgs),
    /// Write a YAML mapping file pre-filled from the header row
    Template(TemplateArgs),
    /// Generate an INSERT statement from mapped columns
    Generate(GenerateArgs),
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Input .xlsx, .csv or .tsv file ('-' reads CSV from stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Sheet to read from a workbook (defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,
    /// Delimiter for CSV input (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of CSV input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct SheetsArgs {
    /// Workbook to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct HeadersArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Number of data rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct TemplateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Comma-separated target column names
    #[arg(short = 'C', long = "columns")]
    pub columns: String,
    /// Table name to record in the template
    #[arg(short = 't', long = "table")]
    pub table: Option<String>,
    /// Destination YAML file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Destination table name (overrides the mapping file)
    #[arg(short = 't', long = "table")]
    pub table: Option<String>,
    /// Comma-separated target column names (overrides the mapping file)
    #[arg(short = 'C', long = "columns")]
    pub columns: Option<String>,
    /// Column mapping `SOURCE=TARGET`; `SOURCE=` excludes the column
    #[arg(short = 'm', long = "map", action = clap::ArgAction::Append)]
    pub maps: Vec<String>,
    /// YAML mapping file written by the `template` command
    #[arg(long = "mapping")]
    pub mapping: Option<PathBuf>,
    /// Map remaining source columns to targets with the same snake_case name
    #[arg(long = "auto-map")]
    pub auto_map: bool,
    /// Fail unless every source column is mapped or explicitly excluded
    #[arg(long = "require-complete")]
    pub require_complete: bool,
    /// Allow several source columns to map to the same target
    #[arg(long = "allow-duplicate-targets")]
    pub allow_duplicate_targets: bool,
    /// Put each row tuple on its own line
    #[arg(long)]
    pub multiline: bool,
    /// Output SQL file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
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
