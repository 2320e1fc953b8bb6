use std::path::PathBuf;

use clap::Parser;

use crate::load::DEFAULT_MAX_SAMPLED_LINES;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Run an SQL query against a delimited text file",
    long_about = "Infers column types from a sample of the input, loads it into a table named \
                  `csv` (columns c1, c2, ...) and runs the query against it."
)]
pub struct Cli {
    /// Input file to load
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// SQL query to run against the `csv` table
    #[arg(short = 'q', long = "query")]
    pub query: String,
    /// Field delimiter (supports ',', 'tab', ';', '|')
    #[arg(short = 'd', long, value_parser = parse_delimiter, default_value = ",")]
    pub delimiter: u8,
    /// Enclosure (quote) character wrapping fields that contain the delimiter
    #[arg(short = 'e', long = "enclosure", value_parser = parse_enclosure)]
    pub enclosure: Option<char>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(short = 'n', long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Number of lines sampled to infer column types (0 or less disables sampling)
    #[arg(
        short = 'l',
        long = "max-lines",
        default_value_t = DEFAULT_MAX_SAMPLED_LINES,
        allow_negative_numbers = true
    )]
    pub max_lines: i64,
    /// Comma-separated types for every column, in order (e.g. `numeric,varchar(20),date`)
    #[arg(short = 'T', long = "types", value_delimiter = ',')]
    pub types: Vec<String>,
    /// Type for one column as `cN=TYPE`; repeatable, cannot be combined with --types
    #[arg(short = 't', long = "type", value_parser = parse_named_type, action = clap::ArgAction::Append)]
    pub named_types: Vec<(String, String)>,
    /// Treat every column as text
    #[arg(short = 'c', long = "all-varchar")]
    pub all_varchar: bool,
    /// Skip the first record (header row)
    #[arg(short = 's', long = "skip-header")]
    pub skip_header: bool,
    /// Lock the first column as text and type the others as the load reaches them
    #[arg(long = "first-column-text")]
    pub first_column_text: bool,
    /// Print the first value of the result as `COUNT=<n>`
    #[arg(long, conflicts_with = "table")]
    pub count: bool,
    /// Render the result as an aligned table
    #[arg(long)]
    pub table: bool,
    /// Delimiter for result rows (defaults to the input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Print the load report (final schema and counters) as JSON on stderr
    #[arg(long = "schema")]
    pub print_schema: bool,
    /// Load into this SQLite file instead of a temporary workspace
    #[arg(long = "database")]
    pub database: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
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

pub fn parse_enclosure(value: &str) -> Result<char, String> {
    let mut chars = value.chars();
    let first = chars
        .next()
        .ok_or_else(|| "Enclosure cannot be empty".to_string())?;
    if chars.next().is_some() {
        return Err("Enclosure must be a single character".to_string());
    }
    Ok(first)
}

pub fn parse_named_type(value: &str) -> Result<(String, String), String> {
    let (name, ty) = value
        .split_once('=')
        .ok_or_else(|| format!("Expected cN=TYPE, got '{value}'"))?;
    let (name, ty) = (name.trim(), ty.trim());
    if name.is_empty() || ty.is_empty() {
        return Err(format!("Expected cN=TYPE, got '{value}'"));
    }
    Ok((name.to_string(), ty.to_string()))
}
