pub mod classify;
pub mod cli;
pub mod engine;
pub mod error;
pub mod io_utils;
pub mod load;
pub mod registry;
pub mod runner;
pub mod statement;
pub mod table;
pub mod tokenizer;

use std::{env, io, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{cli::Cli, load::LoadOptions, runner::QueryRunner};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_query", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    execute(&cli)
}

fn execute(cli: &Cli) -> Result<()> {
    let options = load_options(cli)?;
    info!(
        "Querying '{}' with delimiter '{}'",
        cli.input.display(),
        printable_delimiter(cli.delimiter)
    );
    let mut runner = QueryRunner::new(options, cli.query.clone());
    if let Some(path) = &cli.database {
        runner = runner.with_database(path);
    }
    let outcome = runner
        .run()
        .with_context(|| format!("Querying {:?}", cli.input))?;

    if cli.print_schema {
        serde_json::to_writer_pretty(io::stderr(), &outcome.report)
            .context("Writing schema JSON")?;
        eprintln!();
    }

    if cli.count {
        match outcome.count() {
            Some(count) => println!("COUNT={count}"),
            None => println!("COUNT="),
        }
    } else if cli.table {
        table::print_result(&outcome.result);
    } else {
        let delimiter = cli.output_delimiter.unwrap_or(cli.delimiter);
        io_utils::write_delimited(io::stdout().lock(), &outcome.result, delimiter, false)?;
    }

    if outcome.report.rows_failed > 0 {
        info!(
            "{} of {} row(s) could not be loaded",
            outcome.report.rows_failed,
            outcome.report.rows_failed + outcome.report.rows_inserted
        );
    }
    Ok(())
}

fn load_options(cli: &Cli) -> Result<LoadOptions> {
    let encoding = io_utils::resolve_encoding(cli.input_encoding.as_deref())?;
    Ok(LoadOptions {
        input: cli.input.clone(),
        encoding,
        delimiter: cli.delimiter as char,
        enclosure: cli.enclosure,
        max_sampled_lines: cli.max_lines,
        column_types: cli
            .types
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        named_types: cli.named_types.iter().cloned().collect(),
        all_varchar: cli.all_varchar,
        first_column_text: cli.first_column_text,
        skip_header: cli.skip_header,
    })
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
