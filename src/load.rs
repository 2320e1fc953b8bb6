//! Two-pass load of a delimited file into the engine's `csv` table.
//!
//! The sampling pass reads at most `max_sampled_lines` records to infer the
//! schema and issues one `CREATE TABLE`. The loading pass re-reads the file
//! from the top and submits, per record, any `ALTER TABLE` needed for extra
//! columns followed by the record's `INSERT`. A rejected insert is counted
//! and skipped; a rejected schema statement aborts the load.

use std::{
    collections::BTreeMap,
    path::PathBuf,
    time::{Duration, Instant},
};

use encoding_rs::{Encoding, UTF_8};
use log::{debug, error, info};
use serde::Serialize;

use crate::{
    classify::{Classifier, ColumnType},
    engine::SqlEngine,
    error::{QueryError, Result},
    io_utils,
    registry::{Schema, TypeOverride, parse_column_name},
    statement::StatementBuilder,
    tokenizer::RecordTokenizer,
};

pub const DEFAULT_MAX_SAMPLED_LINES: i64 = 50;
const PROGRESS_INTERVAL: usize = 1000;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub input: PathBuf,
    pub encoding: &'static Encoding,
    pub delimiter: char,
    pub enclosure: Option<char>,
    /// Zero or negative disables sampling.
    pub max_sampled_lines: i64,
    /// Positional types: entry `i` locks column `c{i+1}`.
    pub column_types: Vec<String>,
    /// Named types keyed by `c1`, `c2`, ...
    pub named_types: BTreeMap<String, String>,
    pub all_varchar: bool,
    /// Locks `c1` as text and infers every other column from the first row that reaches it.
    pub first_column_text: bool,
    pub skip_header: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            encoding: UTF_8,
            delimiter: ',',
            enclosure: None,
            max_sampled_lines: DEFAULT_MAX_SAMPLED_LINES,
            column_types: Vec::new(),
            named_types: BTreeMap::new(),
            all_varchar: false,
            first_column_text: false,
            skip_header: false,
        }
    }
}

impl LoadOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn tokenizer(&self) -> RecordTokenizer {
        RecordTokenizer::new(self.delimiter, self.enclosure)
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.all_varchar)
    }

    /// Checks the type configuration without touching the input.
    pub fn validate(&self) -> Result<()> {
        self.seeded_schema().map(|_| ())
    }

    /// The pre-locked schema when types were supplied, or `None` when the
    /// schema must be sampled from the input.
    pub fn seeded_schema(&self) -> Result<Option<Schema>> {
        let classifier = self.classifier();
        if !self.column_types.is_empty() && !self.named_types.is_empty() {
            return Err(QueryError::ConfigurationConflict);
        }
        if !self.column_types.is_empty() {
            let declared = self
                .column_types
                .iter()
                .map(|token| token.parse::<TypeOverride>())
                .collect::<Result<Vec<_>>>()?;
            return Ok(Some(Schema::with_locked(
                classifier,
                declared.into_iter().enumerate(),
            )));
        }
        if !self.named_types.is_empty() {
            let declared = self
                .named_types
                .iter()
                .map(|(name, token)| -> Result<(usize, TypeOverride)> {
                    Ok((parse_column_name(name)?, token.parse()?))
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(Some(Schema::with_locked(classifier, declared)));
        }
        if self.first_column_text {
            return Ok(Some(Schema::with_locked(
                classifier,
                [(0, TypeOverride::new(ColumnType::Varchar))],
            )));
        }
        Ok(None)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub table: String,
    pub schema: Schema,
    pub sampled_rows: usize,
    pub rows_inserted: usize,
    pub rows_failed: usize,
    pub date_fallbacks: usize,
    pub columns_added: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Samples (unless types were supplied), creates the table, and loads every record.
pub fn load<E>(options: &LoadOptions, engine: &mut E) -> Result<LoadReport>
where
    E: SqlEngine + ?Sized,
{
    let seeded = options.seeded_schema()?;
    let builder = StatementBuilder::default();
    let started = Instant::now();

    let (mut schema, sampled_rows) = match seeded {
        Some(schema) => {
            info!("No need to analyze: column types have been provided");
            (schema, 0)
        }
        None => sample_schema(options)?,
    };
    if schema.is_empty() {
        debug!("No columns sampled; starting from a single untyped column");
        schema.ensure_width(&[String::new()]);
    }

    let create = builder.create_table(&schema).to_string();
    info!("Creating table: {create}");
    engine
        .execute(&create)
        .map_err(|source| QueryError::Schema {
            statement: create.clone(),
            source,
        })?;

    let mut report = LoadReport {
        table: builder.table().to_string(),
        schema: Schema::default(),
        sampled_rows,
        rows_inserted: 0,
        rows_failed: 0,
        date_fallbacks: 0,
        columns_added: 0,
        elapsed: Duration::ZERO,
    };
    load_records(options, engine, &builder, &mut schema, &mut report)?;
    report.schema = schema;
    report.elapsed = started.elapsed();
    info!(
        "End of load: {} ms, {} insert(s), {} error(s), {} column(s) added",
        report.elapsed.as_millis(),
        report.rows_inserted,
        report.rows_failed,
        report.columns_added
    );
    Ok(report)
}

/// Infers a schema from the first `max_sampled_lines` records of the input.
pub fn sample_schema(options: &LoadOptions) -> Result<(Schema, usize)> {
    let mut schema = Schema::new(options.classifier());
    let limit = usize::try_from(options.max_sampled_lines).unwrap_or(0);
    if limit == 0 {
        info!("Sampling disabled; columns will be typed during the load");
        return Ok((schema, 0));
    }

    info!("Analyzing up to {limit} line(s) of {:?}", options.input);
    let records = io_utils::open_records(
        &options.input,
        options.encoding,
        options.tokenizer(),
        options.skip_header,
    )?;
    let mut sampled = 0usize;
    for item in records {
        let (_, record) = item?;
        schema.observe_record(&record);
        sampled += 1;
        if sampled >= limit {
            break;
        }
    }

    debug!(
        "Sampled {sampled} row(s): {}",
        schema
            .columns()
            .iter()
            .map(|spec| format!("{}={}/{}", spec.name(), spec.sql_type(), spec.max_observed_length))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok((schema, sampled))
}

fn load_records<E>(
    options: &LoadOptions,
    engine: &mut E,
    builder: &StatementBuilder,
    schema: &mut Schema,
    report: &mut LoadReport,
) -> Result<()>
where
    E: SqlEngine + ?Sized,
{
    info!("Loading {:?}", options.input);
    let records = io_utils::open_records(
        &options.input,
        options.encoding,
        options.tokenizer(),
        options.skip_header,
    )?;

    for item in records {
        let (line, record) = item?;
        if line % PROGRESS_INTERVAL == 0 {
            debug!("Loaded {line} line(s)");
        }

        let row = builder.build_row(schema, &record);
        report.date_fallbacks += row.date_fallbacks;

        for alter in &row.alters {
            let sql = alter.to_string();
            info!("Line {line} is wider than the table: {sql}");
            engine
                .execute(&sql)
                .map_err(|source| QueryError::Schema {
                    statement: sql.clone(),
                    source,
                })?;
            report.columns_added += 1;
        }

        let insert = row.insert.to_string();
        debug!("{insert}");
        match engine.execute(&insert) {
            Ok(()) => report.rows_inserted += 1,
            Err(err) => {
                report.rows_failed += 1;
                error!("Insert for line {line} rejected: {err}");
            }
        }
    }
    Ok(())
}
