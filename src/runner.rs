use std::path::{Path, PathBuf};

use log::info;

use crate::{
    engine::{QueryResult, SqlEngine, SqliteEngine},
    error::{QueryError, Result},
    load::{LoadOptions, LoadReport, load},
    registry::TABLE_NAME,
};

/// Loads one input file and runs one query against it.
#[derive(Debug, Clone)]
pub struct QueryRunner {
    options: LoadOptions,
    query: String,
    database: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub report: LoadReport,
    pub result: QueryResult,
}

impl QueryOutcome {
    /// The first column of the first row as an integer, for `count(*)` style queries.
    pub fn count(&self) -> Option<i64> {
        let value = self.result.first_value()?;
        value
            .parse::<i64>()
            .ok()
            .or_else(|| value.parse::<f64>().ok().map(|f| f as i64))
    }
}

impl QueryRunner {
    pub fn new(options: LoadOptions, query: impl Into<String>) -> Self {
        Self {
            options,
            query: query.into(),
            database: None,
        }
    }

    /// Uses a caller-owned database file instead of a temporary workspace.
    pub fn with_database(mut self, path: &Path) -> Self {
        self.database = Some(path.to_path_buf());
        self
    }

    /// The query with any verbatim mention of the input path replaced by the table name.
    pub fn effective_query(&self) -> String {
        let input = self.options.input.to_string_lossy();
        if !input.is_empty() && self.query.contains(input.as_ref()) {
            self.query.replace(input.as_ref(), TABLE_NAME)
        } else {
            self.query.clone()
        }
    }

    /// Validates the configuration, opens a fresh workspace, loads, and queries.
    /// The workspace is released when this returns, whatever the outcome. A
    /// caller-owned database keeps its file but loses any earlier `csv` table.
    pub fn run(&self) -> Result<QueryOutcome> {
        self.options.validate()?;
        let mut engine = match &self.database {
            Some(path) => SqliteEngine::open_path(path).and_then(|mut engine| {
                engine.drop_table(TABLE_NAME)?;
                Ok(engine)
            }),
            None => SqliteEngine::open_workspace(),
        }
        .map_err(QueryError::EngineConnection)?;
        self.run_with(&mut engine)
    }

    pub fn run_with<E>(&self, engine: &mut E) -> Result<QueryOutcome>
    where
        E: SqlEngine + ?Sized,
    {
        let report = load(&self.options, engine)?;
        let query = self.effective_query();
        info!("Query execution: {query}");
        let result = engine
            .query(&query)
            .map_err(|source| QueryError::Query {
                query: query.clone(),
                source,
            })?;
        info!("Query returned {} row(s)", result.rows.len());
        Ok(QueryOutcome { report, result })
    }
}
