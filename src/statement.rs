//! Structured DDL/DML statements handed to the SQL engine.
//!
//! Statements are built as column and value lists and only turned into text
//! by their `Display` implementations, which produce the exact shapes below:
//!
//! ```text
//! CREATE TABLE csv (c1 numeric, c2 varchar(200))
//! ALTER TABLE csv ADD c3 numeric
//! INSERT INTO csv (c1,c2,c3) VALUES (2,'banana',3.5)
//! ```

use std::fmt;

use itertools::Itertools;
use log::{debug, warn};

use crate::{
    classify::{ColumnType, is_numeric, reformat_date},
    error::DateReformatError,
    registry::{ColumnSpec, Schema, TABLE_NAME, column_name},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Null,
    Number(String),
    Text(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("NULL"),
            Literal::Number(raw) => f.write_str(raw),
            Literal::Text(text) => write!(f, "'{}'", text.replace('\'', "''")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub sql_type: String,
}

impl ColumnDefinition {
    pub fn from_spec(spec: &ColumnSpec) -> Self {
        Self {
            name: spec.name(),
            sql_type: spec.sql_type(),
        }
    }
}

impl fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.sql_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateTable {
        table: String,
        columns: Vec<ColumnDefinition>,
    },
    AddColumn {
        table: String,
        column: ColumnDefinition,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<Literal>,
    },
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::CreateTable { table, columns } => {
                write!(f, "CREATE TABLE {table} ({})", columns.iter().join(", "))
            }
            Statement::AddColumn { table, column } => {
                write!(f, "ALTER TABLE {table} ADD {column}")
            }
            Statement::Insert {
                table,
                columns,
                values,
            } => write!(
                f,
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.iter().join(","),
                values.iter().join(",")
            ),
        }
    }
}

/// Everything one record needs submitted, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowStatements {
    pub alters: Vec<Statement>,
    pub insert: Statement,
    pub date_fallbacks: usize,
}

impl RowStatements {
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.alters.iter().chain(std::iter::once(&self.insert))
    }
}

#[derive(Debug, Clone)]
pub struct StatementBuilder {
    table: String,
}

impl Default for StatementBuilder {
    fn default() -> Self {
        Self::new(TABLE_NAME)
    }
}

impl StatementBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn create_table(&self, schema: &Schema) -> Statement {
        Statement::CreateTable {
            table: self.table.clone(),
            columns: schema
                .columns()
                .iter()
                .map(ColumnDefinition::from_spec)
                .collect(),
        }
    }

    pub fn add_column(&self, spec: &ColumnSpec) -> Statement {
        Statement::AddColumn {
            table: self.table.clone(),
            column: ColumnDefinition::from_spec(spec),
        }
    }

    /// Widens `schema` for `record` if needed, then renders its insert.
    ///
    /// The insert names only as many columns as the record has fields.
    pub fn build_row(&self, schema: &mut Schema, record: &[String]) -> RowStatements {
        let added = schema.ensure_width(record);
        let alters = added
            .map(|position| self.add_column(&schema.columns()[position]))
            .collect::<Vec<_>>();

        let mut date_fallbacks = 0usize;
        let values = record
            .iter()
            .zip(schema.columns())
            .map(|(value, spec)| {
                if value.is_empty() {
                    return Literal::Null;
                }
                render_value(spec.effective_type(), value).unwrap_or_else(|err| {
                    warn!("{err}; keeping raw value for {}", spec.name());
                    date_fallbacks += 1;
                    Literal::Text(value.clone())
                })
            })
            .collect::<Vec<_>>();

        let insert = Statement::Insert {
            table: self.table.clone(),
            columns: (0..record.len()).map(column_name).collect(),
            values,
        };
        RowStatements {
            alters,
            insert,
            date_fallbacks,
        }
    }
}

/// Renders a non-empty value as a literal for a column of `column_type`.
pub fn render_value(column_type: ColumnType, value: &str) -> Result<Literal, DateReformatError> {
    let literal = match column_type {
        ColumnType::Timestamp => Literal::Text(value.replace('T', " ")),
        ty if ty.is_date() => Literal::Text(reformat_date(value, ty)?),
        ColumnType::Numeric if is_numeric(value) => Literal::Number(value.to_string()),
        ColumnType::Numeric => {
            debug!("Quoting non-numeric value '{value}' for a numeric column");
            Literal::Text(value.to_string())
        }
        _ => Literal::Text(value.to_string()),
    };
    Ok(literal)
}
