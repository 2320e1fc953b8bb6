//! Per-column type and width bookkeeping for the generated table.
//!
//! Columns are positional and named `c1`, `c2`, ... The registry only ever
//! grows: specs are appended, never removed or renumbered, and a locked spec
//! keeps its user-supplied type no matter what the data says.

use std::{ops::Range, str::FromStr};

use serde::Serialize;

use crate::{
    classify::{Classifier, ColumnType},
    error::QueryError,
};

pub const TABLE_NAME: &str = "csv";

const VARCHAR_SIZE_RATIO: usize = 4;
const MIN_VARCHAR_WIDTH: usize = 50;
/// SQLite's default `SQLITE_MAX_COLUMN`.
pub const MAX_COLUMNS: usize = 2000;

pub fn column_name(position: usize) -> String {
    format!("c{}", position + 1)
}

/// Maps a synthetic column name (`c1`, `C12`) back to its 0-based position.
pub fn parse_column_name(name: &str) -> Result<usize, QueryError> {
    let trimmed = name.trim();
    trimmed
        .strip_prefix(['c', 'C'])
        .and_then(|digits| digits.parse::<usize>().ok())
        .filter(|index| (1..=MAX_COLUMNS).contains(index))
        .map(|index| index - 1)
        .ok_or_else(|| QueryError::InvalidColumnName(name.to_string()))
}

/// A user-supplied column type, optionally with an explicit text width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeOverride {
    pub column_type: ColumnType,
    pub width: Option<usize>,
}

impl TypeOverride {
    pub fn new(column_type: ColumnType) -> Self {
        Self {
            column_type,
            width: None,
        }
    }
}

impl FromStr for TypeOverride {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let lowered = trimmed.to_ascii_lowercase();
        if let Some(inner) = lowered
            .strip_prefix("varchar(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let width = inner
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|w| *w > 0)
                .ok_or_else(|| QueryError::InvalidColumnType(value.to_string()))?;
            return Ok(Self {
                column_type: ColumnType::Varchar,
                width: Some(width),
            });
        }
        trimmed.parse::<ColumnType>().map(Self::new)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub position: usize,
    pub column_type: Option<ColumnType>,
    pub max_observed_length: usize,
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_width: Option<usize>,
}

impl ColumnSpec {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            column_type: None,
            max_observed_length: 0,
            locked: false,
            declared_width: None,
        }
    }

    pub fn locked(position: usize, declared: TypeOverride) -> Self {
        Self {
            position,
            column_type: Some(declared.column_type),
            max_observed_length: 0,
            locked: true,
            declared_width: declared.width,
        }
    }

    pub fn name(&self) -> String {
        column_name(self.position)
    }

    /// Columns that never saw a non-empty value are stored as text.
    pub fn effective_type(&self) -> ColumnType {
        self.column_type.unwrap_or(ColumnType::Varchar)
    }

    pub fn sql_type(&self) -> String {
        match self.effective_type() {
            ColumnType::Varchar => {
                let width = self.declared_width.unwrap_or_else(|| {
                    self.max_observed_length.max(MIN_VARCHAR_WIDTH) * VARCHAR_SIZE_RATIO
                });
                format!("varchar({width})")
            }
            ty if ty.is_date() => "date".to_string(),
            ColumnType::Timestamp => "timestamp".to_string(),
            _ => "numeric".to_string(),
        }
    }

    fn record_length(&mut self, value: &str) {
        self.max_observed_length = self.max_observed_length.max(value.chars().count());
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
    #[serde(skip)]
    classifier: Classifier,
}

impl Schema {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            columns: Vec::new(),
            classifier,
        }
    }

    /// Pre-seeds locked columns. Gaps between declared positions are filled
    /// with unlocked, untyped columns so positions stay contiguous.
    pub fn with_locked<I>(classifier: Classifier, declared: I) -> Self
    where
        I: IntoIterator<Item = (usize, TypeOverride)>,
    {
        let mut schema = Self::new(classifier);
        for (position, declaration) in declared {
            schema.grow_to(position + 1);
            schema.columns[position] = ColumnSpec::locked(position, declaration);
        }
        schema
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Feeds one sampled value into the column at `position`.
    pub fn observe(&mut self, position: usize, value: &str) {
        self.grow_to(position + 1);
        let observed = self.classifier.classify(value);
        let spec = &mut self.columns[position];
        spec.record_length(value);
        if spec.locked {
            return;
        }
        if let Some(ty) = observed {
            spec.column_type = Some(match spec.column_type {
                Some(current) => current.join(ty),
                None => ty,
            });
        }
    }

    pub fn observe_record(&mut self, record: &[String]) {
        for (position, value) in record.iter().enumerate() {
            self.observe(position, value);
        }
    }

    /// Appends a column for every field of `record` beyond the current width,
    /// typed from the field that triggered it. Returns the new positions.
    pub fn ensure_width(&mut self, record: &[String]) -> Range<usize> {
        let start = self.columns.len();
        for (position, value) in record.iter().enumerate().skip(start) {
            let mut spec = ColumnSpec::new(position);
            spec.column_type = self.classifier.classify(value);
            spec.record_length(value);
            self.columns.push(spec);
        }
        start..self.columns.len()
    }

    fn grow_to(&mut self, width: usize) {
        while self.columns.len() < width {
            let position = self.columns.len();
            self.columns.push(ColumnSpec::new(position));
        }
    }
}
