//! Value classification for type inference.
//!
//! A field is tested against an ordered table of detectors and the first
//! match decides its [`ColumnType`]. Numbers win over dates, and every bare
//! date shape is tried before the date-time shape. Conflicting evidence for
//! one column is resolved with [`ColumnType::join`], which widens to
//! [`ColumnType::Varchar`] and never narrows back.

use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{DateReformatError, QueryError};

pub const SQL_DATE_FORMAT: &str = "%Y-%m-%d";
pub const SIMPLE_DATE_FORMAT: &str = "%d/%m/%Y";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    IsoDate,
    BasicDate,
    SimpleDate,
    SqlDate,
    Timestamp,
    Varchar,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::IsoDate => "isodate",
            ColumnType::BasicDate => "basicdate",
            ColumnType::SimpleDate => "simpledate",
            ColumnType::SqlDate => "date",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Varchar => "varchar",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &[
            "numeric",
            "date",
            "isodate",
            "basicdate",
            "simpledate",
            "timestamp",
            "varchar",
            "varchar(N)",
        ]
    }

    pub fn is_date(&self) -> bool {
        matches!(
            self,
            ColumnType::IsoDate | ColumnType::BasicDate | ColumnType::SimpleDate | ColumnType::SqlDate
        )
    }

    /// Least upper bound of two observations: equal types stay, anything else is text.
    pub fn join(self, other: ColumnType) -> ColumnType {
        if self == other {
            self
        } else {
            ColumnType::Varchar
        }
    }

    /// Parses `value` with the source pattern of a date-shaped type.
    pub fn parse_date(&self, value: &str) -> Option<NaiveDate> {
        match self {
            ColumnType::IsoDate | ColumnType::SqlDate => {
                NaiveDate::parse_from_str(value, SQL_DATE_FORMAT).ok()
            }
            ColumnType::BasicDate => parse_basic_date(value),
            ColumnType::SimpleDate => NaiveDate::parse_from_str(value, SIMPLE_DATE_FORMAT).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "numeric" | "number" | "int" | "integer" | "decimal" | "float" | "double" | "real" => {
                Ok(ColumnType::Numeric)
            }
            "date" => Ok(ColumnType::SqlDate),
            "isodate" => Ok(ColumnType::IsoDate),
            "basicdate" => Ok(ColumnType::BasicDate),
            "simpledate" => Ok(ColumnType::SimpleDate),
            "timestamp" | "datetime" => Ok(ColumnType::Timestamp),
            "varchar" | "text" | "string" | "char" => Ok(ColumnType::Varchar),
            _ => Err(QueryError::InvalidColumnType(value.to_string())),
        }
    }
}

type Detector = fn(&str) -> bool;

const DETECTORS: &[(ColumnType, Detector)] = &[
    (ColumnType::Numeric, is_numeric),
    (ColumnType::IsoDate, is_iso_date),
    (ColumnType::BasicDate, is_basic_date),
    (ColumnType::SimpleDate, is_simple_date),
    (ColumnType::SqlDate, is_sql_date),
    (ColumnType::Timestamp, is_timestamp),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classifier {
    force_varchar: bool,
}

impl Classifier {
    pub fn new(force_varchar: bool) -> Self {
        Self { force_varchar }
    }

    /// Returns `None` for an empty field, which carries no type evidence.
    pub fn classify(&self, value: &str) -> Option<ColumnType> {
        if self.force_varchar {
            return Some(ColumnType::Varchar);
        }
        if value.is_empty() {
            return None;
        }
        let detected = DETECTORS
            .iter()
            .find(|(_, detects)| detects(value))
            .map(|(ty, _)| *ty)
            .unwrap_or(ColumnType::Varchar);
        Some(detected)
    }
}

/// Rewrites a date-shaped value into the `yyyy-mm-dd` storage pattern.
pub fn reformat_date(value: &str, ty: ColumnType) -> Result<String, DateReformatError> {
    ty.parse_date(value)
        .map(|date| date.format(SQL_DATE_FORMAT).to_string())
        .ok_or_else(|| DateReformatError {
            value: value.to_string(),
            pattern: ty.as_str(),
        })
}

/// Plain decimal notation with an optional sign; no exponent, no hex, no trailing dot.
pub fn is_numeric(value: &str) -> bool {
    let digits = value
        .strip_prefix('-')
        .or_else(|| value.strip_prefix('+'))
        .unwrap_or(value);
    if digits.is_empty() || digits.ends_with('.') {
        return false;
    }
    let mut seen_dot = false;
    for ch in digits.chars() {
        match ch {
            '0'..='9' => {}
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    true
}

fn is_iso_date(value: &str) -> bool {
    ColumnType::IsoDate.parse_date(value).is_some()
}

fn is_basic_date(value: &str) -> bool {
    parse_basic_date(value).is_some()
}

fn is_simple_date(value: &str) -> bool {
    ColumnType::SimpleDate.parse_date(value).is_some()
}

fn is_sql_date(value: &str) -> bool {
    ColumnType::SqlDate.parse_date(value).is_some()
}

fn is_timestamp(value: &str) -> bool {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).is_ok()
}

fn parse_basic_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = value[0..4].parse().ok()?;
    let month = value[4..6].parse().ok()?;
    let day = value[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn classifies_numbers_before_dates() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("42"), Some(ColumnType::Numeric));
        assert_eq!(classifier.classify("-3.5"), Some(ColumnType::Numeric));
        assert_eq!(classifier.classify("+.5"), Some(ColumnType::Numeric));
        // eight digits are a number long before they are a basic date
        assert_eq!(classifier.classify("20160706"), Some(ColumnType::Numeric));
    }

    #[test]
    fn rejects_non_plain_numbers() {
        for value in ["1.", "1e5", "0x1F", "1.2.3", "-", "+", "1,5", " 1"] {
            assert!(!is_numeric(value), "{value} should not be numeric");
        }
    }

    #[test]
    fn classifies_date_shapes_in_order() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("2016-07-06"), Some(ColumnType::IsoDate));
        assert_eq!(classifier.classify("06/07/2016"), Some(ColumnType::SimpleDate));
        assert_eq!(
            classifier.classify("2016-07-06T10:11:12"),
            Some(ColumnType::Timestamp)
        );
        assert_eq!(classifier.classify("2016-13-06"), Some(ColumnType::Varchar));
        assert_eq!(
            classifier.classify("2016-07-06T10:11:12Z"),
            Some(ColumnType::Varchar)
        );
    }

    #[test]
    fn empty_value_has_no_type_unless_forced() {
        assert_eq!(Classifier::default().classify(""), None);
        assert_eq!(Classifier::new(true).classify(""), Some(ColumnType::Varchar));
        assert_eq!(
            Classifier::new(true).classify("2020-01-01"),
            Some(ColumnType::Varchar)
        );
    }

    #[test]
    fn reformats_each_date_shape_to_storage_pattern() {
        assert_eq!(
            reformat_date("06/07/2016", ColumnType::SimpleDate).unwrap(),
            "2016-07-06"
        );
        assert_eq!(
            reformat_date("20160706", ColumnType::BasicDate).unwrap(),
            "2016-07-06"
        );
        assert_eq!(
            reformat_date("2016-07-06", ColumnType::IsoDate).unwrap(),
            "2016-07-06"
        );
        let err = reformat_date("tomorrow", ColumnType::SimpleDate).unwrap_err();
        assert_eq!(err.value, "tomorrow");
    }

    #[test]
    fn parses_user_type_names() {
        assert_eq!("INTEGER".parse::<ColumnType>().unwrap(), ColumnType::Numeric);
        assert_eq!("date".parse::<ColumnType>().unwrap(), ColumnType::SqlDate);
        assert_eq!(" text ".parse::<ColumnType>().unwrap(), ColumnType::Varchar);
        assert!(matches!(
            "blob".parse::<ColumnType>(),
            Err(QueryError::InvalidColumnType(token)) if token == "blob"
        ));
        let message = "blob".parse::<ColumnType>().unwrap_err().to_string();
        assert!(message.contains("basicdate"), "{message}");
        assert!(message.contains("varchar(N)"), "{message}");
    }

    #[test]
    fn join_widens_conflicts_to_varchar() {
        assert_eq!(
            ColumnType::Numeric.join(ColumnType::Numeric),
            ColumnType::Numeric
        );
        assert_eq!(
            ColumnType::Numeric.join(ColumnType::IsoDate),
            ColumnType::Varchar
        );
        assert_eq!(
            ColumnType::Varchar.join(ColumnType::Numeric),
            ColumnType::Varchar
        );
    }

    proptest! {
        #[test]
        fn classify_is_pure(value in ".{0,16}", force in any::<bool>()) {
            let classifier = Classifier::new(force);
            prop_assert_eq!(classifier.classify(&value), classifier.classify(&value));
        }

        #[test]
        fn signed_integers_are_numeric(number in any::<i64>()) {
            prop_assert_eq!(
                Classifier::default().classify(&number.to_string()),
                Some(ColumnType::Numeric)
            );
        }
    }
}
