//! Computed (derived) fields.
//!
//! A computed field is never user input: its value is derived from other
//! fields of the record by a named pure function. Malformed or missing
//! sources yield `None` rather than an error.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::rule::{age_on, parse_date};
use crate::types::Record;

fn default_separator() -> String {
    " ".to_string()
}

/// A named derivation over one or more source fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum Computation {
    /// Whole years since a date, honoring the birthday boundary
    AgeFromDate { source: String },
    /// Calendar year of a date
    YearOf { source: String },
    /// Present source values joined by a separator
    Concat {
        sources: Vec<String>,
        #[serde(default = "default_separator")]
        separator: String,
    },
    /// Calendar years elapsed since a date (current year minus its year)
    YearsSince { source: String },
    /// A numeric source incremented by one
    NextSequence { source: String },
}

impl Computation {
    pub fn concat<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Concat {
            sources: sources.into_iter().map(Into::into).collect(),
            separator: default_separator(),
        }
    }

    /// Function name as written in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AgeFromDate { .. } => "age_from_date",
            Self::YearOf { .. } => "year_of",
            Self::Concat { .. } => "concat",
            Self::YearsSince { .. } => "years_since",
            Self::NextSequence { .. } => "next_sequence",
        }
    }

    /// Registry keys this computation reads.
    pub fn sources(&self) -> Vec<&str> {
        match self {
            Self::AgeFromDate { source }
            | Self::YearOf { source }
            | Self::YearsSince { source }
            | Self::NextSequence { source } => vec![source.as_str()],
            Self::Concat { sources, .. } => sources.iter().map(String::as_str).collect(),
        }
    }

    /// True if every source must be date-typed.
    pub fn needs_date_source(&self) -> bool {
        matches!(
            self,
            Self::AgeFromDate { .. } | Self::YearOf { .. } | Self::YearsSince { .. }
        )
    }

    /// Derive the value for `record` as of `today`.
    pub fn compute(&self, record: &Record, today: NaiveDate) -> Option<Value> {
        match self {
            Self::AgeFromDate { source } => {
                let birth = date_source(record, source)?;
                let age = age_on(birth, today);
                (age >= 0).then(|| Value::from(age))
            }
            Self::YearOf { source } => {
                let date = date_source(record, source)?;
                Some(Value::from(date.year()))
            }
            Self::YearsSince { source } => {
                let date = date_source(record, source)?;
                let years = i64::from(today.year()) - i64::from(date.year());
                (years >= 0).then(|| Value::from(years))
            }
            Self::NextSequence { source } => {
                let raw = record.get(source)?;
                let current = match raw {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                if current.is_none() {
                    debug!(source = %source, value = %raw, "Sequence source is not an integer");
                }
                current?.checked_add(1).map(Value::from)
            }
            Self::Concat { sources, separator } => {
                let parts: Vec<String> = sources
                    .iter()
                    .filter_map(|key| match record.get(key)? {
                        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect();
                (!parts.is_empty()).then(|| Value::from(parts.join(separator)))
            }
        }
    }
}

/// A parsed date source. Unparsable values are logged and treated as absent.
fn date_source(record: &Record, source: &str) -> Option<NaiveDate> {
    let raw = record.get(source)?;
    let date = parse_date(raw);
    if date.is_none() {
        debug!(source = %source, value = %raw, "Date source is not a date");
    }
    date
}
