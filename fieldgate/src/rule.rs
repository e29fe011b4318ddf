//! Conditional rules and their evaluation against record snapshots.
//!
//! Rules are pure predicates over one named field of a record. Evaluation is
//! total: a missing or malformed value never raises, it makes the rule false
//! (except for the existence operators, which are about absence).

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::clock::Clock;
use crate::types::{Record, Required, ValidationRule};

/// A predicate over a named field of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "operator", rename_all = "snake_case")]
pub enum ConditionalRule {
    /// Field value equals `value` (dates compared by calendar value)
    Equals { field: String, value: Value },
    /// Field value is present and differs from `value`
    NotEquals { field: String, value: Value },
    /// Field value is one of `values`
    Contains { field: String, values: Vec<Value> },
    /// Field value is present and none of `values`
    NotContains { field: String, values: Vec<Value> },
    /// Field is present and non-empty
    Exists { field: String },
    /// Field is absent or empty
    NotExists { field: String },
    /// Age in whole years derived from a date field is below `years`
    AgeLessThan { field: String, years: u32 },
}

impl ConditionalRule {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn not_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::NotEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn contains<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Contains {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_contains<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::NotContains {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists {
            field: field.into(),
        }
    }

    pub fn not_exists(field: impl Into<String>) -> Self {
        Self::NotExists {
            field: field.into(),
        }
    }

    pub fn age_less_than(field: impl Into<String>, years: u32) -> Self {
        Self::AgeLessThan {
            field: field.into(),
            years,
        }
    }

    /// The record field this rule reads.
    pub fn field(&self) -> &str {
        match self {
            Self::Equals { field, .. }
            | Self::NotEquals { field, .. }
            | Self::Contains { field, .. }
            | Self::NotContains { field, .. }
            | Self::Exists { field }
            | Self::NotExists { field }
            | Self::AgeLessThan { field, .. } => field,
        }
    }

    /// Operator name as written in configuration.
    pub fn operator(&self) -> &'static str {
        match self {
            Self::Equals { .. } => "equals",
            Self::NotEquals { .. } => "not_equals",
            Self::Contains { .. } => "contains",
            Self::NotContains { .. } => "not_contains",
            Self::Exists { .. } => "exists",
            Self::NotExists { .. } => "not_exists",
            Self::AgeLessThan { .. } => "age_less_than",
        }
    }
}

/// Evaluates rules against records as of a fixed date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleEvaluator {
    today: NaiveDate,
}

impl RuleEvaluator {
    /// Create an evaluator for the given date.
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Create an evaluator dated from a clock.
    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self::new(clock.today())
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Evaluate a single rule.
    pub fn evaluate(&self, rule: &ConditionalRule, record: &Record) -> bool {
        match rule {
            ConditionalRule::Exists { field } => record.is_present(field),
            ConditionalRule::NotExists { field } => !record.is_present(field),
            ConditionalRule::Equals { field, value } => record
                .get(field)
                .is_some_and(|actual| values_equal(actual, value)),
            ConditionalRule::NotEquals { field, value } => record
                .get(field)
                .is_some_and(|actual| !values_equal(actual, value)),
            ConditionalRule::Contains { field, values } => record
                .get(field)
                .is_some_and(|actual| is_member(actual, values)),
            ConditionalRule::NotContains { field, values } => record
                .get(field)
                .is_some_and(|actual| !is_member(actual, values)),
            ConditionalRule::AgeLessThan { field, years } => record
                .get(field)
                .and_then(parse_date)
                .is_some_and(|birth| age_on(birth, self.today) < i64::from(*years)),
        }
    }

    /// Logical OR across a rule list. An empty list always holds.
    pub fn any(&self, rules: &[ConditionalRule], record: &Record) -> bool {
        rules.is_empty() || rules.iter().any(|rule| self.evaluate(rule, record))
    }

    /// Whether a field is required for this record.
    pub fn is_required(&self, required: &Required, record: &Record) -> bool {
        match required {
            Required::Always(flag) => *flag,
            Required::When(rule) => self.evaluate(rule, record),
        }
    }

    /// Validation rules that apply to this record, in declared order.
    ///
    /// Unconditioned rules always apply; conditioned rules apply only when
    /// their own condition holds.
    pub fn active_validations<'a>(
        &self,
        rules: &'a [ValidationRule],
        record: &Record,
    ) -> Vec<&'a ValidationRule> {
        rules
            .iter()
            .filter(|rule| {
                rule.when
                    .as_ref()
                    .map_or(true, |condition| self.evaluate(condition, record))
            })
            .collect()
    }
}

/// Age in whole years on `today`.
///
/// A birthday not yet reached this year does not count. Negative for dates
/// in the future.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i64 {
    let mut years = i64::from(today.year()) - i64::from(birth.year());
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years
}

/// Parse a date-like JSON value.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and naive `YYYY-MM-DDTHH:MM:SS`
/// timestamps. Timestamps are reduced to their calendar date.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    value.as_str().and_then(parse_date_str)
}

fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|timestamp| timestamp.date())
}

/// Type-aware equality between a record value and a configured value.
///
/// Numbers compare numerically (also against numeric strings), and strings
/// that both parse as dates compare by calendar value.
pub fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        (Value::String(a), Value::String(b)) => {
            a == b
                || matches!(
                    (parse_date_str(a), parse_date_str(b)),
                    (Some(da), Some(db)) if da == db
                )
        }
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            match (s.trim().parse::<f64>(), n.as_f64()) {
                (Ok(parsed), Some(number)) => parsed == number,
                _ => false,
            }
        }
        _ => actual == expected,
    }
}

/// Membership test; an array value matches if any element is a member.
fn is_member(actual: &Value, values: &[Value]) -> bool {
    match actual {
        Value::Array(items) => items
            .iter()
            .any(|item| values.iter().any(|v| values_equal(item, v))),
        _ => values.iter().any(|v| values_equal(actual, v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn evaluator() -> RuleEvaluator {
        RuleEvaluator::new(date(2026, 10, 19))
    }

    #[test]
    fn test_equals_is_type_aware() {
        let eval = evaluator();
        let record = Record::new()
            .with("joined", "2020-03-01T10:00:00Z")
            .with("count", 3)
            .with("status", "active");

        assert!(eval.evaluate(&ConditionalRule::equals("joined", "2020-03-01"), &record));
        assert!(eval.evaluate(&ConditionalRule::equals("count", 3.0), &record));
        assert!(eval.evaluate(&ConditionalRule::equals("count", "3"), &record));
        assert!(eval.evaluate(&ConditionalRule::equals("status", "active"), &record));
        assert!(!eval.evaluate(&ConditionalRule::equals("status", "pending"), &record));
        assert!(eval.evaluate(&ConditionalRule::not_equals("status", "pending"), &record));
    }

    #[test]
    fn test_absent_field_is_false_except_existence() {
        let eval = evaluator();
        let record = Record::new();

        assert!(!eval.evaluate(&ConditionalRule::equals("status", "x"), &record));
        assert!(!eval.evaluate(&ConditionalRule::not_equals("status", "x"), &record));
        assert!(!eval.evaluate(&ConditionalRule::contains("status", ["x"]), &record));
        assert!(!eval.evaluate(&ConditionalRule::not_contains("status", ["x"]), &record));
        assert!(!eval.evaluate(&ConditionalRule::age_less_than("birth_date", 18), &record));
        assert!(!eval.evaluate(&ConditionalRule::exists("member_id"), &record));
        assert!(eval.evaluate(&ConditionalRule::not_exists("member_id"), &record));
    }

    #[test]
    fn test_contains() {
        let eval = evaluator();
        let record = Record::new()
            .with("membership_type", "family")
            .with("tags", json!(["a", "b"]));

        let rule = ConditionalRule::contains("membership_type", ["family", "youth"]);
        assert!(eval.evaluate(&rule, &record));

        let rule = ConditionalRule::not_contains("membership_type", ["family", "youth"]);
        assert!(!eval.evaluate(&rule, &record));

        assert!(eval.evaluate(&ConditionalRule::contains("tags", ["b"]), &record));
        assert!(!eval.evaluate(&ConditionalRule::contains("tags", ["c"]), &record));
    }

    #[test]
    fn test_age_boundary() {
        let eval = evaluator();
        let rule = ConditionalRule::age_less_than("birth_date", 18);

        // Eighteenth birthday is tomorrow
        let record = Record::new().with("birth_date", "2008-10-20");
        assert!(eval.evaluate(&rule, &record));

        // Eighteenth birthday is today
        let record = Record::new().with("birth_date", "2008-10-19");
        assert!(!eval.evaluate(&rule, &record));

        let record = Record::new().with("birth_date", "not a date");
        assert!(!eval.evaluate(&rule, &record));
    }

    #[test]
    fn test_age_on_leap_day() {
        assert_eq!(age_on(date(2008, 2, 29), date(2026, 2, 28)), 17);
        assert_eq!(age_on(date(2008, 2, 29), date(2026, 3, 1)), 18);
        assert_eq!(age_on(date(2030, 1, 1), date(2026, 10, 19)), -4);
    }

    #[test]
    fn test_any_is_or() {
        let eval = evaluator();
        let record = Record::new().with("status", "active");
        let rules = vec![
            ConditionalRule::equals("status", "suspended"),
            ConditionalRule::equals("status", "active"),
        ];
        assert!(eval.any(&rules, &record));
        assert!(eval.any(&[], &record));
        assert!(!eval.any(&rules[..1], &record));
    }

    #[test]
    fn test_active_validations() {
        use crate::types::ValidationCheck;

        let eval = evaluator();
        let rules = vec![
            ValidationRule::new(ValidationCheck::MaxLength { value: 10 }),
            ValidationRule::new(ValidationCheck::Required)
                .when(ConditionalRule::age_less_than("birth_date", 18)),
        ];

        let adult = Record::new().with("birth_date", "1980-01-01");
        assert_eq!(eval.active_validations(&rules, &adult).len(), 1);

        let minor = Record::new().with("birth_date", "2015-01-01");
        assert_eq!(eval.active_validations(&rules, &minor).len(), 2);
    }

    #[test]
    fn test_rule_yaml() {
        let yaml = r#"
operator: contains
field: membership_type
values: [family, youth]
"#;
        let rule: ConditionalRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.field(), "membership_type");
        assert_eq!(rule.operator(), "contains");

        let rule: ConditionalRule =
            serde_json::from_value(json!({"operator": "age_less_than", "field": "birth_date", "years": 18}))
                .unwrap();
        assert_eq!(rule, ConditionalRule::age_less_than("birth_date", 18));
    }
}
