//! Submission validation against a resolved form.
//!
//! Only fields the actor could actually fill in are checked: hidden,
//! read-only and computed fields never produce issues.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::compose::{ResolvedField, ResolvedForm};
use crate::types::{FieldDefinition, Record, ValidationCheck};

/// Email pattern
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});

/// One failed check on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ValidationIssue {
    pub field: String,
    /// Name of the failed check, e.g. `required` or `max_length`
    pub check: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &ResolvedField, check: &str, message: String) -> Self {
        Self {
            field: field.key.clone(),
            check: check.to_string(),
            message,
        }
    }
}

/// Checks submitted values, with every configured pattern compiled once.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    /// Compiled patterns keyed by their source
    patterns: HashMap<String, Regex>,
    /// Declared option values per enumerated field
    declared: HashMap<String, BTreeSet<String>>,
}

impl Validator {
    pub fn new<'a>(fields: impl IntoIterator<Item = &'a FieldDefinition>) -> Self {
        let mut validator = Self::default();
        for field in fields {
            for rule in &field.validations {
                if let ValidationCheck::Pattern { value } = &rule.check {
                    // Integrity rejects patterns that do not compile
                    if let Ok(re) = Regex::new(value) {
                        validator.patterns.insert(value.clone(), re);
                    }
                }
            }
            if !field.options.is_empty() {
                validator.declared.insert(
                    field.key.clone(),
                    field.options.iter().map(|o| o.value.clone()).collect(),
                );
            }
        }
        validator
    }

    /// Validate a submitted record against the form it was resolved from.
    ///
    /// With a `stored` snapshot, an enumerated value the actor may not
    /// select is still accepted when it is a declared option left unchanged.
    pub fn validate(&self, form: &ResolvedForm, submitted: &Record, stored: Option<&Record>) -> Vec<ValidationIssue> {
        form.sections
            .iter()
            .flat_map(|section| section.fields.iter())
            .filter(|field| field.visible && !field.read_only && !field.computed)
            .flat_map(|field| self.validate_field(field, submitted, stored))
            .collect()
    }

    fn validate_field(&self, field: &ResolvedField, record: &Record, stored: Option<&Record>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if !record.is_present(&field.key) {
            let required = field.required
                || field
                    .validations
                    .iter()
                    .any(|rule| rule.check == ValidationCheck::Required);
            if required {
                let message = field
                    .validations
                    .iter()
                    .find(|rule| rule.check == ValidationCheck::Required)
                    .and_then(|rule| rule.message.clone())
                    .unwrap_or_else(|| format!("{} is required", field.label));
                issues.push(ValidationIssue::new(field, "required", message));
            }
            return issues;
        }

        let Some(value) = record.get(&field.key) else {
            return issues;
        };

        if !field.options.is_empty() {
            if let Some(selected) = value.as_str() {
                let selectable = field.options.iter().any(|o| o.value == selected);
                if !selectable && !self.is_kept(&field.key, selected, stored) {
                    issues.push(ValidationIssue::new(
                        field,
                        "option",
                        format!("'{}' is not a selectable {}", selected, field.label),
                    ));
                }
            }
        }

        for rule in &field.validations {
            if let Some(default_message) = self.failure(&rule.check, value) {
                let message = rule.message.clone().unwrap_or(default_message);
                issues.push(ValidationIssue::new(field, rule.check.name(), message));
            }
        }

        issues
    }

    /// A declared option that the stored record already holds.
    fn is_kept(&self, key: &str, selected: &str, stored: Option<&Record>) -> bool {
        stored.and_then(|record| record.get_str(key)) == Some(selected)
            && self
                .declared
                .get(key)
                .is_some_and(|values| values.contains(selected))
    }

    /// The default failure message, or `None` when the value passes.
    fn failure(&self, check: &ValidationCheck, value: &Value) -> Option<String> {
        match check {
            ValidationCheck::Required => None,
            ValidationCheck::MinLength { value: min } => {
                let len = text(value)?.chars().count();
                (len < *min).then(|| format!("must be at least {} characters", min))
            }
            ValidationCheck::MaxLength { value: max } => {
                let len = text(value)?.chars().count();
                (len > *max).then(|| format!("must be at most {} characters", max))
            }
            ValidationCheck::Pattern { value: pattern } => {
                let text = text(value)?;
                let re = self.patterns.get(pattern)?;
                (!re.is_match(text)).then(|| "has an invalid format".to_string())
            }
            ValidationCheck::Min { value: min } => {
                let n = number(value)?;
                (n < *min).then(|| format!("must be at least {}", min))
            }
            ValidationCheck::Max { value: max } => {
                let n = number(value)?;
                (n > *max).then(|| format!("must be at most {}", max))
            }
            ValidationCheck::Email => {
                let text = text(value)?;
                (!EMAIL_RE.is_match(text)).then(|| "must be a valid email address".to_string())
            }
        }
    }
}

fn text(value: &Value) -> Option<&str> {
    value.as_str()
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ResolvedSection;
    use crate::types::{DataType, EnumOption, InputType, ValidationRule};

    fn field(key: &str, validations: Vec<ValidationRule>) -> ResolvedField {
        ResolvedField {
            key: key.to_string(),
            label: key.replace('_', " "),
            data_type: DataType::String,
            input_type: InputType::Text,
            group: "personal".to_string(),
            visible: true,
            read_only: false,
            span: 6,
            required: false,
            validations,
            options: Vec::new(),
            computed: false,
            computed_value: None,
            help_text: None,
        }
    }

    fn form(fields: Vec<ResolvedField>) -> ResolvedForm {
        ResolvedForm {
            name: "member-edit".to_string(),
            title: None,
            can_edit: true,
            sections: vec![ResolvedSection {
                id: "main".to_string(),
                title: "Main".to_string(),
                order: 1,
                collapsible: false,
                default_expanded: true,
                editable: true,
                fields,
            }],
        }
    }

    fn checks(issues: &[ValidationIssue]) -> Vec<(&str, &str)> {
        issues.iter().map(|i| (i.field.as_str(), i.check.as_str())).collect()
    }

    /// Definitions mirroring the resolved fields of a form.
    fn definitions(form: &ResolvedForm) -> Vec<FieldDefinition> {
        form.sections
            .iter()
            .flat_map(|section| section.fields.iter())
            .map(|field| {
                let mut definition = FieldDefinition::new(&field.key, &field.label, field.data_type, &field.group)
                    .options(field.options.iter().map(|o| (o.value.clone(), o.label.clone())));
                definition.validations = field.validations.clone();
                definition
            })
            .collect()
    }

    fn validate(form: &ResolvedForm, record: &Record) -> Vec<ValidationIssue> {
        Validator::new(&definitions(form)).validate(form, record, None)
    }

    fn email_form() -> ResolvedForm {
        form(vec![field("email", vec![ValidationRule::new(ValidationCheck::Email)])])
    }

    #[test]
    fn test_required_fields() {
        let mut first = field("first_name", Vec::new());
        first.required = true;
        let guardian = field(
            "guardian_name",
            vec![ValidationRule::new(ValidationCheck::Required).message("A guardian is needed")],
        );
        let form = form(vec![first, guardian]);

        let issues = validate(&form, &Record::new().with("first_name", "  "));
        assert_eq!(checks(&issues), vec![("first_name", "required"), ("guardian_name", "required")]);
        assert_eq!(issues[0].message, "first name is required");
        assert_eq!(issues[1].message, "A guardian is needed");
    }

    #[test]
    fn test_length_pattern_and_range() {
        let form = form(vec![
            field("postal_code", vec![ValidationRule::new(ValidationCheck::Pattern { value: r"^\d{4}$".into() })]),
            field("last_name", vec![ValidationRule::new(ValidationCheck::MaxLength { value: 5 })]),
            field("fee", vec![
                ValidationRule::new(ValidationCheck::Min { value: 0.0 }),
                ValidationRule::new(ValidationCheck::Max { value: 500.0 }),
            ]),
            field("email", vec![ValidationRule::new(ValidationCheck::Email)]),
        ]);

        let record = Record::new()
            .with("postal_code", "12a4")
            .with("last_name", "Abernathy")
            .with("fee", "-3")
            .with("email", "someone@example");
        assert_eq!(
            checks(&validate(&form, &record)),
            vec![
                ("postal_code", "pattern"),
                ("last_name", "max_length"),
                ("fee", "min"),
                ("email", "email"),
            ]
        );

        let record = Record::new()
            .with("postal_code", "1234")
            .with("last_name", "Smith")
            .with("fee", 120)
            .with("email", "someone@example.org");
        assert!(validate(&form, &record).is_empty());
    }

    #[test]
    fn test_patterns_compiled_once_per_source() {
        let rule = ValidationRule::new(ValidationCheck::Pattern { value: r"^\d{4}$".into() });
        let form = form(vec![
            field("postal_code", vec![rule.clone()]),
            field("billing_code", vec![rule]),
        ]);
        let validator = Validator::new(&definitions(&form));
        assert_eq!(validator.patterns.len(), 1);

        let record = Record::new().with("postal_code", "12a4").with("billing_code", "1234");
        assert_eq!(checks(&validator.validate(&form, &record, None)), vec![("postal_code", "pattern")]);
    }

    #[test]
    fn test_read_only_and_hidden_skipped() {
        let mut locked = field("member_id", Vec::new());
        locked.required = true;
        locked.read_only = true;
        let mut hidden = field("notes", Vec::new());
        hidden.required = true;
        hidden.visible = false;

        assert!(validate(&form(vec![locked, hidden]), &Record::new()).is_empty());
    }

    #[test]
    fn test_option_outside_filtered_list() {
        let mut kind = field("membership_type", Vec::new());
        kind.options = vec![EnumOption::new("regular", "Regular")];
        let issues = validate(&form(vec![kind]), &Record::new().with("membership_type", "honorary"));
        assert_eq!(checks(&issues), vec![("membership_type", "option")]);
    }

    #[test]
    fn test_unchanged_gated_option_is_kept() {
        let declared = FieldDefinition::new("membership_type", "Membership type", DataType::Enum, "membership")
            .options([("regular", "Regular"), ("honorary", "Honorary")])
            .gate_option("honorary", ["admin"]);
        let validator = Validator::new([&declared]);

        // The actor only sees the ungated option
        let mut kind = field("membership_type", Vec::new());
        kind.options = vec![EnumOption::new("regular", "Regular")];
        let form = form(vec![kind]);

        let honorary = Record::new().with("membership_type", "honorary");
        let regular = Record::new().with("membership_type", "regular");

        assert!(validator.validate(&form, &honorary, Some(&honorary)).is_empty());
        assert_eq!(
            checks(&validator.validate(&form, &honorary, Some(&regular))),
            vec![("membership_type", "option")]
        );
        assert_eq!(
            checks(&validator.validate(&form, &honorary, None)),
            vec![("membership_type", "option")]
        );

        // A stored value that was never declared is not grandfathered
        let legacy = Record::new().with("membership_type", "lifetime");
        assert_eq!(
            checks(&validator.validate(&form, &legacy, Some(&legacy))),
            vec![("membership_type", "option")]
        );
    }

    #[test]
    fn test_email_shape() {
        let form = email_form();
        let rejected = |address: &str| !validate(&form, &Record::new().with("email", address)).is_empty();

        assert!(!rejected("a@b.co"));
        assert!(!rejected("first.last+tag@mail.example.org"));
        assert!(rejected("a@b"));
        assert!(rejected("@b.co"));
        assert!(rejected("a b@c.co"));
        assert!(rejected("a@@b.co"));
        assert!(rejected("a@b..c"));
        assert!(rejected("a@.b.co"));
    }
}
