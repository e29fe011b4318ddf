//! Load-time integrity pass over the full configuration graph.
//!
//! Every defect is collected rather than stopping at the first, so a broken
//! deployment reports all offending contexts and fields at once.

use std::collections::HashSet;

use crate::compose::{expand_section, section_location};
use crate::config::EngineConfig;
use crate::context::{FormContext, SectionContent, TableContext};
use crate::error::ConfigError;
use crate::registry::FieldRegistry;
use crate::rule::ConditionalRule;
use crate::types::{DataType, FieldDefinition, Required, ValidationCheck};

/// Grid spans are expressed on a twelve-column grid.
const MAX_SPAN: u8 = 12;

/// Check the configuration against its registry. Empty means valid.
pub fn check(config: &EngineConfig, registry: &FieldRegistry) -> Vec<ConfigError> {
    let mut integrity = Integrity {
        registry,
        findings: Vec::new(),
    };

    integrity.check_settings(config);
    for field in registry.iter() {
        integrity.check_field(field);
    }
    integrity.check_context_names(config);
    for table in &config.tables {
        integrity.check_table(table);
    }
    for form in &config.forms {
        integrity.check_form(form);
    }

    integrity.findings
}

struct Integrity<'a> {
    registry: &'a FieldRegistry,
    findings: Vec<ConfigError>,
}

impl Integrity<'_> {
    fn report(&mut self, error: ConfigError) {
        self.findings.push(error);
    }

    fn invalid_rule(&mut self, location: &str, reason: String) {
        self.report(ConfigError::InvalidRule {
            location: location.to_string(),
            reason,
        });
    }

    fn invalid_context(&mut self, location: &str, reason: String) {
        self.report(ConfigError::InvalidContext {
            location: location.to_string(),
            reason,
        });
    }

    fn check_settings(&mut self, config: &EngineConfig) {
        let settings = &config.settings;
        if !(1..=MAX_SPAN).contains(&settings.default_span) {
            self.report(ConfigError::InvalidSetting(format!(
                "default_span must be between 1 and {}, got {}",
                MAX_SPAN, settings.default_span
            )));
        }
        if settings.cache.enabled && settings.cache.max_entries == 0 {
            self.report(ConfigError::InvalidSetting(
                "cache.max_entries must be positive when the cache is enabled".to_string(),
            ));
        }
    }

    fn check_rule(&mut self, rule: &ConditionalRule, location: &str) {
        let Some(target) = self.registry.get(rule.field()) else {
            self.report(ConfigError::UnknownField {
                location: location.to_string(),
                field: rule.field().to_string(),
            });
            return;
        };

        match rule {
            ConditionalRule::Equals { value, .. } | ConditionalRule::NotEquals { value, .. } => {
                if value.is_null() {
                    self.invalid_rule(
                        location,
                        format!("{} compares '{}' with null; use exists/not_exists", rule.operator(), target.key),
                    );
                } else {
                    self.check_enum_values(target, std::slice::from_ref(value), location);
                }
            }
            ConditionalRule::Contains { values, .. } | ConditionalRule::NotContains { values, .. } => {
                if values.is_empty() {
                    self.invalid_rule(location, format!("{} on '{}' has no values", rule.operator(), target.key));
                } else {
                    self.check_enum_values(target, values, location);
                }
            }
            ConditionalRule::AgeLessThan { years, .. } => {
                if target.data_type != DataType::Date {
                    self.invalid_rule(location, format!("age_less_than reads non-date field '{}'", target.key));
                }
                if *years == 0 {
                    self.invalid_rule(location, "age_less_than threshold must be positive".to_string());
                }
            }
            ConditionalRule::Exists { .. } | ConditionalRule::NotExists { .. } => {}
        }
    }

    fn check_enum_values(&mut self, target: &FieldDefinition, values: &[serde_json::Value], location: &str) {
        if !target.is_enum() {
            return;
        }
        for value in values {
            let known = value
                .as_str()
                .is_some_and(|v| target.options.iter().any(|o| o.value == v));
            if !known {
                self.invalid_rule(location, format!("{} is not an option of '{}'", value, target.key));
            }
        }
    }

    fn check_field(&mut self, field: &FieldDefinition) {
        let location = format!("field:{}", field.key);
        let invalid = |reason: &str| ConfigError::InvalidField {
            field: field.key.clone(),
            reason: reason.to_string(),
        };

        match (field.is_enum(), field.options.is_empty()) {
            (true, true) => self.report(invalid("enum field declares no options")),
            (false, false) => self.report(invalid("options declared on a non-enum field")),
            _ => {}
        }

        let mut seen = HashSet::new();
        for option in &field.options {
            if !seen.insert(option.value.as_str()) {
                self.report(invalid(&format!("duplicate option '{}'", option.value)));
            }
        }

        for (option, gate) in &field.option_gates {
            let reason = if !field.options.iter().any(|o| &o.value == option) {
                Some("not a declared option")
            } else if gate.is_empty() {
                Some("gate grants no role")
            } else {
                None
            };
            if let Some(reason) = reason {
                self.report(ConfigError::InvalidOptionGate {
                    field: field.key.clone(),
                    option: option.clone(),
                    reason: reason.to_string(),
                });
            }
        }

        if field.permissions.membership_types.as_ref().is_some_and(Vec::is_empty) {
            self.report(invalid("empty membership type list"));
        }

        for rule in &field.show_when {
            self.check_rule(rule, &location);
        }
        if let Required::When(rule) = &field.required {
            self.check_rule(rule, &location);
        }
        if let Some(over) = &field.conditional_edit {
            self.check_rule(&over.rule, &location);
        }
        for validation in &field.validations {
            if let Some(rule) = &validation.when {
                self.check_rule(rule, &location);
            }
            if let ValidationCheck::Pattern { value } = &validation.check {
                if let Err(err) = regex::Regex::new(value) {
                    self.report(ConfigError::InvalidPattern {
                        field: field.key.clone(),
                        pattern: value.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if let Some(computation) = &field.computed {
            let sources = computation.sources();
            if sources.is_empty() {
                self.report(invalid("computed field has no sources"));
            }
            for source in sources {
                match self.registry.get(source) {
                    None => self.report(ConfigError::UnknownComputedSource {
                        field: field.key.clone(),
                        source_key: source.to_string(),
                    }),
                    Some(source_field) if source_field.key == field.key => {
                        self.report(invalid("computed field reads itself"));
                    }
                    Some(source_field)
                        if computation.needs_date_source() && source_field.data_type != DataType::Date =>
                    {
                        self.report(invalid(&format!(
                            "{} needs a date source, '{}' is not a date",
                            computation.name(),
                            source_field.key
                        )));
                    }
                    Some(_) => {}
                }
            }
        }
    }

    fn check_context_names(&mut self, config: &EngineConfig) {
        let mut seen = HashSet::new();
        let names = config
            .tables
            .iter()
            .map(|t| t.name.as_str())
            .chain(config.forms.iter().map(|f| f.name.as_str()));
        for name in names {
            if !seen.insert(name) {
                self.report(ConfigError::DuplicateContext(name.to_string()));
            }
        }
    }

    fn check_table(&mut self, table: &TableContext) {
        let location = format!("table:{}", table.name);

        if table.permissions.view.is_empty() {
            self.invalid_context(&location, "no view roles".to_string());
        }
        if table.page_size == 0 {
            self.invalid_context(&location, "page_size must be positive".to_string());
        }

        let mut seen = HashSet::new();
        for column in &table.columns {
            if !self.registry.contains(&column.field) {
                self.report(ConfigError::UnknownField {
                    location: location.clone(),
                    field: column.field.clone(),
                });
            }
            if !seen.insert(column.field.as_str()) {
                self.invalid_context(&location, format!("column '{}' bound twice", column.field));
            }
        }

        if let Some(sort) = &table.default_sort {
            if !seen.contains(sort.field.as_str()) {
                self.invalid_context(&location, format!("default sort '{}' is not a column", sort.field));
            }
        }
    }

    fn check_span(&mut self, span: Option<u8>, location: &str, key: &str) {
        if let Some(span) = span {
            if !(1..=MAX_SPAN).contains(&span) {
                self.invalid_context(location, format!("span {} of '{}' is outside 1-{}", span, key, MAX_SPAN));
            }
        }
    }

    fn check_form(&mut self, form: &FormContext) {
        let form_location = format!("form:{}", form.name);
        if form.permissions.view.is_empty() {
            self.invalid_context(&form_location, "no view roles".to_string());
        }

        let mut section_ids = HashSet::new();
        for section in &form.sections {
            let location = section_location(&form.name, &section.id);
            if !section_ids.insert(section.id.as_str()) {
                self.invalid_context(&form_location, format!("section '{}' declared twice", section.id));
            }
            for rule in &section.show_when {
                self.check_rule(rule, &location);
            }

            let before = self.findings.len();
            for content in &section.content {
                match content {
                    SectionContent::Field(binding) => {
                        if !self.registry.contains(&binding.field) {
                            self.report(ConfigError::UnknownField {
                                location: location.clone(),
                                field: binding.field.clone(),
                            });
                        }
                        self.check_span(binding.span, &location, &binding.field);
                        for rule in &binding.show_when {
                            self.check_rule(rule, &location);
                        }
                    }
                    SectionContent::Group(reference) => {
                        if !self.registry.has_group(&reference.group) {
                            self.report(ConfigError::UnknownGroup {
                                location: location.clone(),
                                group: reference.group.clone(),
                            });
                            continue;
                        }
                        let keys = reference
                            .include
                            .iter()
                            .flatten()
                            .chain(reference.exclude.iter())
                            .chain(reference.overrides.keys());
                        for key in keys {
                            self.check_group_member(&reference.group, key, &location);
                        }
                        for (key, patch) in &reference.overrides {
                            self.check_span(patch.span, &location, key);
                            for rule in &patch.show_when {
                                self.check_rule(rule, &location);
                            }
                        }
                    }
                }
            }

            // Duplicate detection needs a clean expansion
            if self.findings.len() == before {
                match expand_section(self.registry, section, &location) {
                    Ok(bindings) => {
                        let mut seen = HashSet::new();
                        for binding in &bindings {
                            if !seen.insert(binding.field.as_str()) {
                                self.invalid_context(&location, format!("field '{}' bound twice", binding.field));
                            }
                        }
                    }
                    Err(err) => self.report(err),
                }
            }
        }
    }

    fn check_group_member(&mut self, group: &str, key: &str, location: &str) {
        if !self.registry.contains(key) {
            self.report(ConfigError::UnknownField {
                location: location.to_string(),
                field: key.to_string(),
            });
        } else if !self.registry.is_member(group, key) {
            self.report(ConfigError::FieldNotInGroup {
                location: location.to_string(),
                group: group.to_string(),
                field: key.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Computation;
    use crate::context::{ColumnBinding, FieldBinding, GroupReference, Section, TablePermissions};
    use crate::types::PermissionConfig;

    fn base_fields() -> Vec<FieldDefinition> {
        vec![
            FieldDefinition::new("first_name", "First name", DataType::String, "personal").order(1),
            FieldDefinition::new("birth_date", "Birth date", DataType::Date, "personal").order(2),
            FieldDefinition::new("status", "Status", DataType::Enum, "membership")
                .options([("active", "Active"), ("pending-application", "Pending")]),
        ]
    }

    fn findings(config: &EngineConfig) -> Vec<ConfigError> {
        let registry = FieldRegistry::new(config.fields.clone()).unwrap();
        check(config, &registry)
    }

    fn viewers() -> PermissionConfig {
        PermissionConfig::new().view(["admin"])
    }

    #[test]
    fn test_valid_config_has_no_findings() {
        let config = EngineConfig::new(base_fields())
            .table(
                TableContext::new("overview", TablePermissions::new(["admin"]))
                    .column(ColumnBinding::new("first_name").sortable())
                    .sort_by("first_name", Default::default()),
            )
            .form(FormContext::new("detail", viewers()).section(
                Section::new("personal", "Personal", 1, viewers()).group(GroupReference::new("personal")),
            ));
        assert!(findings(&config).is_empty());
    }

    #[test]
    fn test_dangling_references() {
        let config = EngineConfig::new(base_fields())
            .table(
                TableContext::new("overview", TablePermissions::new(["admin"]))
                    .column(ColumnBinding::new("nickname")),
            )
            .form(
                FormContext::new("detail", viewers()).section(
                    Section::new("s", "S", 1, viewers())
                        .group(GroupReference::new("motor"))
                        .field(FieldBinding::new("shoe_size")),
                ),
            );

        let found = findings(&config);
        assert!(found.iter().any(|e| matches!(e, ConfigError::UnknownField { field, .. } if field == "nickname")));
        assert!(found.iter().any(|e| matches!(e, ConfigError::UnknownGroup { group, .. } if group == "motor")));
        assert!(found.iter().any(|e| matches!(
            e,
            ConfigError::UnknownField { location, field } if field == "shoe_size" && location == "form:detail/section:s"
        )));
    }

    #[test]
    fn test_group_member_keys() {
        let config = EngineConfig::new(base_fields()).form(FormContext::new("detail", viewers()).section(
            Section::new("s", "S", 1, viewers()).group(GroupReference::new("personal").exclude(["status"])),
        ));
        let found = findings(&config);
        assert!(matches!(
            found.as_slice(),
            [ConfigError::FieldNotInGroup { field, group, .. }] if field == "status" && group == "personal"
        ));
    }

    #[test]
    fn test_computed_sources() {
        let mut fields = base_fields();
        fields.push(
            FieldDefinition::new("age", "Age", DataType::Number, "personal").computed(Computation::AgeFromDate {
                source: "first_name".into(),
            }),
        );
        fields.push(
            FieldDefinition::new("full_name", "Full name", DataType::String, "personal")
                .computed(Computation::concat(["first_name", "last_name"])),
        );

        let found = findings(&EngineConfig::new(fields));
        assert!(found.iter().any(|e| matches!(e, ConfigError::InvalidField { field, .. } if field == "age")));
        assert!(found.iter().any(|e| matches!(
            e,
            ConfigError::UnknownComputedSource { field, source_key } if field == "full_name" && source_key == "last_name"
        )));
    }

    #[test]
    fn test_malformed_rules() {
        let mut fields = base_fields();
        fields.push(
            FieldDefinition::new("guardian", "Guardian", DataType::String, "personal")
                .show_when(ConditionalRule::age_less_than("first_name", 18))
                .show_when(ConditionalRule::equals("status", "retired"))
                .show_when(ConditionalRule::contains("status", Vec::<String>::new()))
                .show_when(ConditionalRule::exists("shoe_size")),
        );

        let found = findings(&EngineConfig::new(fields));
        let rules = found
            .iter()
            .filter(|e| matches!(e, ConfigError::InvalidRule { .. }))
            .count();
        assert_eq!(rules, 3);
        assert!(found.iter().any(|e| matches!(e, ConfigError::UnknownField { field, .. } if field == "shoe_size")));
    }

    #[test]
    fn test_option_gates_and_patterns() {
        let mut fields = base_fields();
        fields[2] = fields[2]
            .clone()
            .gate_option("honorary", ["admin"])
            .gate_option("active", Vec::<String>::new());
        fields[0] = fields[0].clone().validate(crate::types::ValidationRule::new(ValidationCheck::Pattern {
            value: "([a-z".into(),
        }));

        let found = findings(&EngineConfig::new(fields));
        let gates = found
            .iter()
            .filter(|e| matches!(e, ConfigError::InvalidOptionGate { .. }))
            .count();
        assert_eq!(gates, 2);
        assert!(found.iter().any(|e| matches!(e, ConfigError::InvalidPattern { .. })));
    }

    #[test]
    fn test_duplicates_and_spans() {
        let config = EngineConfig::new(base_fields())
            .table(TableContext::new("detail", TablePermissions::new(["admin"])))
            .form(
                FormContext::new("detail", viewers()).section(
                    Section::new("s", "S", 1, viewers())
                        .group(GroupReference::new("personal"))
                        .field(FieldBinding::new("first_name").span(13)),
                ),
            );

        let found = findings(&config);
        assert!(found.iter().any(|e| matches!(e, ConfigError::DuplicateContext(name) if name == "detail")));
        assert!(found.iter().any(|e| matches!(
            e,
            ConfigError::InvalidContext { reason, .. } if reason.contains("span 13")
        )));
    }

    #[test]
    fn test_field_bound_twice() {
        let config = EngineConfig::new(base_fields()).form(
            FormContext::new("detail", viewers()).section(
                Section::new("s", "S", 1, viewers())
                    .group(GroupReference::new("personal"))
                    .field(FieldBinding::new("first_name")),
            ),
        );
        let found = findings(&config);
        assert!(matches!(
            found.as_slice(),
            [ConfigError::InvalidContext { reason, .. }] if reason == "field 'first_name' bound twice"
        ));
    }
}
