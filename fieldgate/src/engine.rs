//! The engine facade.
//!
//! [`FieldEngine`] owns a validated configuration and answers every
//! resolution question against it. Construction is the only fallible step
//! for configuration problems; after that, errors are limited to callers
//! naming contexts or fields that do not exist.

use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{CacheStats, ResolutionCache, ResolutionKey, ResolutionKind};
use crate::clock::{Clock, SystemClock};
use crate::compose::{Composer, ResolvedColumn, ResolvedForm, ResolvedRow, ResolvedSection, ResolvedTable};
use crate::config::{EngineConfig, EngineSettings};
use crate::error::{ConfigError, ResolveError, Result};
use crate::integrity;
use crate::options;
use crate::permission::Verdict;
use crate::registry::FieldRegistry;
use crate::rule::{ConditionalRule, RuleEvaluator};
use crate::types::{Actor, EnumOption, FieldDefinition, Record, RoleSet, ValidationRule};
use crate::validation::{ValidationIssue, Validator};

/// A loaded, validated configuration ready to resolve contexts.
pub struct FieldEngine {
    config: EngineConfig,
    registry: FieldRegistry,
    fingerprint: String,
    clock: Box<dyn Clock>,
    cache: Option<ResolutionCache>,
    validator: Validator,
}

impl std::fmt::Debug for FieldEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldEngine")
            .field("fields", &self.registry.len())
            .field("tables", &self.config.tables.len())
            .field("forms", &self.config.forms.len())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl FieldEngine {
    /// Build an engine evaluating dates against the system clock.
    pub fn new(config: EngineConfig) -> std::result::Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock)
    }

    /// Build an engine with an injected clock.
    ///
    /// Every integrity finding is reported; a single finding is returned
    /// as-is, several are wrapped in [`ConfigError::Invalid`].
    pub fn with_clock(config: EngineConfig, clock: impl Clock + 'static) -> std::result::Result<Self, ConfigError> {
        let registry = FieldRegistry::new(config.fields.clone())?;
        if let Some(error) = ConfigError::from_findings(integrity::check(&config, &registry)) {
            return Err(error);
        }

        let fingerprint = config.fingerprint();
        let validator = Validator::new(registry.iter());
        let cache = config
            .settings
            .cache
            .enabled
            .then(|| ResolutionCache::new(config.settings.cache.max_entries));

        info!(
            fields = registry.len(),
            tables = config.tables.len(),
            forms = config.forms.len(),
            cache = cache.is_some(),
            fingerprint = %fingerprint,
            "Field engine ready"
        );

        Ok(Self {
            config,
            registry,
            fingerprint,
            clock: Box::new(clock),
            cache,
            validator,
        })
    }

    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, ConfigError> {
        Self::new(EngineConfig::from_yaml(yaml)?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.config.settings
    }

    /// SHA-256 of the loaded configuration.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Rule evaluator pinned to the clock's current date.
    pub fn evaluator(&self) -> RuleEvaluator {
        RuleEvaluator::from_clock(self.clock.as_ref())
    }

    /// A composer for one evaluation date. Calls through it share that date.
    pub fn composer(&self) -> Composer<'_> {
        Composer::new(&self.config, &self.registry, self.evaluator())
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(ResolutionCache::stats)
    }

    pub fn field(&self, key: &str) -> Result<&FieldDefinition> {
        self.registry
            .get(key)
            .ok_or_else(|| ResolveError::UnknownField(key.to_string()))
    }

    pub fn evaluate(&self, rule: &ConditionalRule, record: &Record) -> bool {
        self.evaluator().evaluate(rule, record)
    }

    pub fn can_view(&self, field: &str, actor: &Actor, record: &Record) -> Result<bool> {
        Ok(self.explain_view(field, actor, record)?.is_allowed())
    }

    pub fn can_edit(&self, field: &str, actor: &Actor, record: &Record) -> Result<bool> {
        Ok(self.explain_edit(field, actor, record)?.is_allowed())
    }

    /// The view verdict with the guard that settled it.
    pub fn explain_view(&self, field: &str, actor: &Actor, record: &Record) -> Result<Verdict> {
        let field = self.field(field)?;
        Ok(self.composer().permissions().explain_view(field, actor, record))
    }

    /// The edit verdict with the guard that settled it.
    pub fn explain_edit(&self, field: &str, actor: &Actor, record: &Record) -> Result<Verdict> {
        let field = self.field(field)?;
        Ok(self.composer().permissions().explain_edit(field, actor, record))
    }

    pub fn filter_options(&self, field: &str, roles: &RoleSet) -> Result<Vec<&EnumOption>> {
        Ok(options::filter_options(self.field(field)?, roles))
    }

    pub fn is_required(&self, field: &str, record: &Record) -> Result<bool> {
        Ok(self.evaluator().is_required(&self.field(field)?.required, record))
    }

    pub fn active_validations(&self, field: &str, record: &Record) -> Result<Vec<&ValidationRule>> {
        let field = self.field(field)?;
        Ok(self.evaluator().active_validations(&field.validations, record))
    }

    /// Derived value of a computed field; `None` for stored fields or missing inputs.
    pub fn compute(&self, field: &str, record: &Record) -> Result<Option<Value>> {
        let field = self.field(field)?;
        let today = self.clock.today();
        Ok(field
            .computed
            .as_ref()
            .and_then(|computation| computation.compute(record, today)))
    }

    pub fn resolve_table_columns(&self, table: &str, roles: &RoleSet) -> Result<Vec<ResolvedColumn>> {
        self.composer().resolve_table_columns(table, roles)
    }

    pub fn resolve_table(&self, table: &str, actor: &Actor) -> Result<ResolvedTable> {
        let composer = self.composer();
        let Some(cache) = &self.cache else {
            return composer.resolve_table(table, actor);
        };

        let key = ResolutionKey::new(
            ResolutionKind::Table,
            table,
            &self.fingerprint,
            actor,
            None,
            composer.evaluator().today(),
        );
        if let Some(hit) = cache.get_table(&key) {
            return Ok(hit);
        }
        let resolved = composer.resolve_table(table, actor)?;
        cache.put_table(&key, resolved.clone());
        Ok(resolved)
    }

    pub fn can_view_row(&self, table: &str, actor: &Actor, record: &Record) -> Result<bool> {
        self.composer().can_view_row(table, actor, record)
    }

    pub fn filter_rows<'r>(&self, table: &str, actor: &Actor, rows: &'r [Record]) -> Result<Vec<&'r Record>> {
        self.composer().filter_rows(table, actor, rows)
    }

    pub fn resolve_row(&self, table: &str, actor: &Actor, record: &Record) -> Result<Option<ResolvedRow>> {
        self.composer().resolve_row(table, actor, record)
    }

    pub fn can_edit_form(&self, form: &str, actor: &Actor, record: &Record) -> Result<bool> {
        self.composer().can_edit_form(form, actor, record)
    }

    pub fn resolve_sections(&self, form: &str, actor: &Actor, record: &Record) -> Result<Vec<ResolvedSection>> {
        Ok(self.resolve_form(form, actor, record)?.sections)
    }

    pub fn resolve_form(&self, form: &str, actor: &Actor, record: &Record) -> Result<ResolvedForm> {
        let composer = self.composer();
        let Some(cache) = &self.cache else {
            return composer.resolve_form(form, actor, record);
        };

        let key = ResolutionKey::new(
            ResolutionKind::Form,
            form,
            &self.fingerprint,
            actor,
            Some(record),
            composer.evaluator().today(),
        );
        if let Some(hit) = cache.get_form(&key) {
            return Ok(hit);
        }
        let resolved = composer.resolve_form(form, actor, record)?;
        cache.put_form(&key, resolved.clone());
        Ok(resolved)
    }

    /// Check a new submission against the form as the actor sees it.
    pub fn validate_submission(&self, form: &str, actor: &Actor, record: &Record) -> Result<Vec<ValidationIssue>> {
        self.check_submission(form, actor, record, None)
    }

    /// Check an edit of `stored` against the form as the actor sees it.
    ///
    /// Enumerated values the actor may not select pass when they are left
    /// as stored.
    pub fn validate_update(
        &self,
        form: &str,
        actor: &Actor,
        stored: &Record,
        submitted: &Record,
    ) -> Result<Vec<ValidationIssue>> {
        self.check_submission(form, actor, submitted, Some(stored))
    }

    fn check_submission(
        &self,
        form: &str,
        actor: &Actor,
        submitted: &Record,
        stored: Option<&Record>,
    ) -> Result<Vec<ValidationIssue>> {
        let resolved = self.resolve_form(form, actor, submitted)?;
        let issues = self.validator.validate(&resolved, submitted, stored);
        if !issues.is_empty() {
            debug!(form = %form, actor = %actor.id, issues = issues.len(), "Submission rejected");
        }
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::CacheSettings;
    use crate::context::{ColumnBinding, FormContext, GroupReference, Section, TableContext, TablePermissions};
    use crate::permission::Guard;
    use crate::types::{DataType, PermissionConfig};

    fn clock() -> FixedClock {
        FixedClock::ymd(2026, 10, 19).unwrap()
    }

    fn config() -> EngineConfig {
        let member = PermissionConfig::new().view(["member", "admin"]).edit(["admin"]);
        EngineConfig::new(vec![
            FieldDefinition::new("first_name", "First name", DataType::String, "personal")
                .order(1)
                .permissions(member.clone().self_service()),
            FieldDefinition::new("birth_date", "Birth date", DataType::Date, "personal")
                .order(2)
                .permissions(member.clone()),
            FieldDefinition::new("age", "Age", DataType::Number, "personal")
                .order(3)
                .permissions(member.clone())
                .computed(crate::compute::Computation::AgeFromDate {
                    source: "birth_date".into(),
                }),
        ])
        .table(
            TableContext::new("overview", TablePermissions::new(["admin"]))
                .column(ColumnBinding::new("first_name"))
                .column(ColumnBinding::new("age")),
        )
        .form(
            FormContext::new("detail", member.clone())
                .section(Section::new("personal", "Personal", 1, member).group(GroupReference::new("personal"))),
        )
    }

    #[test]
    fn test_construction_reports_all_findings() {
        let broken = config().table(
            TableContext::new("broken", TablePermissions::new(["admin"]))
                .column(ColumnBinding::new("nickname"))
                .page_size(0),
        );
        let err = FieldEngine::with_clock(broken, clock()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert_eq!(err.findings().len(), 2);
    }

    #[test]
    fn test_unknown_names() {
        let engine = FieldEngine::with_clock(config(), clock()).unwrap();
        let actor = Actor::new("u1").with_roles(["admin"]);

        assert!(matches!(
            engine.can_view("nickname", &actor, &Record::new()),
            Err(ResolveError::UnknownField(_))
        ));
        assert!(matches!(
            engine.resolve_form("overview", &actor, &Record::new()),
            Err(ResolveError::WrongContextKind { expected: "form", .. })
        ));
        assert!(matches!(
            engine.resolve_table("nowhere", &actor),
            Err(ResolveError::UnknownContext(_))
        ));
    }

    #[test]
    fn test_compute_uses_injected_clock() {
        let engine = FieldEngine::with_clock(config(), clock()).unwrap();
        let record = Record::new().with("birth_date", "2008-10-20");
        assert_eq!(engine.compute("age", &record).unwrap(), Some(Value::from(17)));
        assert_eq!(engine.compute("first_name", &record).unwrap(), None);
    }

    #[test]
    fn test_explain_edit() {
        let engine = FieldEngine::with_clock(config(), clock()).unwrap();
        let owner = Actor::new("acc-7").with_roles(["member"]);
        let record = Record::new().with("account_id", "acc-7");

        assert_eq!(
            engine.explain_edit("first_name", &owner, &record).unwrap(),
            Verdict::AllowSelfService
        );
        assert_eq!(
            engine.explain_edit("birth_date", &owner, &record).unwrap(),
            Verdict::Deny(Guard::Role)
        );
        assert_eq!(
            engine.explain_edit("age", &Actor::new("a").with_roles(["admin"]), &record).unwrap(),
            Verdict::Deny(Guard::Computed)
        );
    }

    #[test]
    fn test_cache_is_transparent() {
        let mut cached = config();
        cached.settings.cache = CacheSettings {
            enabled: true,
            max_entries: 16,
        };
        let plain = FieldEngine::with_clock(config(), clock()).unwrap();
        let cached = FieldEngine::with_clock(cached, clock()).unwrap();

        let actor = Actor::new("acc-7").with_roles(["member"]);
        let record = Record::new().with("account_id", "acc-7").with("birth_date", "1990-01-01");

        let first = cached.resolve_form("detail", &actor, &record).unwrap();
        let second = cached.resolve_form("detail", &actor, &record).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, plain.resolve_form("detail", &actor, &record).unwrap());

        let stats = cached.cache_stats().unwrap();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert!(plain.cache_stats().is_none());
    }

    #[test]
    fn test_validate_submission_skips_read_only() {
        let engine = FieldEngine::with_clock(config(), clock()).unwrap();
        let member = Actor::new("acc-9").with_roles(["member"]);
        let record = Record::new().with("account_id", "acc-7");
        assert!(engine.validate_submission("detail", &member, &record).unwrap().is_empty());
    }
}
