//! Permission resolution for fields, sections and forms.
//!
//! Access is decided by an ordered sequence of named guards. Each guard
//! either lets the request through to the next guard or settles it:
//!
//! - view: `MembershipType` -> `Role` -> `Region`
//! - edit: `MembershipType` -> `Computed` -> `Role` / `SelfService` -> `Region`
//!
//! The membership-type guard runs first and is a hard veto: no role, region
//! or self-service standing can override it.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineSettings;
use crate::rule::RuleEvaluator;
use crate::types::{Actor, FieldDefinition, PermissionConfig, Record, RegionScope, RoleSet};

/// The named checks that can settle an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guard {
    /// The record's membership type is outside the field's list
    MembershipType,
    /// Computed fields are never editable
    Computed,
    /// The actor holds none of the permitted roles
    Role,
    /// The owner of the record may edit it
    SelfService,
    /// The actor's region does not match the record's
    Region,
}

impl Guard {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MembershipType => "membership_type",
            Self::Computed => "computed",
            Self::Role => "role",
            Self::SelfService => "self_service",
            Self::Region => "region",
        }
    }
}

/// Outcome of a guard sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every guard passed
    Allow,
    /// Granted by self-service ownership
    AllowSelfService,
    /// Denied by the named guard
    Deny(Guard),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Deny(_))
    }

    fn settle(flow: ControlFlow<Verdict>) -> Self {
        match flow {
            ControlFlow::Break(verdict) => verdict,
            ControlFlow::Continue(()) => Self::Allow,
        }
    }
}

type Step = ControlFlow<Verdict>;

const PASS: Step = ControlFlow::Continue(());

fn deny(guard: Guard) -> Step {
    ControlFlow::Break(Verdict::Deny(guard))
}

/// Decides view/edit eligibility per field for one actor and record.
#[derive(Debug, Clone, Copy)]
pub struct PermissionResolver<'a> {
    settings: &'a EngineSettings,
    evaluator: RuleEvaluator,
}

impl<'a> PermissionResolver<'a> {
    pub fn new(settings: &'a EngineSettings, evaluator: RuleEvaluator) -> Self {
        Self {
            settings,
            evaluator,
        }
    }

    /// Can `actor` view `field` on `record`?
    pub fn can_view(&self, field: &FieldDefinition, actor: &Actor, record: &Record) -> bool {
        self.explain_view(field, actor, record).is_allowed()
    }

    /// Can `actor` edit `field` on `record`?
    pub fn can_edit(&self, field: &FieldDefinition, actor: &Actor, record: &Record) -> bool {
        self.explain_edit(field, actor, record).is_allowed()
    }

    /// View decision with the guard that settled it.
    pub fn explain_view(&self, field: &FieldDefinition, actor: &Actor, record: &Record) -> Verdict {
        let verdict = self.check_view(&field.permissions, actor, record);
        if let Verdict::Deny(guard) = verdict {
            debug!(field = %field.key, actor = %actor.id, guard = guard.as_str(), "View denied");
        }
        verdict
    }

    /// Edit decision with the guard that settled it.
    pub fn explain_edit(&self, field: &FieldDefinition, actor: &Actor, record: &Record) -> Verdict {
        let verdict = Verdict::settle(self.edit_sequence(field, actor, record));
        if let Verdict::Deny(guard) = verdict {
            debug!(field = %field.key, actor = %actor.id, guard = guard.as_str(), "Edit denied");
        }
        verdict
    }

    /// View decision for a bare permission config (section, form).
    pub fn check_view(&self, config: &PermissionConfig, actor: &Actor, record: &Record) -> Verdict {
        Verdict::settle(self.view_sequence(config, actor, record))
    }

    /// Edit decision for a bare permission config (section, form).
    pub fn check_edit(&self, config: &PermissionConfig, actor: &Actor, record: &Record) -> Verdict {
        Verdict::settle(self.config_edit_sequence(config, actor, record))
    }

    /// The permission config governing edits of `field` for this record.
    ///
    /// A conditional-edit override replaces the base config only while its
    /// rule holds.
    pub fn effective_edit_config<'f>(
        &self,
        field: &'f FieldDefinition,
        record: &Record,
    ) -> &'f PermissionConfig {
        match &field.conditional_edit {
            Some(over) if self.evaluator.evaluate(&over.rule, record) => &over.permissions,
            _ => &field.permissions,
        }
    }

    /// Regional gate in isolation, used for table rows.
    pub fn region_allows(&self, restricted: bool, actor: &Actor, record: &Record) -> bool {
        self.region_guard(restricted, actor, record).is_continue()
    }

    fn view_sequence(&self, config: &PermissionConfig, actor: &Actor, record: &Record) -> Step {
        self.membership_type_guard(config, record)?;
        role_guard(&config.view, actor)?;
        self.region_guard(config.regional_restricted, actor, record)
    }

    fn edit_sequence(&self, field: &FieldDefinition, actor: &Actor, record: &Record) -> Step {
        // The veto always reads the field's own config
        self.membership_type_guard(&field.permissions, record)?;
        computed_guard(field)?;
        let config = self.effective_edit_config(field, record);
        self.edit_role_guard(config, actor, record)?;
        self.region_guard(config.regional_restricted, actor, record)
    }

    fn config_edit_sequence(&self, config: &PermissionConfig, actor: &Actor, record: &Record) -> Step {
        self.membership_type_guard(config, record)?;
        self.edit_role_guard(config, actor, record)?;
        self.region_guard(config.regional_restricted, actor, record)
    }

    fn membership_type_guard(&self, config: &PermissionConfig, record: &Record) -> Step {
        let Some(allowed) = &config.membership_types else {
            return PASS;
        };
        let key = &self.settings.record_keys.membership_type;
        match record.get_str(key) {
            Some(kind) if allowed.iter().any(|a| a == kind) => PASS,
            _ => deny(Guard::MembershipType),
        }
    }

    fn edit_role_guard(&self, config: &PermissionConfig, actor: &Actor, record: &Record) -> Step {
        if actor.has_any_role(&config.edit) {
            return PASS;
        }
        if config.self_service && self.is_owner(actor, record) {
            return ControlFlow::Break(Verdict::AllowSelfService);
        }
        deny(Guard::Role)
    }

    fn region_guard(&self, restricted: bool, actor: &Actor, record: &Record) -> Step {
        if !restricted || actor.has_any_role(&self.settings.unrestricted_region_roles) {
            return PASS;
        }
        let record_region = record.get_str(&self.settings.record_keys.region);
        match (&actor.region, record_region) {
            (RegionScope::Unrestricted, _) => PASS,
            (RegionScope::Region(mine), Some(theirs)) if mine == theirs => PASS,
            _ => deny(Guard::Region),
        }
    }

    fn is_owner(&self, actor: &Actor, record: &Record) -> bool {
        !actor.id.is_empty()
            && record
                .get(&self.settings.record_keys.owner)
                .is_some_and(|owner| match owner {
                    serde_json::Value::String(s) => s == &actor.id,
                    other => other.to_string() == actor.id,
                })
    }
}

fn role_guard(allowed: &RoleSet, actor: &Actor) -> Step {
    if actor.has_any_role(allowed) {
        PASS
    } else {
        deny(Guard::Role)
    }
}

fn computed_guard(field: &FieldDefinition) -> Step {
    if field.is_computed() {
        deny(Guard::Computed)
    } else {
        PASS
    }
}
