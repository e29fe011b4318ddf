//! Core types for field resolution.
//!
//! These types model the declarative field catalogue (definitions, permission
//! configs, validation rules) and the per-request inputs (actor, record).
//!
//! With the `typescript` feature enabled, the types consumed by the rendering
//! layer can be exported to TypeScript using ts-rs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::compute::Computation;
use crate::rule::ConditionalRule;

/// A set of role identifiers. Ordered so resolution output is deterministic.
pub type RoleSet = BTreeSet<String>;

/// Build a [`RoleSet`] from anything string-like.
pub fn roles<I, S>(roles: I) -> RoleSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    roles.into_iter().map(Into::into).collect()
}

/// Data type of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Date,
    Number,
    Boolean,
    Enum,
}

/// Input affordance the rendering layer should offer for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Text,
    Textarea,
    Email,
    Phone,
    Date,
    Number,
    Currency,
    Select,
    Radio,
    Checkbox,
    Hidden,
}

impl InputType {
    /// The affordance used when a field does not declare one.
    pub fn default_for(data_type: DataType) -> Self {
        match data_type {
            DataType::String => Self::Text,
            DataType::Date => Self::Date,
            DataType::Number => Self::Number,
            DataType::Boolean => Self::Checkbox,
            DataType::Enum => Self::Select,
        }
    }
}

/// Role, region, self-service and membership-type gating for a field,
/// section or form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct PermissionConfig {
    /// Roles permitted to view
    #[serde(default)]
    pub view: RoleSet,
    /// Roles permitted to edit
    #[serde(default)]
    pub edit: RoleSet,
    /// The record's owner may edit without a general edit role
    #[serde(default)]
    pub self_service: bool,
    /// Access is bounded by the actor's authorized region
    #[serde(default)]
    pub regional_restricted: bool,
    /// Membership types this applies to; `None` means all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership_types: Option<Vec<String>>,
}

impl PermissionConfig {
    /// An empty config: nobody may view or edit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set view roles.
    pub fn view<I, S>(mut self, view: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.view = roles(view);
        self
    }

    /// Builder: set edit roles.
    pub fn edit<I, S>(mut self, edit: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edit = roles(edit);
        self
    }

    /// Builder: allow the record owner to edit.
    pub fn self_service(mut self) -> Self {
        self.self_service = true;
        self
    }

    /// Builder: bound access by region.
    pub fn regional(mut self) -> Self {
        self.regional_restricted = true;
        self
    }

    /// Builder: restrict to membership types.
    pub fn membership_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.membership_types = Some(types.into_iter().map(Into::into).collect());
        self
    }
}

/// Whether a field is required: a constant, or only when a rule holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(untagged)]
pub enum Required {
    Always(bool),
    When(ConditionalRule),
}

impl Default for Required {
    fn default() -> Self {
        Self::Always(false)
    }
}

/// The check performed by a validation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationCheck {
    Required,
    MinLength { value: usize },
    MaxLength { value: usize },
    Pattern { value: String },
    Min { value: f64 },
    Max { value: f64 },
    Email,
}

impl ValidationCheck {
    /// Short name used in validation issues.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::MinLength { .. } => "min_length",
            Self::MaxLength { .. } => "max_length",
            Self::Pattern { .. } => "pattern",
            Self::Min { .. } => "min",
            Self::Max { .. } => "max",
            Self::Email => "email",
        }
    }
}

/// A validation rule, optionally applied only when `when` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ValidationRule {
    #[serde(flatten)]
    pub check: ValidationCheck,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<ConditionalRule>,
}

impl ValidationRule {
    pub fn new(check: ValidationCheck) -> Self {
        Self {
            check,
            message: None,
            when: None,
        }
    }

    /// Builder: set the message shown on failure.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Builder: only apply when the rule holds.
    pub fn when(mut self, rule: ConditionalRule) -> Self {
        self.when = Some(rule);
        self
    }
}

/// A selectable value of an enumerated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct EnumOption {
    pub value: String,
    pub label: String,
}

impl EnumOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Alternate permissions that govern editing while `rule` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalEdit {
    pub rule: ConditionalRule,
    pub permissions: PermissionConfig,
}

/// Metadata for one attribute of the membership entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Stable identifier, unique across the registry
    pub key: String,
    /// Human label
    pub label: String,
    pub data_type: DataType,
    /// Input affordance; defaults from the data type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<InputType>,
    /// Semantic group (personal, address, membership, ...)
    pub group: String,
    /// Display order within the group
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub required: Required,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<ValidationRule>,
    #[serde(default)]
    pub permissions: PermissionConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<EnumOption>,
    /// Per-option role gates, keyed by option value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub option_gates: BTreeMap<String, RoleSet>,
    /// Visible when any of these rules hold (empty = always)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub show_when: Vec<ConditionalRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_edit: Option<ConditionalEdit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed: Option<Computation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

impl FieldDefinition {
    /// Create a field with no permissions and no rules.
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        data_type: DataType,
        group: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            data_type,
            input_type: None,
            group: group.into(),
            order: 0,
            required: Required::default(),
            validations: Vec::new(),
            permissions: PermissionConfig::default(),
            options: Vec::new(),
            option_gates: BTreeMap::new(),
            show_when: Vec::new(),
            conditional_edit: None,
            computed: None,
            help_text: None,
        }
    }

    pub fn order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn input(mut self, input_type: InputType) -> Self {
        self.input_type = Some(input_type);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = Required::Always(true);
        self
    }

    pub fn required_when(mut self, rule: ConditionalRule) -> Self {
        self.required = Required::When(rule);
        self
    }

    pub fn validate(mut self, rule: ValidationRule) -> Self {
        self.validations.push(rule);
        self
    }

    pub fn permissions(mut self, permissions: PermissionConfig) -> Self {
        self.permissions = permissions;
        self
    }

    /// Builder: declare enumerated options as `(value, label)` pairs.
    pub fn options<I, V, L>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = (V, L)>,
        V: Into<String>,
        L: Into<String>,
    {
        self.options = options
            .into_iter()
            .map(|(value, label)| EnumOption::new(value, label))
            .collect();
        self
    }

    /// Builder: restrict one option to the given roles.
    pub fn gate_option<I, S>(mut self, value: impl Into<String>, gate: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.option_gates.insert(value.into(), roles(gate));
        self
    }

    pub fn show_when(mut self, rule: ConditionalRule) -> Self {
        self.show_when.push(rule);
        self
    }

    pub fn conditional_edit(mut self, rule: ConditionalRule, permissions: PermissionConfig) -> Self {
        self.conditional_edit = Some(ConditionalEdit { rule, permissions });
        self
    }

    pub fn computed(mut self, computation: Computation) -> Self {
        self.computed = Some(computation);
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help_text = Some(text.into());
        self
    }

    /// Effective input affordance.
    pub fn input_type(&self) -> InputType {
        self.input_type
            .unwrap_or_else(|| InputType::default_for(self.data_type))
    }

    pub fn is_computed(&self) -> bool {
        self.computed.is_some()
    }

    pub fn is_enum(&self) -> bool {
        self.data_type == DataType::Enum
    }
}

/// The region an actor is authorized for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionScope {
    /// May act on records of any region
    Unrestricted,
    /// May act on records of this region only
    Region(String),
    /// No region assigned
    Unassigned,
}

impl Default for RegionScope {
    fn default() -> Self {
        Self::Unassigned
    }
}

/// An already-authenticated actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable identity, compared against the record owner
    pub id: String,
    #[serde(default)]
    pub roles: RoleSet,
    #[serde(default)]
    pub region: RegionScope,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Builder: set roles.
    pub fn with_roles<I, S>(mut self, actor_roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles(actor_roles);
        self
    }

    /// Builder: authorize for one region.
    pub fn in_region(mut self, region: impl Into<String>) -> Self {
        self.region = RegionScope::Region(region.into());
        self
    }

    /// Builder: authorize for all regions.
    pub fn unrestricted(mut self) -> Self {
        self.region = RegionScope::Unrestricted;
        self
    }

    /// Check if the actor holds any of the given roles.
    pub fn has_any_role(&self, allowed: &RoleSet) -> bool {
        !self.roles.is_disjoint(allowed)
    }
}

/// A flat key/value snapshot of one membership record.
///
/// Partial records are normal (draft applications); lookups never fail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    /// An empty record, used when no snapshot is available.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set a value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// The value for `key`, treating JSON null as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// The value for `key` if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// True if the value is present and non-empty.
    pub fn is_present(&self, key: &str) -> bool {
        match self.get(key) {
            None => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Build a record from a JSON object. Returns `None` for other values.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self {
                values: map.into_iter().collect(),
            }),
            _ => None,
        }
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
