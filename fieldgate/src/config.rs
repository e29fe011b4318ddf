//! Declarative engine configuration.
//!
//! The full configuration graph (fields, table contexts, form contexts and
//! settings) is one serde document, loadable from YAML or JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::context::{FormContext, TableContext};
use crate::error::ConfigError;
use crate::types::{roles, FieldDefinition, RoleSet};

/// The complete declarative configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub settings: EngineSettings,
    /// Field registry, in declaration order
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub tables: Vec<TableContext>,
    #[serde(default)]
    pub forms: Vec<FormContext>,
}

impl EngineConfig {
    /// Create a config with default settings.
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    /// Builder: add a table context.
    pub fn table(mut self, table: TableContext) -> Self {
        self.tables.push(table);
        self
    }

    /// Builder: add a form context.
    pub fn form(mut self, form: FormContext) -> Self {
        self.forms.push(form);
        self
    }

    /// Builder: replace settings.
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load config from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a file; `.json` is read as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&raw),
            _ => Self::from_yaml(&raw),
        }
    }

    /// SHA-256 over the canonical JSON form, for audit logs and cache keys.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(self).unwrap_or_default());
        hex::encode(hasher.finalize())
    }
}

/// Which record fields carry owner identity, region and membership type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordKeys {
    pub owner: String,
    pub region: String,
    pub membership_type: String,
}

impl Default for RecordKeys {
    fn default() -> Self {
        Self {
            owner: "account_id".to_string(),
            region: "region".to_string(),
            membership_type: "membership_type".to_string(),
        }
    }
}

/// Resolution cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Enable caching of resolved tables and forms
    pub enabled: bool,
    /// Entries kept before the cache is flushed
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: 1024,
        }
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub record_keys: RecordKeys,
    /// Roles that bypass regional restriction
    pub unrestricted_region_roles: RoleSet,
    /// Grid span for bindings that declare none (1-12)
    pub default_span: u8,
    pub cache: CacheSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            record_keys: RecordKeys::default(),
            unrestricted_region_roles: roles(["admin"]),
            default_span: 6,
            cache: CacheSettings::default(),
        }
    }
}
