//! Error taxonomy.
//!
//! Configuration errors are deployment defects and refuse service. Permission
//! denials and malformed records are not errors: they only change the
//! resolved output.

/// A defect in the declarative configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Two fields share a key
    #[error("Duplicate field key: {0}")]
    DuplicateField(String),

    /// Two contexts share a name
    #[error("Duplicate context name: {0}")]
    DuplicateContext(String),

    /// A binding, rule or column references a key missing from the registry
    #[error("Unknown field '{field}' referenced at {location}")]
    UnknownField { location: String, field: String },

    /// A group reference names a group with no members
    #[error("Unknown group '{group}' referenced at {location}")]
    UnknownGroup { location: String, group: String },

    /// An include/exclude/override key is not a member of the group
    #[error("Field '{field}' is not a member of group '{group}' at {location}")]
    FieldNotInGroup {
        location: String,
        group: String,
        field: String,
    },

    /// A computed field reads a key missing from the registry
    #[error("Computed field '{field}' reads unknown source '{source_key}'")]
    UnknownComputedSource { field: String, source_key: String },

    /// A rule is malformed for the field it reads
    #[error("Invalid rule at {location}: {reason}")]
    InvalidRule { location: String, reason: String },

    /// A field definition is internally inconsistent
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// A per-option gate is malformed
    #[error("Invalid option gate '{option}' on field '{field}': {reason}")]
    InvalidOptionGate {
        field: String,
        option: String,
        reason: String,
    },

    /// A validation pattern does not compile
    #[error("Invalid pattern '{pattern}' on field '{field}': {reason}")]
    InvalidPattern {
        field: String,
        pattern: String,
        reason: String,
    },

    /// A context is malformed (sort key, page size, span, ...)
    #[error("Invalid context at {location}: {reason}")]
    InvalidContext { location: String, reason: String },

    /// An engine setting is out of range
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    /// Several defects found by the integrity pass
    #[error("{} configuration errors; first: {}", .0.len(), first_error(.0))]
    Invalid(Vec<ConfigError>),

    /// YAML could not be parsed
    #[error("Failed to parse YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON could not be parsed
    #[error("Failed to parse JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file could not be read
    #[error("Failed to read configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn first_error(errors: &[ConfigError]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

impl ConfigError {
    /// Collapse integrity findings into a single error, if any.
    pub fn from_findings(mut findings: Vec<ConfigError>) -> Option<Self> {
        match findings.len() {
            0 => None,
            1 => findings.pop(),
            _ => Some(Self::Invalid(findings)),
        }
    }

    /// All individual findings carried by this error.
    pub fn findings(&self) -> Vec<&ConfigError> {
        match self {
            Self::Invalid(errors) => errors.iter().collect(),
            other => vec![other],
        }
    }
}

/// A caller-facing failure while resolving a context.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No context with this name is configured
    #[error("Unknown context: {0}")]
    UnknownContext(String),

    /// The context exists but is of another kind
    #[error("Context '{name}' is not a {expected} context")]
    WrongContextKind { name: String, expected: &'static str },

    /// No field with this key is registered
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// The configuration graph is inconsistent
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result alias for resolution calls.
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
