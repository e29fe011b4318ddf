//! Field-level authorization and presentation resolution.
//!
//! A single registry of field metadata is combined with named contexts
//! (tables and forms), role-based permissions, regional and membership-type
//! restrictions, and data-dependent conditional rules to produce one
//! unambiguous decision per field per request:
//!
//! - **Rules**: declarative predicates over a record (`equals`, `contains`,
//!   `exists`, `age_less_than`, ...)
//! - **Permissions**: an ordered guard sequence where the membership-type
//!   veto always runs first
//! - **Contexts**: table views and sectioned forms, with bulk inclusion of
//!   semantic groups
//!
//! # Key Components
//!
//! - [`FieldEngine`]: validated configuration plus every resolution call
//! - [`PermissionResolver`]: view/edit decisions with explanations
//! - [`Composer`]: resolved columns, rows and form sections
//! - [`membership_catalogue`]: the production field catalogue
//!
//! # Example
//!
//! ```ignore
//! use fieldgate::{membership_catalogue, Actor, FieldEngine, Record};
//!
//! let engine = FieldEngine::new(membership_catalogue())?;
//! let actor = Actor::new("acc-17").with_roles(["member"]);
//! let record = Record::new().with("account_id", "acc-17");
//! let form = engine.resolve_form("member-edit", &actor, &record)?;
//! ```

pub mod cache;
pub mod catalogue;
pub mod clock;
pub mod compose;
pub mod compute;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod integrity;
pub mod options;
pub mod permission;
pub mod registry;
pub mod rule;
pub mod types;
pub mod validation;

// Re-export main types
pub use cache::{CacheStats, ResolutionCache};
pub use catalogue::membership_catalogue;
pub use clock::{Clock, FixedClock, SystemClock};
pub use compose::{
    Composer, ResolvedCell, ResolvedColumn, ResolvedField, ResolvedForm, ResolvedRow,
    ResolvedSection, ResolvedTable,
};
pub use compute::Computation;
pub use config::{CacheSettings, EngineConfig, EngineSettings, RecordKeys};
pub use context::*;
pub use engine::FieldEngine;
pub use error::{ConfigError, ResolveError};
pub use options::{filter_options, is_option_allowed};
pub use permission::{Guard, PermissionResolver, Verdict};
pub use registry::FieldRegistry;
pub use rule::{ConditionalRule, RuleEvaluator};
pub use types::*;
pub use validation::{ValidationIssue, Validator};
