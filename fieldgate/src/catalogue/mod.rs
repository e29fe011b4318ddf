//! The production membership catalogue.
//!
//! Each semantic group contributes its fields through a [`GroupProvider`];
//! the named tables and forms built on top of them live in [`contexts`].

pub mod address;
pub mod administrative;
pub mod contexts;
pub mod financial;
pub mod membership;
pub mod motor;
pub mod personal;

pub use address::AddressGroup;
pub use administrative::AdministrativeGroup;
pub use financial::FinancialGroup;
pub use membership::MembershipGroup;
pub use motor::MotorGroup;
pub use personal::PersonalGroup;

use crate::config::{EngineConfig, EngineSettings};
use crate::types::{roles, FieldDefinition, PermissionConfig};

/// Full administration, all regions.
pub const ADMIN: &str = "admin";
/// Administration bounded to the actor's own region.
pub const REGIONAL_ADMIN: &str = "regional-admin";
/// Finance staff, all regions.
pub const TREASURER: &str = "treasurer";
pub const READ_ONLY: &str = "read-only";
/// An admitted member acting on their own record.
pub const MEMBER: &str = "member";
/// Someone whose application is not yet decided.
pub const APPLICANT: &str = "applicant";

/// Roles that work on other people's records.
pub const STAFF: &[&str] = &[ADMIN, REGIONAL_ADMIN, TREASURER, READ_ONLY];
/// Roles that maintain member data.
pub const MANAGERS: &[&str] = &[ADMIN, REGIONAL_ADMIN];

/// Trait for group-specific field definitions.
pub trait GroupProvider: Send + Sync {
    /// The semantic group this provider handles
    fn group(&self) -> &'static str;

    /// Field definitions of the group, in display order
    fn fields(&self) -> Vec<FieldDefinition>;
}

/// All group providers, in registry order.
pub fn providers() -> Vec<Box<dyn GroupProvider>> {
    vec![
        Box::new(PersonalGroup),
        Box::new(AddressGroup),
        Box::new(MembershipGroup),
        Box::new(MotorGroup),
        Box::new(FinancialGroup),
        Box::new(AdministrativeGroup),
    ]
}

/// Staff plus the given extra roles.
pub(crate) fn staff_and(extra: &[&str]) -> Vec<String> {
    STAFF
        .iter()
        .chain(extra)
        .map(|role| role.to_string())
        .collect()
}

/// Visible to staff, the member and the applicant; maintained by managers.
pub(crate) fn member_facing() -> PermissionConfig {
    PermissionConfig::new()
        .view(staff_and(&[MEMBER, APPLICANT]))
        .edit(MANAGERS.iter().copied())
}

/// The complete catalogue with its contexts and settings.
pub fn membership_catalogue() -> EngineConfig {
    let fields = providers()
        .iter()
        .flat_map(|provider| provider.fields())
        .collect();

    let settings = EngineSettings {
        unrestricted_region_roles: roles([ADMIN, TREASURER]),
        ..EngineSettings::default()
    };

    let mut config = EngineConfig::new(fields).with_settings(settings);
    config.tables = contexts::tables();
    config.forms = contexts::forms();
    config
}
