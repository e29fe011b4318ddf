//! Enum option filtering.
//!
//! Coarse field-level permission decides whether an enumerated field is shown
//! at all; per-option gates then narrow which values the actor may select.
//! An option without a gate is always retained.

use crate::types::{EnumOption, FieldDefinition, RoleSet};

/// Options of `field` selectable by an actor holding `roles`, in declared order.
pub fn filter_options<'a>(field: &'a FieldDefinition, roles: &RoleSet) -> Vec<&'a EnumOption> {
    if field.option_gates.is_empty() {
        return field.options.iter().collect();
    }

    field
        .options
        .iter()
        .filter(|option| match field.option_gates.get(&option.value) {
            Some(gate) => !gate.is_disjoint(roles),
            None => true,
        })
        .collect()
}

/// Check whether a single value is selectable by `roles`.
///
/// Values not declared as options are never selectable.
pub fn is_option_allowed(field: &FieldDefinition, value: &str, roles: &RoleSet) -> bool {
    field.options.iter().any(|option| option.value == value)
        && field
            .option_gates
            .get(value)
            .map_or(true, |gate| !gate.is_disjoint(roles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{roles, DataType};

    fn membership_type() -> FieldDefinition {
        FieldDefinition::new("membership_type", "Membership type", DataType::Enum, "membership")
            .options([
                ("regular", "Regular"),
                ("honorary", "Honorary"),
                ("youth", "Youth"),
            ])
            .gate_option("honorary", ["admin"])
    }

    fn values(options: Vec<&EnumOption>) -> Vec<&str> {
        options.into_iter().map(|o| o.value.as_str()).collect()
    }

    #[test]
    fn test_ungated_field_returns_all_in_order() {
        let field = FieldDefinition::new("gender", "Gender", DataType::Enum, "personal")
            .options([("f", "Female"), ("m", "Male"), ("x", "Other")]);
        assert_eq!(values(filter_options(&field, &RoleSet::new())), vec!["f", "m", "x"]);
    }

    #[test]
    fn test_gate_is_additive() {
        let field = membership_type();

        let admin = roles(["admin"]);
        assert_eq!(
            values(filter_options(&field, &admin)),
            vec!["regular", "honorary", "youth"]
        );

        let member = roles(["member"]);
        assert_eq!(values(filter_options(&field, &member)), vec!["regular", "youth"]);
    }

    #[test]
    fn test_is_option_allowed() {
        let field = membership_type();
        let member = roles(["member"]);

        assert!(is_option_allowed(&field, "regular", &member));
        assert!(!is_option_allowed(&field, "honorary", &member));
        assert!(!is_option_allowed(&field, "platinum", &roles(["admin"])));
    }
}
