//! Vehicle details for membership types that include roadside assistance.

use crate::catalogue::membership::{FAMILY, HONORARY, REGULAR};
use crate::catalogue::{member_facing, GroupProvider};
use crate::types::{DataType, FieldDefinition, InputType, ValidationCheck, ValidationRule};

/// Membership types the motor fields apply to.
pub const MOTOR_MEMBERSHIP_TYPES: [&str; 3] = [REGULAR, FAMILY, HONORARY];

pub struct MotorGroup;

impl GroupProvider for MotorGroup {
    fn group(&self) -> &'static str {
        "motor"
    }

    fn fields(&self) -> Vec<FieldDefinition> {
        let group = self.group();
        let permissions = member_facing()
            .self_service()
            .membership_types(MOTOR_MEMBERSHIP_TYPES);

        vec![
            FieldDefinition::new("motor_brand", "Brand", DataType::String, group)
                .order(1)
                .validate(ValidationRule::new(ValidationCheck::MaxLength { value: 60 }))
                .permissions(permissions.clone()),
            FieldDefinition::new("motor_model", "Model", DataType::String, group)
                .order(2)
                .validate(ValidationRule::new(ValidationCheck::MaxLength { value: 60 }))
                .permissions(permissions.clone()),
            FieldDefinition::new("motor_year", "Year of manufacture", DataType::Number, group)
                .order(3)
                .validate(ValidationRule::new(ValidationCheck::Min { value: 1900.0 }))
                .validate(ValidationRule::new(ValidationCheck::Max { value: 2100.0 }))
                .permissions(permissions.clone()),
            FieldDefinition::new("license_plate", "License plate", DataType::String, group)
                .order(4)
                .validate(
                    ValidationRule::new(ValidationCheck::Pattern {
                        value: r"^[A-Z0-9][A-Z0-9 -]{1,11}$".to_string(),
                    })
                    .message("Use capital letters, digits, spaces or dashes"),
                )
                .permissions(permissions.clone()),
            FieldDefinition::new("motor_insured", "Insured", DataType::Boolean, group)
                .order(5)
                .input(InputType::Checkbox)
                .permissions(permissions),
        ]
    }
}
