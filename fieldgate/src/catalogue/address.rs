//! Postal address and the region the record belongs to.

use crate::catalogue::{member_facing, GroupProvider, ADMIN};
use crate::types::{DataType, FieldDefinition, PermissionConfig, ValidationCheck, ValidationRule};

pub const REGIONS: [(&str, &str); 4] = [
    ("north", "North"),
    ("east", "East"),
    ("south", "South"),
    ("west", "West"),
];

pub struct AddressGroup;

impl GroupProvider for AddressGroup {
    fn group(&self) -> &'static str {
        "address"
    }

    fn fields(&self) -> Vec<FieldDefinition> {
        let group = self.group();
        let own = member_facing().self_service();

        vec![
            FieldDefinition::new("street", "Street", DataType::String, group)
                .order(1)
                .required()
                .permissions(own.clone()),
            FieldDefinition::new("house_number", "No.", DataType::String, group)
                .order(2)
                .required()
                .validate(ValidationRule::new(ValidationCheck::MaxLength { value: 10 }))
                .permissions(own.clone()),
            FieldDefinition::new("postal_code", "Postal code", DataType::String, group)
                .order(3)
                .required()
                .validate(
                    ValidationRule::new(ValidationCheck::Pattern {
                        value: r"^[0-9]{4,5}$".to_string(),
                    })
                    .message("Postal codes have four or five digits"),
                )
                .permissions(own.clone()),
            FieldDefinition::new("city", "City", DataType::String, group)
                .order(4)
                .required()
                .permissions(own.clone()),
            FieldDefinition::new("country", "Country", DataType::Enum, group)
                .order(5)
                .options([("de", "Germany"), ("at", "Austria"), ("ch", "Switzerland")])
                .permissions(own),
            // Moving a record between regions is a full-admin action
            FieldDefinition::new("region", "Region", DataType::Enum, group)
                .order(6)
                .required()
                .options(REGIONS)
                .permissions(PermissionConfig::new().view(member_facing().view).edit([ADMIN])),
        ]
    }
}
