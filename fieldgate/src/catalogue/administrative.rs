use crate::catalogue::membership::PENDING_APPLICATION;
use crate::catalogue::{GroupProvider, ADMIN, MANAGERS, READ_ONLY};
use crate::compute::Computation;
use crate::rule::ConditionalRule;
use crate::types::{DataType, FieldDefinition, InputType, PermissionConfig, ValidationCheck, ValidationRule};

/// Office-internal bookkeeping.
pub struct AdministrativeGroup;

impl GroupProvider for AdministrativeGroup {
    fn group(&self) -> &'static str {
        "administrative"
    }

    fn fields(&self) -> Vec<FieldDefinition> {
        let group = self.group();
        let office = PermissionConfig::new()
            .view(MANAGERS.iter().copied().chain([READ_ONLY]))
            .edit(MANAGERS.iter().copied());

        vec![
            FieldDefinition::new("last_member_number", "Last issued number", DataType::Number, group)
                .order(1)
                .input(InputType::Hidden)
                .permissions(PermissionConfig::new().view([ADMIN]).edit([ADMIN])),
            FieldDefinition::new("next_member_number", "Next member number", DataType::Number, group)
                .order(2)
                .permissions(office.clone())
                .computed(Computation::NextSequence {
                    source: "last_member_number".into(),
                })
                .help("Assigned when the application is approved"),
            FieldDefinition::new("approved_by", "Approved by", DataType::String, group)
                .order(3)
                .show_when(ConditionalRule::not_equals("status", PENDING_APPLICATION))
                .permissions(office.clone()),
            FieldDefinition::new("notes", "Notes", DataType::String, group)
                .order(4)
                .input(InputType::Textarea)
                .validate(ValidationRule::new(ValidationCheck::MaxLength { value: 2000 }))
                .permissions(office.clone()),
            FieldDefinition::new("created_at", "Created", DataType::Date, group)
                .order(5)
                .permissions(PermissionConfig::new().view(office.view.clone())),
            FieldDefinition::new("updated_at", "Last changed", DataType::Date, group)
                .order(6)
                .permissions(PermissionConfig::new().view(office.view)),
        ]
    }
}
