//! Personal details: names, birth date, contact data.

use crate::catalogue::membership::PENDING_APPLICATION;
use crate::catalogue::{member_facing, GroupProvider, MANAGERS, MEMBER};
use crate::compute::Computation;
use crate::rule::ConditionalRule;
use crate::types::{DataType, FieldDefinition, InputType, ValidationCheck, ValidationRule};

/// Age below which a guardian must be named.
pub const MAJORITY_AGE: u32 = 18;

/// Provider for the personal group.
pub struct PersonalGroup;

impl GroupProvider for PersonalGroup {
    fn group(&self) -> &'static str {
        "personal"
    }

    fn fields(&self) -> Vec<FieldDefinition> {
        let group = self.group();
        let self_service = member_facing().self_service();
        let minor = ConditionalRule::age_less_than("birth_date", MAJORITY_AGE);

        vec![
            FieldDefinition::new("first_name", "First name", DataType::String, group)
                .order(1)
                .required()
                .validate(ValidationRule::new(ValidationCheck::MaxLength { value: 100 }))
                .permissions(self_service.clone()),
            FieldDefinition::new("last_name", "Last name", DataType::String, group)
                .order(2)
                .required()
                .validate(ValidationRule::new(ValidationCheck::MaxLength { value: 100 }))
                .permissions(self_service.clone()),
            FieldDefinition::new("full_name", "Name", DataType::String, group)
                .order(3)
                .permissions(member_facing())
                .computed(Computation::concat(["first_name", "last_name"])),
            // Applicants may correct their birth date until the application is decided
            FieldDefinition::new("birth_date", "Date of birth", DataType::Date, group)
                .order(4)
                .required()
                .permissions(member_facing())
                .conditional_edit(
                    ConditionalRule::equals("status", PENDING_APPLICATION),
                    member_facing().self_service(),
                ),
            FieldDefinition::new("age", "Age", DataType::Number, group)
                .order(5)
                .permissions(member_facing())
                .computed(Computation::AgeFromDate {
                    source: "birth_date".into(),
                }),
            FieldDefinition::new("gender", "Gender", DataType::Enum, group)
                .order(6)
                .input(InputType::Radio)
                .options([
                    ("female", "Female"),
                    ("male", "Male"),
                    ("diverse", "Diverse"),
                    ("unspecified", "Prefer not to say"),
                ])
                .permissions(self_service.clone()),
            FieldDefinition::new("guardian_name", "Guardian", DataType::String, group)
                .order(7)
                .required_when(minor.clone())
                .show_when(minor)
                .permissions(self_service.clone())
                .help("Required for members under 18"),
            FieldDefinition::new("email", "Email", DataType::String, group)
                .order(8)
                .input(InputType::Email)
                .required()
                .validate(ValidationRule::new(ValidationCheck::Email))
                .permissions(self_service.clone()),
            FieldDefinition::new("phone", "Phone", DataType::String, group)
                .order(9)
                .input(InputType::Phone)
                .validate(
                    ValidationRule::new(ValidationCheck::Pattern {
                        value: r"^\+?[0-9 ()/-]{6,20}$".to_string(),
                    })
                    .message("Enter a phone number with digits only"),
                )
                .permissions(self_service.clone()),
            FieldDefinition::new("emergency_contact", "Emergency contact", DataType::String, group)
                .order(10)
                .input(InputType::Textarea)
                .permissions(self_service.view(MANAGERS.iter().copied().chain([MEMBER]))),
        ]
    }
}
