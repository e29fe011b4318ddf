//! Membership standing: identifiers, type, status and dates.

use crate::catalogue::{member_facing, staff_and, GroupProvider, ADMIN, MANAGERS, MEMBER};
use crate::compute::Computation;
use crate::rule::ConditionalRule;
use crate::types::{DataType, FieldDefinition, InputType, PermissionConfig};

pub const PENDING_APPLICATION: &str = "pending-application";
pub const ACTIVE: &str = "active";
pub const SUSPENDED: &str = "suspended";
pub const RESIGNED: &str = "resigned";
pub const DECEASED: &str = "deceased";

pub const REGULAR: &str = "regular";
pub const YOUTH: &str = "youth";
pub const FAMILY: &str = "family";
pub const SUPPORTING: &str = "supporting";
pub const HONORARY: &str = "honorary";

pub struct MembershipGroup;

impl GroupProvider for MembershipGroup {
    fn group(&self) -> &'static str {
        "membership"
    }

    fn fields(&self) -> Vec<FieldDefinition> {
        let group = self.group();
        let admin_only = PermissionConfig::new()
            .view(staff_and(&[MEMBER]))
            .edit([ADMIN]);
        let ended = ConditionalRule::contains("status", [RESIGNED, DECEASED]);

        vec![
            FieldDefinition::new("member_id", "Member number", DataType::String, group)
                .order(1)
                .permissions(admin_only.clone()),
            FieldDefinition::new("account_id", "Account", DataType::String, group)
                .order(2)
                .input(InputType::Hidden)
                .permissions(PermissionConfig::new().view([ADMIN]).edit([ADMIN])),
            FieldDefinition::new("membership_type", "Membership type", DataType::Enum, group)
                .order(3)
                .required()
                .options([
                    (REGULAR, "Regular"),
                    (YOUTH, "Youth"),
                    (FAMILY, "Family"),
                    (SUPPORTING, "Supporting"),
                    (HONORARY, "Honorary"),
                ])
                .gate_option(HONORARY, [ADMIN])
                .permissions(member_facing())
                .conditional_edit(
                    ConditionalRule::equals("status", PENDING_APPLICATION),
                    member_facing().self_service(),
                ),
            FieldDefinition::new("status", "Status", DataType::Enum, group)
                .order(4)
                .options([
                    (PENDING_APPLICATION, "Application pending"),
                    (ACTIVE, "Active"),
                    (SUSPENDED, "Suspended"),
                    (RESIGNED, "Resigned"),
                    (DECEASED, "Deceased"),
                ])
                .gate_option(DECEASED, MANAGERS.iter().copied())
                .permissions(member_facing()),
            FieldDefinition::new("join_date", "Member since", DataType::Date, group)
                .order(5)
                .permissions(admin_only.clone()),
            FieldDefinition::new("membership_years", "Years of membership", DataType::Number, group)
                .order(6)
                .permissions(admin_only.clone())
                .computed(Computation::YearsSince {
                    source: "join_date".into(),
                }),
            FieldDefinition::new("join_year", "Year joined", DataType::Number, group)
                .order(7)
                .permissions(admin_only.clone())
                .computed(Computation::YearOf {
                    source: "join_date".into(),
                }),
            FieldDefinition::new("end_date", "Membership ended", DataType::Date, group)
                .order(8)
                .show_when(ended)
                .required_when(ConditionalRule::equals("status", RESIGNED))
                .permissions(PermissionConfig::new().view(staff_and(&[])).edit(MANAGERS.iter().copied())),
        ]
    }
}
