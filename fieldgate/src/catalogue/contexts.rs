//! Named tables and forms of the membership catalogue.

use crate::catalogue::membership::PENDING_APPLICATION;
use crate::catalogue::motor::MOTOR_MEMBERSHIP_TYPES;
use crate::catalogue::{staff_and, ADMIN, APPLICANT, MANAGERS, MEMBER, READ_ONLY, REGIONAL_ADMIN, STAFF, TREASURER};
use crate::context::{
    Alignment, BindingPatch, ColumnBinding, FieldBinding, FormContext, GroupReference, Section,
    SortDirection, TableContext, TablePermissions,
};
use crate::rule::ConditionalRule;
use crate::types::PermissionConfig;

pub const TABLE_OVERVIEW: &str = "table-overview";
pub const TABLE_FINANCE: &str = "table-finance";
pub const TABLE_MOTOR: &str = "table-motor";
pub const TABLE_APPLICATIONS: &str = "table-applications";
pub const MEMBER_DETAIL: &str = "member-detail";
pub const MEMBER_EDIT: &str = "member-edit";
pub const APPLICATION_FORM: &str = "application-form";

const FINANCE_VIEW: [&str; 3] = [ADMIN, REGIONAL_ADMIN, TREASURER];

fn read_only(view: Vec<String>) -> PermissionConfig {
    PermissionConfig::new().view(view)
}

fn maintained(view: Vec<String>) -> PermissionConfig {
    PermissionConfig::new()
        .view(view)
        .edit(MANAGERS.iter().copied())
        .self_service()
}

fn uses_motor() -> ConditionalRule {
    ConditionalRule::contains("membership_type", MOTOR_MEMBERSHIP_TYPES)
}

pub fn tables() -> Vec<TableContext> {
    vec![
        TableContext::new(TABLE_OVERVIEW, TablePermissions::new(STAFF.iter().copied()).export([ADMIN]))
            .title("Members")
            .column(ColumnBinding::new("member_id").width(120).sortable().sticky())
            .column(ColumnBinding::new("last_name").sortable().filterable())
            .column(ColumnBinding::new("first_name").sortable())
            .column(ColumnBinding::new("city").filterable())
            .column(ColumnBinding::new("region").filterable())
            .column(ColumnBinding::new("membership_type").filterable())
            .column(ColumnBinding::new("status").filterable())
            .column(ColumnBinding::new("age").sortable().align(Alignment::Right))
            .sort_by("last_name", SortDirection::Asc)
            .page_size(50)
            .exportable()
            .regional(),
        TableContext::new(TABLE_FINANCE, TablePermissions::new(FINANCE_VIEW).export([ADMIN, TREASURER]))
            .title("Fees")
            .column(ColumnBinding::new("member_id").width(120).sticky())
            .column(ColumnBinding::new("full_name").sortable())
            .column(ColumnBinding::new("payment_method").filterable())
            .column(ColumnBinding::new("annual_fee").align(Alignment::Right))
            .column(ColumnBinding::new("paid_until").sortable())
            .column(ColumnBinding::new("outstanding_balance").sortable().align(Alignment::Right))
            .sort_by("outstanding_balance", SortDirection::Desc)
            .exportable()
            .regional(),
        TableContext::new(TABLE_MOTOR, TablePermissions::new(STAFF.iter().copied()))
            .title("Vehicles")
            .column(ColumnBinding::new("member_id").width(120).sticky())
            .column(ColumnBinding::new("full_name"))
            .column(ColumnBinding::new("membership_type").filterable())
            .column(ColumnBinding::new("motor_brand").sortable().filterable())
            .column(ColumnBinding::new("motor_model"))
            .column(ColumnBinding::new("motor_year").align(Alignment::Right))
            .column(ColumnBinding::new("license_plate"))
            .sort_by("motor_brand", SortDirection::Asc)
            .regional(),
        TableContext::new(TABLE_APPLICATIONS, TablePermissions::new(MANAGERS.iter().copied()))
            .title("Open applications")
            .column(ColumnBinding::new("full_name").sortable())
            .column(ColumnBinding::new("birth_date"))
            .column(ColumnBinding::new("age").align(Alignment::Right))
            .column(ColumnBinding::new("city"))
            .column(ColumnBinding::new("membership_type"))
            .column(ColumnBinding::new("status").hidden())
            .sort_by("full_name", SortDirection::Asc)
            .page_size(10)
            .regional(),
    ]
}

pub fn forms() -> Vec<FormContext> {
    vec![member_detail(), member_edit(), application_form()]
}

/// Read-only record view. No section grants edit.
fn member_detail() -> FormContext {
    let everyone = staff_and(&[MEMBER]);

    FormContext::new(MEMBER_DETAIL, read_only(everyone.clone()))
        .title("Member")
        .section(
            Section::new("personal", "Personal details", 1, read_only(everyone.clone()))
                .group(GroupReference::new("personal").exclude(["first_name", "last_name"])),
        )
        .section(Section::new("address", "Address", 2, read_only(everyone.clone())).group(GroupReference::new("address")))
        .section(
            Section::new("membership", "Membership", 3, read_only(everyone.clone()))
                .group(GroupReference::new("membership").exclude(["account_id"])),
        )
        .section(
            Section::new("motor", "Vehicle", 4, read_only(everyone))
                .collapsible(false)
                .group(GroupReference::new("motor")),
        )
        .section(
            Section::new("financial", "Fees", 5, read_only(FINANCE_VIEW.map(String::from).to_vec()))
                .collapsible(false)
                .group(GroupReference::new("financial")),
        )
        .section(
            Section::new(
                "administrative",
                "Office",
                6,
                read_only(MANAGERS.iter().chain([&READ_ONLY]).map(|r| r.to_string()).collect()),
            )
            .collapsible(false)
            .group(GroupReference::new("administrative").exclude(["last_member_number"])),
        )
}

fn member_edit() -> FormContext {
    let everyone = staff_and(&[MEMBER]);
    let form = PermissionConfig::new()
        .view(everyone.clone())
        .edit(MANAGERS.iter().copied().chain([TREASURER]))
        .self_service();

    FormContext::new(MEMBER_EDIT, form)
        .title("Edit member")
        .section(
            Section::new("personal", "Personal details", 1, maintained(everyone.clone())).group(
                GroupReference::new("personal")
                    .exclude(["full_name"])
                    .patch("guardian_name", BindingPatch::new().span(12))
                    .patch("emergency_contact", BindingPatch::new().span(12)),
            ),
        )
        .section(
            Section::new("address", "Address", 2, maintained(everyone.clone())).group(
                GroupReference::new("address")
                    .patch("street", BindingPatch::new().span(8))
                    .patch("house_number", BindingPatch::new().span(4))
                    .patch("postal_code", BindingPatch::new().span(4))
                    .patch("city", BindingPatch::new().span(8)),
            ),
        )
        .section(
            Section::new("membership", "Membership", 3, maintained(everyone.clone()))
                .group(GroupReference::new("membership").exclude(["account_id", "join_year"])),
        )
        .section(
            Section::new("motor", "Vehicle", 4, maintained(everyone))
                .collapsible(true)
                .show_when(uses_motor())
                .group(GroupReference::new("motor")),
        )
        .section(
            Section::new(
                "financial",
                "Fees",
                5,
                PermissionConfig::new()
                    .view(FINANCE_VIEW)
                    .edit([ADMIN, TREASURER])
                    .regional(),
            )
            .group(GroupReference::new("financial")),
        )
        .section(
            Section::new(
                "administrative",
                "Office",
                6,
                PermissionConfig::new()
                    .view(MANAGERS.iter().copied())
                    .edit(MANAGERS.iter().copied()),
            )
            .collapsible(false)
            .group(GroupReference::new("administrative")),
        )
}

/// The form an applicant fills in before admission.
fn application_form() -> FormContext {
    let audience: Vec<String> = MANAGERS.iter().chain([&APPLICANT]).map(|r| r.to_string()).collect();
    let pending = ConditionalRule::equals("status", PENDING_APPLICATION);

    FormContext::new(APPLICATION_FORM, maintained(audience.clone()))
        .title("Membership application")
        .section(
            Section::new("applicant", "About you", 1, maintained(audience.clone())).group(
                GroupReference::new("personal")
                    .include(["first_name", "last_name", "birth_date", "gender", "guardian_name", "email", "phone"])
                    .patch("guardian_name", BindingPatch::new().span(12)),
            ),
        )
        .section(
            Section::new("address", "Address", 2, maintained(audience.clone()))
                .group(GroupReference::new("address").exclude(["region"])),
        )
        .section(
            Section::new("membership", "Membership", 3, maintained(audience.clone()))
                .field(FieldBinding::new("membership_type").span(12))
                .field(FieldBinding::new("status").read_only().show_when(pending)),
        )
        .section(
            Section::new("motor", "Vehicle", 4, maintained(audience))
                .show_when(uses_motor())
                .group(GroupReference::new("motor").exclude(["motor_insured"])),
        )
}
