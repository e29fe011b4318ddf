//! Resolution scenarios against the production membership catalogue.

use fieldgate::catalogue::contexts::{
    APPLICATION_FORM, MEMBER_DETAIL, MEMBER_EDIT, TABLE_FINANCE, TABLE_MOTOR, TABLE_OVERVIEW,
};
use fieldgate::{
    membership_catalogue, Actor, FieldEngine, FixedClock, Guard, Record, ResolvedForm, Verdict,
};
use serde_json::Value;

fn engine() -> FieldEngine {
    let clock = FixedClock::ymd(2026, 10, 19).unwrap();
    FieldEngine::with_clock(membership_catalogue(), clock).expect("catalogue is valid")
}

fn member_record(region: &str) -> Record {
    Record::new()
        .with("account_id", "acc-1")
        .with("member_id", "M-0001")
        .with("first_name", "Ada")
        .with("last_name", "Byron")
        .with("birth_date", "1990-12-10")
        .with("region", region)
        .with("membership_type", "regular")
        .with("status", "active")
}

fn field_keys(form: &ResolvedForm, section: &str) -> Vec<String> {
    form.sections
        .iter()
        .find(|s| s.id == section)
        .map(|s| s.fields.iter().map(|f| f.key.clone()).collect())
        .unwrap_or_default()
}

#[test]
fn test_overview_excludes_rows_outside_region() {
    let engine = engine();
    let read_only = Actor::new("ro-1").with_roles(["read-only"]).in_region("south");
    let north = member_record("north");
    let south = member_record("south");

    assert!(!engine.can_view_row(TABLE_OVERVIEW, &read_only, &north).unwrap());
    assert!(engine.can_view_row(TABLE_OVERVIEW, &read_only, &south).unwrap());
    assert!(engine.resolve_row(TABLE_OVERVIEW, &read_only, &north).unwrap().is_none());

    let rows = vec![north.clone(), south.clone()];
    let visible = engine.filter_rows(TABLE_OVERVIEW, &read_only, &rows).unwrap();
    assert_eq!(visible, vec![&south]);

    let admin = Actor::new("adm").with_roles(["admin"]);
    assert_eq!(engine.filter_rows(TABLE_OVERVIEW, &admin, &rows).unwrap().len(), 2);
}

#[test]
fn test_pending_application_allows_self_service_edit() {
    let engine = engine();
    let applicant = Actor::new("acc-1").with_roles(["applicant"]);
    let pending = member_record("north").with("status", "pending-application");

    assert_eq!(
        engine.explain_edit("birth_date", &applicant, &pending).unwrap(),
        Verdict::AllowSelfService
    );

    let active = member_record("north");
    let member = Actor::new("acc-1").with_roles(["member"]);
    assert_eq!(
        engine.explain_edit("birth_date", &member, &active).unwrap(),
        Verdict::Deny(Guard::Role)
    );

    // Not the owner: the override grants nothing
    let other = Actor::new("acc-2").with_roles(["applicant"]);
    assert!(!engine.can_edit("birth_date", &other, &pending).unwrap());
}

#[test]
fn test_application_form_for_applicant() {
    let engine = engine();
    let applicant = Actor::new("acc-1").with_roles(["applicant"]);
    let pending = member_record("north").with("status", "pending-application");

    let form = engine.resolve_form(APPLICATION_FORM, &applicant, &pending).unwrap();
    assert!(form.can_edit);
    assert_eq!(
        field_keys(&form, "applicant"),
        vec!["first_name", "last_name", "birth_date", "gender", "email", "phone"]
    );

    let applicant_section = &form.sections[0];
    let birth = applicant_section.fields.iter().find(|f| f.key == "birth_date").unwrap();
    assert!(!birth.read_only);

    let membership = form.sections.iter().find(|s| s.id == "membership").unwrap();
    let kind = &membership.fields[0];
    let options: Vec<&str> = kind.options.iter().map(|o| o.value.as_str()).collect();
    assert_eq!(options, vec!["regular", "youth", "family", "supporting"]);
    assert!(membership.fields[1].read_only);
    assert_eq!(membership.fields[1].key, "status");

    assert_eq!(
        field_keys(&form, "motor"),
        vec!["motor_brand", "motor_model", "motor_year", "license_plate"]
    );
}

#[test]
fn test_membership_type_veto_beats_admin() {
    let engine = engine();
    let admin = Actor::new("adm").with_roles(["admin"]).unrestricted();
    let youth = member_record("north")
        .with("membership_type", "youth")
        .with("motor_brand", "Vespa");

    assert_eq!(
        engine.explain_view("motor_brand", &admin, &youth).unwrap(),
        Verdict::Deny(Guard::MembershipType)
    );
    assert!(!engine.can_edit("motor_brand", &admin, &youth).unwrap());

    let detail = engine.resolve_form(MEMBER_DETAIL, &admin, &youth).unwrap();
    assert!(detail.sections.iter().all(|s| s.id != "motor"));

    let row = engine.resolve_row(TABLE_MOTOR, &admin, &youth).unwrap().unwrap();
    let brand = row.cells.iter().find(|c| c.field == "motor_brand").unwrap();
    assert_eq!(brand.value, None);
}

#[test]
fn test_honorary_option_needs_admin() {
    let engine = engine();
    let record = member_record("north");

    let regional = Actor::new("ra").with_roles(["regional-admin"]).in_region("north");
    let form = engine.resolve_form(MEMBER_EDIT, &regional, &record).unwrap();
    let membership = form.sections.iter().find(|s| s.id == "membership").unwrap();
    let kind = membership.fields.iter().find(|f| f.key == "membership_type").unwrap();
    assert!(kind.options.iter().all(|o| o.value != "honorary"));
    assert!(!kind.read_only);

    let admin = Actor::new("adm").with_roles(["admin"]);
    let honorary: Vec<String> = engine
        .filter_options("membership_type", &admin.roles)
        .unwrap()
        .into_iter()
        .map(|o| o.value.clone())
        .collect();
    assert!(honorary.contains(&"honorary".to_string()));
}

#[test]
fn test_guardian_at_the_majority_boundary() {
    let engine = engine();
    let admin = Actor::new("adm").with_roles(["admin"]);
    let minor = member_record("north").with("birth_date", "2008-10-20");
    let adult = member_record("north").with("birth_date", "2008-10-19");

    assert!(engine.is_required("guardian_name", &minor).unwrap());
    assert!(!engine.is_required("guardian_name", &adult).unwrap());

    let minor_form = engine.resolve_form(MEMBER_EDIT, &admin, &minor).unwrap();
    let adult_form = engine.resolve_form(MEMBER_EDIT, &admin, &adult).unwrap();
    assert!(field_keys(&minor_form, "personal").contains(&"guardian_name".to_string()));
    assert!(!field_keys(&adult_form, "personal").contains(&"guardian_name".to_string()));

    let guardian = minor_form.sections[0]
        .fields
        .iter()
        .find(|f| f.key == "guardian_name")
        .unwrap();
    assert!(guardian.required);
    assert_eq!(guardian.span, 12);
}

#[test]
fn test_financial_fields_are_regional() {
    let engine = engine();
    let south = member_record("south").with("iban", "DE89370400440532013000");

    let regional = Actor::new("ra").with_roles(["regional-admin"]).in_region("north");
    assert_eq!(
        engine.explain_view("iban", &regional, &south).unwrap(),
        Verdict::Deny(Guard::Region)
    );

    let treasurer = Actor::new("tr").with_roles(["treasurer"]);
    assert!(engine.can_view("iban", &treasurer, &south).unwrap());
    assert!(engine.can_edit("iban", &treasurer, &south).unwrap());

    let form = engine.resolve_form(MEMBER_DETAIL, &regional, &south).unwrap();
    assert!(form.sections.iter().all(|s| s.id != "financial"));
}

#[test]
fn test_rows_carry_computed_values() {
    let engine = engine();
    let admin = Actor::new("adm").with_roles(["admin"]);
    let record = member_record("north").with("birth_date", "2000-01-01");

    let row = engine.resolve_row(TABLE_OVERVIEW, &admin, &record).unwrap().unwrap();
    let age = row.cells.iter().find(|c| c.field == "age").unwrap();
    assert_eq!(age.value, Some(Value::from(26)));
    let city = row.cells.iter().find(|c| c.field == "city").unwrap();
    assert_eq!(city.value, None);
}

#[test]
fn test_export_follows_roles() {
    let engine = engine();
    let read_only = Actor::new("ro").with_roles(["read-only"]);
    let admin = Actor::new("adm").with_roles(["admin"]);
    let treasurer = Actor::new("tr").with_roles(["treasurer"]);

    assert!(!engine.resolve_table(TABLE_OVERVIEW, &read_only).unwrap().export_allowed);
    assert!(engine.resolve_table(TABLE_OVERVIEW, &admin).unwrap().export_allowed);
    assert!(engine.resolve_table(TABLE_FINANCE, &treasurer).unwrap().export_allowed);

    let finance = engine.resolve_table(TABLE_FINANCE, &read_only).unwrap();
    assert!(finance.columns.is_empty());
    assert!(!finance.export_allowed);
}

#[test]
fn test_submission_checks_required_and_options() {
    let engine = engine();
    let applicant = Actor::new("acc-1").with_roles(["applicant"]);
    let submission = member_record("north")
        .with("status", "pending-application")
        .with("membership_type", "honorary")
        .with("postal_code", "ABC");

    let issues = engine
        .validate_submission(APPLICATION_FORM, &applicant, &submission)
        .unwrap();
    let found: Vec<(&str, &str)> = issues
        .iter()
        .map(|i| (i.field.as_str(), i.check.as_str()))
        .collect();

    assert!(found.contains(&("email", "required")));
    assert!(found.contains(&("membership_type", "option")));
    assert!(found.contains(&("postal_code", "pattern")));
    // Read-only status is never reported
    assert!(found.iter().all(|(field, _)| *field != "status"));
}

#[test]
fn test_member_sees_own_record_read_only_where_required() {
    let engine = engine();
    let member = Actor::new("acc-1").with_roles(["member"]);
    let record = member_record("north");

    let form = engine.resolve_form(MEMBER_EDIT, &member, &record).unwrap();
    assert!(form.can_edit);

    let personal = &form.sections[0];
    let first = personal.fields.iter().find(|f| f.key == "first_name").unwrap();
    let birth = personal.fields.iter().find(|f| f.key == "birth_date").unwrap();
    let age = personal.fields.iter().find(|f| f.key == "age").unwrap();
    assert!(!first.read_only);
    assert!(birth.read_only);
    assert!(age.read_only);
    assert_eq!(age.computed_value, Some(Value::from(35)));

    // Office and finance sections are staff-only
    assert!(form.sections.iter().all(|s| s.id != "administrative" && s.id != "financial"));
}

#[test]
fn test_dumped_catalogue_loads() {
    let yaml = membership_catalogue().to_yaml().unwrap();
    let engine = FieldEngine::from_yaml(&yaml).unwrap();
    assert_eq!(engine.fingerprint(), membership_catalogue().fingerprint());
}

#[test]
fn test_regional_admin_keeps_stored_honorary_membership() {
    let engine = engine();
    let regional = Actor::new("ra").with_roles(["regional-admin"]).in_region("north");
    let stored = member_record("north").with("membership_type", "honorary");
    let edited = stored.clone().with("last_name", "King");

    let option_issues = |issues: Vec<fieldgate::ValidationIssue>| {
        issues
            .into_iter()
            .filter(|i| i.field == "membership_type")
            .map(|i| i.check)
            .collect::<Vec<_>>()
    };

    let kept = engine
        .validate_update(MEMBER_EDIT, &regional, &stored, &edited)
        .unwrap();
    assert!(option_issues(kept).is_empty());

    // Choosing the gated value is still refused
    let promoted = member_record("north").with("membership_type", "honorary");
    let changed = engine
        .validate_update(MEMBER_EDIT, &regional, &member_record("north"), &promoted)
        .unwrap();
    assert_eq!(option_issues(changed), vec!["option"]);

    // Without a stored snapshot every value counts as newly chosen
    let fresh = engine.validate_submission(MEMBER_EDIT, &regional, &edited).unwrap();
    assert_eq!(option_issues(fresh), vec!["option"]);
}
