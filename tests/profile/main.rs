use serde_json::json;

use rsm_audit::{
    error::RsmErrorKind,
    profile::{ProfileValidationError, ResourcesProfile},
    resources::{
        availability::{Amount, AvailabilityLedger},
        key::{ResourceKey, Scope},
    },
};

fn ledger(entries: &[(&str, &str, f64, f64)]) -> AvailabilityLedger {
    let mut ledger = AvailabilityLedger::new();
    for &(project, resource, quota, usage) in entries {
        ledger
            .record(
                ResourceKey::for_project(project, "apic", resource),
                Some(quota),
                Some(Amount::Value(usage)),
            )
            .expect("ledger write should succeed");
    }
    ledger
}

#[test]
fn given_commented_profile_text_when_parsed_then_requirements_are_read() {
    let profile = ResourcesProfile::parse(
        r#"{
            // tenant-wide limits
            global: { apic: { tenant: 1 } },
            project: { apic: { bd: "2", epg: 3.5 } },
        }"#,
    )
    .expect("profile should parse");

    assert_eq!(profile.len(), 3);
    assert_eq!(
        profile.get(&ResourceKey::new(Scope::Project, "apic", "bd", None)),
        Some(2.0)
    );
    assert_eq!(
        profile.get(&ResourceKey::new(Scope::Project, "apic", "epg", None)),
        Some(3.5)
    );
}

#[test]
fn given_unknown_scope_or_non_numeric_value_when_parsed_then_entry_is_dropped() {
    let profile = ResourcesProfile::from_value(&json!({
        "tenant": {"apic": {"bd": 1}},
        "project": {"apic": {"bd": "many", "epg": true, "vrf": 2}}
    }))
    .expect("profile should parse");

    assert_eq!(profile.len(), 1);
    assert_eq!(profile.requirements()[0].0.resource_name(), "vrf");
}

#[test]
fn given_malformed_profile_when_parsed_then_invalid_profile_is_returned() {
    let err = ResourcesProfile::parse("{project: [1, 2]}").expect_err("list is not a mapping");
    assert_eq!(err.kind, RsmErrorKind::InvalidProfile);

    let err = ResourcesProfile::parse("{project: ").expect_err("truncated text");
    assert_eq!(err.kind, RsmErrorKind::InvalidProfile);
}

#[test]
fn given_mixed_outcomes_when_validated_then_each_failing_requirement_is_reported() {
    let profile = ResourcesProfile::from_value(&json!({
        "project": {"apic": {"bd": 2, "epg": 5, "vrf": 1}}
    }))
    .expect("profile should parse");
    let ledger = ledger(&[("p1", "bd", 10.0, 1.0), ("p1", "epg", 6.0, 4.0)]);

    let errors = profile.validate(&ledger, "p1");

    assert_eq!(errors.len(), 2);
    assert!(errors.iter().any(|error| matches!(
        error,
        ProfileValidationError::NoAvailableResources { key, availability, .. }
            if key.resource_name() == "epg" && *availability == 2.0
    )));
    assert!(errors.iter().any(|error| matches!(
        error,
        ProfileValidationError::CannotDetermineAvailability { key, .. }
            if key.resource_name() == "vrf" && key.project_id() == Some("p1")
    )));
}

#[test]
fn given_unlimited_quota_when_validated_then_availability_cannot_be_determined() {
    let profile = ResourcesProfile::from_value(&json!({"project": {"apic": {"bd": 1}}}))
        .expect("profile should parse");
    let ledger = ledger(&[("p1", "bd", -1.0, 3.0)]);

    let errors = profile.validate(&ledger, "p1");
    assert!(matches!(
        errors.as_slice(),
        [ProfileValidationError::CannotDetermineAvailability { .. }]
    ));
}

#[test]
fn given_usage_above_quota_when_recorded_then_accounting_violation_is_returned() {
    let mut ledger = AvailabilityLedger::new();
    let err = ledger
        .record(
            ResourceKey::for_project("p1", "apic", "bd"),
            Some(1.0),
            Some(Amount::Items(2)),
        )
        .expect_err("negative availability is rejected");
    assert_eq!(err.kind, RsmErrorKind::AccountingViolation);
    assert!(ledger.is_empty());
}
