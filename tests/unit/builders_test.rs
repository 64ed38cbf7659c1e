//! Tests for engine builders

use std::collections::HashMap;
use std::sync::Arc;

use credit_ledger::builders::{build_engine, build_engine_with_clock};
use credit_ledger::config::EngineConfig;
use credit_ledger::core::{
    CallContext, CompanyId, CompanySettings, EnrollmentRequest, EventCategory, EventDraft, Identity,
    LedgerError, Role, User,
};
use credit_ledger::infra::InMemoryStore;
use credit_ledger::util::ManualClock;

const HOUR_MS: u64 = 3_600_000;

fn store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::with_users([
        User::new("c1", Role::Client, 5),
        User::new("c2", Role::Client, 5),
    ]))
}

#[test]
fn test_build_engine_rejects_invalid_config() {
    let cfg = EngineConfig {
        default_timeout_ms: 0,
        ..EngineConfig::default()
    };
    let err = build_engine(&cfg, store()).err().unwrap();
    assert!(matches!(err, LedgerError::InvalidRequest(msg) if msg.contains("default_timeout_ms")));
}

#[tokio::test]
async fn test_built_engine_records_audit() {
    let built = build_engine(&EngineConfig::default(), store()).unwrap();
    let pro = CallContext::new(Identity::new("p1", Role::Professional));

    built
        .engine
        .create_event(&pro, EventDraft::new(EventCategory::Class, "acme", 0).with_attendees(["c1"]))
        .await
        .unwrap();

    let events = built.audit.lock().events();
    assert_eq!(events.len(), 1);
    assert!(events[0].is_applied());
    assert_eq!(events[0].adjustments.len(), 1);
}

#[tokio::test]
async fn test_built_engine_applies_company_rules() {
    let mut companies = HashMap::new();
    companies.insert(
        CompanyId::new("acme"),
        CompanySettings {
            max_class_assistants: Some(1),
            class_block_mins: None,
            class_unenroll_mins: None,
        },
    );
    let cfg = EngineConfig {
        companies,
        ..EngineConfig::default()
    };
    let clock = Arc::new(ManualClock::new(0));
    let built = build_engine_with_clock(&cfg, store(), clock).unwrap();

    let pro = CallContext::new(Identity::new("p1", Role::Professional));
    let created = built
        .engine
        .create_event(
            &pro,
            EventDraft::new(EventCategory::Class, "acme", u128::from(10 * HOUR_MS)).with_attendees(["c1"]),
        )
        .await
        .unwrap();

    let client = CallContext::new(Identity::new("c2", Role::Client));
    let err = built
        .engine
        .enroll(&client, &created.event_id, EnrollmentRequest::for_self())
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::PolicyViolation("class full".into()));
}
