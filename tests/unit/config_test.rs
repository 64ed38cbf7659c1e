//! Tests for configuration validation

use credit_ledger::config::EngineConfig;
use credit_ledger::core::CompanyId;

#[test]
fn test_engine_config_defaults() {
    let cfg = EngineConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.default_timeout_ms, 5_000);
}

#[test]
fn test_engine_config_invalid_audit_buffer() {
    let cfg = EngineConfig {
        audit_buffer: 0,
        ..EngineConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_engine_config_invalid_prune_threshold() {
    let cfg = EngineConfig {
        lock_prune_threshold: 0,
        ..EngineConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_engine_config_from_json() {
    let json = r#"{
        "default_timeout_ms": 250,
        "companies": {
            "acme": {
                "max_class_assistants": 12,
                "class_block_mins": 30,
                "class_unenroll_mins": 120
            },
            "globex": {}
        }
    }"#;

    let cfg = EngineConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.default_timeout_ms, 250);
    assert_eq!(cfg.companies.len(), 2);
    let acme = &cfg.companies[&CompanyId::new("acme")];
    assert_eq!(acme.max_class_assistants, Some(12));
    assert_eq!(acme.class_unenroll_mins, Some(120));
    assert_eq!(cfg.companies[&CompanyId::new("globex")].class_block_mins, None);
}

#[test]
fn test_engine_config_rejects_zero_seat_class() {
    let json = r#"{"companies": {"acme": {"max_class_assistants": 0}}}"#;
    let err = EngineConfig::from_json_str(json).unwrap_err();
    assert!(err.contains("acme"));
}

#[test]
fn test_engine_config_invalid_json() {
    let err = EngineConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}
