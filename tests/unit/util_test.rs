//! Tests for utility functions

use std::sync::Arc;

use credit_ledger::util::{init_tracing, init_tracing_with, now_ms, Clock, ManualClock, SystemClock};

#[test]
fn test_now_ms_advances() {
    let before = now_ms();
    let after = SystemClock.now_ms();
    assert!(after >= before);
}

#[test]
fn test_manual_clock_behind_trait_object() {
    let manual = Arc::new(ManualClock::new(1_000));
    let clock: Arc<dyn Clock> = manual.clone();
    manual.advance_ms(60_000);
    assert_eq!(clock.now_ms(), 61_000);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    assert!(!init_tracing_with("credit_ledger=debug"));
}
