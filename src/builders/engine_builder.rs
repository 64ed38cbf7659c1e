//! Builders to construct a reconciliation engine from configuration.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::core::{
    CompanyPolicy, InMemoryAuditSink, KeyedLocks, LedgerError, LedgerResult,
    ReconciliationEngine, SharedAuditSink, TransactionalStore,
};
use crate::util::clock::{Clock, SystemClock};

/// Engine plus the handles a host keeps after wiring.
pub struct BuiltEngine<S> {
    /// Configured engine.
    pub engine: ReconciliationEngine<S>,
    /// Audit buffer the engine records into.
    pub audit: Arc<Mutex<InMemoryAuditSink>>,
}

/// Build an engine over `store` using the system clock.
pub fn build_engine<S>(cfg: &EngineConfig, store: Arc<S>) -> LedgerResult<BuiltEngine<S>>
where
    S: TransactionalStore,
{
    build_engine_with_clock(cfg, store, Arc::new(SystemClock))
}

/// Build an engine over `store`, reading time from `clock`.
pub fn build_engine_with_clock<S>(
    cfg: &EngineConfig,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
) -> LedgerResult<BuiltEngine<S>>
where
    S: TransactionalStore,
{
    cfg.validate()
        .map_err(|e| LedgerError::InvalidRequest(format!("config invalid: {e}")))?;

    let policy = CompanyPolicy::new(cfg.companies.clone());
    let audit = Arc::new(Mutex::new(InMemoryAuditSink::new(cfg.audit_buffer)));
    let shared: SharedAuditSink = audit.clone();

    let engine = ReconciliationEngine::new(store)
        .with_policy(Arc::new(policy))
        .with_clock(clock)
        .with_audit(shared)
        .with_locks(KeyedLocks::new(cfg.lock_prune_threshold))
        .with_default_timeout(cfg.default_timeout());

    tracing::info!(
        companies = cfg.companies.len(),
        timeout_ms = cfg.default_timeout_ms,
        "reconciliation engine built"
    );
    Ok(BuiltEngine { engine, audit })
}
