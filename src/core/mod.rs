//! Ledger domain: model, authorization, reconciliation, and orchestration.

pub mod audit;
pub mod auth;
pub mod engine;
pub mod error;
pub mod locks;
pub mod model;
pub mod policy;
pub mod reconcile;
pub mod store;

pub use audit::{build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink};
pub use auth::{
    allows, authorize, decide, Capability, Credential, Decision, Identity, IdentityResolver,
};
pub use engine::{CallContext, EnrollmentRequest, ReconciliationEngine, SharedAuditSink};
pub use error::{AppResult, ErrorKind, LedgerError, LedgerResult};
pub use locks::{EventLock, KeyedLocks, LockScope};
pub use model::{
    BalanceAdjustment, CompanyId, Event, EventCategory, EventDraft, EventId, EventPatch, Operation,
    OperationOutcome, Role, User, UserId,
};
pub use policy::{CompanyPolicy, CompanySettings, EnrollmentPolicy, OpenPolicy};
pub use reconcile::{reconcile, EventState, Transition};
pub use store::{
    Changeset, CommitReceipt, EventStore, EventWrite, LedgerStore, TransactionalStore,
};
