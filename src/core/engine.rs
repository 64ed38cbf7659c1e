//! Reconciliation engine: authorization, locking, credit checks, and commit.
//!
//! Each operation follows the same shape:
//!
//! 1. gate the caller through the role/capability table;
//! 2. lock the event, load it, then lock every affected user;
//! 3. derive the adjustments from the state transition;
//! 4. refuse charges against users without credit (unless forced);
//! 5. hand the event write and all adjustments to the store as one changeset.
//!
//! Every validation happens before step 5, so a rejected operation never
//! leaves a trace in the stores. The whole sequence runs under a deadline;
//! expiry before the commit surfaces as `DeadlineExpired` with nothing
//! applied.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::audit::{build_audit_event, AuditSink};
use crate::core::auth::{self, Capability, Identity};
use crate::core::locks::KeyedLocks;
use crate::core::model::{
    BalanceAdjustment, Event, EventDraft, EventId, EventPatch, Operation, OperationOutcome, UserId,
};
use crate::core::policy::{EnrollmentPolicy, OpenPolicy};
use crate::core::reconcile::{charges, EventState, Transition};
use crate::core::store::{Changeset, CommitReceipt, EventWrite, TransactionalStore};
use crate::core::{ErrorKind, LedgerError, LedgerResult};
use crate::util::clock::{Clock, SystemClock};

/// Shared handle to an audit sink.
pub type SharedAuditSink = Arc<Mutex<dyn AuditSink>>;

/// Deadline applied when neither the caller nor the configuration sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-call context: who is calling and how long they will wait.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Resolved caller.
    pub identity: Identity,
    /// Deadline for this call; falls back to the engine default.
    pub timeout: Option<Duration>,
}

impl CallContext {
    /// Context with the engine's default deadline.
    pub const fn new(identity: Identity) -> Self {
        Self {
            identity,
            timeout: None,
        }
    }

    /// Bound the call by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Enrollment or withdrawal parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentRequest {
    /// User to act on; defaults to the caller.
    pub target: Option<UserId>,
    /// Skip the credit sufficiency check (enrollment only).
    pub force: bool,
}

impl EnrollmentRequest {
    /// Act on the caller.
    pub const fn for_self() -> Self {
        Self {
            target: None,
            force: false,
        }
    }

    /// Act on another user.
    pub fn for_user(target: impl Into<UserId>) -> Self {
        Self {
            target: Some(target.into()),
            force: false,
        }
    }

    /// Request the force override.
    #[must_use]
    pub const fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// Orchestrates event mutations and their ledger effects.
pub struct ReconciliationEngine<S> {
    store: Arc<S>,
    locks: KeyedLocks,
    policy: Arc<dyn EnrollmentPolicy>,
    clock: Arc<dyn Clock>,
    audit: Option<SharedAuditSink>,
    default_timeout: Duration,
}

impl<S> ReconciliationEngine<S>
where
    S: TransactionalStore,
{
    /// Engine with an open policy, the system clock, and no audit sink.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: KeyedLocks::default(),
            policy: Arc::new(OpenPolicy),
            clock: Arc::new(SystemClock),
            audit: None,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replace the enrollment policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn EnrollmentPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the clock used by the policy.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Replace the lock table.
    #[must_use]
    pub fn with_locks(mut self, locks: KeyedLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Deadline for calls that do not carry one.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Underlying store.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create an event, charging every class attendee up front.
    pub async fn create_event(
        &self,
        ctx: &CallContext,
        draft: EventDraft,
    ) -> LedgerResult<OperationOutcome> {
        let event_id = EventId::generate();
        self.run(ctx, Operation::Create, &event_id, self.create_inner(ctx, draft, event_id.clone()))
            .await
    }

    /// Update an event, reconciling against the latest stored snapshot.
    pub async fn update_event(
        &self,
        ctx: &CallContext,
        event_id: &EventId,
        patch: EventPatch,
    ) -> LedgerResult<OperationOutcome> {
        self.run(ctx, Operation::Update, event_id, self.update_inner(ctx, event_id, patch))
            .await
    }

    /// Delete an event, refunding every class attendee.
    pub async fn delete_event(
        &self,
        ctx: &CallContext,
        event_id: &EventId,
    ) -> LedgerResult<OperationOutcome> {
        self.run(ctx, Operation::Delete, event_id, self.delete_inner(ctx, event_id))
            .await
    }

    /// Add a user to an event.
    pub async fn enroll(
        &self,
        ctx: &CallContext,
        event_id: &EventId,
        request: EnrollmentRequest,
    ) -> LedgerResult<OperationOutcome> {
        self.run(ctx, Operation::Enroll, event_id, self.enroll_inner(ctx, event_id, request))
            .await
    }

    /// Remove a user from an event.
    pub async fn withdraw(
        &self,
        ctx: &CallContext,
        event_id: &EventId,
        request: EnrollmentRequest,
    ) -> LedgerResult<OperationOutcome> {
        self.run(ctx, Operation::Withdraw, event_id, self.withdraw_inner(ctx, event_id, request))
            .await
    }

    async fn create_inner(
        &self,
        ctx: &CallContext,
        draft: EventDraft,
        event_id: EventId,
    ) -> LedgerResult<OperationOutcome> {
        auth::authorize(Some(&ctx.identity), Capability::ManageEvent)?;
        draft.validate()?;
        let event = draft.into_event(event_id);

        let held = self.locks.lock_event(&event.id).await;
        let _scope = self.locks.lock_users(held, event.attendees.iter()).await;

        let adjustments = Transition::create(EventState::from(&event)).adjustments();
        self.ensure_sufficient(&adjustments).await?;

        let event_id = event.id.clone();
        let receipt = self
            .store
            .commit(Changeset {
                event_write: EventWrite::Insert(event),
                adjustments,
            })
            .await?;
        Ok(outcome(event_id, Operation::Create, receipt))
    }

    async fn update_inner(
        &self,
        ctx: &CallContext,
        event_id: &EventId,
        patch: EventPatch,
    ) -> LedgerResult<OperationOutcome> {
        auth::authorize(Some(&ctx.identity), Capability::ManageEvent)?;
        patch.validate()?;

        let held = self.locks.lock_event(event_id).await;
        let old = self.store.find_event(event_id).await?;
        let new = patch.apply_to(&old);
        let _scope = self
            .locks
            .lock_users(held, old.attendees.iter().chain(new.attendees.iter()))
            .await;

        let adjustments =
            Transition::update(EventState::from(&old), EventState::from(&new)).adjustments();
        self.ensure_sufficient(&adjustments).await?;

        let receipt = self
            .store
            .commit(Changeset {
                event_write: EventWrite::Replace {
                    event: new,
                    expected_version: old.version,
                },
                adjustments,
            })
            .await?;
        Ok(outcome(event_id.clone(), Operation::Update, receipt))
    }

    async fn delete_inner(
        &self,
        ctx: &CallContext,
        event_id: &EventId,
    ) -> LedgerResult<OperationOutcome> {
        auth::authorize(Some(&ctx.identity), Capability::ManageEvent)?;

        let held = self.locks.lock_event(event_id).await;
        let old = self.store.find_event(event_id).await?;
        let _scope = self.locks.lock_users(held, old.attendees.iter()).await;

        let adjustments = Transition::delete(EventState::from(&old)).adjustments();
        let receipt = self
            .store
            .commit(Changeset {
                event_write: EventWrite::Remove {
                    id: event_id.clone(),
                    expected_version: old.version,
                },
                adjustments,
            })
            .await?;
        Ok(outcome(event_id.clone(), Operation::Delete, receipt))
    }

    async fn enroll_inner(
        &self,
        ctx: &CallContext,
        event_id: &EventId,
        request: EnrollmentRequest,
    ) -> LedgerResult<OperationOutcome> {
        let identity = &ctx.identity;
        let target = request.target.unwrap_or_else(|| identity.user_id.clone());
        auth::authorize(Some(identity), auth::enrollment_capability(identity, &target))?;
        if request.force {
            auth::authorize(Some(identity), Capability::ForceOverride)?;
        }

        let held = self.locks.lock_event(event_id).await;
        let event = self.store.find_event(event_id).await?;
        let _scope = self.locks.lock_users(held, [&target]).await;

        let transition = Transition::enroll(EventState::from(&event), &target)?;
        if !auth::allows(identity.role, Capability::BypassEnrollmentPolicy) {
            self.policy
                .check_enroll(&event, &target, self.clock.now_ms())?;
        }
        if event.category.draws_credits() && !request.force {
            self.ensure_balance(&target).await?;
        }

        let adjustments = transition.adjustments();
        let next = with_attendees(&event, &transition);

        let receipt = self
            .store
            .commit(Changeset {
                event_write: EventWrite::Replace {
                    event: next,
                    expected_version: event.version,
                },
                adjustments,
            })
            .await?;
        if request.force {
            tracing::info!(event = %event_id, user = %target, "enrollment forced past credit check");
        }
        Ok(outcome(event_id.clone(), Operation::Enroll, receipt))
    }

    async fn withdraw_inner(
        &self,
        ctx: &CallContext,
        event_id: &EventId,
        request: EnrollmentRequest,
    ) -> LedgerResult<OperationOutcome> {
        let identity = &ctx.identity;
        let target = request.target.unwrap_or_else(|| identity.user_id.clone());
        auth::authorize(Some(identity), auth::enrollment_capability(identity, &target))?;

        let held = self.locks.lock_event(event_id).await;
        let event = self.store.find_event(event_id).await?;
        let _scope = self.locks.lock_users(held, [&target]).await;

        let transition = Transition::withdraw(EventState::from(&event), &target)?;
        if !auth::allows(identity.role, Capability::BypassEnrollmentPolicy) {
            self.policy
                .check_withdraw(&event, &target, self.clock.now_ms())?;
        }
        let adjustments = transition.adjustments();
        let next = with_attendees(&event, &transition);

        let receipt = self
            .store
            .commit(Changeset {
                event_write: EventWrite::Replace {
                    event: next,
                    expected_version: event.version,
                },
                adjustments,
            })
            .await?;
        Ok(outcome(event_id.clone(), Operation::Withdraw, receipt))
    }

    /// Every charged user must hold a positive balance.
    async fn ensure_sufficient(&self, adjustments: &[BalanceAdjustment]) -> LedgerResult<()> {
        for charge in charges(adjustments) {
            self.ensure_balance(&charge.user_id).await?;
        }
        Ok(())
    }

    async fn ensure_balance(&self, user: &UserId) -> LedgerResult<()> {
        let balance = self.store.balance(user).await?;
        tracing::debug!(user = %user, balance, "credit check");
        if balance <= 0 {
            return Err(LedgerError::InsufficientBalance {
                user_id: user.clone(),
                balance,
            });
        }
        Ok(())
    }

    async fn run<F>(
        &self,
        ctx: &CallContext,
        operation: Operation,
        event_id: &EventId,
        fut: F,
    ) -> LedgerResult<OperationOutcome>
    where
        F: Future<Output = LedgerResult<OperationOutcome>>,
    {
        let limit = ctx.timeout.unwrap_or(self.default_timeout);
        let result = tokio::time::timeout(limit, fut)
            .await
            .unwrap_or(Err(LedgerError::DeadlineExpired));

        match &result {
            Ok(done) => {
                tracing::info!(
                    event = %done.event_id,
                    %operation,
                    adjustments = done.applied_adjustments.len(),
                    net_delta = done.net_delta(),
                    "operation committed"
                );
                self.record(ctx, operation, done.event_id.clone(), done.applied_adjustments.clone(), None);
            }
            Err(err) => {
                if matches!(err, LedgerError::Store(_)) {
                    tracing::error!(event = %event_id, %operation, "store failure, nothing applied: {err}");
                } else {
                    tracing::warn!(event = %event_id, %operation, kind = ?err.kind(), "operation rejected: {err}");
                }
                self.record(ctx, operation, event_id.clone(), Vec::new(), Some(err.kind()));
            }
        }
        result
    }

    fn record(
        &self,
        ctx: &CallContext,
        operation: Operation,
        event_id: EventId,
        adjustments: Vec<BalanceAdjustment>,
        rejected: Option<ErrorKind>,
    ) {
        if let Some(sink) = self.audit.as_ref() {
            sink.lock().record(build_audit_event(
                event_id,
                Some(ctx.identity.user_id.clone()),
                operation,
                adjustments,
                rejected,
            ));
        }
    }
}

fn with_attendees(event: &Event, transition: &Transition) -> Event {
    let mut next = event.clone();
    if let Some(after) = transition.after() {
        next.attendees.clone_from(&after.attendees);
    }
    next
}

fn outcome(event_id: EventId, operation: Operation, receipt: CommitReceipt) -> OperationOutcome {
    OperationOutcome {
        event_id,
        operation,
        applied_adjustments: receipt.applied,
        event_after: receipt.event,
    }
}
