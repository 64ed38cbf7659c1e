//! API-facing request/response models and the service that serves them.
//!
//! Transports hand over the raw `Authorization` header and a decoded request
//! body; the service resolves the caller, runs the engine operation, and maps
//! the result onto a status code and JSON body.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{
    CallContext, Credential, EnrollmentRequest, ErrorKind, EventDraft, EventId, EventPatch,
    IdentityResolver, LedgerError, LedgerResult, OperationOutcome, ReconciliationEngine,
    TransactionalStore, UserId,
};

/// Create payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    /// Event to create.
    pub event: EventDraft,
}

/// Update payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    /// Fields to change.
    pub event: EventPatch,
}

/// Enrollment payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    /// User to enroll; defaults to the caller.
    #[serde(default)]
    pub client_id: Option<UserId>,
    /// Skip the credit check. Professionals only.
    #[serde(default)]
    pub force: bool,
}

/// Withdrawal payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    /// User to withdraw; defaults to the caller.
    #[serde(default)]
    pub client_id: Option<UserId>,
}

/// Successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Status code.
    pub status: u16,
    /// JSON body; `null` for empty responses.
    pub body: Value,
}

/// Failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Failure classification.
    pub kind: ErrorKind,
    /// Status code derived from `kind`.
    pub status: u16,
    /// Human-readable reason.
    pub message: String,
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let kind = err.kind();
        Self {
            kind,
            status: kind.status_code(),
            message: err.to_string(),
        }
    }
}

/// Health response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Result alias for service calls.
pub type ApiResult = Result<ApiResponse, ApiError>;

/// Engine operations behind credential resolution.
pub struct LedgerService<S> {
    engine: Arc<ReconciliationEngine<S>>,
    resolver: Arc<dyn IdentityResolver>,
}

impl<S> LedgerService<S>
where
    S: TransactionalStore,
{
    /// Pair an engine with a resolver.
    pub fn new(engine: Arc<ReconciliationEngine<S>>, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { engine, resolver }
    }

    /// Liveness probe.
    pub const fn health() -> Health {
        Health { ok: true }
    }

    /// Create an event. Answers 201 with the new id.
    pub async fn create_event(
        &self,
        authorization: Option<&str>,
        request: CreateEventRequest,
    ) -> ApiResult {
        let ctx = self.context(authorization).await?;
        let outcome = self.engine.create_event(&ctx, request.event).await?;
        let body = serde_json::json!({
            "id": outcome.event_id.as_str(),
            "outcome": encode(&outcome)?,
        });
        Ok(ApiResponse { status: 201, body })
    }

    /// Update an event.
    pub async fn update_event(
        &self,
        authorization: Option<&str>,
        event_id: &str,
        request: UpdateEventRequest,
    ) -> ApiResult {
        let ctx = self.context(authorization).await?;
        let outcome = self
            .engine
            .update_event(&ctx, &EventId::new(event_id), request.event)
            .await?;
        ok(&outcome)
    }

    /// Delete an event. Answers 204.
    pub async fn delete_event(&self, authorization: Option<&str>, event_id: &str) -> ApiResult {
        let ctx = self.context(authorization).await?;
        self.engine.delete_event(&ctx, &EventId::new(event_id)).await?;
        Ok(ApiResponse {
            status: 204,
            body: Value::Null,
        })
    }

    /// Enroll the caller or, for staff, another client.
    pub async fn enroll_client(
        &self,
        authorization: Option<&str>,
        event_id: &str,
        request: EnrollRequest,
    ) -> ApiResult {
        let ctx = self.context(authorization).await?;
        let enrollment = EnrollmentRequest {
            target: request.client_id,
            force: request.force,
        };
        let outcome = self
            .engine
            .enroll(&ctx, &EventId::new(event_id), enrollment)
            .await?;
        ok(&outcome)
    }

    /// Withdraw the caller or, for staff, another client.
    pub async fn withdraw_client(
        &self,
        authorization: Option<&str>,
        event_id: &str,
        request: WithdrawRequest,
    ) -> ApiResult {
        let ctx = self.context(authorization).await?;
        let withdrawal = EnrollmentRequest {
            target: request.client_id,
            force: false,
        };
        let outcome = self
            .engine
            .withdraw(&ctx, &EventId::new(event_id), withdrawal)
            .await?;
        ok(&outcome)
    }

    async fn context(&self, authorization: Option<&str>) -> LedgerResult<CallContext> {
        let credential = Credential::from_authorization_header(authorization)?;
        match self.resolver.resolve(&credential).await {
            Ok(identity) => Ok(CallContext::new(identity)),
            Err(err) => {
                tracing::warn!("credential rejected: {err}");
                Err(err)
            }
        }
    }
}

fn encode(outcome: &OperationOutcome) -> LedgerResult<Value> {
    serde_json::to_value(outcome).map_err(|e| LedgerError::Store(format!("encoding response: {e}")))
}

fn ok(outcome: &OperationOutcome) -> ApiResult {
    Ok(ApiResponse {
        status: 200,
        body: encode(outcome)?,
    })
}
