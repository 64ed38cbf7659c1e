//! Tests for the request/response surface

use std::sync::Arc;

use credit_ledger::builders::build_engine;
use credit_ledger::config::EngineConfig;
use credit_ledger::core::{ErrorKind, EventCategory, EventDraft, EventPatch, Identity, Role, User, UserId};
use credit_ledger::infra::{InMemoryIdentityResolver, InMemoryStore};
use credit_ledger::runtime::{
    CreateEventRequest, EnrollRequest, LedgerService, UpdateEventRequest, WithdrawRequest,
};

const PRO: Option<&str> = Some("Bearer pro-token");
const CLIENT: Option<&str> = Some("Bearer client-token");

fn service() -> (LedgerService<InMemoryStore>, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::with_users([
        User::new("c1", Role::Client, 2),
        User::new("c2", Role::Client, 0),
    ]));
    let built = build_engine(&EngineConfig::default(), Arc::clone(&store)).unwrap();
    let resolver = InMemoryIdentityResolver::new();
    resolver.register("pro-token", Identity::new("p1", Role::Professional));
    resolver.register("client-token", Identity::new("c1", Role::Client));
    (
        LedgerService::new(Arc::new(built.engine), Arc::new(resolver)),
        store,
    )
}

fn class_request() -> CreateEventRequest {
    CreateEventRequest {
        event: EventDraft::new(EventCategory::Class, "acme", 0),
    }
}

#[tokio::test]
async fn test_create_returns_created_with_id() {
    let (service, store) = service();
    let response = service.create_event(PRO, class_request()).await.unwrap();

    assert_eq!(response.status, 201);
    let id = response.body["id"].as_str().unwrap().to_string();
    assert_eq!(response.body["outcome"]["event_id"], id.as_str());
    assert_eq!(store.event_count(), 1);
}

#[tokio::test]
async fn test_missing_header_is_unauthenticated() {
    let (service, store) = service();
    let err = service.create_event(None, class_request()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthenticated);
    assert_eq!(err.status, 401);

    let err = service
        .create_event(Some("Bearer unknown"), class_request())
        .await
        .unwrap_err();
    assert_eq!(err.status, 401);
    assert_eq!(store.event_count(), 0);
}

#[tokio::test]
async fn test_client_cannot_create() {
    let (service, _) = service();
    let err = service.create_event(CLIENT, class_request()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
    assert_eq!(err.status, 403);
}

#[tokio::test]
async fn test_enroll_and_withdraw_self() {
    let (service, store) = service();
    let created = service.create_event(PRO, class_request()).await.unwrap();
    let id = created.body["id"].as_str().unwrap().to_string();

    let enrolled = service
        .enroll_client(CLIENT, &id, EnrollRequest::default())
        .await
        .unwrap();
    assert_eq!(enrolled.status, 200);
    assert_eq!(store.credits(&UserId::new("c1")), Some(1));

    let withdrawn = service
        .withdraw_client(CLIENT, &id, WithdrawRequest::default())
        .await
        .unwrap();
    assert_eq!(withdrawn.status, 200);
    assert_eq!(store.credits(&UserId::new("c1")), Some(2));
}

#[tokio::test]
async fn test_enroll_without_credit_is_conflict() {
    let (service, store) = service();
    let created = service.create_event(PRO, class_request()).await.unwrap();
    let id = created.body["id"].as_str().unwrap().to_string();

    let request: EnrollRequest = serde_json::from_str(r#"{"clientId": "c2"}"#).unwrap();
    let err = service.enroll_client(PRO, &id, request).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InsufficientBalance);
    assert_eq!(err.status, 409);

    let forced: EnrollRequest = serde_json::from_str(r#"{"clientId": "c2", "force": true}"#).unwrap();
    service.enroll_client(PRO, &id, forced).await.unwrap();
    assert_eq!(store.credits(&UserId::new("c2")), Some(-1));
}

#[tokio::test]
async fn test_update_and_delete() {
    let (service, store) = service();
    let created = service.create_event(PRO, class_request()).await.unwrap();
    let id = created.body["id"].as_str().unwrap().to_string();

    let updated = service
        .update_event(
            PRO,
            &id,
            UpdateEventRequest {
                event: EventPatch::attendees(["c1"]),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, 200);
    assert_eq!(updated.body["applied_adjustments"][0]["delta"], -1);
    assert_eq!(store.credits(&UserId::new("c1")), Some(1));

    let deleted = service.delete_event(PRO, &id).await.unwrap();
    assert_eq!(deleted.status, 204);
    assert!(deleted.body.is_null());
    assert_eq!(store.credits(&UserId::new("c1")), Some(2));

    let err = service.delete_event(PRO, &id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn test_health() {
    assert!(LedgerService::<InMemoryStore>::health().ok);
}
