//! Router-level tests over the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use super::context::{ApiStore, Context};
use super::router;
use crate::error::Result;
use crate::models::{
    Account, AccountMetadata, AccountState, AwsMetadata, Subnet, PROVIDER_AWS,
    PROVISIONER_PLATFORM,
};
use crate::supervisor::Doer;
use crate::testing::MockStore;

struct NoopDoer;

#[async_trait]
impl Doer for NoopDoer {
    async fn do_work(&self) -> Result<()> {
        Ok(())
    }
}

fn app(store: Arc<MockStore>) -> Router {
    let context = Context::new(store as Arc<dyn ApiStore>, Arc::new(NoopDoer), "test");
    router(Arc::new(context))
}

fn seed_account(state: AccountState) -> Account {
    Account {
        id: crate::models::new_id(),
        state,
        provider: PROVIDER_AWS.into(),
        provisioner: PROVISIONER_PLATFORM.into(),
        provider_metadata: Some(AwsMetadata {
            service_catalog_product_id: "prod-12345".into(),
            aws_account_id: "123456789012".into(),
            account_product_id: String::new(),
        }),
        account_metadata: Some(AccountMetadata::default()),
        create_at: 1,
        delete_at: 0,
        api_security_lock: false,
        lock_acquired_by: None,
        lock_acquired_at: 0,
    }
}

fn free_subnet(cidr: &str) -> Subnet {
    Subnet {
        id: crate::models::new_id(),
        cidr: cidr.into(),
        account_id: String::new(),
        parent_subnet: "10.0.0.0/8".into(),
        create_at: 1,
        lock_acquired_by: None,
        lock_acquired_at: 0,
    }
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_account_is_accepted() {
    let store = Arc::new(MockStore::default());
    let response = app(store.clone())
        .oneshot(post_json(
            "/api/accounts",
            r#"{"provider":"aws","serviceCatalogProductID":"prod-12345","provision":true,"subnet":"10.0.0.0/24"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["state"], "creation-requested");

    let id = body["id"].as_str().unwrap();
    let stored = store.account(id).unwrap();
    assert_eq!(stored.state, AccountState::CreationRequested);
    assert_eq!(stored.claimed_subnet(), "10.0.0.0/24");
    assert!(stored.provision_requested());
}

#[tokio::test]
async fn create_account_defaults_the_provider() {
    let store = Arc::new(MockStore::default());
    let response = app(store)
        .oneshot(post_json(
            "/api/accounts",
            r#"{"serviceCatalogProductID":"prod-12345"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["provider"], "aws");
}

#[tokio::test]
async fn create_account_rejects_unknown_provider() {
    let store = Arc::new(MockStore::default());
    let response = app(store)
        .oneshot(post_json(
            "/api/accounts",
            r#"{"provider":"azure","serviceCatalogProductID":"prod-12345"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_account_rejects_malformed_json() {
    let store = Arc::new(MockStore::default());
    let response = app(store)
        .oneshot(post_json("/api/accounts", "{not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_unknown_account_is_not_found() {
    let store = Arc::new(MockStore::default());
    let id = crate::models::new_id();
    let response = app(store)
        .oneshot(request("GET", &format!("/api/account/{id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_account_id_is_not_found() {
    let store = Arc::new(MockStore::default());
    let response = app(store)
        .oneshot(request("GET", "/api/account/nope"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn retry_create_moves_failed_account_back_to_requested() {
    let store = Arc::new(MockStore::default());
    let account = seed_account(AccountState::CreationFailed);
    let id = account.id.clone();
    store.seed_account(account);

    let response = app(store.clone())
        .oneshot(request("POST", &format!("/api/account/{id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let stored = store.account(&id).unwrap();
    assert_eq!(stored.state, AccountState::CreationRequested);
    assert_eq!(stored.lock_acquired_at, 0, "row lock must be released");
}

#[tokio::test]
async fn retry_create_on_stable_account_is_invalid() {
    let store = Arc::new(MockStore::default());
    let account = seed_account(AccountState::Stable);
    let id = account.id.clone();
    store.seed_account(account);

    let response = app(store.clone())
        .oneshot(request("POST", &format!("/api/account/{id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.account(&id).unwrap().state, AccountState::Stable);
}

#[tokio::test]
async fn delete_on_row_locked_by_another_worker_conflicts() {
    let store = Arc::new(MockStore::default());
    let mut account = seed_account(AccountState::Stable);
    account.lock_acquired_by = Some("another-worker".into());
    account.lock_acquired_at = 42;
    let id = account.id.clone();
    store.seed_account(account);

    let response = app(store.clone())
        .oneshot(request("DELETE", &format!("/api/account/{id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let stored = store.account(&id).unwrap();
    assert_eq!(stored.state, AccountState::Stable);
    assert_eq!(stored.lock_acquired_by.as_deref(), Some("another-worker"));
    assert_eq!(stored.lock_acquired_at, 42);
}

#[tokio::test]
async fn delete_requests_deletion() {
    let store = Arc::new(MockStore::default());
    let account = seed_account(AccountState::Stable);
    let id = account.id.clone();
    store.seed_account(account);

    let response = app(store.clone())
        .oneshot(request("DELETE", &format!("/api/account/{id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(
        store.account(&id).unwrap().state,
        AccountState::DeletionRequested
    );
}

#[tokio::test]
async fn provision_under_security_lock_is_forbidden() {
    let store = Arc::new(MockStore::default());
    let mut account = seed_account(AccountState::Stable);
    account.api_security_lock = true;
    let id = account.id.clone();
    store.seed_account(account);
    store.seed_subnet(free_subnet("10.0.0.0/24"));

    let response = app(store.clone())
        .oneshot(request("POST", &format!("/api/account/{id}/provision")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let stored = store.account(&id).unwrap();
    assert_eq!(stored.state, AccountState::Stable);
    assert_eq!(stored.claimed_subnet(), "");
}

#[tokio::test]
async fn provision_claims_a_named_subnet() {
    let store = Arc::new(MockStore::default());
    let account = seed_account(AccountState::Stable);
    let id = account.id.clone();
    store.seed_account(account);
    store.seed_subnet(free_subnet("10.0.0.0/24"));
    store.seed_subnet(free_subnet("10.0.1.0/24"));

    let response = app(store.clone())
        .oneshot(post_json(
            &format!("/api/account/{id}/provision"),
            r#"{"subnet":"10.0.1.0/24"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let stored = store.account(&id).unwrap();
    assert_eq!(stored.state, AccountState::ProvisioningRequested);
    assert_eq!(stored.claimed_subnet(), "10.0.1.0/24");
    assert_eq!(
        store.subnet_by_cidr("10.0.1.0/24").unwrap().account_id,
        "123456789012"
    );
}

#[tokio::test]
async fn provision_without_body_claims_any_free_subnet() {
    let store = Arc::new(MockStore::default());
    let account = seed_account(AccountState::Stable);
    let id = account.id.clone();
    store.seed_account(account);
    store.seed_subnet(free_subnet("10.0.0.0/24"));

    let response = app(store.clone())
        .oneshot(request("POST", &format!("/api/account/{id}/provision")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(store.account(&id).unwrap().claimed_subnet(), "10.0.0.0/24");
}

#[tokio::test]
async fn provision_with_empty_pool_fails_internally() {
    let store = Arc::new(MockStore::default());
    let account = seed_account(AccountState::Stable);
    let id = account.id.clone();
    store.seed_account(account);

    let response = app(store.clone())
        .oneshot(request("POST", &format!("/api/account/{id}/provision")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn add_parent_subnet_creates_children() {
    let store = Arc::new(MockStore::default());
    let response = app(store.clone())
        .oneshot(post_json(
            "/api/subnets/parent",
            r#"{"cidr":"10.0.0.0/8","splitRange":10}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["cidr"], "10.0.0.0/8");

    let subnets = store.subnets.lock().unwrap();
    assert_eq!(subnets.len(), 4);
    assert!(subnets.iter().all(|subnet| subnet.is_free()));
    assert_eq!(subnets[1].cidr, "10.64.0.0/10");
}

#[tokio::test]
async fn add_parent_subnet_rejects_bad_cidr() {
    let store = Arc::new(MockStore::default());
    let response = app(store)
        .oneshot(post_json(
            "/api/subnets/parent",
            r#"{"cidr":"10.0.0.0//8","splitRange":10}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn add_parent_subnet_rejects_range_past_address_width() {
    let store = Arc::new(MockStore::default());
    let response = app(store.clone())
        .oneshot(post_json(
            "/api/subnets/parent",
            r#"{"cidr":"10.0.0.0/8","splitRange":33}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.subnets.lock().unwrap().is_empty());
}

#[tokio::test]
async fn list_accounts_excludes_deleted_by_default() {
    let store = Arc::new(MockStore::default());
    let live = seed_account(AccountState::Stable);
    let mut gone = seed_account(AccountState::Deleted);
    gone.delete_at = 99;
    store.seed_account(live);
    store.seed_account(gone);

    let response = app(store.clone())
        .oneshot(request("GET", "/api/accounts"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let response = app(store)
        .oneshot(request("GET", "/api/accounts?include_deleted=true"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn bad_paging_is_rejected() {
    let store = Arc::new(MockStore::default());
    let response = app(store.clone())
        .oneshot(request("GET", "/api/accounts?per_page=-2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app(store)
        .oneshot(request("GET", "/api/accounts?page=abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn free_subnet_listing_filters_claimed_rows() {
    let store = Arc::new(MockStore::default());
    store.seed_subnet(free_subnet("10.0.0.0/24"));
    let mut claimed = free_subnet("10.0.1.0/24");
    claimed.account_id = "123456789012".into();
    store.seed_subnet(claimed);

    let response = app(store)
        .oneshot(request("GET", "/api/subnets?show_free=true"))
        .await
        .unwrap();
    let body = body_json(response).await;
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["cidr"], "10.0.0.0/24");
}

#[tokio::test]
async fn security_lock_endpoints_toggle_the_flag() {
    let store = Arc::new(MockStore::default());
    let account = seed_account(AccountState::Stable);
    let id = account.id.clone();
    store.seed_account(account);

    let response = app(store.clone())
        .oneshot(request("POST", &format!("/api/security/account/{id}/api/lock")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.account(&id).unwrap().api_security_lock);

    // Locking twice is a no-op.
    let response = app(store.clone())
        .oneshot(request("POST", &format!("/api/security/account/{id}/api/lock")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(store.clone())
        .oneshot(request(
            "POST",
            &format!("/api/security/account/{id}/api/unlock"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!store.account(&id).unwrap().api_security_lock);
}

#[tokio::test]
async fn webhook_registration_round_trip() {
    let store = Arc::new(MockStore::default());
    let response = app(store.clone())
        .oneshot(post_json(
            "/api/webhooks",
            r#"{"ownerID":"ops","url":"https://example.com/hook"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let id = body["id"].as_str().unwrap().to_string();

    let response = app(store.clone())
        .oneshot(request("GET", "/api/webhooks"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let response = app(store.clone())
        .oneshot(request("DELETE", &format!("/api/webhook/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Soft-deleted hooks disappear from the default listing.
    let response = app(store)
        .oneshot(request("GET", "/api/webhooks"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn webhook_registration_requires_owner_and_url() {
    let store = Arc::new(MockStore::default());
    let response = app(store)
        .oneshot(post_json("/api/webhooks", r#"{"ownerID":"ops"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
