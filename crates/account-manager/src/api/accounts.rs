//! Account endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::error;

use super::context::Context;
use super::helpers::{ensure_entity_id, PagingQuery};
use super::lock;
use crate::error::{Error, Result};
use crate::models::{
    Account, AccountMetadata, AccountState, AwsMetadata, CreateAccountRequest, PayloadType,
    ProvisionAccountRequest, WebhookPayload, PROVISIONER_PLATFORM,
};
use crate::webhook;

/// POST /api/accounts: begins creating a new account.
pub async fn create(
    State(ctx): State<Arc<Context>>,
    body: std::result::Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(mut request) = body.map_err(|err| Error::invalid_request(err.to_string()))?;
    request.set_defaults();
    request.validate()?;

    let mut account = Account {
        id: String::new(),
        state: AccountState::CreationRequested,
        provider: request.provider,
        provisioner: PROVISIONER_PLATFORM.to_string(),
        provider_metadata: Some(AwsMetadata {
            service_catalog_product_id: request.service_catalog_product_id,
            aws_account_id: String::new(),
            account_product_id: String::new(),
        }),
        account_metadata: Some(AccountMetadata {
            provision: request.provision,
            subnet: request.subnet,
        }),
        create_at: 0,
        delete_at: 0,
        api_security_lock: request.api_security_lock,
        lock_acquired_by: None,
        lock_acquired_at: 0,
    };
    ctx.store.create_account(&mut account).await?;

    let payload = WebhookPayload::new(
        PayloadType::Account,
        &account.id,
        AccountState::CreationRequested.as_str(),
        "n/a",
        &ctx.environment,
    );
    if let Err(err) = webhook::send_to_all(&ctx.client, ctx.store.as_ref(), &payload).await {
        error!(error = %err, "unable to process and send webhooks");
    }

    let _ = ctx.supervisor.do_work().await;

    Ok((StatusCode::ACCEPTED, Json(account)))
}

/// GET /api/account/{account}: returns the account in question.
pub async fn get(
    State(ctx): State<Arc<Context>>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse> {
    ensure_entity_id("account", &account_id)?;

    let account = ctx
        .store
        .get_account(&account_id)
        .await?
        .ok_or_else(|| Error::not_found("account", &account_id))?;
    Ok(Json(account))
}

/// GET /api/accounts: returns the requested page of accounts.
pub async fn list(
    State(ctx): State<Arc<Context>>,
    Query(paging): Query<PagingQuery>,
) -> Result<impl IntoResponse> {
    paging.validate()?;

    let accounts = ctx.store.get_accounts(&paging.account_filter()).await?;
    Ok(Json(accounts))
}

/// POST /api/account/{account}: retries a previously failed creation.
pub async fn retry_create(
    State(ctx): State<Arc<Context>>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse> {
    ensure_entity_id("account", &account_id)?;

    let (mut account, guard) = lock::lock_account(&ctx.store, &account_id).await?;
    let result = retry_create_locked(&ctx, &mut account).await;
    guard.release().await;

    // Poke even when nothing changed, to expedite the no-op path.
    let response = result.map(|_| (StatusCode::ACCEPTED, Json(account)))?;
    let _ = ctx.supervisor.do_work().await;
    Ok(response)
}

async fn retry_create_locked(ctx: &Context, account: &mut Account) -> Result<()> {
    if account.api_security_lock {
        return Err(Error::ApiSecurityLocked {
            kind: "account",
            id: account.id.clone(),
        });
    }

    let new_state = AccountState::CreationRequested;
    if !account.valid_transition_state(new_state) {
        return Err(Error::InvalidTransition {
            from: account.state.to_string(),
            to: new_state.to_string(),
        });
    }

    if account.state != new_state {
        let payload = WebhookPayload::new(
            PayloadType::Account,
            &account.id,
            new_state.as_str(),
            account.state.as_str(),
            &ctx.environment,
        );
        account.state = new_state;
        ctx.store.update_account(account).await?;

        if let Err(err) = webhook::send_to_all(&ctx.client, ctx.store.as_ref(), &payload).await {
            error!(error = %err, "unable to process and send webhooks");
        }
    }

    Ok(())
}

/// POST /api/account/{account}/provision: provisions networking on a
/// previously created account.
pub async fn provision(
    State(ctx): State<Arc<Context>>,
    Path(account_id): Path<String>,
    body: Option<Json<ProvisionAccountRequest>>,
) -> Result<impl IntoResponse> {
    ensure_entity_id("account", &account_id)?;
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let (mut account, guard) = lock::lock_account(&ctx.store, &account_id).await?;
    let result = provision_locked(&ctx, &mut account, request).await;
    guard.release().await;

    let response = result.map(|_| (StatusCode::ACCEPTED, Json(account)))?;
    let _ = ctx.supervisor.do_work().await;
    Ok(response)
}

async fn provision_locked(
    ctx: &Context,
    account: &mut Account,
    request: ProvisionAccountRequest,
) -> Result<()> {
    if account.api_security_lock {
        return Err(Error::ApiSecurityLocked {
            kind: "account",
            id: account.id.clone(),
        });
    }

    let new_state = AccountState::ProvisioningRequested;
    if !account.valid_transition_state(new_state) {
        return Err(Error::InvalidTransition {
            from: account.state.to_string(),
            to: new_state.to_string(),
        });
    }

    if account.state != new_state {
        let payload = WebhookPayload::new(
            PayloadType::Account,
            &account.id,
            new_state.as_str(),
            account.state.as_str(),
            &ctx.environment,
        );

        account.state = new_state;
        let physical_id = account.physical_id().to_string();
        let metadata = account.account_metadata.get_or_insert_with(Default::default);
        metadata.provision = true;

        if metadata.subnet.is_empty() {
            let subnet = ctx.store.claim_subnet(&request.subnet, &physical_id).await?;
            metadata.subnet = subnet.cidr;
        } else if !request.subnet.is_empty() {
            return Err(Error::invalid_request(
                "a subnet is already allocated to the account",
            ));
        }

        ctx.store.update_account(account).await?;

        if let Err(err) = webhook::send_to_all(&ctx.client, ctx.store.as_ref(), &payload).await {
            error!(error = %err, "unable to process and send webhooks");
        }
    }

    Ok(())
}

/// DELETE /api/account/{account}: begins deleting the account.
pub async fn delete(
    State(ctx): State<Arc<Context>>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse> {
    ensure_entity_id("account", &account_id)?;

    let (mut account, guard) = lock::lock_account(&ctx.store, &account_id).await?;
    let result = delete_locked(&ctx, &mut account).await;
    guard.release().await;

    result?;
    let _ = ctx.supervisor.do_work().await;
    Ok(StatusCode::ACCEPTED)
}

async fn delete_locked(ctx: &Context, account: &mut Account) -> Result<()> {
    if account.api_security_lock {
        return Err(Error::ApiSecurityLocked {
            kind: "account",
            id: account.id.clone(),
        });
    }

    let new_state = AccountState::DeletionRequested;
    if !account.valid_transition_state(new_state) {
        return Err(Error::InvalidTransition {
            from: account.state.to_string(),
            to: new_state.to_string(),
        });
    }

    if account.state != new_state {
        let payload = WebhookPayload::new(
            PayloadType::Account,
            &account.id,
            new_state.as_str(),
            account.state.as_str(),
            &ctx.environment,
        );
        account.state = new_state;
        ctx.store.update_account(account).await?;

        if let Err(err) = webhook::send_to_all(&ctx.client, ctx.store.as_ref(), &payload).await {
            error!(error = %err, "unable to process and send webhooks");
        }
    }

    Ok(())
}
