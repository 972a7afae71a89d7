//! API-security-lock endpoints.
//!
//! The security lock denies API mutations to an account; background work in
//! flight is unaffected. Both endpoints are idempotent.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::context::Context;
use super::helpers::ensure_entity_id;
use crate::error::{Error, Result};

/// POST /api/security/account/{account}/api/lock
pub async fn lock_account_api(
    State(ctx): State<Arc<Context>>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse> {
    ensure_entity_id("account", &account_id)?;

    let account = ctx
        .store
        .get_account(&account_id)
        .await?
        .ok_or_else(|| Error::not_found("account", &account_id))?;

    if !account.api_security_lock {
        ctx.store.lock_account_api(&account.id).await?;
    }

    Ok(StatusCode::OK)
}

/// POST /api/security/account/{account}/api/unlock
pub async fn unlock_account_api(
    State(ctx): State<Arc<Context>>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse> {
    ensure_entity_id("account", &account_id)?;

    let account = ctx
        .store
        .get_account(&account_id)
        .await?
        .ok_or_else(|| Error::not_found("account", &account_id))?;

    if account.api_security_lock {
        ctx.store.unlock_account_api(&account.id).await?;
    }

    Ok(StatusCode::OK)
}
