//! Webhook registration endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use super::context::Context;
use super::helpers::{ensure_entity_id, PagingQuery};
use crate::error::{Error, Result};
use crate::models::{CreateWebhookRequest, Webhook};

/// POST /api/webhooks: registers a new subscriber.
pub async fn create(
    State(ctx): State<Arc<Context>>,
    body: std::result::Result<Json<CreateWebhookRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = body.map_err(|err| Error::invalid_request(err.to_string()))?;
    request.validate()?;

    let mut webhook = Webhook {
        id: String::new(),
        owner_id: request.owner_id,
        url: request.url,
        create_at: 0,
        delete_at: 0,
    };
    ctx.store.create_webhook(&mut webhook).await?;

    Ok((StatusCode::CREATED, Json(webhook)))
}

/// GET /api/webhook/{webhook}: returns the webhook in question.
pub async fn get(
    State(ctx): State<Arc<Context>>,
    Path(webhook_id): Path<String>,
) -> Result<impl IntoResponse> {
    ensure_entity_id("webhook", &webhook_id)?;

    let webhook = ctx
        .store
        .get_webhook(&webhook_id)
        .await?
        .ok_or_else(|| Error::not_found("webhook", &webhook_id))?;
    Ok(Json(webhook))
}

/// GET /api/webhooks: returns the requested page of webhooks.
pub async fn list(
    State(ctx): State<Arc<Context>>,
    Query(paging): Query<PagingQuery>,
) -> Result<impl IntoResponse> {
    paging.validate()?;

    let webhooks = ctx.store.get_webhooks(&paging.webhook_filter()).await?;
    Ok(Json(webhooks))
}

/// DELETE /api/webhook/{webhook}: removes the subscriber.
pub async fn delete(
    State(ctx): State<Arc<Context>>,
    Path(webhook_id): Path<String>,
) -> Result<impl IntoResponse> {
    ensure_entity_id("webhook", &webhook_id)?;

    ctx.store
        .get_webhook(&webhook_id)
        .await?
        .ok_or_else(|| Error::not_found("webhook", &webhook_id))?;

    ctx.store.delete_webhook(&webhook_id).await?;
    Ok(StatusCode::OK)
}
