//! Parent-subnet endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::error;

use super::context::Context;
use super::helpers::{ensure_entity_id, PagingQuery};
use crate::cidr;
use crate::error::{Error, Result};
use crate::models::{new_id, AddParentSubnetRequest, ParentSubnet, PayloadType, WebhookPayload};
use crate::webhook;

/// POST /api/subnets/parent: registers a parent CIDR and carves its children
/// in one transaction.
pub async fn add(
    State(ctx): State<Arc<Context>>,
    body: std::result::Result<Json<AddParentSubnetRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = body.map_err(|err| Error::invalid_request(err.to_string()))?;
    request.validate()?;

    let mut parent = ParentSubnet {
        id: new_id(),
        cidr: request.cidr,
        split_range: request.split_range,
        create_at: 0,
        lock_acquired_by: None,
        lock_acquired_at: 0,
    };

    let mut children = cidr::split_parent_subnet(&parent)?;
    ctx.store
        .add_parent_subnet(&mut parent, &mut children)
        .await?;

    let payload = WebhookPayload::new(
        PayloadType::ParentSubnet,
        &parent.id,
        "added",
        "n/a",
        &ctx.environment,
    );
    if let Err(err) = webhook::send_to_all(&ctx.client, ctx.store.as_ref(), &payload).await {
        error!(error = %err, "unable to process and send webhooks");
    }

    Ok((StatusCode::CREATED, Json(parent)))
}

/// GET /api/subnet/parent/{parentsubnet}: returns the parent subnet in
/// question.
pub async fn get(
    State(ctx): State<Arc<Context>>,
    Path(parent_subnet_id): Path<String>,
) -> Result<impl IntoResponse> {
    ensure_entity_id("parent subnet", &parent_subnet_id)?;

    let parent = ctx
        .store
        .get_parent_subnet(&parent_subnet_id)
        .await?
        .ok_or_else(|| Error::not_found("parent subnet", &parent_subnet_id))?;
    Ok(Json(parent))
}

/// GET /api/subnets/parent: returns the requested page of parent subnets.
pub async fn list(
    State(ctx): State<Arc<Context>>,
    Query(paging): Query<PagingQuery>,
) -> Result<impl IntoResponse> {
    paging.validate()?;

    let parents = ctx
        .store
        .get_parent_subnets(&paging.parent_subnet_filter())
        .await?;
    Ok(Json(parents))
}
