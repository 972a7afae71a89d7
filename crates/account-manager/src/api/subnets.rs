//! Subnet-pool read endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;

use super::context::Context;
use super::helpers::{ensure_entity_id, PagingQuery};
use crate::error::{Error, Result};

/// GET /api/subnet/{subnet}: returns the subnet in question.
pub async fn get(
    State(ctx): State<Arc<Context>>,
    Path(subnet_id): Path<String>,
) -> Result<impl IntoResponse> {
    ensure_entity_id("subnet", &subnet_id)?;

    let subnet = ctx
        .store
        .get_subnet(&subnet_id)
        .await?
        .ok_or_else(|| Error::not_found("subnet", &subnet_id))?;
    Ok(Json(subnet))
}

/// GET /api/subnets: returns the requested page of subnets; `show_free`
/// restricts the listing to unclaimed ones.
pub async fn list(
    State(ctx): State<Arc<Context>>,
    Query(paging): Query<PagingQuery>,
) -> Result<impl IntoResponse> {
    paging.validate()?;

    let subnets = ctx.store.get_subnets(&paging.subnet_filter()).await?;
    Ok(Json(subnets))
}
