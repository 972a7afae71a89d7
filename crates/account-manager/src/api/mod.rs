//! HTTP surface: a thin translator onto the entity store and state machine.

mod accounts;
mod context;
mod error;
mod helpers;
mod lock;
mod parent_subnets;
mod security;
mod subnets;
mod webhooks;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use context::{ApiStore, Context};

/// Builds the API router over the given context.
pub fn router(context: Arc<Context>) -> Router {
    Router::new()
        .route(
            "/api/accounts",
            get(accounts::list).post(accounts::create),
        )
        .route(
            "/api/account/:account",
            get(accounts::get)
                .post(accounts::retry_create)
                .delete(accounts::delete),
        )
        .route("/api/account/:account/provision", post(accounts::provision))
        .route("/api/subnets", get(subnets::list))
        .route("/api/subnet/:subnet", get(subnets::get))
        .route(
            "/api/subnets/parent",
            get(parent_subnets::list).post(parent_subnets::add),
        )
        .route(
            "/api/subnet/parent/:parentsubnet",
            get(parent_subnets::get),
        )
        .route(
            "/api/security/account/:account/api/lock",
            post(security::lock_account_api),
        )
        .route(
            "/api/security/account/:account/api/unlock",
            post(security::unlock_account_api),
        )
        .route(
            "/api/webhooks",
            get(webhooks::list).post(webhooks::create),
        )
        .route(
            "/api/webhook/:webhook",
            get(webhooks::get).delete(webhooks::delete),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}
