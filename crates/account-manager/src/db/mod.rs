//! Durable entity store over Postgres.
//!
//! One file per entity plus the shared row-lock primitives. All queries use
//! bind parameters; the multi-row paths (parent-subnet registration, subnet
//! claim and release) run in explicit transactions.

mod accounts;
mod locks;
mod parent_subnets;
mod subnets;
mod system;
mod webhooks;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;
use crate::error::Result;

pub use system::LATEST_SCHEMA_VERSION;

/// Handle to the entity store. Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Builds a `LIMIT`/`OFFSET` clause, or nothing when paging is disabled.
fn paging_clause(page: u64, per_page: i64) -> String {
    if per_page < 0 {
        String::new()
    } else {
        let offset = page.saturating_mul(per_page as u64);
        format!(" LIMIT {per_page} OFFSET {offset}")
    }
}
