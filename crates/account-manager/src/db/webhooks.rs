//! Webhook subscriber persistence.

use super::{paging_clause, Store};
use crate::error::{Error, Result};
use crate::models::{new_id, now_millis, Webhook, WebhookFilter};

const WEBHOOK_COLUMNS: &str = "id, owner_id, url, create_at, delete_at";

#[derive(sqlx::FromRow)]
struct WebhookRow {
    id: String,
    owner_id: String,
    url: String,
    create_at: i64,
    delete_at: i64,
}

impl From<WebhookRow> for Webhook {
    fn from(row: WebhookRow) -> Self {
        Webhook {
            id: row.id,
            owner_id: row.owner_id,
            url: row.url,
            create_at: row.create_at,
            delete_at: row.delete_at,
        }
    }
}

impl Store {
    /// Records a new webhook subscriber. A live webhook with the same URL
    /// already present is rejected.
    pub async fn create_webhook(&self, webhook: &mut Webhook) -> Result<()> {
        webhook.id = new_id();
        webhook.create_at = now_millis();
        webhook.delete_at = 0;

        sqlx::query(
            "INSERT INTO webhooks (id, owner_id, url, create_at, delete_at) \
             VALUES ($1, $2, $3, $4, 0)",
        )
        .bind(&webhook.id)
        .bind(&webhook.owner_id)
        .bind(&webhook.url)
        .bind(webhook.create_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Error::invalid_request(format!("webhook already registered for {}", webhook.url))
            }
            other => Error::from(other),
        })?;

        Ok(())
    }

    /// Fetches a webhook by id; `None` when absent.
    pub async fn get_webhook(&self, id: &str) -> Result<Option<Webhook>> {
        let sql = format!("SELECT {WEBHOOK_COLUMNS} FROM webhooks WHERE id = $1");
        let row: Option<WebhookRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Webhook::from))
    }

    /// Fetches the requested page of webhooks, oldest first.
    pub async fn get_webhooks(&self, filter: &WebhookFilter) -> Result<Vec<Webhook>> {
        let mut sql = format!("SELECT {WEBHOOK_COLUMNS} FROM webhooks");
        if !filter.include_deleted {
            sql.push_str(" WHERE delete_at = 0");
        }
        sql.push_str(" ORDER BY create_at ASC");
        sql.push_str(&paging_clause(filter.page, filter.per_page));

        let rows: Vec<WebhookRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Webhook::from).collect())
    }

    /// Marks the webhook as deleted without removing the row.
    pub async fn delete_webhook(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE webhooks SET delete_at = $1 WHERE id = $2 AND delete_at = 0")
            .bind(now_millis())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
