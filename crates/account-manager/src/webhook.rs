//! Best-effort webhook fan-out.
//!
//! Every state change is broadcast to each live subscriber. Delivery failures
//! are logged and skipped; they never influence the state change that
//! triggered them.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{Webhook, WebhookFilter, WebhookPayload};

/// Timeout for a single subscriber delivery.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Store surface the fan-out needs.
#[async_trait]
pub trait WebhookStore: Send + Sync {
    async fn get_webhooks(&self, filter: &WebhookFilter) -> Result<Vec<Webhook>>;
}

#[async_trait]
impl WebhookStore for crate::db::Store {
    async fn get_webhooks(&self, filter: &WebhookFilter) -> Result<Vec<Webhook>> {
        crate::db::Store::get_webhooks(self, filter).await
    }
}

/// Builds the HTTP client used for webhook delivery.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DELIVERY_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// POSTs `payload` to every live subscriber.
///
/// Returns an error only when the subscriber list cannot be read; individual
/// delivery failures are logged and do not stop the fan-out.
pub async fn send_to_all(
    client: &reqwest::Client,
    store: &dyn WebhookStore,
    payload: &WebhookPayload,
) -> Result<()> {
    let webhooks = store.get_webhooks(&WebhookFilter::all_live()).await?;

    for webhook in webhooks {
        match client.post(&webhook.url).json(payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(url = %webhook.url, event = %payload.new_state, "delivered webhook");
            }
            Ok(response) => {
                warn!(
                    url = %webhook.url,
                    status = %response.status(),
                    "webhook endpoint rejected payload"
                );
            }
            Err(err) => {
                warn!(url = %webhook.url, error = %err, "failed to deliver webhook");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PayloadType;

    struct StaticHooks(Vec<Webhook>);

    #[async_trait]
    impl WebhookStore for StaticHooks {
        async fn get_webhooks(&self, _filter: &WebhookFilter) -> Result<Vec<Webhook>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn unreachable_subscriber_does_not_fail_the_fanout() {
        let store = StaticHooks(vec![Webhook {
            id: crate::models::new_id(),
            owner_id: "ops".into(),
            // Nothing listens here; delivery fails with a connection error.
            url: "http://127.0.0.1:1/hook".into(),
            create_at: 0,
            delete_at: 0,
        }]);

        let payload = WebhookPayload::new(
            PayloadType::Account,
            "01ARZ3NDEKTSV4RRFFQ69G5FAV",
            "stable",
            "creation-requested",
            "test",
        );

        send_to_all(&client(), &store, &payload).await.unwrap();
    }

    #[tokio::test]
    async fn empty_subscriber_list_is_a_noop() {
        let store = StaticHooks(Vec::new());
        let payload =
            WebhookPayload::new(PayloadType::Account, "id", "stable", "n/a", "test");
        send_to_all(&client(), &store, &payload).await.unwrap();
    }
}
