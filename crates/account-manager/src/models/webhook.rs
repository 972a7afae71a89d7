//! Webhook subscribers and the state-change payload they receive.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A registered webhook subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: String,
    pub owner_id: String,
    pub url: String,
    pub create_at: i64,
    pub delete_at: i64,
}

impl Webhook {
    pub fn is_deleted(&self) -> bool {
        self.delete_at > 0
    }
}

/// Constrains a webhook listing.
#[derive(Debug, Clone, Copy)]
pub struct WebhookFilter {
    pub page: u64,
    pub per_page: i64,
    pub include_deleted: bool,
}

impl Default for WebhookFilter {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: 100,
            include_deleted: false,
        }
    }
}

impl WebhookFilter {
    /// Filter matching every live webhook, used by the fan-out path.
    pub fn all_live() -> Self {
        Self {
            page: 0,
            per_page: crate::models::ALL_PER_PAGE,
            include_deleted: false,
        }
    }
}

/// Entity kind named in a [`WebhookPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadType {
    Account,
    ParentSubnet,
}

/// State-change event broadcast to every live subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(rename = "type")]
    pub payload_type: PayloadType,
    pub id: String,
    #[serde(rename = "newState")]
    pub new_state: String,
    /// `"n/a"` on initial creation events.
    #[serde(rename = "oldState")]
    pub old_state: String,
    /// Nanoseconds since the epoch.
    pub timestamp: i64,
    #[serde(rename = "extraData")]
    pub extra_data: HashMap<String, String>,
}

impl WebhookPayload {
    pub fn new(
        payload_type: PayloadType,
        id: impl Into<String>,
        new_state: impl Into<String>,
        old_state: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        let mut extra_data = HashMap::new();
        extra_data.insert("Environment".to_string(), environment.into());
        Self {
            payload_type,
            id: id.into(),
            new_state: new_state.into(),
            old_state: old_state.into(),
            timestamp: chrono::Utc::now()
                .timestamp_nanos_opt()
                .unwrap_or_default(),
            extra_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_wire_format() {
        let payload = WebhookPayload::new(
            PayloadType::Account,
            "01ARZ3NDEKTSV4RRFFQ69G5FAV",
            "stable",
            "provisioning-requested",
            "dev",
        );
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "account");
        assert_eq!(value["id"], "01ARZ3NDEKTSV4RRFFQ69G5FAV");
        assert_eq!(value["newState"], "stable");
        assert_eq!(value["oldState"], "provisioning-requested");
        assert_eq!(value["extraData"]["Environment"], "dev");
        assert!(value["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn parent_subnet_type_is_kebab_case() {
        let json = serde_json::to_string(&PayloadType::ParentSubnet).unwrap();
        assert_eq!(json, "\"parent-subnet\"");
    }
}
