//! Domain model: entities, lifecycle states, and request validation.

mod account;
mod parent_subnet;
mod request;
mod subnet;
mod webhook;

pub use account::{
    Account, AccountFilter, AccountMetadata, AccountState, AwsMetadata, PROVIDER_AWS,
    PROVISIONER_PLATFORM,
};
pub use parent_subnet::{ParentSubnet, ParentSubnetFilter};
pub use request::{
    AddParentSubnetRequest, CreateAccountRequest, CreateWebhookRequest, ProvisionAccountRequest,
};
pub use subnet::{Subnet, SubnetFilter};
pub use webhook::{PayloadType, Webhook, WebhookFilter, WebhookPayload};

/// `per_page` value that disables paging.
pub const ALL_PER_PAGE: i64 = -1;

/// Generates a new 26-character entity identifier.
pub fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

/// Current time in milliseconds since the epoch, the persisted timestamp unit.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
