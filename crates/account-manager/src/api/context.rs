//! Shared state and the store surface required by API handlers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::db::Store;
use crate::error::Result;
use crate::models::{
    Account, AccountFilter, ParentSubnet, ParentSubnetFilter, Subnet, SubnetFilter, Webhook,
};
use crate::supervisor::Doer;
use crate::webhook::WebhookStore;

/// Store operations the API needs to persist request effects.
#[async_trait]
pub trait ApiStore: WebhookStore {
    async fn create_account(&self, account: &mut Account) -> Result<()>;
    async fn get_account(&self, id: &str) -> Result<Option<Account>>;
    async fn get_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>>;
    async fn update_account(&self, account: &Account) -> Result<()>;
    async fn lock_account(&self, id: &str, locker_id: &str) -> Result<bool>;
    async fn unlock_account(&self, id: &str, locker_id: &str, force: bool) -> Result<bool>;
    async fn lock_account_api(&self, id: &str) -> Result<()>;
    async fn unlock_account_api(&self, id: &str) -> Result<()>;

    async fn get_subnet(&self, id: &str) -> Result<Option<Subnet>>;
    async fn get_subnets(&self, filter: &SubnetFilter) -> Result<Vec<Subnet>>;
    async fn claim_subnet(&self, cidr: &str, account_physical_id: &str) -> Result<Subnet>;

    async fn get_parent_subnet(&self, id: &str) -> Result<Option<ParentSubnet>>;
    async fn get_parent_subnets(&self, filter: &ParentSubnetFilter) -> Result<Vec<ParentSubnet>>;
    async fn add_parent_subnet(
        &self,
        parent: &mut ParentSubnet,
        children: &mut [Subnet],
    ) -> Result<()>;

    async fn create_webhook(&self, webhook: &mut Webhook) -> Result<()>;
    async fn get_webhook(&self, id: &str) -> Result<Option<Webhook>>;
    async fn delete_webhook(&self, id: &str) -> Result<()>;
}

/// Everything a handler needs to respond to a request.
pub struct Context {
    pub store: Arc<dyn ApiStore>,
    /// Poked after accepted mutations to shorten reconciliation latency.
    pub supervisor: Arc<dyn Doer>,
    /// Deployment environment name attached to webhook payloads.
    pub environment: String,
    /// HTTP client reused for webhook fan-out.
    pub client: reqwest::Client,
}

impl Context {
    pub fn new(
        store: Arc<dyn ApiStore>,
        supervisor: Arc<dyn Doer>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            store,
            supervisor,
            environment: environment.into(),
            client: crate::webhook::client(),
        }
    }
}

#[async_trait]
impl ApiStore for Store {
    async fn create_account(&self, account: &mut Account) -> Result<()> {
        Store::create_account(self, account).await
    }

    async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        Store::get_account(self, id).await
    }

    async fn get_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>> {
        Store::get_accounts(self, filter).await
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        Store::update_account(self, account).await
    }

    async fn lock_account(&self, id: &str, locker_id: &str) -> Result<bool> {
        Store::lock_account(self, id, locker_id).await
    }

    async fn unlock_account(&self, id: &str, locker_id: &str, force: bool) -> Result<bool> {
        Store::unlock_account(self, id, locker_id, force).await
    }

    async fn lock_account_api(&self, id: &str) -> Result<()> {
        Store::lock_account_api(self, id).await
    }

    async fn unlock_account_api(&self, id: &str) -> Result<()> {
        Store::unlock_account_api(self, id).await
    }

    async fn get_subnet(&self, id: &str) -> Result<Option<Subnet>> {
        Store::get_subnet(self, id).await
    }

    async fn get_subnets(&self, filter: &SubnetFilter) -> Result<Vec<Subnet>> {
        Store::get_subnets(self, filter).await
    }

    async fn claim_subnet(&self, cidr: &str, account_physical_id: &str) -> Result<Subnet> {
        Store::claim_subnet(self, cidr, account_physical_id).await
    }

    async fn get_parent_subnet(&self, id: &str) -> Result<Option<ParentSubnet>> {
        Store::get_parent_subnet(self, id).await
    }

    async fn get_parent_subnets(&self, filter: &ParentSubnetFilter) -> Result<Vec<ParentSubnet>> {
        Store::get_parent_subnets(self, filter).await
    }

    async fn add_parent_subnet(
        &self,
        parent: &mut ParentSubnet,
        children: &mut [Subnet],
    ) -> Result<()> {
        Store::add_parent_subnet(self, parent, children).await
    }

    async fn create_webhook(&self, webhook: &mut Webhook) -> Result<()> {
        Store::create_webhook(self, webhook).await
    }

    async fn get_webhook(&self, id: &str) -> Result<Option<Webhook>> {
        Store::get_webhook(self, id).await
    }

    async fn delete_webhook(&self, id: &str) -> Result<()> {
        Store::delete_webhook(self, id).await
    }
}
