//! In-memory test doubles for the store and provisioner seams.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::ApiStore;
use crate::error::{Error, Result};
use crate::models::{
    new_id, now_millis, Account, AccountFilter, ParentSubnet, ParentSubnetFilter, Subnet,
    SubnetFilter, Webhook, WebhookFilter,
};
use crate::provisioner::AccountProvisioner;
use crate::supervisor::AccountStore;
use crate::webhook::WebhookStore;

/// Mutex-backed store with the same observable semantics as the SQL store.
#[derive(Default)]
pub(crate) struct MockStore {
    pub accounts: Mutex<Vec<Account>>,
    pub parent_subnets: Mutex<Vec<ParentSubnet>>,
    pub subnets: Mutex<Vec<Subnet>>,
    pub webhooks: Mutex<Vec<Webhook>>,
    pub update_calls: AtomicUsize,
}

impl MockStore {
    pub fn seed_account(&self, account: Account) {
        self.accounts.lock().unwrap().push(account);
    }

    pub fn seed_subnet(&self, subnet: Subnet) {
        self.subnets.lock().unwrap().push(subnet);
    }

    pub fn seed_webhook(&self, url: &str) {
        self.webhooks.lock().unwrap().push(Webhook {
            id: new_id(),
            owner_id: "test".into(),
            url: url.to_string(),
            create_at: now_millis(),
            delete_at: 0,
        });
    }

    pub fn account(&self, id: &str) -> Option<Account> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|account| account.id == id)
            .cloned()
    }

    pub fn subnet_by_cidr(&self, cidr: &str) -> Option<Subnet> {
        self.subnets
            .lock()
            .unwrap()
            .iter()
            .find(|subnet| subnet.cidr == cidr)
            .cloned()
    }
}

#[async_trait]
impl WebhookStore for MockStore {
    async fn get_webhooks(&self, filter: &WebhookFilter) -> Result<Vec<Webhook>> {
        Ok(self
            .webhooks
            .lock()
            .unwrap()
            .iter()
            .filter(|webhook| filter.include_deleted || !webhook.is_deleted())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AccountStore for MockStore {
    async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        Ok(self.account(id))
    }

    async fn get_unlocked_accounts_pending_work(&self) -> Result<Vec<Account>> {
        let mut pending: Vec<Account> = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|account| account.state.is_pending_work() && account.lock_acquired_at == 0)
            .cloned()
            .collect();
        pending.sort_by_key(|account| account.create_at);
        Ok(pending)
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap();
        let stored = accounts
            .iter_mut()
            .find(|stored| stored.id == account.id)
            .ok_or_else(|| Error::not_found("account", &account.id))?;

        // Deletion stamp and lock columns are owned by their own operations.
        stored.state = account.state;
        stored.provider = account.provider.clone();
        stored.provisioner = account.provisioner.clone();
        stored.provider_metadata = account.provider_metadata.clone();
        stored.account_metadata = account.account_metadata.clone();

        self.update_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_account(&self, id: &str) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(stored) = accounts.iter_mut().find(|stored| stored.id == id) {
            if stored.delete_at == 0 {
                stored.delete_at = now_millis();
            }
        }
        Ok(())
    }

    async fn lock_account(&self, id: &str, locker_id: &str) -> Result<bool> {
        let mut accounts = self.accounts.lock().unwrap();
        match accounts.iter_mut().find(|stored| stored.id == id) {
            Some(stored) if stored.lock_acquired_at == 0 => {
                stored.lock_acquired_by = Some(locker_id.to_string());
                stored.lock_acquired_at = now_millis();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn unlock_account(&self, id: &str, locker_id: &str, force: bool) -> Result<bool> {
        let mut accounts = self.accounts.lock().unwrap();
        match accounts.iter_mut().find(|stored| stored.id == id) {
            Some(stored) if force || stored.lock_acquired_by.as_deref() == Some(locker_id) => {
                stored.lock_acquired_by = None;
                stored.lock_acquired_at = 0;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ApiStore for MockStore {
    async fn create_account(&self, account: &mut Account) -> Result<()> {
        account.id = new_id();
        account.create_at = now_millis();
        self.accounts.lock().unwrap().push(account.clone());
        Ok(())
    }

    async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        Ok(self.account(id))
    }

    async fn get_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|account| filter.include_deleted || !account.is_deleted())
            .cloned()
            .collect();
        accounts.sort_by_key(|account| account.create_at);
        Ok(accounts)
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        AccountStore::update_account(self, account).await
    }

    async fn lock_account(&self, id: &str, locker_id: &str) -> Result<bool> {
        AccountStore::lock_account(self, id, locker_id).await
    }

    async fn unlock_account(&self, id: &str, locker_id: &str, force: bool) -> Result<bool> {
        AccountStore::unlock_account(self, id, locker_id, force).await
    }

    async fn lock_account_api(&self, id: &str) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(stored) = accounts.iter_mut().find(|stored| stored.id == id) {
            stored.api_security_lock = true;
        }
        Ok(())
    }

    async fn unlock_account_api(&self, id: &str) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(stored) = accounts.iter_mut().find(|stored| stored.id == id) {
            stored.api_security_lock = false;
        }
        Ok(())
    }

    async fn get_subnet(&self, id: &str) -> Result<Option<Subnet>> {
        Ok(self
            .subnets
            .lock()
            .unwrap()
            .iter()
            .find(|subnet| subnet.id == id)
            .cloned())
    }

    async fn get_subnets(&self, filter: &SubnetFilter) -> Result<Vec<Subnet>> {
        let mut subnets: Vec<Subnet> = self
            .subnets
            .lock()
            .unwrap()
            .iter()
            .filter(|subnet| !filter.free || subnet.is_free())
            .cloned()
            .collect();
        subnets.sort_by_key(|subnet| subnet.create_at);
        Ok(subnets)
    }

    async fn claim_subnet(&self, cidr: &str, account_physical_id: &str) -> Result<Subnet> {
        if account_physical_id.is_empty() {
            return Err(Error::invalid_request(
                "cannot claim a subnet without an account id",
            ));
        }

        let mut subnets = self.subnets.lock().unwrap();
        let subnet = if cidr.is_empty() {
            subnets
                .iter_mut()
                .filter(|subnet| subnet.is_free())
                .min_by_key(|subnet| subnet.create_at)
                .ok_or(Error::NoFreeSubnets)?
        } else {
            subnets
                .iter_mut()
                .find(|subnet| subnet.cidr == cidr)
                .ok_or_else(|| Error::not_found("subnet", cidr))?
        };

        if !subnet.is_free() {
            return Err(Error::AlreadyClaimed(subnet.cidr.clone()));
        }
        subnet.account_id = account_physical_id.to_string();
        Ok(subnet.clone())
    }

    async fn get_parent_subnet(&self, id: &str) -> Result<Option<ParentSubnet>> {
        Ok(self
            .parent_subnets
            .lock()
            .unwrap()
            .iter()
            .find(|parent| parent.id == id)
            .cloned())
    }

    async fn get_parent_subnets(&self, _filter: &ParentSubnetFilter) -> Result<Vec<ParentSubnet>> {
        Ok(self.parent_subnets.lock().unwrap().clone())
    }

    async fn add_parent_subnet(
        &self,
        parent: &mut ParentSubnet,
        children: &mut [Subnet],
    ) -> Result<()> {
        parent.create_at = now_millis();
        self.parent_subnets.lock().unwrap().push(parent.clone());
        let mut subnets = self.subnets.lock().unwrap();
        for child in children.iter_mut() {
            child.id = new_id();
            child.create_at = parent.create_at;
            subnets.push(child.clone());
        }
        Ok(())
    }

    async fn create_webhook(&self, webhook: &mut Webhook) -> Result<()> {
        webhook.id = new_id();
        webhook.create_at = now_millis();
        self.webhooks.lock().unwrap().push(webhook.clone());
        Ok(())
    }

    async fn get_webhook(&self, id: &str) -> Result<Option<Webhook>> {
        Ok(self
            .webhooks
            .lock()
            .unwrap()
            .iter()
            .find(|webhook| webhook.id == id)
            .cloned())
    }

    async fn delete_webhook(&self, id: &str) -> Result<()> {
        let mut webhooks = self.webhooks.lock().unwrap();
        if let Some(stored) = webhooks.iter_mut().find(|stored| stored.id == id) {
            if stored.delete_at == 0 {
                stored.delete_at = now_millis();
            }
        }
        Ok(())
    }
}

/// Provisioner double with per-operation failure switches and call counts.
#[derive(Default)]
pub(crate) struct MockProvisioner {
    pub prepare_returns: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_provision: AtomicBool,
    pub fail_delete: AtomicBool,
    pub create_calls: AtomicUsize,
    pub provision_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

#[async_trait]
impl AccountProvisioner for MockProvisioner {
    async fn prepare_account(&self, _account: &mut Account) -> bool {
        self.prepare_returns.load(Ordering::SeqCst)
    }

    async fn create_account(&self, account: &mut Account) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::provisioner("simulated create failure"));
        }
        if let Some(metadata) = account.provider_metadata.as_mut() {
            if metadata.aws_account_id.is_empty() {
                metadata.aws_account_id = "123456789012".to_string();
            }
        }
        Ok(())
    }

    async fn provision_account(&self, _account: &mut Account) -> Result<()> {
        self.provision_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_provision.load(Ordering::SeqCst) {
            return Err(Error::provisioner("simulated provision failure"));
        }
        Ok(())
    }

    async fn delete_account(&self, _account: &mut Account) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Error::provisioner("simulated delete failure"));
        }
        Ok(())
    }
}
