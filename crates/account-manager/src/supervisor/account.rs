//! Account supervisor: finds accounts pending work and effects the change.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::Doer;
use crate::error::Result;
use crate::models::{Account, AccountState, PayloadType, WebhookPayload};
use crate::provisioner::AccountProvisioner;
use crate::webhook::{self, WebhookStore};

/// Store surface the account supervisor needs.
#[async_trait]
pub trait AccountStore: WebhookStore {
    async fn get_account(&self, id: &str) -> Result<Option<Account>>;
    async fn get_unlocked_accounts_pending_work(&self) -> Result<Vec<Account>>;
    async fn update_account(&self, account: &Account) -> Result<()>;
    async fn delete_account(&self, id: &str) -> Result<()>;
    async fn lock_account(&self, id: &str, locker_id: &str) -> Result<bool>;
    async fn unlock_account(&self, id: &str, locker_id: &str, force: bool) -> Result<bool>;
}

#[async_trait]
impl AccountStore for crate::db::Store {
    async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        crate::db::Store::get_account(self, id).await
    }

    async fn get_unlocked_accounts_pending_work(&self) -> Result<Vec<Account>> {
        crate::db::Store::get_unlocked_accounts_pending_work(self).await
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        crate::db::Store::update_account(self, account).await
    }

    async fn delete_account(&self, id: &str) -> Result<()> {
        crate::db::Store::delete_account(self, id).await
    }

    async fn lock_account(&self, id: &str, locker_id: &str) -> Result<bool> {
        crate::db::Store::lock_account(self, id, locker_id).await
    }

    async fn unlock_account(&self, id: &str, locker_id: &str, force: bool) -> Result<bool> {
        crate::db::Store::unlock_account(self, id, locker_id, force).await
    }
}

/// Drives accounts in pending-work states toward a terminal state.
///
/// Safe to run in every replica: the row lock taken in `supervise` is atomic
/// at the database, so two instances never act on the same account at once.
pub struct AccountSupervisor {
    store: Arc<dyn AccountStore>,
    provisioner: Arc<dyn AccountProvisioner>,
    instance_id: String,
    environment: String,
    client: reqwest::Client,
}

impl AccountSupervisor {
    pub fn new(
        store: Arc<dyn AccountStore>,
        provisioner: Arc<dyn AccountProvisioner>,
        instance_id: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provisioner,
            instance_id: instance_id.into(),
            environment: environment.into(),
            client: webhook::client(),
        }
    }

    /// Schedules the required work on the given account.
    pub async fn supervise(&self, account: &Account) {
        let locked = match self
            .store
            .lock_account(&account.id, &self.instance_id)
            .await
        {
            Ok(locked) => locked,
            Err(err) => {
                error!(account = %account.id, error = %err, "failed to lock account");
                false
            }
        };
        if !locked {
            return;
        }

        self.supervise_locked(account).await;

        match self
            .store
            .unlock_account(&account.id, &self.instance_id, false)
            .await
        {
            Ok(true) => {}
            Ok(false) => error!(account = %account.id, "failed to release lock for account"),
            Err(err) => {
                error!(account = %account.id, error = %err, "failed to unlock account")
            }
        }
    }

    async fn supervise_locked(&self, observed: &Account) {
        let id = observed.id.as_str();

        // The account may have been advanced by another server between the
        // pending-work query and acquiring the lock; work only on fresh state.
        let mut account = match self.store.get_account(id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                warn!(account = %id, "account disappeared before supervision");
                return;
            }
            Err(err) => {
                error!(account = %id, error = %err, "failed to get refreshed account");
                return;
            }
        };
        if account.state != observed.state {
            warn!(
                account = %id,
                old_state = %observed.state,
                new_state = %account.state,
                "another worker has advanced this account; skipping"
            );
            return;
        }

        debug!(account = %id, state = %account.state, "supervising account");

        let new_state = self.transition_account(&mut account).await;

        let mut account = match self.store.get_account(id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                warn!(account = %id, state = %new_state, "cannot persist state; account is gone");
                return;
            }
            Err(err) => {
                error!(account = %id, error = %err, "failed to re-read account before persisting");
                return;
            }
        };
        if account.state == new_state {
            return;
        }

        let old_state = account.state;
        account.state = new_state;
        if let Err(err) = self.store.update_account(&account).await {
            warn!(account = %id, state = %new_state, error = %err, "failed to persist account state");
            return;
        }

        let payload = WebhookPayload::new(
            PayloadType::Account,
            id,
            new_state.as_str(),
            old_state.as_str(),
            &self.environment,
        );
        if let Err(err) = webhook::send_to_all(&self.client, self.store.as_ref(), &payload).await {
            error!(account = %id, error = %err, "unable to process and send webhooks");
        }

        debug!(account = %id, from = %old_state, to = %new_state, "transitioned account");
    }

    /// Works the account toward its next state; failures land in the
    /// matching `*-failed` state.
    async fn transition_account(&self, account: &mut Account) -> AccountState {
        match account.state {
            AccountState::CreationRequested => self.create_account(account).await,
            AccountState::ProvisioningRequested => self.provision_account(account).await,
            AccountState::DeletionRequested => self.delete_account(account).await,
            AccountState::RefreshMetadata => self.refresh_account_metadata(account).await,
            other => {
                warn!(account = %account.id, state = %other, "account pending work in unexpected state");
                other
            }
        }
    }

    async fn create_account(&self, account: &mut Account) -> AccountState {
        if self.provisioner.prepare_account(account).await {
            if let Err(err) = self.store.update_account(account).await {
                error!(account = %account.id, error = %err, "failed to record prepared account");
                return AccountState::CreationFailed;
            }
        }

        if let Err(err) = self.provisioner.create_account(account).await {
            error!(account = %account.id, error = %err, "failed to create account");
            return AccountState::CreationFailed;
        }

        info!(account = %account.id, "finished creating account");

        if account.provision_requested() {
            return self.provision_account(account).await;
        }
        AccountState::Stable
    }

    async fn provision_account(&self, account: &mut Account) -> AccountState {
        if let Err(err) = self.provisioner.provision_account(account).await {
            error!(account = %account.id, error = %err, "failed to provision account");
            return AccountState::ProvisioningFailed;
        }

        info!(account = %account.id, "finished provisioning account");
        self.refresh_account_metadata(account).await
    }

    async fn refresh_account_metadata(&self, account: &mut Account) -> AccountState {
        if let Err(err) = self.store.update_account(account).await {
            error!(account = %account.id, error = %err, "failed to save updated account metadata");
            return AccountState::ProvisioningFailed;
        }
        AccountState::Stable
    }

    async fn delete_account(&self, account: &mut Account) -> AccountState {
        if let Err(err) = self.provisioner.delete_account(account).await {
            error!(account = %account.id, error = %err, "failed to delete account");
            return AccountState::DeletionFailed;
        }

        if let Err(err) = self.store.delete_account(&account.id).await {
            error!(account = %account.id, error = %err, "failed to record account deletion");
            return AccountState::DeletionFailed;
        }

        info!(account = %account.id, "finished deleting account");
        AccountState::Deleted
    }
}

#[async_trait]
impl Doer for AccountSupervisor {
    /// Looks for pending accounts and schedules the required work on each.
    async fn do_work(&self) -> Result<()> {
        let accounts = match self.store.get_unlocked_accounts_pending_work().await {
            Ok(accounts) => accounts,
            Err(err) => {
                warn!(error = %err, "failed to query for accounts pending work");
                return Ok(());
            }
        };

        for account in &accounts {
            self.supervise(account).await;
        }

        Ok(())
    }
}
