//! Provisioner contract driven by the account supervisor.
//!
//! Realizing a sub-account means calling cloud APIs and applying
//! infrastructure code; that work lives behind [`AccountProvisioner`] so the
//! supervisor only sees state outcomes. The shipped implementation,
//! [`ExecProvisioner`], delegates to an operator-supplied command.

mod exec;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Account;

pub use exec::ExecProvisioner;

/// Operations the supervisor invokes to realize account state changes.
///
/// Every error drives the account into the matching `*-failed` state.
#[async_trait]
pub trait AccountProvisioner: Send + Sync {
    /// Optionally mutates the account in memory before creation; the
    /// supervisor persists the account when this returns `true`.
    async fn prepare_account(&self, account: &mut Account) -> bool;

    /// Realizes the sub-account. On success the provider metadata's physical
    /// account id must be populated.
    async fn create_account(&self, account: &mut Account) -> Result<()>;

    /// Realizes networking for the account. Expects the subnet to have been
    /// claimed already.
    async fn provision_account(&self, account: &mut Account) -> Result<()>;

    /// Tears down networking and the sub-account. When the account was
    /// provisioned, also returns its claimed subnet to the pool.
    async fn delete_account(&self, account: &mut Account) -> Result<()>;
}

/// Subnet-pool surface the delete path needs.
#[async_trait]
pub trait SubnetPool: Send + Sync {
    async fn release_subnet(&self, cidr: &str) -> Result<()>;
}

#[async_trait]
impl SubnetPool for crate::db::Store {
    async fn release_subnet(&self, cidr: &str) -> Result<()> {
        crate::db::Store::release_subnet(self, cidr).await
    }
}
