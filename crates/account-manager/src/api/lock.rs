//! Row-lock helper for multi-stage handlers.
//!
//! Synchronizes access to an account across potentially multiple server
//! replicas. The guard releases at most once; handlers release explicitly
//! before poking the supervisor so background work sees an unlocked row.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::error;

use super::context::ApiStore;
use crate::error::{Error, Result};
use crate::models::{new_id, Account};

pub(super) struct RowLockGuard {
    store: Arc<dyn ApiStore>,
    account_id: String,
    locker_id: String,
    released: AtomicBool,
}

impl RowLockGuard {
    /// Releases the row lock; later calls are no-ops.
    pub(super) async fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        match self
            .store
            .unlock_account(&self.account_id, &self.locker_id, false)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                error!(account = %self.account_id, "failed to release lock for account")
            }
            Err(err) => {
                error!(account = %self.account_id, error = %err, "failed to unlock account")
            }
        }
    }
}

/// Fetches the account and acquires its row lock under a fresh request id.
///
/// A missing account maps to not-found; a lock already held by anyone else
/// maps to a conflict.
pub(super) async fn lock_account(
    store: &Arc<dyn ApiStore>,
    account_id: &str,
) -> Result<(Account, RowLockGuard)> {
    let account = store
        .get_account(account_id)
        .await?
        .ok_or_else(|| Error::not_found("account", account_id))?;

    let locker_id = new_id();
    if !store.lock_account(account_id, &locker_id).await? {
        return Err(Error::LockConflict {
            kind: "account",
            id: account_id.to_string(),
        });
    }

    let guard = RowLockGuard {
        store: store.clone(),
        account_id: account_id.to_string(),
        locker_id,
        released: AtomicBool::new(false),
    };
    Ok((account, guard))
}
