//! Advisory row locks stored directly on entity rows.
//!
//! A lock is a single conditional UPDATE: it either flips the row from
//! unlocked to locked-by-caller or touches nothing, so concurrent callers
//! race safely at the database.

use super::Store;
use crate::error::Result;
use crate::models::now_millis;

/// Tables carrying the `lock_acquired_by` / `lock_acquired_at` columns.
#[derive(Debug, Clone, Copy)]
pub(super) enum LockTable {
    Account,
    ParentSubnet,
    SubnetPool,
}

impl LockTable {
    fn name(self) -> &'static str {
        match self {
            LockTable::Account => "account",
            LockTable::ParentSubnet => "parent_subnet",
            LockTable::SubnetPool => "subnet_pool",
        }
    }
}

impl Store {
    /// Acquires the row lock iff the row is currently unlocked.
    pub(super) async fn lock_row(
        &self,
        table: LockTable,
        id: &str,
        locker_id: &str,
    ) -> Result<bool> {
        let sql = format!(
            "UPDATE {} SET lock_acquired_by = $1, lock_acquired_at = $2 \
             WHERE id = $3 AND lock_acquired_at = 0",
            table.name()
        );
        let done = sqlx::query(&sql)
            .bind(locker_id)
            .bind(now_millis())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() == 1)
    }

    /// Releases the row lock held by `locker_id`, or by anyone when `force`.
    pub(super) async fn unlock_row(
        &self,
        table: LockTable,
        id: &str,
        locker_id: &str,
        force: bool,
    ) -> Result<bool> {
        let done = if force {
            let sql = format!(
                "UPDATE {} SET lock_acquired_by = NULL, lock_acquired_at = 0 WHERE id = $1",
                table.name()
            );
            sqlx::query(&sql).bind(id).execute(&self.pool).await?
        } else {
            let sql = format!(
                "UPDATE {} SET lock_acquired_by = NULL, lock_acquired_at = 0 \
                 WHERE id = $1 AND lock_acquired_by = $2",
                table.name()
            );
            sqlx::query(&sql)
                .bind(id)
                .bind(locker_id)
                .execute(&self.pool)
                .await?
        };
        Ok(done.rows_affected() > 0)
    }
}
