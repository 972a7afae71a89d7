//! Account persistence.

use super::locks::LockTable;
use super::{paging_clause, Store};
use crate::error::Result;
use crate::models::{
    new_id, now_millis, Account, AccountFilter, AccountMetadata, AccountState, AwsMetadata,
};

const ACCOUNT_COLUMNS: &str = "id, state, provider, provisioner, provider_metadata, \
     account_metadata, create_at, delete_at, api_security_lock, lock_acquired_by, \
     lock_acquired_at";

/// Raw row shape; metadata blobs are decoded into typed structs on the way out.
#[derive(sqlx::FromRow)]
struct AccountRow {
    id: String,
    state: String,
    provider: String,
    provisioner: String,
    provider_metadata: Option<serde_json::Value>,
    account_metadata: Option<serde_json::Value>,
    create_at: i64,
    delete_at: i64,
    api_security_lock: bool,
    lock_acquired_by: Option<String>,
    lock_acquired_at: i64,
}

impl AccountRow {
    fn into_account(self) -> Result<Account> {
        let provider_metadata: Option<AwsMetadata> = self
            .provider_metadata
            .map(serde_json::from_value)
            .transpose()?;
        let account_metadata: Option<AccountMetadata> = self
            .account_metadata
            .map(serde_json::from_value)
            .transpose()?;

        Ok(Account {
            id: self.id,
            state: self.state.parse()?,
            provider: self.provider,
            provisioner: self.provisioner,
            provider_metadata,
            account_metadata,
            create_at: self.create_at,
            delete_at: self.delete_at,
            api_security_lock: self.api_security_lock,
            lock_acquired_by: self.lock_acquired_by,
            lock_acquired_at: self.lock_acquired_at,
        })
    }
}

fn rows_to_accounts(rows: Vec<AccountRow>) -> Result<Vec<Account>> {
    rows.into_iter().map(AccountRow::into_account).collect()
}

impl Store {
    /// Records a new account, assigning it an id and creation timestamp.
    pub async fn create_account(&self, account: &mut Account) -> Result<()> {
        account.id = new_id();
        account.create_at = now_millis();

        let provider_metadata = account
            .provider_metadata
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let account_metadata = account
            .account_metadata
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            "INSERT INTO account (id, state, provider, provisioner, provider_metadata, \
             account_metadata, create_at, delete_at, api_security_lock, lock_acquired_by, \
             lock_acquired_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, NULL, 0)",
        )
        .bind(&account.id)
        .bind(account.state.as_str())
        .bind(&account.provider)
        .bind(&account.provisioner)
        .bind(provider_metadata)
        .bind(account_metadata)
        .bind(account.create_at)
        .bind(account.api_security_lock)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches an account by id; `None` when absent.
    pub async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = $1");
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(AccountRow::into_account).transpose()
    }

    /// Fetches the requested page of accounts, oldest first.
    pub async fn get_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>> {
        let mut sql = format!("SELECT {ACCOUNT_COLUMNS} FROM account");
        if !filter.include_deleted {
            sql.push_str(" WHERE delete_at = 0");
        }
        sql.push_str(" ORDER BY create_at ASC");
        sql.push_str(&paging_clause(filter.page, filter.per_page));

        let rows: Vec<AccountRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows_to_accounts(rows)
    }

    /// Returns every unlocked account in a pending-work state, oldest first.
    pub async fn get_unlocked_accounts_pending_work(&self) -> Result<Vec<Account>> {
        let states: Vec<&str> = AccountState::PENDING_WORK
            .iter()
            .map(AccountState::as_str)
            .collect();
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account \
             WHERE state = ANY($1) AND lock_acquired_at = 0 \
             ORDER BY create_at ASC"
        );
        let rows: Vec<AccountRow> = sqlx::query_as(&sql)
            .bind(states)
            .fetch_all(&self.pool)
            .await?;
        rows_to_accounts(rows)
    }

    /// Persists state, provider fields, and both metadata blobs.
    pub async fn update_account(&self, account: &Account) -> Result<()> {
        let provider_metadata = account
            .provider_metadata
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let account_metadata = account
            .account_metadata
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            "UPDATE account SET state = $1, provider = $2, provisioner = $3, \
             provider_metadata = $4, account_metadata = $5 \
             WHERE id = $6",
        )
        .bind(account.state.as_str())
        .bind(&account.provider)
        .bind(&account.provisioner)
        .bind(provider_metadata)
        .bind(account_metadata)
        .bind(&account.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Marks the account as deleted without removing the row.
    pub async fn delete_account(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE account SET delete_at = $1 WHERE id = $2 AND delete_at = 0")
            .bind(now_millis())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Marks the account as locked for exclusive use by the caller.
    pub async fn lock_account(&self, id: &str, locker_id: &str) -> Result<bool> {
        self.lock_row(LockTable::Account, id, locker_id).await
    }

    /// Releases a lock previously acquired against a caller.
    pub async fn unlock_account(&self, id: &str, locker_id: &str, force: bool) -> Result<bool> {
        self.unlock_row(LockTable::Account, id, locker_id, force)
            .await
    }

    /// Denies API mutations to the account.
    pub async fn lock_account_api(&self, id: &str) -> Result<()> {
        self.set_account_api_lock(id, true).await
    }

    /// Permits API mutations to the account again.
    pub async fn unlock_account_api(&self, id: &str) -> Result<()> {
        self.set_account_api_lock(id, false).await
    }

    async fn set_account_api_lock(&self, id: &str, lock: bool) -> Result<()> {
        sqlx::query("UPDATE account SET api_security_lock = $1 WHERE id = $2")
            .bind(lock)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
