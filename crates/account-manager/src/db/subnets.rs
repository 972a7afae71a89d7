//! Subnet pool persistence: listing, transactional claim, and release.

use sqlx::{Postgres, Transaction};

use super::locks::LockTable;
use super::{paging_clause, Store};
use crate::error::{Error, Result};
use crate::models::{new_id, now_millis, Subnet, SubnetFilter};

const SUBNET_COLUMNS: &str =
    "id, cidr, account_id, parent_subnet, create_at, lock_acquired_by, lock_acquired_at";

#[derive(sqlx::FromRow)]
struct SubnetRow {
    id: String,
    cidr: String,
    account_id: String,
    parent_subnet: String,
    create_at: i64,
    lock_acquired_by: Option<String>,
    lock_acquired_at: i64,
}

impl From<SubnetRow> for Subnet {
    fn from(row: SubnetRow) -> Self {
        Subnet {
            id: row.id,
            cidr: row.cidr,
            account_id: row.account_id,
            parent_subnet: row.parent_subnet,
            create_at: row.create_at,
            lock_acquired_by: row.lock_acquired_by,
            lock_acquired_at: row.lock_acquired_at,
        }
    }
}

impl Store {
    /// Fetches a subnet by id; `None` when absent.
    pub async fn get_subnet(&self, id: &str) -> Result<Option<Subnet>> {
        let sql = format!("SELECT {SUBNET_COLUMNS} FROM subnet_pool WHERE id = $1");
        let row: Option<SubnetRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Subnet::from))
    }

    /// Fetches a subnet by its CIDR; `None` when absent.
    pub async fn get_subnet_by_cidr(&self, cidr: &str) -> Result<Option<Subnet>> {
        let sql = format!("SELECT {SUBNET_COLUMNS} FROM subnet_pool WHERE cidr = $1");
        let row: Option<SubnetRow> = sqlx::query_as(&sql)
            .bind(cidr)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Subnet::from))
    }

    /// Fetches the requested page of subnets, oldest first.
    pub async fn get_subnets(&self, filter: &SubnetFilter) -> Result<Vec<Subnet>> {
        let mut sql = format!("SELECT {SUBNET_COLUMNS} FROM subnet_pool");
        if filter.free {
            sql.push_str(" WHERE account_id = ''");
        }
        sql.push_str(" ORDER BY create_at ASC");
        sql.push_str(&paging_clause(filter.page, filter.per_page));

        let rows: Vec<SubnetRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Subnet::from).collect())
    }

    /// Persists the lease column of the given subnet.
    pub async fn update_subnet(&self, subnet: &Subnet) -> Result<()> {
        sqlx::query("UPDATE subnet_pool SET account_id = $1 WHERE id = $2")
            .bind(&subnet.account_id)
            .bind(&subnet.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Atomically associates a free subnet with `account_physical_id`.
    ///
    /// With a non-empty `cidr` the named subnet is claimed; otherwise the
    /// oldest free subnet is taken. Runs at repeatable read so concurrent
    /// claimers racing for the same row serialize at the database; losers
    /// surface an error and may retry.
    pub async fn claim_subnet(&self, cidr: &str, account_physical_id: &str) -> Result<Subnet> {
        if account_physical_id.is_empty() {
            return Err(Error::invalid_request(
                "cannot claim a subnet without an account id",
            ));
        }

        let mut tx = self.begin_repeatable_read().await?;

        let row: Option<SubnetRow> = if cidr.is_empty() {
            let sql = format!(
                "SELECT {SUBNET_COLUMNS} FROM subnet_pool WHERE account_id = '' \
                 ORDER BY create_at ASC LIMIT 1"
            );
            sqlx::query_as(&sql).fetch_optional(&mut *tx).await?
        } else {
            let sql = format!("SELECT {SUBNET_COLUMNS} FROM subnet_pool WHERE cidr = $1");
            sqlx::query_as(&sql)
                .bind(cidr)
                .fetch_optional(&mut *tx)
                .await?
        };

        let mut subnet: Subnet = match row {
            Some(row) => row.into(),
            None if cidr.is_empty() => return Err(Error::NoFreeSubnets),
            None => return Err(Error::not_found("subnet", cidr)),
        };

        if !subnet.account_id.is_empty() {
            return Err(Error::AlreadyClaimed(subnet.cidr));
        }

        sqlx::query("UPDATE subnet_pool SET account_id = $1 WHERE id = $2")
            .bind(account_physical_id)
            .bind(&subnet.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        subnet.account_id = account_physical_id.to_string();
        Ok(subnet)
    }

    /// Returns a claimed subnet to the pool.
    pub async fn release_subnet(&self, cidr: &str) -> Result<()> {
        let mut tx = self.begin_repeatable_read().await?;

        let sql = format!("SELECT {SUBNET_COLUMNS} FROM subnet_pool WHERE cidr = $1");
        let row: Option<SubnetRow> = sqlx::query_as(&sql)
            .bind(cidr)
            .fetch_optional(&mut *tx)
            .await?;
        let subnet: Subnet = row
            .map(Subnet::from)
            .ok_or_else(|| Error::not_found("subnet", cidr))?;

        sqlx::query("UPDATE subnet_pool SET account_id = '' WHERE id = $1")
            .bind(&subnet.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Marks the subnet as locked for exclusive use by the caller.
    pub async fn lock_subnet(&self, id: &str, locker_id: &str) -> Result<bool> {
        self.lock_row(LockTable::SubnetPool, id, locker_id).await
    }

    /// Releases a lock previously acquired against a caller.
    pub async fn unlock_subnet(&self, id: &str, locker_id: &str, force: bool) -> Result<bool> {
        self.unlock_row(LockTable::SubnetPool, id, locker_id, force)
            .await
    }

    async fn begin_repeatable_read(&self) -> Result<Transaction<'_, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    /// Inserts one pool entry inside an open transaction.
    pub(super) async fn insert_subnet(
        tx: &mut Transaction<'_, Postgres>,
        subnet: &mut Subnet,
    ) -> Result<()> {
        subnet.id = new_id();
        if subnet.create_at == 0 {
            subnet.create_at = now_millis();
        }

        sqlx::query(
            "INSERT INTO subnet_pool (id, cidr, account_id, parent_subnet, create_at, \
             lock_acquired_by, lock_acquired_at) \
             VALUES ($1, $2, $3, $4, $5, NULL, 0)",
        )
        .bind(&subnet.id)
        .bind(&subnet.cidr)
        .bind(&subnet.account_id)
        .bind(&subnet.parent_subnet)
        .bind(subnet.create_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
