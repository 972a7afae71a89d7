//! Parent-subnet persistence.

use super::locks::LockTable;
use super::{paging_clause, Store};
use crate::error::Result;
use crate::models::{now_millis, ParentSubnet, ParentSubnetFilter, Subnet};

const PARENT_SUBNET_COLUMNS: &str =
    "id, cidr, split_range, create_at, lock_acquired_by, lock_acquired_at";

#[derive(sqlx::FromRow)]
struct ParentSubnetRow {
    id: String,
    cidr: String,
    split_range: i32,
    create_at: i64,
    lock_acquired_by: Option<String>,
    lock_acquired_at: i64,
}

impl From<ParentSubnetRow> for ParentSubnet {
    fn from(row: ParentSubnetRow) -> Self {
        ParentSubnet {
            id: row.id,
            cidr: row.cidr,
            split_range: row.split_range as u8,
            create_at: row.create_at,
            lock_acquired_by: row.lock_acquired_by,
            lock_acquired_at: row.lock_acquired_at,
        }
    }
}

impl Store {
    /// Fetches a parent subnet by id; `None` when absent.
    pub async fn get_parent_subnet(&self, id: &str) -> Result<Option<ParentSubnet>> {
        let sql = format!("SELECT {PARENT_SUBNET_COLUMNS} FROM parent_subnet WHERE id = $1");
        let row: Option<ParentSubnetRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ParentSubnet::from))
    }

    /// Fetches the requested page of parent subnets, oldest first.
    pub async fn get_parent_subnets(
        &self,
        filter: &ParentSubnetFilter,
    ) -> Result<Vec<ParentSubnet>> {
        let mut sql =
            format!("SELECT {PARENT_SUBNET_COLUMNS} FROM parent_subnet ORDER BY create_at ASC");
        sql.push_str(&paging_clause(filter.page, filter.per_page));

        let rows: Vec<ParentSubnetRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(ParentSubnet::from).collect())
    }

    /// Records a parent subnet and all of its children in one transaction;
    /// either every row appears or none do.
    pub async fn add_parent_subnet(
        &self,
        parent: &mut ParentSubnet,
        children: &mut [Subnet],
    ) -> Result<()> {
        parent.create_at = now_millis();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO parent_subnet (id, cidr, split_range, create_at, lock_acquired_by, \
             lock_acquired_at) \
             VALUES ($1, $2, $3, $4, NULL, 0)",
        )
        .bind(&parent.id)
        .bind(&parent.cidr)
        .bind(parent.split_range as i32)
        .bind(parent.create_at)
        .execute(&mut *tx)
        .await?;

        for child in children.iter_mut() {
            child.create_at = parent.create_at;
            Self::insert_subnet(&mut tx, child).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Marks the parent subnet as locked for exclusive use by the caller.
    pub async fn lock_parent_subnet(&self, id: &str, locker_id: &str) -> Result<bool> {
        self.lock_row(LockTable::ParentSubnet, id, locker_id).await
    }

    /// Releases a lock previously acquired against a caller.
    pub async fn unlock_parent_subnet(
        &self,
        id: &str,
        locker_id: &str,
        force: bool,
    ) -> Result<bool> {
        self.unlock_row(LockTable::ParentSubnet, id, locker_id, force)
            .await
    }
}
