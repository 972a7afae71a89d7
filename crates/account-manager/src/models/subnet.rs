//! Leaf subnets carved from a parent and leasable to one sub-account.

use serde::{Deserialize, Serialize};

/// A leaf subnet in the pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    pub id: String,
    pub cidr: String,
    /// Physical account id holding the lease; empty means free.
    #[serde(default)]
    pub account_id: String,
    /// CIDR of the parent this subnet was carved from.
    pub parent_subnet: String,
    pub create_at: i64,
    #[serde(default)]
    pub lock_acquired_by: Option<String>,
    pub lock_acquired_at: i64,
}

impl Subnet {
    /// Whether the subnet is available for claiming.
    pub fn is_free(&self) -> bool {
        self.account_id.is_empty()
    }
}

/// Constrains a subnet listing.
#[derive(Debug, Clone, Copy)]
pub struct SubnetFilter {
    pub page: u64,
    pub per_page: i64,
    /// Restrict the listing to unclaimed subnets.
    pub free: bool,
}

impl Default for SubnetFilter {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: 100,
            free: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_means_no_account() {
        let mut subnet = Subnet {
            id: crate::models::new_id(),
            cidr: "10.0.0.0/24".into(),
            account_id: String::new(),
            parent_subnet: "10.0.0.0/8".into(),
            create_at: 0,
            lock_acquired_by: None,
            lock_acquired_at: 0,
        };
        assert!(subnet.is_free());

        subnet.account_id = "123456789012".into();
        assert!(!subnet.is_free());
    }
}
