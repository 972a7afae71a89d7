//! Parent CIDR blocks registered for subdivision.

use serde::{Deserialize, Serialize};

/// A CIDR block registered to be split into leasable subnets.
///
/// Parent subnets are inserted in one transaction together with every child
/// subnet carved from them, so they carry no lifecycle state of their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentSubnet {
    pub id: String,
    pub cidr: String,
    /// Target prefix length for the children, e.g. 24.
    pub split_range: u8,
    pub create_at: i64,
    #[serde(default)]
    pub lock_acquired_by: Option<String>,
    pub lock_acquired_at: i64,
}

/// Constrains a parent-subnet listing.
#[derive(Debug, Clone, Copy)]
pub struct ParentSubnetFilter {
    pub page: u64,
    pub per_page: i64,
}

impl Default for ParentSubnetFilter {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: 100,
        }
    }
}
