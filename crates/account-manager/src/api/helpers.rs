//! Shared request plumbing: paging parameters and id validation.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{AccountFilter, ParentSubnetFilter, SubnetFilter, WebhookFilter};

/// Paging and filter query parameters shared by the list endpoints.
#[derive(Debug, Deserialize)]
pub struct PagingQuery {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
    #[serde(default)]
    pub include_deleted: bool,
    #[serde(default)]
    pub show_free: bool,
}

fn default_per_page() -> i64 {
    100
}

impl PagingQuery {
    /// Rejects values outside the supported range; -1 disables paging.
    pub fn validate(&self) -> Result<()> {
        if self.per_page < -1 {
            return Err(Error::invalid_request(format!(
                "per_page must be -1 or greater, got {}",
                self.per_page
            )));
        }
        Ok(())
    }

    pub fn account_filter(&self) -> AccountFilter {
        AccountFilter {
            page: self.page,
            per_page: self.per_page,
            include_deleted: self.include_deleted,
        }
    }

    pub fn subnet_filter(&self) -> SubnetFilter {
        SubnetFilter {
            page: self.page,
            per_page: self.per_page,
            free: self.show_free,
        }
    }

    pub fn parent_subnet_filter(&self) -> ParentSubnetFilter {
        ParentSubnetFilter {
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn webhook_filter(&self) -> WebhookFilter {
        WebhookFilter {
            page: self.page,
            per_page: self.per_page,
            include_deleted: self.include_deleted,
        }
    }
}

/// Entity ids are 26-character alphanumeric strings; anything else cannot
/// name an entity, so the row is simply not found.
pub fn ensure_entity_id(kind: &'static str, id: &str) -> Result<()> {
    if id.len() == 26 && id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(Error::not_found(kind, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_validation() {
        let paging = PagingQuery {
            page: 0,
            per_page: -1,
            include_deleted: false,
            show_free: false,
        };
        assert!(paging.validate().is_ok());

        let paging = PagingQuery {
            page: 0,
            per_page: -2,
            include_deleted: false,
            show_free: false,
        };
        assert!(paging.validate().is_err());
    }

    #[test]
    fn entity_id_shape() {
        assert!(ensure_entity_id("account", &crate::models::new_id()).is_ok());
        assert!(ensure_entity_id("account", "short").is_err());
        assert!(ensure_entity_id("account", "!!!!!!!!!!!!!!!!!!!!!!!!!!").is_err());
    }
}
