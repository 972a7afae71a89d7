//! Managed cloud sub-accounts and their lifecycle state machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The only provider recognized today.
pub const PROVIDER_AWS: &str = "aws";

/// Tag recorded on accounts driven by this service's provisioner.
pub const PROVISIONER_PLATFORM: &str = "platform";

/// Lifecycle state of an [`Account`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountState {
    /// Undergoing no changes.
    Stable,
    /// In the process of being created.
    CreationRequested,
    /// Creation failed; may be retried.
    CreationFailed,
    /// Networking is being provisioned.
    ProvisioningRequested,
    /// Provisioning failed; may be retried.
    ProvisioningFailed,
    /// Metadata will be refreshed on the next tick.
    RefreshMetadata,
    /// In the process of being deleted.
    DeletionRequested,
    /// Deletion failed; may be retried.
    DeletionFailed,
    /// Gone.
    Deleted,
}

impl AccountState {
    /// Every state an account can be in.
    pub const ALL: [AccountState; 9] = [
        AccountState::Stable,
        AccountState::CreationRequested,
        AccountState::CreationFailed,
        AccountState::ProvisioningRequested,
        AccountState::ProvisioningFailed,
        AccountState::RefreshMetadata,
        AccountState::DeletionRequested,
        AccountState::DeletionFailed,
        AccountState::Deleted,
    ];

    /// States the supervisor acts on each tick.
    pub const PENDING_WORK: [AccountState; 4] = [
        AccountState::CreationRequested,
        AccountState::ProvisioningRequested,
        AccountState::RefreshMetadata,
        AccountState::DeletionRequested,
    ];

    /// States an account can be put in via the API.
    pub const REQUESTABLE: [AccountState; 3] = [
        AccountState::CreationRequested,
        AccountState::ProvisioningRequested,
        AccountState::DeletionRequested,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountState::Stable => "stable",
            AccountState::CreationRequested => "creation-requested",
            AccountState::CreationFailed => "creation-failed",
            AccountState::ProvisioningRequested => "provisioning-requested",
            AccountState::ProvisioningFailed => "provisioning-failed",
            AccountState::RefreshMetadata => "refresh-metadata",
            AccountState::DeletionRequested => "deletion-requested",
            AccountState::DeletionFailed => "deletion-failed",
            AccountState::Deleted => "deleted",
        }
    }

    pub fn is_pending_work(&self) -> bool {
        Self::PENDING_WORK.contains(self)
    }
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountState::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| Error::invalid_request(format!("unknown account state {s}")))
    }
}

/// Provider metadata stored on an account as an opaque JSON blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsMetadata {
    /// Service Catalog product used to vend the sub-account.
    #[serde(rename = "serviceCatalogProductID", default)]
    pub service_catalog_product_id: String,

    /// Physical account id, populated once creation succeeds.
    #[serde(rename = "awsAccountID", default)]
    pub aws_account_id: String,

    /// Provisioned-product id backing the sub-account.
    #[serde(rename = "accountProductID", default)]
    pub account_product_id: String,
}

/// Account-level metadata stored as an opaque JSON blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMetadata {
    /// Whether networking should be provisioned after creation.
    #[serde(default)]
    pub provision: bool,

    /// CIDR of the subnet claimed for this account, empty until claimed.
    #[serde(default)]
    pub subnet: String,
}

/// A managed cloud sub-account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub state: AccountState,
    pub provider: String,
    pub provisioner: String,
    #[serde(default)]
    pub provider_metadata: Option<AwsMetadata>,
    #[serde(default)]
    pub account_metadata: Option<AccountMetadata>,
    pub create_at: i64,
    pub delete_at: i64,
    pub api_security_lock: bool,
    #[serde(default)]
    pub lock_acquired_by: Option<String>,
    pub lock_acquired_at: i64,
}

impl Account {
    /// Whether the account can be transitioned into `new_state` via the API.
    pub fn valid_transition_state(&self, new_state: AccountState) -> bool {
        match new_state {
            AccountState::CreationRequested => matches!(
                self.state,
                AccountState::CreationRequested | AccountState::CreationFailed
            ),
            AccountState::ProvisioningRequested => matches!(
                self.state,
                AccountState::Stable
                    | AccountState::ProvisioningFailed
                    | AccountState::ProvisioningRequested
            ),
            AccountState::DeletionRequested => matches!(
                self.state,
                AccountState::Stable
                    | AccountState::CreationRequested
                    | AccountState::CreationFailed
                    | AccountState::ProvisioningFailed
                    | AccountState::DeletionRequested
                    | AccountState::DeletionFailed
            ),
            _ => false,
        }
    }

    /// Physical provider account id, empty until creation completes.
    pub fn physical_id(&self) -> &str {
        self.provider_metadata
            .as_ref()
            .map(|m| m.aws_account_id.as_str())
            .unwrap_or("")
    }

    /// CIDR claimed for this account, empty until claimed.
    pub fn claimed_subnet(&self) -> &str {
        self.account_metadata
            .as_ref()
            .map(|m| m.subnet.as_str())
            .unwrap_or("")
    }

    pub fn provision_requested(&self) -> bool {
        self.account_metadata
            .as_ref()
            .map(|m| m.provision)
            .unwrap_or(false)
    }

    pub fn is_deleted(&self) -> bool {
        self.delete_at > 0
    }
}

/// Constrains an account listing.
#[derive(Debug, Clone, Copy)]
pub struct AccountFilter {
    pub page: u64,
    pub per_page: i64,
    pub include_deleted: bool,
}

impl Default for AccountFilter {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: 100,
            include_deleted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_in(state: AccountState) -> Account {
        Account {
            id: crate::models::new_id(),
            state,
            provider: PROVIDER_AWS.into(),
            provisioner: PROVISIONER_PLATFORM.into(),
            provider_metadata: None,
            account_metadata: None,
            create_at: 0,
            delete_at: 0,
            api_security_lock: false,
            lock_acquired_by: None,
            lock_acquired_at: 0,
        }
    }

    #[test]
    fn state_strings_round_trip() {
        for state in AccountState::ALL {
            assert_eq!(state.as_str().parse::<AccountState>().unwrap(), state);
        }
        assert!("nonexistent".parse::<AccountState>().is_err());
    }

    #[test]
    fn state_serde_uses_kebab_case() {
        let json = serde_json::to_string(&AccountState::CreationRequested).unwrap();
        assert_eq!(json, "\"creation-requested\"");
        let back: AccountState = serde_json::from_str("\"provisioning-failed\"").unwrap();
        assert_eq!(back, AccountState::ProvisioningFailed);
    }

    #[test]
    fn transition_to_creation_requested() {
        let valid = [
            AccountState::CreationRequested,
            AccountState::CreationFailed,
        ];
        for state in AccountState::ALL {
            assert_eq!(
                account_in(state).valid_transition_state(AccountState::CreationRequested),
                valid.contains(&state),
                "from {state}"
            );
        }
    }

    #[test]
    fn transition_to_provisioning_requested() {
        let valid = [
            AccountState::Stable,
            AccountState::ProvisioningFailed,
            AccountState::ProvisioningRequested,
        ];
        for state in AccountState::ALL {
            assert_eq!(
                account_in(state).valid_transition_state(AccountState::ProvisioningRequested),
                valid.contains(&state),
                "from {state}"
            );
        }
    }

    #[test]
    fn transition_to_deletion_requested() {
        let valid = [
            AccountState::Stable,
            AccountState::CreationRequested,
            AccountState::CreationFailed,
            AccountState::ProvisioningFailed,
            AccountState::DeletionRequested,
            AccountState::DeletionFailed,
        ];
        for state in AccountState::ALL {
            assert_eq!(
                account_in(state).valid_transition_state(AccountState::DeletionRequested),
                valid.contains(&state),
                "from {state}"
            );
        }
    }

    #[test]
    fn non_requestable_targets_are_always_rejected() {
        for target in AccountState::ALL {
            if AccountState::REQUESTABLE.contains(&target) {
                continue;
            }
            for state in AccountState::ALL {
                assert!(
                    !account_in(state).valid_transition_state(target),
                    "from {state} to {target}"
                );
            }
        }
    }

    #[test]
    fn pending_work_set() {
        let pending = [
            AccountState::CreationRequested,
            AccountState::ProvisioningRequested,
            AccountState::RefreshMetadata,
            AccountState::DeletionRequested,
        ];
        for state in AccountState::ALL {
            assert_eq!(state.is_pending_work(), pending.contains(&state));
        }
    }

    #[test]
    fn metadata_serde_field_names() {
        let meta = AwsMetadata {
            service_catalog_product_id: "prod-12345".into(),
            aws_account_id: "123456789012".into(),
            account_product_id: "pp-67890".into(),
        };
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["serviceCatalogProductID"], "prod-12345");
        assert_eq!(value["awsAccountID"], "123456789012");
        assert_eq!(value["accountProductID"], "pp-67890");
    }

    #[test]
    fn account_helpers_tolerate_missing_metadata() {
        let account = account_in(AccountState::Stable);
        assert_eq!(account.physical_id(), "");
        assert_eq!(account.claimed_subnet(), "");
        assert!(!account.provision_requested());
    }
}
