//! Error types shared across the service.

use thiserror::Error;

/// Result type for account-manager operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors.
///
/// Each variant corresponds to one outcome the HTTP layer knows how to
/// translate; see `api::error` for the status mapping.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} {id} is locked by another worker")]
    LockConflict { kind: &'static str, id: String },

    #[error("{kind} {id} is locked against API changes")]
    ApiSecurityLocked { kind: &'static str, id: String },

    #[error("cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("subnet {0} is already claimed")]
    AlreadyClaimed(String),

    #[error("no free subnets left in the pool")]
    NoFreeSubnets,

    #[error("invalid CIDR {0}")]
    InvalidCidr(String),

    #[error("insufficient address space to split /{prefix} into /{split_range} subnets")]
    InsufficientAddressSpace { prefix: u8, split_range: u8 },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("metadata encoding error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("provisioner error: {0}")]
    Provisioner(String),
}

impl Error {
    /// Shorthand for a not-found error on a given entity kind.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Error::InvalidRequest(reason.into())
    }

    pub fn provisioner(reason: impl Into<String>) -> Self {
        Error::Provisioner(reason.into())
    }
}
