//! API request bodies and their validation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::PROVIDER_AWS;

/// Parameters for a new account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    #[serde(default)]
    pub provider: String,
    #[serde(rename = "serviceCatalogProductID", default)]
    pub service_catalog_product_id: String,
    #[serde(default)]
    pub provision: bool,
    #[serde(rename = "api-security-lock", default)]
    pub api_security_lock: bool,
    /// Optional CIDR to claim when provisioning.
    #[serde(default)]
    pub subnet: String,
}

impl CreateAccountRequest {
    pub fn set_defaults(&mut self) {
        if self.provider.is_empty() {
            self.provider = PROVIDER_AWS.to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider != PROVIDER_AWS {
            return Err(Error::invalid_request(format!(
                "unsupported provider {}",
                self.provider
            )));
        }
        if self.service_catalog_product_id.is_empty() {
            return Err(Error::invalid_request(
                "service catalog product ID cannot be empty",
            ));
        }
        Ok(())
    }
}

/// Parameters for provisioning networking on an existing account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionAccountRequest {
    /// Specific CIDR to claim; empty claims any free subnet.
    #[serde(default)]
    pub subnet: String,
}

/// Parameters for registering a parent subnet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddParentSubnetRequest {
    #[serde(default)]
    pub cidr: String,
    #[serde(rename = "splitRange", default)]
    pub split_range: u8,
}

impl AddParentSubnetRequest {
    pub fn validate(&self) -> Result<()> {
        if self.cidr.is_empty() {
            return Err(Error::invalid_request("parent CIDR cannot be empty"));
        }
        if self.split_range == 0 {
            return Err(Error::invalid_request("split range cannot be zero"));
        }
        Ok(())
    }
}

/// Parameters for registering a webhook subscriber.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateWebhookRequest {
    #[serde(rename = "ownerID", default)]
    pub owner_id: String,
    #[serde(default)]
    pub url: String,
}

impl CreateWebhookRequest {
    pub fn validate(&self) -> Result<()> {
        if self.owner_id.is_empty() {
            return Err(Error::invalid_request("webhook owner ID cannot be empty"));
        }
        if self.url.is_empty() {
            return Err(Error::invalid_request("webhook URL cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_account_defaults_to_aws() {
        let mut request = CreateAccountRequest {
            service_catalog_product_id: "prod-12345".into(),
            ..Default::default()
        };
        request.set_defaults();
        assert_eq!(request.provider, PROVIDER_AWS);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn create_account_rejects_unknown_provider() {
        let mut request = CreateAccountRequest {
            provider: "azure".into(),
            service_catalog_product_id: "prod-12345".into(),
            ..Default::default()
        };
        request.set_defaults();
        assert!(request.validate().is_err());
    }

    #[test]
    fn create_account_requires_product_id() {
        let mut request = CreateAccountRequest::default();
        request.set_defaults();
        assert!(request.validate().is_err());
    }

    #[test]
    fn create_account_body_field_names() {
        let request: CreateAccountRequest = serde_json::from_str(
            r#"{
                "provider": "aws",
                "serviceCatalogProductID": "prod-12345",
                "provision": true,
                "api-security-lock": true,
                "subnet": "10.0.0.0/24"
            }"#,
        )
        .unwrap();
        assert_eq!(request.service_catalog_product_id, "prod-12345");
        assert!(request.provision);
        assert!(request.api_security_lock);
        assert_eq!(request.subnet, "10.0.0.0/24");
    }

    #[test]
    fn add_parent_subnet_requires_cidr_and_range() {
        assert!(AddParentSubnetRequest::default().validate().is_err());

        let request = AddParentSubnetRequest {
            cidr: "10.0.0.0/8".into(),
            split_range: 0,
        };
        assert!(request.validate().is_err());

        let request = AddParentSubnetRequest {
            cidr: "10.0.0.0/8".into(),
            split_range: 24,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn webhook_request_validation() {
        assert!(CreateWebhookRequest::default().validate().is_err());

        let request = CreateWebhookRequest {
            owner_id: "ops".into(),
            url: "https://example.com/hook".into(),
        };
        assert!(request.validate().is_ok());
    }
}
