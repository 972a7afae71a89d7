//! Provisioner that delegates to an operator-supplied command.
//!
//! Each operation runs the configured program with the operation name as its
//! final argument, the account JSON on stdin, and merges any provider
//! metadata the command prints to stdout. This keeps the cloud/IaC tooling
//! outside the control plane while the supervisor still observes real
//! success and failure.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::{AccountProvisioner, SubnetPool};
use crate::config::ProvisionerConfig;
use crate::error::{Error, Result};
use crate::models::{Account, AccountMetadata, AwsMetadata};

const OP_CREATE: &str = "create";
const OP_PROVISION: &str = "provision";
const OP_DELETE: &str = "delete";

pub struct ExecProvisioner {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    subnet_pool: Arc<dyn SubnetPool>,
}

impl ExecProvisioner {
    /// Builds a provisioner from config; `None` when no command is
    /// configured, in which case the server runs API-only.
    pub fn from_config(
        config: &ProvisionerConfig,
        subnet_pool: Arc<dyn SubnetPool>,
    ) -> Option<Self> {
        let command = config.command.as_ref()?;
        Some(Self {
            program: command.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            subnet_pool,
        })
    }

    #[cfg(test)]
    fn new(
        program: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
        subnet_pool: Arc<dyn SubnetPool>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
            subnet_pool,
        }
    }

    /// Runs one operation, returning provider metadata parsed from stdout
    /// when the command printed any.
    async fn run(&self, operation: &str, account: &Account) -> Result<Option<AwsMetadata>> {
        let payload = serde_json::to_vec(account)?;

        debug!(account = %account.id, operation, program = %self.program, "invoking provisioner command");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(operation)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                Error::provisioner(format!("failed to spawn {}: {err}", self.program))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|err| Error::provisioner(format!("failed to write account: {err}")))?;
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                Error::provisioner(format!(
                    "{operation} did not finish within {:?}",
                    self.timeout
                ))
            })?
            .map_err(|err| Error::provisioner(format!("{operation} failed to run: {err}")))?;

        if !output.status.success() {
            return Err(Error::provisioner(format!(
                "{operation} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            return Ok(None);
        }
        serde_json::from_str::<AwsMetadata>(stdout)
            .map(Some)
            .map_err(|err| Error::provisioner(format!("{operation} returned bad metadata: {err}")))
    }
}

#[async_trait]
impl AccountProvisioner for ExecProvisioner {
    async fn prepare_account(&self, account: &mut Account) -> bool {
        let mut changed = false;
        if account.provider_metadata.is_none() {
            account.provider_metadata = Some(AwsMetadata::default());
            changed = true;
        }
        if account.account_metadata.is_none() {
            account.account_metadata = Some(AccountMetadata::default());
            changed = true;
        }
        changed
    }

    async fn create_account(&self, account: &mut Account) -> Result<()> {
        let metadata = self.run(OP_CREATE, account).await?;

        if let Some(metadata) = metadata {
            account.provider_metadata = Some(metadata);
        }
        if account.physical_id().is_empty() {
            return Err(Error::provisioner(
                "create finished without a physical account id",
            ));
        }

        info!(account = %account.id, physical_id = %account.physical_id(), "created sub-account");
        Ok(())
    }

    async fn provision_account(&self, account: &mut Account) -> Result<()> {
        if account.claimed_subnet().is_empty() {
            return Err(Error::provisioner(
                "cannot provision networking without a claimed subnet",
            ));
        }

        self.run(OP_PROVISION, account).await?;

        info!(account = %account.id, subnet = %account.claimed_subnet(), "provisioned networking");
        Ok(())
    }

    async fn delete_account(&self, account: &mut Account) -> Result<()> {
        self.run(OP_DELETE, account).await?;

        if account.provision_requested() {
            let cidr = account.claimed_subnet().to_string();
            if !cidr.is_empty() {
                self.subnet_pool.release_subnet(&cidr).await?;
                if let Some(metadata) = account.account_metadata.as_mut() {
                    metadata.subnet.clear();
                }
                info!(account = %account.id, subnet = %cidr, "released subnet back to the pool");
            }
        }

        info!(account = %account.id, "deleted sub-account");
        Ok(())
    }
}
