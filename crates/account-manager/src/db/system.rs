//! Schema version bookkeeping in the `system` table.

use semver::Version;

use super::Store;
use crate::error::{Error, Result};

const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Schema version this build expects to find in the database.
pub fn latest_schema_version() -> Version {
    Version::new(1, 1, 0)
}

/// Re-exported string form for logs and error messages.
pub const LATEST_SCHEMA_VERSION: &str = "1.1.0";

impl Store {
    /// Reads the schema version recorded in the database, if any.
    pub async fn get_current_version(&self) -> Result<Option<Version>> {
        let value: Option<(String,)> =
            sqlx::query_as("SELECT value FROM system WHERE key = $1")
                .bind(SCHEMA_VERSION_KEY)
                .fetch_optional(&self.pool)
                .await?;

        value
            .map(|(raw,)| {
                Version::parse(&raw).map_err(|err| {
                    Error::invalid_request(format!("stored schema version {raw} is invalid: {err}"))
                })
            })
            .transpose()
    }

    /// Records the schema version, replacing any previous value.
    pub async fn set_current_version(&self, version: &Version) -> Result<()> {
        sqlx::query(
            "INSERT INTO system (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(SCHEMA_VERSION_KEY)
        .bind(version.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fails unless the stored schema is at least this build's version with
    /// a matching major.
    pub async fn check_schema_version(&self) -> Result<()> {
        let expected = latest_schema_version();
        let current = self.get_current_version().await?.ok_or_else(|| {
            Error::invalid_request("no schema version recorded; run migrations first")
        })?;

        if current < expected || current.major != expected.major {
            return Err(Error::invalid_request(format!(
                "server requires at least schema {expected}, current is {current}"
            )));
        }
        Ok(())
    }
}
