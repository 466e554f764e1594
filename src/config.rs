use crate::errors::RestoreBrowserError;
use crate::models::ResourceType;
use crate::shared::constants::{
    DEFAULT_DATABASE_ENDPOINT_OUTPUT, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REGION, DEFAULT_STACK_PREFIX,
};
use std::env;
use std::time::Duration;

/// Values given on the command line; they win over the environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub stack: Option<String>,
    pub vault: Option<String>,
    pub region: Option<String>,
    pub resource_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub region: String,
    pub stack_name: Option<String>,
    pub vault_name: Option<String>,
    pub resource_type: Option<ResourceType>,
    pub stack_prefix: String,
    pub database_endpoint_output: String,
    pub poll_interval: Duration,
}

impl Config {
    pub fn load(overrides: CliOverrides) -> Result<Self, RestoreBrowserError> {
        dotenv::dotenv().ok();
        Self::resolve(overrides, |key| env::var(key).ok())
    }

    /// Merge CLI values, then `lookup` (the environment), then defaults
    pub fn resolve<F>(overrides: CliOverrides, lookup: F) -> Result<Self, RestoreBrowserError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let given = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let region = given(overrides.region)
            .or_else(|| get("AWS_REGION"))
            .or_else(|| get("AWS_DEFAULT_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let stack_name = given(overrides.stack).or_else(|| get("BACKUP_STACK_NAME"));
        let vault_name = given(overrides.vault).or_else(|| get("BACKUP_VAULT_NAME"));

        let resource_type = given(overrides.resource_type)
            .or_else(|| get("BACKUP_RESOURCE_TYPE"))
            .map(|t| t.parse::<ResourceType>())
            .transpose()?;

        let stack_prefix = get("BACKUP_STACK_PREFIX").unwrap_or_else(|| DEFAULT_STACK_PREFIX.to_string());
        let database_endpoint_output =
            get("BACKUP_DATABASE_OUTPUT").unwrap_or_else(|| DEFAULT_DATABASE_ENDPOINT_OUTPUT.to_string());

        let poll_secs = match get("RESTORE_POLL_INTERVAL_SECS") {
            Some(raw) => raw.parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                RestoreBrowserError::ConfigurationError(format!(
                    "RESTORE_POLL_INTERVAL_SECS must be a positive number of seconds, got '{}'",
                    raw
                ))
            })?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };

        Ok(Config {
            region,
            stack_name,
            vault_name,
            resource_type,
            stack_prefix,
            database_endpoint_output,
            poll_interval: Duration::from_secs(poll_secs),
        })
    }

    /// Short description of the active filter for headers and logs
    pub fn filter_label(&self) -> String {
        self.resource_type
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "all".to_string())
    }
}
