use crate::errors::Result;
use crate::models::{RestoreJobStatus, RestoreRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One page of a paginated AWS listing
#[derive(Debug, Clone, Default)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

/// Recovery point as returned by ListRecoveryPointsByBackupVault, before normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecoveryPointSummary {
    pub recovery_point_arn: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub resource_type: Option<String>,
    pub resource_arn: Option<String>,
    pub backup_size_bytes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupPlanSummary {
    pub plan_id: String,
    pub plan_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupSelectionSummary {
    pub selection_id: Option<String>,
    pub iam_role_arn: Option<String>,
}

/// Network placement of a live database cluster
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbClusterNetwork {
    pub subnet_group: Option<String>,
    pub security_group_ids: Vec<String>,
}

/// The AWS calls the orchestration layer depends on.
///
/// Paged operations return one page per call so callers can track how far a
/// listing got before failing. Lookups of a single resource return `Ok(None)`
/// when the service reports it absent.
#[async_trait]
pub trait BackupServices: Send + Sync {
    /// Account id of the active credentials (STS GetCallerIdentity)
    async fn caller_account_id(&self) -> Result<String>;

    /// Names of all stacks in one of the given lifecycle states
    async fn list_stack_names(&self, statuses: &[&str]) -> Result<Vec<String>>;

    /// Outputs of a stack, `None` if the stack does not exist
    async fn stack_outputs(&self, stack_name: &str) -> Result<Option<HashMap<String, String>>>;

    /// Names of all backup vaults
    async fn list_backup_vault_names(&self) -> Result<Vec<String>>;

    async fn list_recovery_points(
        &self,
        vault_name: &str,
        next_token: Option<String>,
    ) -> Result<Page<RecoveryPointSummary>>;

    async fn list_backup_plans(&self, next_token: Option<String>) -> Result<Page<BackupPlanSummary>>;

    /// Target vault of every rule in a plan
    async fn backup_plan_rule_vaults(&self, plan_id: &str) -> Result<Vec<String>>;

    async fn list_backup_selections(
        &self,
        plan_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<BackupSelectionSummary>>;

    async fn describe_db_cluster(&self, cluster_id: &str) -> Result<Option<DbClusterNetwork>>;

    /// Submit a restore job and return its id
    async fn start_restore_job(&self, request: &RestoreRequest) -> Result<String>;

    async fn describe_restore_job(&self, job_id: &str) -> Result<RestoreJobStatus>;
}
