//! In-memory `BackupServices` used by the orchestration and workflow tests.

use crate::errors::{RestoreBrowserError, Result};
use crate::models::{RestoreJobStatus, RestoreRequest};
use crate::shared::services::{
    BackupPlanSummary, BackupSelectionSummary, BackupServices, DbClusterNetwork, Page,
    RecoveryPointSummary,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct FakeBackupServices {
    pub account_id: Option<String>,
    pub stacks: Vec<String>,
    pub stack_outputs: HashMap<String, HashMap<String, String>>,
    pub vaults: Vec<String>,
    pub recovery_point_pages: Vec<Vec<RecoveryPointSummary>>,
    pub failing_recovery_page: Option<usize>,
    pub plan_pages: Vec<Vec<BackupPlanSummary>>,
    pub fail_plan_listing: bool,
    /// Plans missing here fail GetBackupPlan
    pub plan_vaults: HashMap<String, Vec<String>>,
    /// Plans missing here fail ListBackupSelections
    pub selection_pages: HashMap<String, Vec<Vec<BackupSelectionSummary>>>,
    pub clusters: HashMap<String, DbClusterNetwork>,
    pub job_status: String,
    pub recovery_point_calls: AtomicUsize,
    pub submitted: Mutex<Vec<RestoreRequest>>,
}

impl Default for FakeBackupServices {
    fn default() -> Self {
        Self {
            account_id: Some("123456789012".to_string()),
            stacks: Vec::new(),
            stack_outputs: HashMap::new(),
            vaults: Vec::new(),
            recovery_point_pages: Vec::new(),
            failing_recovery_page: None,
            plan_pages: Vec::new(),
            fail_plan_listing: false,
            plan_vaults: HashMap::new(),
            selection_pages: HashMap::new(),
            clusters: HashMap::new(),
            job_status: "COMPLETED".to_string(),
            recovery_point_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBackupServices {
    pub fn recovery_point_calls(&self) -> usize {
        self.recovery_point_calls.load(Ordering::SeqCst)
    }

    pub fn submitted_requests(&self) -> Vec<RestoreRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

/// Tokens are `page-<index>` into the configured page list
fn page_of<T: Clone>(pages: &[Vec<T>], token: Option<String>) -> Page<T> {
    let index = token
        .and_then(|t| t.strip_prefix("page-").and_then(|i| i.parse::<usize>().ok()))
        .unwrap_or(0);

    let items = pages.get(index).cloned().unwrap_or_default();
    let next_token = (index + 1 < pages.len()).then(|| format!("page-{}", index + 1));
    Page { items, next_token }
}

fn fake_error(operation: &'static str, context: &str) -> RestoreBrowserError {
    RestoreBrowserError::api(operation, context, "simulated failure")
}

pub fn efs_point(id: &str, file_system_id: &str) -> RecoveryPointSummary {
    RecoveryPointSummary {
        recovery_point_arn: Some(format!("arn:aws:backup:us-west-2:123456789012:recovery-point:{}", id)),
        creation_date: Some(Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()),
        status: Some("COMPLETED".to_string()),
        resource_type: Some("EFS".to_string()),
        resource_arn: Some(format!(
            "arn:aws:elasticfilesystem:us-west-2:123456789012:file-system/{}",
            file_system_id
        )),
        backup_size_bytes: Some(1_073_741_824),
    }
}

pub fn rds_point(id: &str, cluster: &str) -> RecoveryPointSummary {
    RecoveryPointSummary {
        recovery_point_arn: Some(format!("arn:aws:backup:us-west-2:123456789012:recovery-point:{}", id)),
        creation_date: Some(Utc.with_ymd_and_hms(2025, 1, 16, 2, 0, 0).unwrap()),
        status: Some("COMPLETED".to_string()),
        resource_type: Some("RDS".to_string()),
        resource_arn: Some(format!("arn:aws:rds:us-west-2:123456789012:cluster:{}", cluster)),
        backup_size_bytes: Some(5_368_709_120),
    }
}

#[async_trait]
impl BackupServices for FakeBackupServices {
    async fn caller_account_id(&self) -> Result<String> {
        self.account_id
            .clone()
            .ok_or_else(|| fake_error("GetCallerIdentity", "no credentials"))
    }

    async fn list_stack_names(&self, _statuses: &[&str]) -> Result<Vec<String>> {
        Ok(self.stacks.clone())
    }

    async fn stack_outputs(&self, stack_name: &str) -> Result<Option<HashMap<String, String>>> {
        Ok(self.stack_outputs.get(stack_name).cloned())
    }

    async fn list_backup_vault_names(&self) -> Result<Vec<String>> {
        Ok(self.vaults.clone())
    }

    async fn list_recovery_points(
        &self,
        vault_name: &str,
        next_token: Option<String>,
    ) -> Result<Page<RecoveryPointSummary>> {
        let call = self.recovery_point_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_recovery_page == Some(call) {
            return Err(fake_error("ListRecoveryPointsByBackupVault", vault_name));
        }
        Ok(page_of(&self.recovery_point_pages, next_token))
    }

    async fn list_backup_plans(&self, next_token: Option<String>) -> Result<Page<BackupPlanSummary>> {
        if self.fail_plan_listing {
            return Err(fake_error("ListBackupPlans", "region us-west-2"));
        }
        Ok(page_of(&self.plan_pages, next_token))
    }

    async fn backup_plan_rule_vaults(&self, plan_id: &str) -> Result<Vec<String>> {
        self.plan_vaults
            .get(plan_id)
            .cloned()
            .ok_or_else(|| fake_error("GetBackupPlan", plan_id))
    }

    async fn list_backup_selections(
        &self,
        plan_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<BackupSelectionSummary>> {
        let pages = self
            .selection_pages
            .get(plan_id)
            .ok_or_else(|| fake_error("ListBackupSelections", plan_id))?;
        Ok(page_of(pages, next_token))
    }

    async fn describe_db_cluster(&self, cluster_id: &str) -> Result<Option<DbClusterNetwork>> {
        Ok(self.clusters.get(cluster_id).cloned())
    }

    async fn start_restore_job(&self, request: &RestoreRequest) -> Result<String> {
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(request.clone());
        Ok(format!("restore-job-{}", submitted.len()))
    }

    async fn describe_restore_job(&self, job_id: &str) -> Result<RestoreJobStatus> {
        Ok(RestoreJobStatus {
            job_id: job_id.to_string(),
            status: self.job_status.clone(),
            percent_done: Some("100.00%".to_string()),
            status_message: None,
            created_resource_arn: None,
        })
    }
}
