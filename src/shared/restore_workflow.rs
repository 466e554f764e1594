use crate::config::Config;
use crate::errors::{RestoreBrowserError, Result};
use crate::models::{RecoveryPoint, ResourceType, RestoreJobStatus, RestoreSubmission};
use crate::shared::cancel::CancelToken;
use crate::shared::display::{sort_newest_first, DisplayFormatter};
use crate::shared::operations::OrchestrationClient;
use crate::shared::ui::{
    confirm_action, create_restore_spinner, select_detail_action, select_recovery_point,
    select_resource_filter, BrowseAction, DetailAction,
};
use tracing::{debug, info, warn};

/// Stack and vault a session operates on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreTargets {
    pub stack_name: String,
    pub vault_name: String,
}

/// Manage the browse and restore workflow
pub struct RestoreWorkflow {
    config: Config,
    client: OrchestrationClient,
    cancel: CancelToken,
}

impl RestoreWorkflow {
    pub fn new(config: Config, client: OrchestrationClient, cancel: CancelToken) -> Self {
        Self {
            config,
            client,
            cancel,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &OrchestrationClient {
        &self.client
    }

    /// Configured stack and vault, discovering whichever is missing.
    ///
    /// The stack is needed even with an explicit vault: database restores read
    /// the cluster endpoint from its outputs.
    pub async fn resolve_targets(&self) -> Result<RestoreTargets> {
        let stack_name = match &self.config.stack_name {
            Some(stack) => stack.clone(),
            None => {
                let stack = self.client.discover_stack_name().await?;
                info!(stack = %stack, "Auto-detected stack");
                stack
            }
        };

        let vault_name = match &self.config.vault_name {
            Some(vault) => vault.clone(),
            None => self
                .client
                .discover_vault_name(&stack_name)
                .await
                .map_err(|e| e.with_context("Failed to discover backup vault"))?,
        };

        Ok(RestoreTargets {
            stack_name,
            vault_name,
        })
    }

    /// Recovery points for display, newest first
    pub async fn load_points(
        &self,
        vault_name: &str,
        filter: Option<&ResourceType>,
    ) -> Result<Vec<RecoveryPoint>> {
        let mut points = self.client.list_recovery_points(vault_name, filter).await?;
        sort_newest_first(&mut points);
        Ok(points)
    }

    /// Execute the interactive browse loop until the operator quits
    pub async fn execute_interactive_browse(&self) -> Result<()> {
        let targets = self.resolve_targets().await?;
        info!(
            stack = %targets.stack_name,
            vault = %targets.vault_name,
            region = %self.config.region,
            "Browsing recovery points"
        );

        let mut filter = self.config.resource_type.clone();
        let mut points = self.load_points(&targets.vault_name, filter.as_ref()).await?;
        let mut notice: Option<String> = None;

        loop {
            if self.cancel.is_cancelled() {
                return Err(RestoreBrowserError::Cancelled("browse".to_string()));
            }

            let rows: Vec<String> = points.iter().map(DisplayFormatter::recovery_point_row).collect();
            let filter_label = filter.as_ref().map(|t| t.to_string());
            let header = DisplayFormatter::header(&targets.vault_name, &self.config.region, filter_label.as_deref());
            let status = notice
                .take()
                .unwrap_or_else(|| DisplayFormatter::status_line(&targets.vault_name, points.len()));

            match select_recovery_point(&header, &status, &rows)? {
                BrowseAction::Quit => break,
                BrowseAction::Refresh => {
                    points = self.reload(&targets.vault_name, filter.as_ref(), points).await?;
                }
                BrowseAction::ChangeFilter => {
                    let selected = select_resource_filter(filter.as_ref())?;
                    if selected != filter {
                        filter = selected;
                        points = self.reload(&targets.vault_name, filter.as_ref(), points).await?;
                    }
                }
                BrowseAction::Open(index) => {
                    let Some(point) = points.get(index).cloned() else {
                        continue;
                    };
                    match select_detail_action(&DisplayFormatter::recovery_point_details(&point))? {
                        DetailAction::Back => {}
                        DetailAction::Quit => break,
                        DetailAction::Restore => {
                            notice = self.restore_selected(&point, &targets).await?;
                        }
                    }
                }
            }
        }

        info!("Exiting recovery point browser");
        Ok(())
    }

    /// Fresh listing, or the previous one when the reload fails
    async fn reload(
        &self,
        vault_name: &str,
        filter: Option<&ResourceType>,
        previous: Vec<RecoveryPoint>,
    ) -> Result<Vec<RecoveryPoint>> {
        match self.load_points(vault_name, filter).await {
            Ok(points) => Ok(points),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                DisplayFormatter::display_error(&e);
                Ok(previous)
            }
        }
    }

    /// Confirm, submit, and optionally follow a restore. Returns the status
    /// line for the list view; only cancellation ends the session.
    async fn restore_selected(
        &self,
        point: &RecoveryPoint,
        targets: &RestoreTargets,
    ) -> Result<Option<String>> {
        let prompt = format!(
            "Restore {} {} from {}? This overwrites the live resource",
            point.resource_type,
            point.resource_id,
            point.creation_date.format("%Y-%m-%d %H:%M:%S")
        );
        if !confirm_action(&prompt, false)? {
            debug!(arn = %point.recovery_point_arn, "Restore declined");
            return Ok(None);
        }

        let submission = match self
            .client
            .start_restore(point, &targets.stack_name, &targets.vault_name)
            .await
        {
            Ok(submission) => submission,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                DisplayFormatter::display_error(&e);
                return Ok(Some(format!("Restore failed: {}", e)));
            }
        };
        DisplayFormatter::display_submission(&submission);

        if !confirm_action("Follow restore job progress?", true)? {
            return Ok(Some(format!("Restore job started: {}", submission.job_id)));
        }

        match self.follow_restore_job(&submission.job_id).await {
            Ok(status) => Ok(Some(DisplayFormatter::job_status_line(&status))),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                DisplayFormatter::display_error(&e);
                Ok(Some(format!("Restore job {} status unknown: {}", submission.job_id, e)))
            }
        }
    }

    /// Non-interactive restore of one recovery point by ARN. With `wait`, a job
    /// that ends FAILED or ABORTED is an error.
    pub async fn restore_by_arn(&self, recovery_point_arn: &str, wait: bool) -> Result<RestoreSubmission> {
        let targets = self.resolve_targets().await?;
        let point = self
            .client
            .find_recovery_point(&targets.vault_name, recovery_point_arn)
            .await?;

        let submission = self
            .client
            .start_restore(&point, &targets.stack_name, &targets.vault_name)
            .await?;
        DisplayFormatter::display_submission(&submission);

        if wait {
            self.follow_restore_job(&submission.job_id).await?.ensure_not_failed()?;
        }
        Ok(submission)
    }

    /// Poll a restore job until it reaches a terminal state
    pub async fn follow_restore_job(&self, job_id: &str) -> Result<RestoreJobStatus> {
        let spinner = create_restore_spinner(job_id)?;

        loop {
            let status = match self.client.restore_job_status(job_id).await {
                Ok(status) => status,
                Err(e) => {
                    spinner.abandon();
                    return Err(e);
                }
            };
            spinner.set_message(status.status.clone());

            if status.is_terminal() {
                spinner.finish_with_message(status.status.clone());
                if status.is_success() {
                    info!(job_id = %job_id, resource = ?status.created_resource_arn, "Restore job completed");
                } else {
                    warn!(job_id = %job_id, status = %status.status, message = ?status.status_message, "Restore job did not complete");
                }
                return Ok(status);
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    spinner.abandon_with_message("cancelled");
                    return Err(RestoreBrowserError::Cancelled(format!("waiting for restore job {}", job_id)));
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliOverrides;
    use crate::shared::cancel::cancel_pair;
    use crate::shared::testing::{efs_point, rds_point, FakeBackupServices};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    fn config(stack: Option<&str>, vault: Option<&str>) -> Config {
        let overrides = CliOverrides {
            stack: stack.map(str::to_string),
            vault: vault.map(str::to_string),
            ..Default::default()
        };
        let mut config = Config::resolve(overrides, |_| None).unwrap();
        config.poll_interval = Duration::from_millis(10);
        config
    }

    async fn workflow(fake: Arc<FakeBackupServices>, config: Config, cancel: CancelToken) -> RestoreWorkflow {
        let client = OrchestrationClient::new(fake, cancel.clone()).await.unwrap();
        RestoreWorkflow::new(config, client, cancel)
    }

    #[tokio::test]
    async fn test_explicit_targets_skip_discovery() -> Result<()> {
        // Empty fake: any discovery call would fail
        let fake = Arc::new(FakeBackupServices::default());
        let wf = workflow(fake, config(Some("StackA"), Some("StackA-vault-xyz")), CancelToken::never()).await;

        let targets = wf.resolve_targets().await?;
        assert_eq!(targets.stack_name, "StackA");
        assert_eq!(targets.vault_name, "StackA-vault-xyz");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_targets_are_discovered() -> Result<()> {
        let fake = Arc::new(FakeBackupServices {
            stacks: vec!["OpenemrEcsStack".to_string()],
            vaults: vec!["other-vault".to_string(), "OpenemrEcsStack-vault-abc".to_string()],
            ..Default::default()
        });
        let wf = workflow(fake, config(None, None), CancelToken::never()).await;

        let targets = wf.resolve_targets().await?;
        assert_eq!(
            targets,
            RestoreTargets {
                stack_name: "OpenemrEcsStack".to_string(),
                vault_name: "OpenemrEcsStack-vault-abc".to_string(),
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_vault_discovery_failure_has_context() {
        let fake = Arc::new(FakeBackupServices {
            vaults: vec!["unrelated".to_string()],
            ..Default::default()
        });
        let wf = workflow(fake, config(Some("StackA"), None), CancelToken::never()).await;

        let err = wf.resolve_targets().await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to discover backup vault"));
        assert!(matches!(err.root(), RestoreBrowserError::NotFound { kind: "Backup vault", .. }));
    }

    #[tokio::test]
    async fn test_load_points_sorts_newest_first() -> Result<()> {
        let fake = Arc::new(FakeBackupServices {
            recovery_point_pages: vec![vec![efs_point("older", "fs-1"), rds_point("newer", "db-1")]],
            ..Default::default()
        });
        let wf = workflow(fake, config(Some("StackA"), Some("StackA-vault-xyz")), CancelToken::never()).await;

        let points = wf.load_points("StackA-vault-xyz", None).await?;
        let types: Vec<&ResourceType> = points.iter().map(|p| &p.resource_type).collect();
        assert_eq!(types, vec![&ResourceType::Rds, &ResourceType::Efs]);
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_by_arn_submits_and_waits() -> Result<()> {
        let fake = Arc::new(FakeBackupServices {
            recovery_point_pages: vec![vec![efs_point("rp-efs", "fs-0123")]],
            ..Default::default()
        });
        let wf = workflow(fake.clone(), config(Some("StackA"), Some("StackA-vault-xyz")), CancelToken::never()).await;

        let arn = "arn:aws:backup:us-west-2:123456789012:recovery-point:rp-efs";
        let submission = wf.restore_by_arn(arn, true).await?;

        assert_eq!(submission.job_id, "restore-job-1");
        assert!(submission.role.is_fallback());
        let requests = fake.submitted_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].recovery_point_arn, arn);
        assert_eq!(requests[0].metadata.get("file-system-id").map(String::as_str), Some("fs-0123"));
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_by_arn_wait_reports_failed_job() {
        let fake = Arc::new(FakeBackupServices {
            recovery_point_pages: vec![vec![efs_point("rp-efs", "fs-0123")]],
            job_status: "FAILED".to_string(),
            ..Default::default()
        });
        let wf = workflow(fake.clone(), config(Some("StackA"), Some("StackA-vault-xyz")), CancelToken::never()).await;

        let arn = "arn:aws:backup:us-west-2:123456789012:recovery-point:rp-efs";
        let err = wf.restore_by_arn(arn, true).await.unwrap_err();
        match err {
            RestoreBrowserError::RestoreJobFailed { job_id, status, .. } => {
                assert_eq!(job_id, "restore-job-1");
                assert_eq!(status, "FAILED");
            }
            other => panic!("expected failed restore job, got {:?}", other),
        }
        assert_eq!(fake.submitted_requests().len(), 1);

        // Without waiting the submission itself succeeds
        assert!(wf.restore_by_arn(arn, false).await.is_ok());
    }

    #[tokio::test]
    async fn test_restore_by_unknown_arn_is_not_found() {
        let fake = Arc::new(FakeBackupServices {
            recovery_point_pages: vec![vec![efs_point("rp-efs", "fs-0123")]],
            ..Default::default()
        });
        let wf = workflow(fake.clone(), config(Some("StackA"), Some("StackA-vault-xyz")), CancelToken::never()).await;

        let err = wf.restore_by_arn("arn:aws:backup:missing", false).await.unwrap_err();
        assert!(matches!(err, RestoreBrowserError::NotFound { kind: "Recovery point", .. }));
        assert!(fake.submitted_requests().is_empty());
    }

    #[tokio::test]
    async fn test_follow_returns_terminal_status() -> Result<()> {
        let fake = Arc::new(FakeBackupServices {
            job_status: "FAILED".to_string(),
            ..Default::default()
        });
        let wf = workflow(fake, config(Some("S"), Some("V")), CancelToken::never()).await;

        let status = wf.follow_restore_job("restore-job-9").await?;
        assert_eq!(status.job_id, "restore-job-9");
        assert!(status.is_terminal());
        assert!(!status.is_success());
        Ok(())
    }

    #[tokio::test]
    async fn test_follow_stops_on_cancellation() {
        let fake = Arc::new(FakeBackupServices {
            job_status: "RUNNING".to_string(),
            ..Default::default()
        });
        let (handle, token) = cancel_pair();
        let wf = workflow(fake, config(Some("S"), Some("V")), token).await;

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.cancel();
        });

        let err = wf.follow_restore_job("restore-job-1").await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_database_restore_by_arn_uses_stack_outputs() -> Result<()> {
        use crate::shared::services::DbClusterNetwork;

        let mut outputs = HashMap::new();
        outputs.insert(
            "DatabaseEndpoint".to_string(),
            "db-cluster-1.cluster-abc.us-west-2.rds.amazonaws.com".to_string(),
        );
        let mut clusters = HashMap::new();
        clusters.insert(
            "db-cluster-1".to_string(),
            DbClusterNetwork {
                subnet_group: Some("db-subnets".to_string()),
                security_group_ids: vec!["sg-1".to_string()],
            },
        );
        let fake = Arc::new(FakeBackupServices {
            recovery_point_pages: vec![vec![rds_point("rp-db", "db-cluster-1")]],
            stack_outputs: [("StackA".to_string(), outputs)].into_iter().collect(),
            clusters,
            ..Default::default()
        });
        let wf = workflow(fake.clone(), config(Some("StackA"), Some("StackA-vault-xyz")), CancelToken::never()).await;

        let submission = wf
            .restore_by_arn("arn:aws:backup:us-west-2:123456789012:recovery-point:rp-db", false)
            .await?;
        assert_eq!(submission.metadata.len(), 3);
        assert_eq!(
            submission.metadata.get("DBClusterIdentifier").map(String::as_str),
            Some("db-cluster-1")
        );
        Ok(())
    }
}
