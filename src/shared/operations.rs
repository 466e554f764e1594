use crate::config::Config;
use crate::errors::{RestoreBrowserError, Result};
use crate::models::{
    RecoveryPoint, ResourceType, RestoreJobStatus, RestoreMetadata, RestoreRequest,
    RestoreSubmission, RoleResolution, RoleSource,
};
use crate::shared::aws_sdk::AwsBackupServices;
use crate::shared::cancel::CancelToken;
use crate::shared::constants::{
    DEFAULT_BACKUP_ROLE_PATH, DEFAULT_DATABASE_ENDPOINT_OUTPUT, DEFAULT_STACK_PREFIX,
    DEPLOYED_STACK_STATUSES, EFS_ENCRYPTED_VALUE, EFS_NEW_FILE_SYSTEM_VALUE, META_DB_CLUSTER_IDENTIFIER,
    META_DB_SUBNET_GROUP_NAME, META_ENCRYPTED, META_FILE_SYSTEM_ID, META_NEW_FILE_SYSTEM,
    META_VPC_SECURITY_GROUP_IDS,
};
use crate::shared::services::BackupServices;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Discovery and restore orchestration over the AWS Backup APIs.
///
/// Holds no mutable state: the account id is read once at construction and
/// every call races the shared cancellation token.
pub struct OrchestrationClient {
    services: Arc<dyn BackupServices>,
    cancel: CancelToken,
    account_id: String,
    stack_prefix: String,
    database_endpoint_output: String,
}

impl OrchestrationClient {
    /// Build a client over the AWS SDK for `region`
    pub async fn connect(region: &str, cancel: CancelToken) -> Result<Self> {
        let services = AwsBackupServices::connect(region).await;
        Self::new(Arc::new(services), cancel).await
    }

    /// Resolve the caller's account id; any failure here is an authentication failure
    pub async fn new(services: Arc<dyn BackupServices>, cancel: CancelToken) -> Result<Self> {
        let account_id = cancel
            .run("GetCallerIdentity", services.caller_account_id())
            .await
            .map_err(|e| match e {
                RestoreBrowserError::Cancelled(_) => e,
                other => RestoreBrowserError::AuthenticationFailed(other.to_string()),
            })?;

        info!(account_id = %account_id, "Resolved AWS caller identity");

        Ok(Self {
            services,
            cancel,
            account_id,
            stack_prefix: DEFAULT_STACK_PREFIX.to_string(),
            database_endpoint_output: DEFAULT_DATABASE_ENDPOINT_OUTPUT.to_string(),
        })
    }

    /// Connect with the region and discovery settings from `config`
    pub async fn from_config(config: &Config, cancel: CancelToken) -> Result<Self> {
        Ok(Self::connect(&config.region, cancel)
            .await?
            .with_stack_prefix(config.stack_prefix.clone())
            .with_database_endpoint_output(config.database_endpoint_output.clone()))
    }

    pub fn with_stack_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.stack_prefix = prefix.into();
        self
    }

    pub fn with_database_endpoint_output(mut self, output_key: impl Into<String>) -> Self {
        self.database_endpoint_output = output_key.into();
        self
    }

    /// Find the single deployed stack whose name starts with the configured prefix
    pub async fn discover_stack_name(&self) -> Result<String> {
        let names = self
            .cancel
            .run("ListStacks", self.services.list_stack_names(DEPLOYED_STACK_STATUSES))
            .await
            .map_err(|e| e.with_context("Failed to list CloudFormation stacks"))?;

        let mut matching: Vec<String> = names
            .into_iter()
            .filter(|name| name.starts_with(&self.stack_prefix))
            .collect();

        let pattern = format!("{}*", self.stack_prefix);
        match matching.len() {
            0 => Err(RestoreBrowserError::not_found(
                "CloudFormation stack",
                format!("no stack matches pattern '{}'", pattern),
            )),
            1 => {
                let stack_name = matching.remove(0);
                info!(stack = %stack_name, "Discovered CloudFormation stack");
                Ok(stack_name)
            }
            _ => Err(RestoreBrowserError::AmbiguousResult {
                kind: "CloudFormation stacks",
                pattern,
                candidates: matching,
            }),
        }
    }

    /// Find the first vault whose name contains the stack name.
    ///
    /// Vault names carry a generated suffix after the stack name, so this is a
    /// substring match and can hit another stack's vault when names overlap.
    pub async fn discover_vault_name(&self, stack_name: &str) -> Result<String> {
        if stack_name.is_empty() {
            return Err(RestoreBrowserError::Validation(
                "stack name cannot be empty".to_string(),
            ));
        }

        let vaults = self
            .cancel
            .run("ListBackupVaults", self.services.list_backup_vault_names())
            .await
            .map_err(|e| e.with_context("Failed to list backup vaults"))?;

        let vault_name = vaults
            .into_iter()
            .find(|name| name.contains(stack_name))
            .ok_or_else(|| RestoreBrowserError::not_found("Backup vault", format!("stack {}", stack_name)))?;

        info!(stack = %stack_name, vault = %vault_name, "Discovered backup vault");
        Ok(vault_name)
    }

    /// All recovery points in a vault across every page, in service order
    pub async fn list_recovery_points(
        &self,
        vault_name: &str,
        resource_type: Option<&ResourceType>,
    ) -> Result<Vec<RecoveryPoint>> {
        if vault_name.is_empty() {
            return Err(RestoreBrowserError::Validation(
                "vault name cannot be empty".to_string(),
            ));
        }

        let mut points = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;
        let mut seen = 0usize;

        loop {
            pages += 1;
            let page = self
                .cancel
                .run(
                    "ListRecoveryPointsByBackupVault",
                    self.services.list_recovery_points(vault_name, next_token.take()),
                )
                .await
                .map_err(|e| e.with_listing_context(vault_name, pages, seen))?;

            seen += page.items.len();
            points.extend(
                page.items
                    .iter()
                    .filter_map(RecoveryPoint::from_summary)
                    .filter(|p| resource_type.map_or(true, |t| p.resource_type.matches(t))),
            );

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        if seen > 0 && points.is_empty() {
            debug!(vault = %vault_name, seen, "All recovery points were filtered out");
        }
        info!(vault = %vault_name, pages, seen, returned = points.len(), "Listed recovery points");
        Ok(points)
    }

    /// Role used by the backup plan that writes to `vault_name`, falling back
    /// to the account's default AWS Backup service role.
    pub async fn resolve_restore_role(&self, vault_name: &str) -> Result<RoleResolution> {
        if vault_name.is_empty() {
            return Err(RestoreBrowserError::Validation(
                "vault name cannot be empty".to_string(),
            ));
        }

        let mut next_token: Option<String> = None;
        let mut pages = 0usize;
        loop {
            pages += 1;
            let page = self
                .cancel
                .run("ListBackupPlans", self.services.list_backup_plans(next_token.take()))
                .await
                .map_err(|e| e.with_context(format!("Failed to list backup plans (page {})", pages)))?;

            for plan in &page.items {
                if !self.plan_targets_vault(&plan.plan_id, vault_name).await? {
                    continue;
                }

                if let Some(role_arn) = self.first_selection_role(&plan.plan_id).await? {
                    info!(
                        plan_id = %plan.plan_id,
                        plan_name = plan.plan_name.as_deref().unwrap_or("<unnamed>"),
                        role = %role_arn,
                        "Resolved restore role from backup plan"
                    );
                    return Ok(RoleResolution {
                        role_arn,
                        source: RoleSource::BackupPlan {
                            plan_id: plan.plan_id.clone(),
                        },
                    });
                }
            }

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        let role_arn = self.default_role_arn();
        warn!(vault = %vault_name, role = %role_arn, "No backup plan role found, using default service role");
        Ok(RoleResolution {
            role_arn,
            source: RoleSource::DefaultServiceRole,
        })
    }

    pub fn default_role_arn(&self) -> String {
        format!("arn:aws:iam::{}:{}", self.account_id, DEFAULT_BACKUP_ROLE_PATH)
    }

    /// Whether any rule of the plan targets the vault; unreadable plans are skipped
    async fn plan_targets_vault(&self, plan_id: &str, vault_name: &str) -> Result<bool> {
        match self
            .cancel
            .run("GetBackupPlan", self.services.backup_plan_rule_vaults(plan_id))
            .await
        {
            Ok(vaults) => Ok(vaults.iter().any(|v| v == vault_name)),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!(plan_id = %plan_id, error = %e, "Skipping backup plan whose details could not be read");
                Ok(false)
            }
        }
    }

    /// First non-empty selection role of a plan; a failing page ends the search for this plan
    async fn first_selection_role(&self, plan_id: &str) -> Result<Option<String>> {
        let mut next_token: Option<String> = None;
        loop {
            let page = match self
                .cancel
                .run(
                    "ListBackupSelections",
                    self.services.list_backup_selections(plan_id, next_token.take()),
                )
                .await
            {
                Ok(page) => page,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(plan_id = %plan_id, error = %e, "Skipping backup plan whose selections could not be listed");
                    return Ok(None);
                }
            };

            if let Some((selection_id, role)) = page.items.into_iter().find_map(|s| {
                let role = s.iam_role_arn.filter(|arn| !arn.is_empty())?;
                Some((s.selection_id, role))
            }) {
                debug!(plan_id = %plan_id, selection_id = ?selection_id, "Using backup selection role");
                return Ok(Some(role));
            }

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => return Ok(None),
            }
        }
    }

    /// Restore metadata for the point's resource family
    pub async fn build_restore_metadata(
        &self,
        point: &RecoveryPoint,
        stack_name: &str,
    ) -> Result<RestoreMetadata> {
        let mut metadata = RestoreMetadata::new();

        match &point.resource_type {
            t if t.is_database() => {
                let cluster_id = self.database_cluster_id(stack_name).await?;

                let network = self
                    .cancel
                    .run("DescribeDBClusters", self.services.describe_db_cluster(&cluster_id))
                    .await
                    .map_err(|e| e.with_context(format!("Failed to describe DB cluster {}", cluster_id)))?
                    .ok_or_else(|| RestoreBrowserError::not_found("DB cluster", cluster_id.clone()))?;

                let subnet_group = network.subnet_group.filter(|s| !s.is_empty()).ok_or_else(|| {
                    RestoreBrowserError::ConfigurationError(format!(
                        "DB cluster {} has no subnet group",
                        cluster_id
                    ))
                })?;
                if network.security_group_ids.is_empty() {
                    return Err(RestoreBrowserError::ConfigurationError(format!(
                        "DB cluster {} has no VPC security groups",
                        cluster_id
                    )));
                }

                metadata.insert(META_DB_CLUSTER_IDENTIFIER.to_string(), cluster_id);
                metadata.insert(META_DB_SUBNET_GROUP_NAME.to_string(), subnet_group);
                metadata.insert(
                    META_VPC_SECURITY_GROUP_IDS.to_string(),
                    network.security_group_ids.join(","),
                );
            }
            ResourceType::Efs => {
                metadata.insert(META_FILE_SYSTEM_ID.to_string(), point.resource_id.clone());
                metadata.insert(META_NEW_FILE_SYSTEM.to_string(), EFS_NEW_FILE_SYSTEM_VALUE.to_string());
                metadata.insert(META_ENCRYPTED.to_string(), EFS_ENCRYPTED_VALUE.to_string());
            }
            other => {
                warn!(resource_type = %other, "No restore metadata known for resource type");
            }
        }

        Ok(metadata)
    }

    /// Cluster id published by the stack's database endpoint output
    async fn database_cluster_id(&self, stack_name: &str) -> Result<String> {
        let outputs = self
            .cancel
            .run("DescribeStacks", self.services.stack_outputs(stack_name))
            .await
            .map_err(|e| e.with_context(format!("Failed to read outputs of stack {}", stack_name)))?
            .ok_or_else(|| RestoreBrowserError::not_found("CloudFormation stack", stack_name))?;

        let endpoint = outputs.get(&self.database_endpoint_output).ok_or_else(|| {
            RestoreBrowserError::ConfigurationError(format!(
                "{} output not found in stack: {}",
                self.database_endpoint_output, stack_name
            ))
        })?;

        cluster_id_from_endpoint(endpoint).ok_or_else(|| {
            RestoreBrowserError::ConfigurationError(format!(
                "{} output of stack {} is empty",
                self.database_endpoint_output, stack_name
            ))
        })
    }

    /// Resolve role and metadata for `point`, then submit the restore job
    pub async fn start_restore(
        &self,
        point: &RecoveryPoint,
        stack_name: &str,
        vault_name: &str,
    ) -> Result<RestoreSubmission> {
        let role = self
            .resolve_restore_role(vault_name)
            .await
            .map_err(|e| e.with_context("Failed to get backup plan role ARN"))?;

        let metadata = self
            .build_restore_metadata(point, stack_name)
            .await
            .map_err(|e| e.with_context(format!("Failed to prepare {} restore metadata", point.resource_type)))?;

        let request = RestoreRequest {
            recovery_point_arn: point.recovery_point_arn.clone(),
            iam_role_arn: role.role_arn.clone(),
            metadata,
        };

        debug!(arn = %request.recovery_point_arn, metadata = ?request.metadata, "Submitting restore job");
        let job_id = self
            .cancel
            .run("StartRestoreJob", self.services.start_restore_job(&request))
            .await
            .map_err(|e| e.with_context("Failed to start restore job"))?;

        info!(
            job_id = %job_id,
            resource_type = %point.resource_type,
            resource_id = %point.resource_id,
            "Restore job started"
        );

        Ok(RestoreSubmission {
            job_id,
            role,
            metadata: request.metadata,
        })
    }

    /// Current state of a restore job
    pub async fn restore_job_status(&self, job_id: &str) -> Result<RestoreJobStatus> {
        if job_id.is_empty() {
            return Err(RestoreBrowserError::Validation(
                "restore job id cannot be empty".to_string(),
            ));
        }

        self.cancel
            .run("DescribeRestoreJob", self.services.describe_restore_job(job_id))
            .await
            .map_err(|e| e.with_context(format!("Failed to describe restore job {}", job_id)))
    }

    /// Recovery point by ARN, searched in the vault listing
    pub async fn find_recovery_point(&self, vault_name: &str, recovery_point_arn: &str) -> Result<RecoveryPoint> {
        self.list_recovery_points(vault_name, None)
            .await?
            .into_iter()
            .find(|p| p.recovery_point_arn == recovery_point_arn)
            .ok_or_else(|| RestoreBrowserError::not_found("Recovery point", recovery_point_arn))
    }
}

/// `cluster-id.xxxx.region.rds.amazonaws.com` -> `cluster-id`
fn cluster_id_from_endpoint(endpoint: &str) -> Option<String> {
    endpoint
        .split('.')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
