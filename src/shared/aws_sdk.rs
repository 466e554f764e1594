use crate::errors::{RestoreBrowserError, Result};
use crate::models::{RestoreJobStatus, RestoreRequest};
use crate::shared::services::{
    BackupPlanSummary, BackupSelectionSummary, BackupServices, DbClusterNetwork, Page,
    RecoveryPointSummary,
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_backup::error::DisplayErrorContext;
use aws_sdk_backup::primitives::DateTime as SmithyDateTime;
use aws_sdk_cloudformation::types::StackStatus;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

/// `BackupServices` backed by the AWS SDK clients for one region
pub struct AwsBackupServices {
    backup: aws_sdk_backup::Client,
    cfn: aws_sdk_cloudformation::Client,
    rds: aws_sdk_rds::Client,
    sts: aws_sdk_sts::Client,
    region: String,
}

impl AwsBackupServices {
    /// Load the default credential chain (environment, shared config files,
    /// SSO, container/instance role) pinned to `region`.
    pub async fn connect(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        debug!(region = %region, "Loaded AWS SDK configuration");
        Self::from_config(&config, region)
    }

    pub fn from_config(config: &aws_config::SdkConfig, region: &str) -> Self {
        Self {
            backup: aws_sdk_backup::Client::new(config),
            cfn: aws_sdk_cloudformation::Client::new(config),
            rds: aws_sdk_rds::Client::new(config),
            sts: aws_sdk_sts::Client::new(config),
            region: region.to_string(),
        }
    }

    fn region_context(&self) -> String {
        format!("region {}", self.region)
    }
}

/// SDK accessors return `&str` for required members and `Option<&str>` for
/// optional ones; both collapse to a non-empty owned string here.
trait SdkText {
    fn into_text(self) -> Option<String>;
}

impl SdkText for &str {
    fn into_text(self) -> Option<String> {
        Some(self.to_string()).filter(|s| !s.is_empty())
    }
}

impl SdkText for Option<&str> {
    fn into_text(self) -> Option<String> {
        self.and_then(|s| s.into_text())
    }
}

fn text(value: impl SdkText) -> Option<String> {
    value.into_text()
}

fn api_error<E>(operation: &'static str, context: impl Into<String>, err: E) -> RestoreBrowserError
where
    E: std::error::Error,
{
    RestoreBrowserError::api(operation, context, DisplayErrorContext(err).to_string())
}

fn to_chrono(value: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(value.secs(), value.subsec_nanos())
}

#[async_trait]
impl BackupServices for AwsBackupServices {
    async fn caller_account_id(&self) -> Result<String> {
        let identity = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| api_error("GetCallerIdentity", self.region_context(), e))?;

        text(identity.account()).ok_or_else(|| {
            RestoreBrowserError::api(
                "GetCallerIdentity",
                self.region_context(),
                "response did not include an account id",
            )
        })
    }

    async fn list_stack_names(&self, statuses: &[&str]) -> Result<Vec<String>> {
        let filter: Vec<StackStatus> = statuses.iter().map(|s| StackStatus::from(*s)).collect();

        let mut names = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = self
                .cfn
                .list_stacks()
                .set_stack_status_filter(Some(filter.clone()))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| api_error("ListStacks", self.region_context(), e))?;

            names.extend(page.stack_summaries().iter().filter_map(|s| text(s.stack_name())));

            match text(page.next_token()) {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        debug!(count = names.len(), "Listed CloudFormation stacks");
        Ok(names)
    }

    async fn stack_outputs(&self, stack_name: &str) -> Result<Option<HashMap<String, String>>> {
        let result = self.cfn.describe_stacks().stack_name(stack_name).send().await;

        let stacks = match result {
            Ok(stacks) => stacks,
            Err(err) => {
                let message = DisplayErrorContext(&err).to_string();
                // CloudFormation reports a missing stack as a ValidationError
                if message.contains("does not exist") {
                    return Ok(None);
                }
                return Err(RestoreBrowserError::api(
                    "DescribeStacks",
                    format!("stack {}", stack_name),
                    message,
                ));
            }
        };

        let Some(stack) = stacks.stacks().first() else {
            return Ok(None);
        };

        let mut outputs = HashMap::new();
        for output in stack.outputs() {
            if let (Some(key), Some(value)) = (text(output.output_key()), text(output.output_value())) {
                outputs.insert(key, value);
            }
        }

        Ok(Some(outputs))
    }

    async fn list_backup_vault_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = self
                .backup
                .list_backup_vaults()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| api_error("ListBackupVaults", self.region_context(), e))?;

            names.extend(
                page.backup_vault_list()
                    .iter()
                    .filter_map(|v| text(v.backup_vault_name())),
            );

            match text(page.next_token()) {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(names)
    }

    async fn list_recovery_points(
        &self,
        vault_name: &str,
        next_token: Option<String>,
    ) -> Result<Page<RecoveryPointSummary>> {
        let page = self
            .backup
            .list_recovery_points_by_backup_vault()
            .backup_vault_name(vault_name)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| api_error("ListRecoveryPointsByBackupVault", format!("vault {}", vault_name), e))?;

        let items = page
            .recovery_points()
            .iter()
            .map(|point| RecoveryPointSummary {
                recovery_point_arn: text(point.recovery_point_arn()),
                creation_date: point.creation_date().and_then(to_chrono),
                status: point.status().map(|s| s.as_str().to_string()),
                resource_type: text(point.resource_type()),
                resource_arn: text(point.resource_arn()),
                backup_size_bytes: point.backup_size_in_bytes(),
            })
            .collect();

        Ok(Page {
            items,
            next_token: text(page.next_token()),
        })
    }

    async fn list_backup_plans(&self, next_token: Option<String>) -> Result<Page<BackupPlanSummary>> {
        let page = self
            .backup
            .list_backup_plans()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| api_error("ListBackupPlans", self.region_context(), e))?;

        let items = page
            .backup_plans_list()
            .iter()
            .filter_map(|plan| {
                Some(BackupPlanSummary {
                    plan_id: text(plan.backup_plan_id())?,
                    plan_name: text(plan.backup_plan_name()),
                })
            })
            .collect();

        Ok(Page {
            items,
            next_token: text(page.next_token()),
        })
    }

    async fn backup_plan_rule_vaults(&self, plan_id: &str) -> Result<Vec<String>> {
        let output = self
            .backup
            .get_backup_plan()
            .backup_plan_id(plan_id)
            .send()
            .await
            .map_err(|e| api_error("GetBackupPlan", format!("plan {}", plan_id), e))?;

        Ok(output
            .backup_plan()
            .map(|plan| {
                plan.rules()
                    .iter()
                    .filter_map(|rule| text(rule.target_backup_vault_name()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_backup_selections(
        &self,
        plan_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<BackupSelectionSummary>> {
        let page = self
            .backup
            .list_backup_selections()
            .backup_plan_id(plan_id)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| api_error("ListBackupSelections", format!("plan {}", plan_id), e))?;

        let items = page
            .backup_selections_list()
            .iter()
            .map(|selection| BackupSelectionSummary {
                selection_id: text(selection.selection_id()),
                iam_role_arn: text(selection.iam_role_arn()),
            })
            .collect();

        Ok(Page {
            items,
            next_token: text(page.next_token()),
        })
    }

    async fn describe_db_cluster(&self, cluster_id: &str) -> Result<Option<DbClusterNetwork>> {
        let result = self
            .rds
            .describe_db_clusters()
            .db_cluster_identifier(cluster_id)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.db_clusters().first().map(|cluster| DbClusterNetwork {
                subnet_group: text(cluster.db_subnet_group()),
                security_group_ids: cluster
                    .vpc_security_groups()
                    .iter()
                    .filter_map(|sg| text(sg.vpc_security_group_id()))
                    .collect(),
            })),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_db_cluster_not_found_fault()) =>
            {
                Ok(None)
            }
            Err(err) => Err(api_error("DescribeDBClusters", format!("cluster {}", cluster_id), err)),
        }
    }

    async fn start_restore_job(&self, request: &RestoreRequest) -> Result<String> {
        let metadata: HashMap<String, String> = request
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let context = format!("recovery point {}", request.recovery_point_arn);
        let output = self
            .backup
            .start_restore_job()
            .recovery_point_arn(&request.recovery_point_arn)
            .iam_role_arn(&request.iam_role_arn)
            .set_metadata(Some(metadata))
            .send()
            .await
            .map_err(|e| api_error("StartRestoreJob", context.clone(), e))?;

        text(output.restore_job_id()).ok_or_else(|| {
            RestoreBrowserError::api("StartRestoreJob", context, "response did not include a restore job id")
        })
    }

    async fn describe_restore_job(&self, job_id: &str) -> Result<RestoreJobStatus> {
        let output = self
            .backup
            .describe_restore_job()
            .restore_job_id(job_id)
            .send()
            .await
            .map_err(|e| api_error("DescribeRestoreJob", format!("job {}", job_id), e))?;

        Ok(RestoreJobStatus {
            job_id: job_id.to_string(),
            status: output
                .status()
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            percent_done: text(output.percent_done()),
            status_message: text(output.status_message()),
            created_resource_arn: text(output.created_resource_arn()),
        })
    }
}
