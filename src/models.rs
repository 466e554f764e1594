use crate::errors::RestoreBrowserError;
use crate::shared::arn::extract_resource_id;
use crate::shared::constants::STATUS_DELETED;
use crate::shared::services::RecoveryPointSummary;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Flat key/value metadata handed to StartRestoreJob
pub type RestoreMetadata = BTreeMap<String, String>;

/// Protected resource family that produced a recovery point
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Rds,
    Aurora,
    Efs,
    Other(String),
}

impl ResourceType {
    /// Map the tag reported by AWS Backup
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "RDS" => ResourceType::Rds,
            "Aurora" => ResourceType::Aurora,
            "EFS" => ResourceType::Efs,
            other => ResourceType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Rds => "RDS",
            ResourceType::Aurora => "Aurora",
            ResourceType::Efs => "EFS",
            ResourceType::Other(tag) => tag,
        }
    }

    /// Filter comparison; unrecognized tags compare ignoring ASCII case so
    /// `--type dynamodb` selects `DynamoDB` points
    pub fn matches(&self, filter: &ResourceType) -> bool {
        match (self, filter) {
            (ResourceType::Other(tag), ResourceType::Other(wanted)) => tag.eq_ignore_ascii_case(wanted),
            _ => self == filter,
        }
    }

    /// Restores of this family target a live database cluster
    pub fn is_database(&self) -> bool {
        matches!(self, ResourceType::Rds | ResourceType::Aurora)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator input (`--type rds`), case-insensitive for the known families
impl FromStr for ResourceType {
    type Err = RestoreBrowserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(RestoreBrowserError::Validation(
                "resource type filter cannot be empty".to_string(),
            ));
        }

        Ok(match trimmed.to_ascii_uppercase().as_str() {
            "RDS" => ResourceType::Rds,
            "AURORA" => ResourceType::Aurora,
            "EFS" => ResourceType::Efs,
            _ => ResourceType::Other(trimmed.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryPointStatus {
    Completed,
    Available,
    Partial,
    Creating,
    Stopped,
    Deleting,
    Expired,
    Deleted,
    Other(String),
}

impl RecoveryPointStatus {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "COMPLETED" => RecoveryPointStatus::Completed,
            "AVAILABLE" => RecoveryPointStatus::Available,
            "PARTIAL" => RecoveryPointStatus::Partial,
            "CREATING" => RecoveryPointStatus::Creating,
            "STOPPED" => RecoveryPointStatus::Stopped,
            "DELETING" => RecoveryPointStatus::Deleting,
            "EXPIRED" => RecoveryPointStatus::Expired,
            STATUS_DELETED => RecoveryPointStatus::Deleted,
            other => RecoveryPointStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RecoveryPointStatus::Completed => "COMPLETED",
            RecoveryPointStatus::Available => "AVAILABLE",
            RecoveryPointStatus::Partial => "PARTIAL",
            RecoveryPointStatus::Creating => "CREATING",
            RecoveryPointStatus::Stopped => "STOPPED",
            RecoveryPointStatus::Deleting => "DELETING",
            RecoveryPointStatus::Expired => "EXPIRED",
            RecoveryPointStatus::Deleted => STATUS_DELETED,
            RecoveryPointStatus::Other(tag) => tag,
        }
    }
}

impl fmt::Display for RecoveryPointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backup recovery point, normalized from the AWS Backup listing
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryPoint {
    pub recovery_point_arn: String,
    pub creation_date: DateTime<Utc>,
    pub status: RecoveryPointStatus,
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub backup_size_bytes: u64,
}

impl RecoveryPoint {
    /// Normalize a listing entry, dropping deleted points and points whose
    /// resource id cannot be extracted.
    pub fn from_summary(summary: &RecoveryPointSummary) -> Option<Self> {
        let status = RecoveryPointStatus::from_tag(summary.status.as_deref().unwrap_or_default());
        if status == RecoveryPointStatus::Deleted {
            debug!(arn = ?summary.recovery_point_arn, "Skipping deleted recovery point");
            return None;
        }

        let recovery_point_arn = summary.recovery_point_arn.clone().filter(|a| !a.is_empty())?;

        let resource_id = summary
            .resource_arn
            .as_deref()
            .map(extract_resource_id)
            .unwrap_or_default();
        if resource_id.is_empty() {
            debug!(arn = %recovery_point_arn, "Skipping recovery point without resource id");
            return None;
        }

        Some(RecoveryPoint {
            recovery_point_arn,
            creation_date: summary.creation_date.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            status,
            resource_type: ResourceType::from_tag(summary.resource_type.as_deref().unwrap_or_default()),
            resource_id,
            backup_size_bytes: summary
                .backup_size_bytes
                .and_then(|size| u64::try_from(size).ok())
                .unwrap_or(0),
        })
    }
}

/// Request submitted to StartRestoreJob
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreRequest {
    pub recovery_point_arn: String,
    pub iam_role_arn: String,
    pub metadata: RestoreMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSource {
    /// Role taken from a selection of the plan targeting the vault
    BackupPlan { plan_id: String },
    /// Conventional default role built from the account id
    DefaultServiceRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleResolution {
    pub role_arn: String,
    pub source: RoleSource,
}

impl RoleResolution {
    pub fn is_fallback(&self) -> bool {
        self.source == RoleSource::DefaultServiceRole
    }
}

/// Result of a successful restore submission
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreSubmission {
    pub job_id: String,
    pub role: RoleResolution,
    pub metadata: RestoreMetadata,
}

/// Snapshot of a restore job as reported by DescribeRestoreJob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreJobStatus {
    pub job_id: String,
    pub status: String,
    pub percent_done: Option<String>,
    pub status_message: Option<String>,
    pub created_resource_arn: Option<String>,
}

impl RestoreJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "COMPLETED" | "ABORTED" | "FAILED")
    }

    pub fn is_success(&self) -> bool {
        self.status == "COMPLETED"
    }

    /// Turn a job that ended FAILED or ABORTED into an error
    pub fn ensure_not_failed(self) -> Result<Self, RestoreBrowserError> {
        if self.is_terminal() && !self.is_success() {
            return Err(RestoreBrowserError::RestoreJobFailed {
                job_id: self.job_id,
                status: self.status,
                message: self.status_message.unwrap_or_else(|| "no status message".to_string()),
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary(status: &str, resource_arn: Option<&str>) -> RecoveryPointSummary {
        RecoveryPointSummary {
            recovery_point_arn: Some("arn:aws:backup:us-west-2:123456789012:recovery-point:rp-1".to_string()),
            creation_date: Some(Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()),
            status: Some(status.to_string()),
            resource_type: Some("EFS".to_string()),
            resource_arn: resource_arn.map(str::to_string),
            backup_size_bytes: Some(2048),
        }
    }

    #[test]
    fn test_from_summary_normalizes_fields() {
        let point = RecoveryPoint::from_summary(&summary(
            "COMPLETED",
            Some("arn:aws:elasticfilesystem:us-west-2:123456789012:file-system/fs-0abc"),
        ))
        .unwrap();

        assert_eq!(point.resource_type, ResourceType::Efs);
        assert_eq!(point.resource_id, "fs-0abc");
        assert_eq!(point.status, RecoveryPointStatus::Completed);
        assert_eq!(point.backup_size_bytes, 2048);
    }

    #[test]
    fn test_from_summary_skips_deleted_and_unidentifiable() {
        let efs_arn = "arn:aws:elasticfilesystem:us-west-2:123456789012:file-system/fs-0abc";
        assert!(RecoveryPoint::from_summary(&summary("DELETED", Some(efs_arn))).is_none());
        assert!(RecoveryPoint::from_summary(&summary("COMPLETED", None)).is_none());
        assert!(RecoveryPoint::from_summary(&summary("COMPLETED", Some(""))).is_none());

        let mut without_arn = summary("COMPLETED", Some(efs_arn));
        without_arn.recovery_point_arn = None;
        assert!(RecoveryPoint::from_summary(&without_arn).is_none());
    }

    #[test]
    fn test_from_summary_missing_size_is_zero() {
        let mut raw = summary("EXPIRED", Some("arn:aws:rds:us-west-2:123456789012:cluster:db-1"));
        raw.backup_size_bytes = None;
        raw.resource_type = Some("RDS".to_string());

        let point = RecoveryPoint::from_summary(&raw).unwrap();
        assert_eq!(point.backup_size_bytes, 0);
        assert_eq!(point.status, RecoveryPointStatus::Expired);
        assert!(point.resource_type.is_database());
    }

    #[test]
    fn test_resource_type_parsing() -> Result<(), RestoreBrowserError> {
        assert_eq!("rds".parse::<ResourceType>()?, ResourceType::Rds);
        assert_eq!("EFS".parse::<ResourceType>()?, ResourceType::Efs);
        assert_eq!(" aurora ".parse::<ResourceType>()?, ResourceType::Aurora);
        assert_eq!(
            "DynamoDB".parse::<ResourceType>()?,
            ResourceType::Other("DynamoDB".to_string())
        );
        assert!("  ".parse::<ResourceType>().is_err());

        assert_eq!(ResourceType::from_tag("EC2").as_str(), "EC2");
        assert!(!ResourceType::Efs.is_database());
        Ok(())
    }

    #[test]
    fn test_restore_job_terminal_states() {
        let mut job = RestoreJobStatus {
            job_id: "job-1".to_string(),
            status: "RUNNING".to_string(),
            percent_done: Some("40.0".to_string()),
            status_message: None,
            created_resource_arn: None,
        };
        assert!(!job.is_terminal());

        job.status = "FAILED".to_string();
        assert!(job.is_terminal());
        assert!(!job.is_success());

        job.status = "COMPLETED".to_string();
        assert!(job.is_success());
    }

    #[test]
    fn test_failed_jobs_become_errors() {
        let job = RestoreJobStatus {
            job_id: "job-1".to_string(),
            status: "ABORTED".to_string(),
            percent_done: None,
            status_message: Some("Access denied".to_string()),
            created_resource_arn: None,
        };
        let err = job.clone().ensure_not_failed().unwrap_err();
        assert_eq!(err.to_string(), "Restore job job-1 ended ABORTED: Access denied");
        assert!(err.hint().is_some());

        let running = RestoreJobStatus {
            status: "RUNNING".to_string(),
            ..job.clone()
        };
        assert!(running.ensure_not_failed().is_ok());

        let done = RestoreJobStatus {
            status: "COMPLETED".to_string(),
            ..job
        };
        assert!(done.ensure_not_failed().is_ok());
    }

    #[test]
    fn test_type_filter_matching() {
        let dynamo = ResourceType::from_tag("DynamoDB");
        assert!(dynamo.matches(&ResourceType::Other("dynamodb".to_string())));
        assert!(!dynamo.matches(&ResourceType::Efs));
        assert!(ResourceType::Rds.matches(&ResourceType::Rds));
        assert!(!ResourceType::Rds.matches(&ResourceType::Aurora));
    }
}
