// Shared constants used across the recovery browser

/// Discovery defaults
pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_STACK_PREFIX: &str = "OpenemrEcs";
pub const DEFAULT_DATABASE_ENDPOINT_OUTPUT: &str = "DatabaseEndpoint";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Stack lifecycle states considered deployed
pub const DEPLOYED_STACK_STATUSES: &[&str] = &[
    "CREATE_COMPLETE",
    "UPDATE_COMPLETE",
    "UPDATE_ROLLBACK_COMPLETE",
];

/// Fallback restore role, relative to the account
pub const DEFAULT_BACKUP_ROLE_PATH: &str = "role/service-role/AWSBackupDefaultServiceRole";

/// Recovery point status the catalog never surfaces
pub const STATUS_DELETED: &str = "DELETED";

/// RDS/Aurora restore metadata keys
pub const META_DB_CLUSTER_IDENTIFIER: &str = "DBClusterIdentifier";
pub const META_DB_SUBNET_GROUP_NAME: &str = "DBSubnetGroupName";
pub const META_VPC_SECURITY_GROUP_IDS: &str = "VpcSecurityGroupIds";

/// EFS restore metadata keys and fixed values
pub const META_FILE_SYSTEM_ID: &str = "file-system-id";
pub const META_NEW_FILE_SYSTEM: &str = "newFileSystem";
pub const META_ENCRYPTED: &str = "Encrypted";
pub const EFS_NEW_FILE_SYSTEM_VALUE: &str = "false";
pub const EFS_ENCRYPTED_VALUE: &str = "true";

/// Display limits
pub const ARN_DISPLAY_WIDTH: usize = 60;
