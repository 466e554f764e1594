use thiserror::Error;

pub type Result<T> = std::result::Result<T, RestoreBrowserError>;

/// Error enum for the recovery browser using thiserror
#[derive(Error, Debug)]
pub enum RestoreBrowserError {
    // Core operational errors
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid argument: {0}")]
    Validation(String),

    #[error("{kind} not found: {identifier}")]
    NotFound {
        kind: &'static str,
        identifier: String,
    },

    #[error(
        "Multiple {kind} found matching '{pattern}': {}. Please specify one explicitly",
        candidates.join(", ")
    )]
    AmbiguousResult {
        kind: &'static str,
        pattern: String,
        candidates: Vec<String>,
    },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("{operation} failed ({context}): {message}")]
    Api {
        operation: &'static str,
        context: String,
        message: String,
    },

    #[error("Restore job {job_id} ended {status}: {message}")]
    RestoreJobFailed {
        job_id: String,
        status: String,
        message: String,
    },

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    // Context-specific operation errors
    #[error(
        "Failed to list recovery points from vault {vault} (after {pages} pages, {points} points): {source}"
    )]
    ListingFailed {
        vault: String,
        pages: usize,
        points: usize,
        #[source]
        source: Box<RestoreBrowserError>,
    },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<RestoreBrowserError>,
    },

    // Automatic conversions from standard library and UI errors
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    DialogueError(#[from] dialoguer::Error),

    #[error(transparent)]
    TemplateError(#[from] indicatif::style::TemplateError),
}

impl RestoreBrowserError {
    pub fn api(operation: &'static str, context: impl Into<String>, message: impl Into<String>) -> Self {
        RestoreBrowserError::Api {
            operation,
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, identifier: impl Into<String>) -> Self {
        RestoreBrowserError::NotFound {
            kind,
            identifier: identifier.into(),
        }
    }

    pub fn with_context(self, context: impl Into<String>) -> RestoreBrowserError {
        RestoreBrowserError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn with_listing_context(self, vault: &str, pages: usize, points: usize) -> RestoreBrowserError {
        RestoreBrowserError::ListingFailed {
            vault: vault.to_string(),
            pages,
            points,
            source: Box::new(self),
        }
    }

    /// Innermost error once context wrappers are peeled off
    pub fn root(&self) -> &RestoreBrowserError {
        match self {
            RestoreBrowserError::Context { source, .. }
            | RestoreBrowserError::ListingFailed { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), RestoreBrowserError::Cancelled(_))
    }

    /// Operator-facing advice shown under the error text
    pub fn hint(&self) -> Option<&'static str> {
        match self.root() {
            RestoreBrowserError::AuthenticationFailed(_) => Some(
                "AWS credentials are required. Configure them using one of:\n  \
                 - Environment variables: AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY\n  \
                 - AWS credentials file: ~/.aws/credentials (run 'aws configure')\n  \
                 - IAM role: if running on EC2/ECS, ensure the instance/task role has permissions",
            ),
            RestoreBrowserError::NotFound { kind: "Backup vault", .. } => Some(
                "Ensure a backup vault exists for your stack, or pass the vault name with --vault",
            ),
            RestoreBrowserError::NotFound { kind: "CloudFormation stack", .. }
            | RestoreBrowserError::AmbiguousResult { .. } => Some(
                "Verify your AWS credentials and region, or pass the stack name with --stack",
            ),
            RestoreBrowserError::RestoreJobFailed { .. } => Some(
                "Inspect the job in the AWS Backup console; the restore role may lack permissions on the target resource",
            ),
            RestoreBrowserError::ConfigurationError(_) => Some(
                "Check that the CloudFormation stack publishes the expected outputs",
            ),
            _ => None,
        }
    }
}
