use crate::errors::Result;
use crate::shared::display::DisplayFormatter;
use crate::shared::restore_workflow::RestoreWorkflow;
use tracing::info;

/// Browse recovery points and restore interactively
pub async fn restore_interactive(workflow: &RestoreWorkflow) -> Result<()> {
    info!("AWS Backup Recovery Browser");
    workflow.execute_interactive_browse().await
}

/// Restore a single recovery point without prompting
pub async fn restore_recovery_point(workflow: &RestoreWorkflow, recovery_point_arn: &str, wait: bool) -> Result<()> {
    info!(arn = %recovery_point_arn, "Restoring recovery point");
    let submission = workflow.restore_by_arn(recovery_point_arn, wait).await?;
    println!("{}", submission.job_id);
    Ok(())
}

/// Show, or follow to completion, the state of a restore job
pub async fn show_restore_status(workflow: &RestoreWorkflow, job_id: &str, wait: bool) -> Result<()> {
    let status = if wait {
        workflow.follow_restore_job(job_id).await?
    } else {
        workflow.client().restore_job_status(job_id).await?
    };

    println!("{}", DisplayFormatter::job_status_line(&status));
    if let Some(arn) = &status.created_resource_arn {
        println!("Created resource: {}", arn);
    }
    status.ensure_not_failed()?;
    Ok(())
}
