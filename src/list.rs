use crate::errors::Result;
use crate::models::{RecoveryPoint, ResourceType};
use crate::shared::display::{format_bytes, DisplayFormatter};
use crate::shared::restore_workflow::{RestoreTargets, RestoreWorkflow};
use serde_json::{json, Value};
use tracing::info;

/// Print every recovery point in the vault, as a log table or JSON
pub async fn list_recovery_points(workflow: &RestoreWorkflow, json_output: bool) -> Result<()> {
    let targets = workflow.resolve_targets().await?;
    let filter = workflow.config().resource_type.as_ref();

    if !json_output {
        info!(
            vault = %targets.vault_name,
            filter = %workflow.config().filter_label(),
            "Listing recovery points"
        );
    }

    let points = workflow.load_points(&targets.vault_name, filter).await?;

    if json_output {
        let output = recovery_points_json(&targets, &workflow.config().region, filter, &points);
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        DisplayFormatter::display_recovery_points(&targets.vault_name, &points);
    }

    Ok(())
}

fn recovery_points_json(
    targets: &RestoreTargets,
    region: &str,
    filter: Option<&ResourceType>,
    points: &[RecoveryPoint],
) -> Value {
    json!({
        "stack": targets.stack_name,
        "vault": targets.vault_name,
        "region": region,
        "resource_type": filter.map(|t| t.to_string()),
        "recovery_points": points.iter().map(|p| json!({
            "arn": p.recovery_point_arn,
            "resource_type": p.resource_type.to_string(),
            "resource_id": p.resource_id,
            "status": p.status.to_string(),
            "created": p.creation_date.to_rfc3339(),
            "size_bytes": p.backup_size_bytes,
            "size": format_bytes(p.backup_size_bytes),
        })).collect::<Vec<_>>()
    })
}
