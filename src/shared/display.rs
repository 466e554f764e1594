use crate::errors::RestoreBrowserError;
use crate::models::{RecoveryPoint, RestoreJobStatus, RestoreSubmission};
use crate::shared::constants::ARN_DISPLAY_WIDTH;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// Display formatter for recovery point listings and restore results
pub struct DisplayFormatter;

impl DisplayFormatter {
    /// `TYPE | RESOURCE-ID | CREATED | SIZE`
    pub fn recovery_point_row(point: &RecoveryPoint) -> String {
        format!(
            "{} | {} | {} | {}",
            point.resource_type,
            point.resource_id,
            point.creation_date.format("%Y-%m-%d %H:%M:%S"),
            format_bytes(point.backup_size_bytes)
        )
    }

    /// Detail view of a single recovery point
    pub fn recovery_point_details(point: &RecoveryPoint) -> Vec<String> {
        vec![
            format!("{:<20}{}", "Resource Type:", point.resource_type),
            format!("{:<20}{}", "Resource ID:", point.resource_id),
            format!("{:<20}{}", "Status:", point.status),
            format!("{:<20}{}", "Created:", point.creation_date.format("%Y-%m-%d %H:%M:%S UTC")),
            format!("{:<20}{}", "Size:", format_bytes(point.backup_size_bytes)),
            format!(
                "{:<20}{}",
                "Recovery Point ARN:",
                truncate_string(&point.recovery_point_arn, ARN_DISPLAY_WIDTH)
            ),
        ]
    }

    /// Header shown above the interactive list
    pub fn header(vault_name: &str, region: &str, filter: Option<&str>) -> String {
        let mut header = format!("Vault: {}  Region: {}", vault_name, region);
        if let Some(filter) = filter {
            header.push_str(&format!("  Filter: {}", filter));
        }
        header
    }

    /// Count line under the list, as the status bar shows it
    pub fn status_line(vault_name: &str, count: usize) -> String {
        if count == 0 {
            format!("No backups found in vault: {}", vault_name)
        } else {
            format!("{} backup(s) found", count)
        }
    }

    /// Log a per-type summary followed by each recovery point
    pub fn display_recovery_points(vault_name: &str, points: &[RecoveryPoint]) {
        info!("");
        info!("RECOVERY POINTS IN {}:", vault_name);
        info!("====================");

        if points.is_empty() {
            info!("{}", Self::status_line(vault_name, 0));
            return;
        }

        for (resource_type, count) in Self::count_by_type(points) {
            info!("{:<10} {} recovery point(s)", resource_type, count);
        }

        info!("");
        for point in points {
            info!("  {}", Self::recovery_point_row(point));
        }
    }

    fn count_by_type(points: &[RecoveryPoint]) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for point in points {
            *counts.entry(point.resource_type.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Log the outcome of a restore submission
    pub fn display_submission(submission: &RestoreSubmission) {
        info!(job_id = %submission.job_id, "Restore job started");
        info!(role = %submission.role.role_arn, "Restore role");
        for (key, value) in &submission.metadata {
            info!("  {} = {}", key, value);
        }
        if submission.role.is_fallback() {
            warn!(
                role = %submission.role.role_arn,
                "No backup plan role was found for the vault; the default AWS Backup service role may lack permissions"
            );
        }
    }

    /// Error text verbatim, followed by operator advice when there is some
    pub fn display_error(err: &RestoreBrowserError) {
        error!("{}", err);
        if let Some(hint) = err.hint() {
            warn!("{}", hint);
        }
    }

    pub fn job_status_line(status: &RestoreJobStatus) -> String {
        let mut line = format!("{} {}", status.job_id, status.status);
        if let Some(percent) = &status.percent_done {
            line.push_str(&format!(" ({})", percent));
        }
        if let Some(message) = &status.status_message {
            line.push_str(&format!(": {}", message));
        }
        line
    }
}

/// Human-readable size with one decimal place (`1.5 GB`)
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: &[char] = &['K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.1} {}B", bytes as f64 / div as f64, PREFIXES[exp])
}

/// Shorten `s` to `max_len` characters, ending in `...` when cut
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut truncated: String = s.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

/// Newest first; the catalog itself keeps service order
pub fn sort_newest_first(points: &mut [RecoveryPoint]) {
    points.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
}
