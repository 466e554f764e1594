use crate::errors::RestoreBrowserError;
use crate::models::ResourceType;
use dialoguer::{Confirm, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const REFRESH_ITEM: &str = "[r] Refresh list";
const FILTER_ITEM: &str = "[/] Change resource type filter";
const QUIT_ITEM: &str = "[q] Quit";

/// What the operator picked in the recovery point list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseAction {
    Open(usize),
    Refresh,
    ChangeFilter,
    Quit,
}

/// What the operator picked in the detail view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailAction {
    Restore,
    Back,
    Quit,
}

/// List entries followed by the fixed actions
pub fn browse_items(rows: &[String]) -> Vec<String> {
    let mut items = rows.to_vec();
    items.extend([REFRESH_ITEM, FILTER_ITEM, QUIT_ITEM].map(str::to_string));
    items
}

pub fn browse_action_for(selection: usize, row_count: usize) -> BrowseAction {
    match selection.checked_sub(row_count) {
        None => BrowseAction::Open(selection),
        Some(0) => BrowseAction::Refresh,
        Some(1) => BrowseAction::ChangeFilter,
        Some(_) => BrowseAction::Quit,
    }
}

/// Interactive recovery point list
pub fn select_recovery_point(
    header: &str,
    status: &str,
    rows: &[String],
) -> Result<BrowseAction, RestoreBrowserError> {
    println!();
    println!("{}", header);
    println!("{}", status);

    let items = browse_items(rows);
    let selection = Select::new()
        .with_prompt("Select a backup (TYPE | RESOURCE | CREATED | SIZE)")
        .items(&items)
        .default(0)
        .max_length(20)
        .interact_opt()?;

    Ok(match selection {
        Some(index) => browse_action_for(index, rows.len()),
        None => BrowseAction::Quit,
    })
}

fn filter_choices() -> Vec<(&'static str, Option<ResourceType>)> {
    vec![
        ("All resource types", None),
        ("RDS", Some(ResourceType::Rds)),
        ("Aurora", Some(ResourceType::Aurora)),
        ("EFS", Some(ResourceType::Efs)),
    ]
}

/// Pick a resource type filter, defaulting to the current one
pub fn select_resource_filter(
    current: Option<&ResourceType>,
) -> Result<Option<ResourceType>, RestoreBrowserError> {
    let mut choices = filter_choices();
    let labels: Vec<&str> = choices.iter().map(|(label, _)| *label).collect();
    let default = choices
        .iter()
        .position(|(_, t)| t.as_ref() == current)
        .unwrap_or(0);

    let selection = Select::new()
        .with_prompt("Filter by resource type")
        .items(&labels)
        .default(default)
        .interact()?;

    Ok(choices.swap_remove(selection).1)
}

/// Detail view with its actions
pub fn select_detail_action(details: &[String]) -> Result<DetailAction, RestoreBrowserError> {
    println!();
    for line in details {
        println!("  {}", line);
    }
    println!();

    let actions = ["Initiate restore", "Back to list", "Quit"];
    let selection = Select::new()
        .with_prompt("Action")
        .items(&actions)
        .default(0)
        .interact_opt()?;

    Ok(match selection {
        Some(0) => DetailAction::Restore,
        Some(1) | None => DetailAction::Back,
        Some(_) => DetailAction::Quit,
    })
}

/// Simple confirmation dialog
pub fn confirm_action(prompt: &str, default: bool) -> Result<bool, RestoreBrowserError> {
    let result = Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()?;
    Ok(result)
}

/// Spinner shown while following a restore job
pub fn create_restore_spinner(job_id: &str) -> Result<ProgressBar, RestoreBrowserError> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {prefix} {msg}")?);
    pb.set_prefix(job_id.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}
