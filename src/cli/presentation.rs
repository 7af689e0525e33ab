//! CLI presentation: text and json formatters per command.

use crate::comments::DrainReport;
use crate::config::ValidationError;
use crate::content::{GeneratedItem, PipelineOutcome};
use crate::error::AutomationError;
use crate::scheduler::{DrainOutcome, TickOutcome};
use crate::status::{StateLabel, StatusSnapshot};
use chrono::{DateTime, Utc};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn format_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_state(label: StateLabel) -> String {
    match label {
        StateLabel::Active => label.green().to_string(),
        StateLabel::Paused => label.yellow().to_string(),
        StateLabel::Blocked => label.red().to_string(),
    }
}

pub fn format_status_text(snapshot: &StatusSnapshot) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Automation Status")));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["State".to_string(), format_state(snapshot.state)]);
    if let Some(reason) = &snapshot.block_reason {
        table.add_row(vec!["Block reason".to_string(), reason.clone()]);
    }
    table.add_row(vec![
        "Last item".to_string(),
        snapshot
            .last_item_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec!["Last run".to_string(), format_time(snapshot.last_run_at)]);
    table.add_row(vec!["Next run".to_string(), format_time(snapshot.next_run_at)]);
    table.add_row(vec![
        "Pending comments".to_string(),
        snapshot.pending_action_count.to_string(),
    ]);
    table.add_row(vec![
        "Last comment".to_string(),
        format_time(snapshot.last_comment_at),
    ]);
    out.push_str(&format!("{}\n", table));

    if let Some(error) = &snapshot.last_error {
        out.push_str(&format!(
            "\n{} {} ({})\n",
            "Last error:".red().bold(),
            error,
            format_time(snapshot.last_error_at)
        ));
    }
    out
}

pub fn format_status_json(snapshot: &StatusSnapshot) -> Result<String, AutomationError> {
    serde_json::to_string_pretty(snapshot)
        .map_err(|e| AutomationError::ConfigError(format!("Failed to render status: {}", e)))
}

pub fn format_pipeline_outcome(outcome: &PipelineOutcome) -> String {
    match outcome {
        PipelineOutcome::Produced { item_id, warnings } if warnings.is_empty() => {
            format!("Item {} created", item_id)
        }
        PipelineOutcome::Produced { item_id, warnings } => {
            format!("Item {} created with warnings: {}", item_id, warnings.join("; "))
        }
        PipelineOutcome::Previewed(item) => format!("Previewed: {}", item.title),
        PipelineOutcome::NothingProduced(err) => format!("Nothing produced: {}", err),
    }
}

pub fn format_tick_outcome(outcome: &TickOutcome) -> String {
    match outcome {
        TickOutcome::Paused => "Automation is paused".to_string(),
        TickOutcome::Blocked(reason) => format!("Automation is blocked: {}", reason),
        TickOutcome::Armed(next) => format!("Scheduler armed; next run at {}", format_time(Some(*next))),
        TickOutcome::NotDue(next) => format!("Not due; next run at {}", format_time(Some(*next))),
        TickOutcome::Busy => "A generation run is already in progress".to_string(),
        TickOutcome::Ran {
            outcome,
            next_run_at,
        } => format!(
            "{}\nNext run at {}",
            format_pipeline_outcome(outcome),
            format_time(Some(*next_run_at))
        ),
    }
}

fn format_drain_report(report: &DrainReport) -> String {
    format!(
        "Drained: {} executed, {} deferred, {} skipped ({} plans examined)",
        report.executed, report.deferred, report.skipped, report.examined_plans
    )
}

pub fn format_drain_outcome(outcome: &DrainOutcome) -> String {
    match outcome {
        DrainOutcome::Paused => "Automation is paused".to_string(),
        DrainOutcome::Blocked(reason) => format!("Automation is blocked: {}", reason),
        DrainOutcome::Busy => "A drain is already in progress".to_string(),
        DrainOutcome::Drained(report) => format_drain_report(report),
    }
}

pub fn format_item_text(item: &GeneratedItem) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading(&item.title)));
    out.push_str(&format!("Slug: {}\n", item.resolved_slug()));
    out.push_str(&format!("Excerpt: {}\n", item.resolved_excerpt()));
    if !item.summary_text().is_empty() {
        out.push_str(&format!("Summary: {}\n", item.summary_text()));
    }
    out.push_str(&format!("\n{}\n", item.body));
    out
}

pub fn format_item_json(item: &GeneratedItem) -> Result<String, AutomationError> {
    serde_json::to_string_pretty(item)
        .map_err(|e| AutomationError::ConfigError(format!("Failed to render item: {}", e)))
}

pub fn format_validation_errors(errors: &[ValidationError]) -> String {
    let mut out = format!("Configuration has {} problem(s):", errors.len());
    for error in errors {
        out.push_str(&format!("\n  - {}", error));
    }
    out
}
