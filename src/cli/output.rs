//! CLI output formatting

use crate::core::StepResult;
use crate::execution::RunEvent;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static GATE: Emoji<'_, '_> = Emoji("🚧 ", "? ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar over the pipeline's steps
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    if let Ok(progress_style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        progress.set_style(progress_style.progress_chars("#>-"));
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a run event for display
pub fn format_run_event(event: &RunEvent) -> String {
    match event {
        RunEvent::PipelineStarted {
            run_id,
            pipeline_name,
        } => format!(
            "{} Starting pipeline {} ({})",
            ROCKET,
            style(pipeline_name).bold(),
            style(&run_id.to_string()[..8]).dim()
        ),
        RunEvent::StepStarted {
            step_id,
            agent,
            attempt,
        } => {
            if *attempt > 1 {
                format!(
                    "{} {} on {} (attempt {})",
                    SPINNER,
                    style(step_id).cyan(),
                    style(agent).dim(),
                    style(attempt).yellow()
                )
            } else {
                format!(
                    "{} {} on {}",
                    SPINNER,
                    style(step_id).cyan(),
                    style(agent).dim()
                )
            }
        }
        RunEvent::StepOutput { step_id, chunk } => {
            format!("  {} {}", style(format!("[{}]", step_id)).dim(), chunk)
        }
        RunEvent::StepCompleted { result } => format_step_result(result),
        RunEvent::GateWaiting { step_id, message } => format!(
            "{} Gate before {}: {}",
            GATE,
            style(step_id).cyan(),
            message
        ),
        RunEvent::StepRecovering { step_id, handler } => format!(
            "{} {} failed, running recovery {}",
            INFO,
            style(step_id).red(),
            style(handler).cyan()
        ),
        RunEvent::PipelineCompleted { run_id, success } => {
            let status = if *success {
                style("succeeded").green().to_string()
            } else {
                style("failed").red().to_string()
            };
            format!(
                "{} Pipeline ({}) {}",
                INFO,
                style(&run_id.to_string()[..8]).dim(),
                status
            )
        }
    }
}

/// Format a single step result line
pub fn format_step_result(result: &StepResult) -> String {
    if result.skipped {
        let reason = result.skip_reason.as_deref().unwrap_or("skipped");
        format!(
            "{} {} ({})",
            INFO,
            style(&result.step_id).dim(),
            style(reason).dim()
        )
    } else if result.success {
        format!(
            "{} {} ({}ms)",
            CHECK,
            style(&result.step_id).green(),
            result.duration_ms
        )
    } else {
        let error = result.error.as_deref().unwrap_or("unknown error");
        format!(
            "{} {}: {}",
            CROSS,
            style(&result.step_id).red(),
            style(error).dim()
        )
    }
}
