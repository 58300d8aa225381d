//! Command implementations

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::adapters::toml_config::ConfigFile;
use crate::app::container::{AppContainer, DefaultAppContainer};
use crate::app::{InspectRequest, MarkRequest, ReportFormat, VerifyRequest};
use crate::cli::args::{InspectArgs, MarkArgs, VerifyArgs};
use crate::engine::{AbortFlag, RunSummary};
use crate::utils::time::frame_to_timestamp;

fn format_for(json: bool) -> ReportFormat {
    if json {
        ReportFormat::Json
    } else {
        ReportFormat::Text
    }
}

/// Execute the mark command
pub fn mark(args: MarkArgs, config: &ConfigFile) -> Result<()> {
    info!("Starting mark operation");
    info!("Recording: {}", args.recording.display());

    let container = DefaultAppContainer::new(config.admark.clone(), AbortFlag::new());
    let request = MarkRequest {
        recording_dir: args.recording.clone(),
        marks_path: args.marks.clone(),
        frame_index_path: args.frames.clone(),
    };
    let summary = container
        .mark_interactor()
        .execute(&request)
        .with_context(|| format!("Failed to mark {}", args.recording.display()))?;

    if summary.aborted {
        warn!("Processing was aborted");
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render_summary(&summary));
    }

    info!("Mark operation completed successfully");
    Ok(())
}

fn render_summary(summary: &RunSummary) -> String {
    let mut output = String::new();
    let passes: Vec<String> = summary.passes.iter().map(|p| p.to_string()).collect();
    output.push_str(&format!("Completed: {}\n", passes.join(", ")));
    output.push_str(&format!("Marks: {}{}\n", summary.marks.len(), if summary.saved { " (saved)" } else { "" }));
    for mark in &summary.marks {
        output.push_str(&format!(
            "{} ({:>7}) {:<16} {}\n",
            frame_to_timestamp(mark.position, summary.fps),
            mark.position,
            mark.mark_type.code(),
            mark.comment.as_deref().unwrap_or("")
        ));
    }
    output
}

/// Execute the inspect command
pub fn inspect(args: InspectArgs, config: &ConfigFile) -> Result<()> {
    info!("Starting inspect operation");
    let container = DefaultAppContainer::new(config.admark.clone(), AbortFlag::new());
    let request = InspectRequest {
        recording_dir: args.recording.clone(),
        marks_path: args.marks,
        format: format_for(args.json),
    };
    let response = container
        .inspect_interactor()
        .execute(&request)
        .with_context(|| format!("Failed to inspect {}", args.recording.display()))?;
    print!("{}", response.summary);
    if request.format == ReportFormat::Json {
        println!();
    }
    Ok(())
}

/// Execute the verify command
pub fn verify(args: VerifyArgs, config: &ConfigFile) -> Result<()> {
    info!("Starting verify operation");
    let container = DefaultAppContainer::new(config.admark.clone(), AbortFlag::new());
    let request = VerifyRequest {
        recording_dir: args.recording.clone(),
        marks_path: args.marks,
        full_decode: config.admark.full_decode,
        format: format_for(args.json),
    };
    let response = container
        .verify_interactor()
        .execute(&request)
        .with_context(|| format!("Mark sequence of {} is not usable", args.recording.display()))?;
    print!("{}", response.summary);
    if request.format == ReportFormat::Json {
        println!();
    }
    Ok(())
}
