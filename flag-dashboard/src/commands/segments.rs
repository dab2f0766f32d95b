use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use flag_overrides::api::AdminApi;
use flag_overrides::flag::SegmentOperation;
use tracing::info;

#[derive(Subcommand)]
pub enum SegmentsCommand {
    /// Print every segment override
    List,
    /// Force a key into a segment
    Add { segment: String, key: String },
    /// Force a key out of a segment
    Remove { segment: String, key: String },
    /// Drop the override of a key, so the upstream segment membership applies again
    Clear { segment: String, key: String },
}

pub async fn run(api: &dyn AdminApi, cmd: &SegmentsCommand) -> Result<()> {
    match cmd {
        SegmentsCommand::List => list(api).await,
        SegmentsCommand::Add { segment, key } => {
            save(api, segment, key, SegmentOperation::Add).await
        }
        SegmentsCommand::Remove { segment, key } => {
            save(api, segment, key, SegmentOperation::Remove).await
        }
        SegmentsCommand::Clear { segment, key } => {
            api.remove_segment_override(segment, key)
                .await
                .with_context(|| format!("Failed to clear override of '{key}' in '{segment}'"))?;
            info!(segment = %segment, key = %key, "segment override cleared");
            println!("Cleared the override of '{key}' in {}.", segment.bold());
            Ok(())
        }
    }
}

async fn list(api: &dyn AdminApi) -> Result<()> {
    let overrides = api
        .segment_overrides()
        .await
        .context("Failed to fetch segment overrides")?;

    if overrides.is_empty() {
        println!("No segment overrides.");
        return Ok(());
    }

    for (segment, keys) in &overrides {
        println!("{}", segment.bold());
        let pretty = serde_json::to_string_pretty(keys)?;
        for line in pretty.lines() {
            println!("  {line}");
        }
    }
    Ok(())
}

async fn save(
    api: &dyn AdminApi,
    segment: &str,
    key: &str,
    operation: SegmentOperation,
) -> Result<()> {
    api.save_segment_override(segment, key, operation)
        .await
        .with_context(|| format!("Failed to override '{key}' in '{segment}'"))?;
    info!(segment, key, ?operation, "segment override saved");

    let verb = match operation {
        SegmentOperation::Add => "added to",
        SegmentOperation::Remove => "removed from",
    };
    println!("'{key}' is now {verb} {}.", segment.bold());
    Ok(())
}
