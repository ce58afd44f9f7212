use anyhow::{Context, Result};
use std::path::Path;

use zeitgeist::models::ContentItem;
use zeitgeist::trends::{DetectOptions, TrendManager, TrendReport};

/// Read a JSON array of content items
pub fn load_items(path: &Path) -> Result<Vec<ContentItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    let items: Vec<ContentItem> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse content items: {}", path.display()))?;

    Ok(items)
}

pub async fn detect(manager: &TrendManager, input: &Path, options: DetectOptions) -> Result<()> {
    let items = load_items(input)?;
    tracing::info!(items = items.len(), input = %input.display(), "Loaded content items");

    let report = manager.detect_trends(&items, &options).await;
    print_report(&report)?;

    if report.is_failed() {
        anyhow::bail!(
            "Trend detection failed: {}",
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

pub fn print_report(report: &TrendReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    println!("{json}");
    Ok(())
}
