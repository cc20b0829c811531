//! Run summary generation.
//!
//! This module renders the collected section reports as plain text or
//! JSON.

use crate::cli::OutputFormat;
use crate::models::{RunMetadata, RunReport, SectionReport};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Generate the plain-text summary.
pub fn generate_text_report(report: &RunReport) -> String {
    let mut output = String::new();

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table(&report.sections));

    for section in &report.sections {
        output.push_str(&generate_section_details(section));
    }

    output.push_str(&format!(
        "\n{} of {} sections succeeded, {} failed units\n",
        report.successful_sections(),
        report.sections.len(),
        report.total_failures()
    ));

    output
}

/// Generate the metadata header.
fn generate_metadata_section(metadata: &RunMetadata) -> String {
    let mut section = String::new();

    section.push_str("📊 Run Summary\n");
    section.push_str(&format!("   Version: {}\n", metadata.version));
    section.push_str(&format!(
        "   Started: {}\n",
        metadata.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("   Duration: {:.1}s\n\n", metadata.duration_seconds));

    section
}

/// Generate the one-line-per-section table.
fn generate_table(sections: &[SectionReport]) -> String {
    let mut table = String::new();

    table.push_str(&format!(
        "   {:<12} {:<24} {:>6} {:>8} {:>8} {:>10}\n",
        "section", "mode", "inputs", "results", "failed", "time"
    ));

    for section in sections {
        let status = if section.succeeded() { "✅" } else { "❌" };
        table.push_str(&format!(
            "{} {:<12} {:<24} {:>6} {:>8} {:>8} {:>8}ms\n",
            status,
            section.name,
            section.mode.to_string(),
            section.inputs,
            section.results.len(),
            section.failures.len(),
            section.duration_ms
        ));
    }

    table
}

/// Generate failure details for one section. Empty when it succeeded.
fn generate_section_details(section: &SectionReport) -> String {
    if section.succeeded() {
        return String::new();
    }

    let mut details = String::new();
    details.push_str(&format!("\n   {}:\n", section.name));

    if let Some(ref error) = section.error {
        details.push_str(&format!("     error: {}\n", error));
    }

    for failure in &section.failures {
        details.push_str(&format!(
            "     unit {} ({}): {}\n",
            failure.item.index, failure.item.id, failure.error
        ));
    }

    details
}

/// Generate a JSON report.
pub fn generate_json_report(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Render the report in the requested format.
pub fn render(report: &RunReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(generate_text_report(report)),
        OutputFormat::Json => generate_json_report(report),
    }
}

/// Write the rendered report to a file.
pub fn write_report(report: &RunReport, format: OutputFormat, path: &Path) -> Result<()> {
    let content = render(report, format)?;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(())
}
