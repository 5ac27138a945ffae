// Report rendering for scan results

use crate::scan::extract_url_path;
use colored::Colorize;
use deadlink_scanner::{LinkOutcome, LinkStatus, ScanResult, Termination};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub scans: usize,
    pub links_checked: usize,
    pub alive: usize,
    pub broken: usize,
    pub dropped_links: usize,
    pub timed_out: usize,
}

impl ReportSummary {
    pub fn from_results(results: &[ScanResult]) -> Self {
        let links_checked = results.iter().map(|r| r.outcomes.len()).sum();
        let broken = results.iter().map(|r| r.broken().count()).sum();

        Self {
            scans: results.len(),
            links_checked,
            alive: links_checked - broken,
            broken,
            dropped_links: results.iter().map(|r| r.dropped_links).sum(),
            timed_out: results
                .iter()
                .filter(|r| r.termination == Termination::DeadlineExceeded)
                .count(),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: ReportSummary,
    scans: &'a [ScanResult],
}

pub fn render_report(results: &[ScanResult], format: ReportFormat) -> Result<String, String> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(results)),
        ReportFormat::Json => generate_json_report(results),
        ReportFormat::Csv => Ok(generate_csv_report(results)),
        ReportFormat::Markdown => Ok(generate_markdown_report(results)),
    }
}

pub fn write_report(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// Broken links first, then by URL.
fn sorted_outcomes(result: &ScanResult) -> Vec<&LinkOutcome> {
    let mut outcomes: Vec<&LinkOutcome> = result.outcomes.iter().collect();
    outcomes.sort_by(|a, b| {
        a.status
            .is_alive()
            .cmp(&b.status.is_alive())
            .then_with(|| a.url.cmp(&b.url))
    });
    outcomes
}

fn colored_status(status: &LinkStatus) -> String {
    let label = status.to_string();
    match status {
        LinkStatus::Alive => label.green().to_string(),
        LinkStatus::Redirect { .. } => label.cyan().to_string(),
        LinkStatus::NotFound | LinkStatus::ClientError { .. } => label.yellow().to_string(),
        LinkStatus::ServerError { .. } | LinkStatus::TooManyRedirects | LinkStatus::Dead => {
            label.red().to_string()
        }
    }
}

pub fn generate_text_report(results: &[ScanResult]) -> String {
    let summary = ReportSummary::from_results(results);
    let mut report = String::new();

    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Sites scanned: {}\n", summary.scans));
    report.push_str(&format!("  Links checked: {}\n", summary.links_checked));
    report.push_str(&format!("  Alive: {}\n", summary.alive));
    report.push_str(&format!("  Broken: {}\n", summary.broken));
    if summary.dropped_links > 0 {
        report.push_str(&format!(
            "  Skipped (queue full): {}\n",
            summary.dropped_links
        ));
    }
    if summary.timed_out > 0 {
        report.push_str(&format!("  Timed out: {}\n", summary.timed_out));
    }
    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    for result in results {
        report.push_str(&format!("## {}\n", result.seed_url));
        let suffix = match result.termination {
            Termination::Completed => String::new(),
            Termination::DeadlineExceeded => " (partial, deadline exceeded)".to_string(),
        };
        report.push_str(&format!(
            "  {} links checked{}\n\n",
            result.outcomes.len(),
            suffix
        ));

        for outcome in sorted_outcomes(result) {
            let mut line = format!(
                "  {} {}",
                colored_status(&outcome.status),
                extract_url_path(&outcome.url)
            );
            if let Some(ref error) = outcome.error {
                line.push_str(&format!(" {}", error.bright_black()));
            }
            report.push_str(&line);
            report.push('\n');
        }
        report.push('\n');
    }

    report
}

pub fn generate_json_report(results: &[ScanResult]) -> Result<String, String> {
    let report = JsonReport {
        summary: ReportSummary::from_results(results),
        scans: results,
    };
    serde_json::to_string_pretty(&report).map_err(|e| format!("Failed to serialize report: {}", e))
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn generate_csv_report(results: &[ScanResult]) -> String {
    let mut report = String::from("seed_url,link_url,status,status_code,depth,error\n");

    for result in results {
        for outcome in sorted_outcomes(result) {
            report.push_str(&format!(
                "{},{},{},{},{},{}\n",
                csv_field(&result.seed_url),
                csv_field(&outcome.url),
                outcome.status.as_str(),
                outcome
                    .status_code
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
                outcome.depth,
                csv_field(outcome.error.as_deref().unwrap_or("")),
            ));
        }
    }

    report
}

pub fn generate_markdown_report(results: &[ScanResult]) -> String {
    let summary = ReportSummary::from_results(results);
    let mut report = String::from("# Dead Link Report\n\n");

    report.push_str("| Metric | Count |\n|---|---|\n");
    report.push_str(&format!("| Sites scanned | {} |\n", summary.scans));
    report.push_str(&format!("| Links checked | {} |\n", summary.links_checked));
    report.push_str(&format!("| Alive | {} |\n", summary.alive));
    report.push_str(&format!("| Broken | {} |\n\n", summary.broken));

    for result in results {
        report.push_str(&format!("## {}\n\n", result.seed_url));
        if result.termination == Termination::DeadlineExceeded {
            report.push_str("_Partial result: the scan deadline was exceeded._\n\n");
        }
        report.push_str("| Status | Link | Depth |\n|---|---|---|\n");
        for outcome in sorted_outcomes(result) {
            report.push_str(&format!(
                "| {} | {} | {} |\n",
                outcome.status,
                outcome.url.replace('|', "\\|"),
                outcome.depth
            ));
        }
        report.push('\n');
    }

    report
}
