//! Rendering of analysis summaries for the console and for files.

use anyhow::Context;
use std::fmt::{self, Write};
use std::fs;
use std::path::Path;

use crate::analyzer::report::StatisticsReport;
use crate::analyzer::task::AnalysisSummary;
use crate::analyzer::types::SizeBucket;

fn ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.6}", v),
        None => "n/a".to_string(),
    }
}

fn write_report<W: Write>(out: &mut W, report: &StatisticsReport) -> fmt::Result {
    writeln!(out, "{}_mean: {:.6}, 99th: {}", report.protocol_name, report.mean_fct, report.p99_fct)?;
    for p in &report.percentiles {
        writeln!(out, "  p{}: {}", (p.quantile * 100_000.0).round() / 1000.0, p.value)?;
    }
    writeln!(
        out,
        "  miss ratio: {}, small miss ratio: {}, medium miss ratio: {}, big miss ratio: {}",
        ratio(report.overall_miss_ratio),
        ratio(report.bucket_stats.small.miss_ratio),
        ratio(report.bucket_stats.medium.miss_ratio),
        ratio(report.bucket_stats.big.miss_ratio)
    )?;
    for bucket in SizeBucket::ALL {
        let stats = report.bucket_stats.get(bucket);
        writeln!(out, "  {} meet num: {}, {} num: {}", bucket, stats.meet, bucket, stats.observed)?;
    }
    writeln!(
        out,
        "  flows in window: {}, outside window: {}, parse errors: {}, missed deadlines: {}",
        report.events_in_window, report.events_outside_window, report.parse_error_count, report.missed_deadline_count
    )?;
    for missed in &report.missed_deadlines {
        writeln!(
            out,
            "    line {}: flow {} fct {} > deadline {} ({} bytes, {})",
            missed.line_number, missed.flow_id, missed.fct, missed.deadline, missed.size, missed.bucket
        )?;
    }
    let shown = report.missed_deadlines.len() as u64;
    if report.missed_deadline_count > shown {
        writeln!(out, "    ... {} more", report.missed_deadline_count - shown)?;
    }
    Ok(())
}

/// Write the human-readable summary, one block per protocol, failures last.
pub fn write_text<W: Write>(out: &mut W, summary: &AnalysisSummary) -> fmt::Result {
    for report in &summary.reports {
        write_report(out, report)?;
    }
    for failure in &summary.failures {
        writeln!(out, "{}: FAILED ({:?}): {}", failure.protocol_name, failure.kind, failure.message)?;
    }
    Ok(())
}

/// Human-readable summary as a string.
pub fn render_text(summary: &AnalysisSummary) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_text(&mut out, summary)?;
    Ok(out)
}

/// Pretty-printed JSON of the whole summary.
pub fn render_json(summary: &AnalysisSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}

/// Write the JSON summary to `path`.
pub fn write_json(summary: &AnalysisSummary, path: &Path) -> anyhow::Result<()> {
    let json = render_json(summary).context("Failed to serialize summary")?;
    fs::write(path, json + "\n").with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
