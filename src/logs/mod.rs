use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::{CheckStatus, ScanReport};

#[derive(Debug, Serialize)]
struct ScanLog<'a> {
    schema_version: &'static str,
    tool_version: String,
    command: &'static str,
    started_at: String,
    finished_at: String,
    url: &'a str,
    risk_level: String,
    risk_score: u8,
    threat_count: usize,
    checks: Vec<ScanLogCheck<'a>>,
}

#[derive(Debug, Serialize)]
struct ScanLogCheck<'a> {
    name: &'a str,
    status: CheckStatus,
}

pub fn logs_dir(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/securecheck/logs")
}

pub fn write_scan_log(
    home_dir: &Path,
    command: &'static str,
    started_at: OffsetDateTime,
    finished_at: OffsetDateTime,
    report: &ScanReport,
) -> Result<PathBuf> {
    let dir = logs_dir(home_dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let pid = std::process::id();
    let ts = finished_at.unix_timestamp_nanos();
    let path = dir.join(format!("scan-{pid}-{ts}.json"));

    let log = ScanLog {
        schema_version: "1.0",
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        command,
        started_at: format_ts(started_at),
        finished_at: format_ts(finished_at),
        url: &report.result.url,
        risk_level: report.result.risk_level.to_string(),
        risk_score: report.result.risk_score,
        threat_count: report.result.threats.len(),
        checks: report
            .checks
            .iter()
            .map(|c| ScanLogCheck {
                name: &c.name,
                status: c.status,
            })
            .collect(),
    };

    let buf = serde_json::to_vec_pretty(&log).context("failed to serialize scan log (JSON)")?;
    std::fs::write(&path, buf)
        .with_context(|| format!("failed to write scan log: {}", path.display()))?;
    Ok(path)
}

fn format_ts(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}
