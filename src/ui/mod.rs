use anyhow::Error;
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

use crate::core::{CheckStatus, RiskLevel, ScanReport, SecurityCheck};
use crate::exit::{ExitCode, exit_code};
use crate::target::InvalidUrl;

const SCORE_BAR_WIDTH: usize = 20;

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub color: bool,
    pub stdin_is_tty: bool,
    pub stdout_is_tty: bool,
    pub stderr_is_tty: bool,
    pub quiet: bool,
    pub verbose: bool,
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "next:");
    for hint in next_hints(err) {
        let _ = writeln!(stderr, "  - {hint}");
    }
}

fn next_hints(err: &Error) -> Vec<&'static str> {
    let mut hints = Vec::new();
    if err.chain().any(|cause| cause.is::<InvalidUrl>()) {
        hints.push("check the URL (scheme and host, e.g. https://example.com)");
    } else if exit_code(err) == ExitCode::InvalidArgs.as_i32() {
        hints.push(
            "check the arguments, the config file and SECURECHECK_* environment variables",
        );
    }
    hints.push("see `securecheck --help` for commands and options");
    hints
}

pub fn print_report(report: &ScanReport, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }

    let result = &report.result;
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "URL:        {}", result.url);
    let _ = writeln!(
        out,
        "Risk:       {}  {}/100  {}",
        format_risk(result.risk_level, cfg.color),
        result.risk_score,
        score_bar(result.risk_score)
    );
    let _ = writeln!(out, "            {}", result.risk_level.description());
    if cfg.verbose {
        let (lo, hi) = result.risk_level.score_bounds();
        let _ = writeln!(out, "            bucket: {lo}-{hi}");
    }
    let _ = writeln!(
        out,
        "HTTPS:      {}",
        if result.is_secure { "yes" } else { "no" }
    );
    let _ = writeln!(
        out,
        "Scanned at: {} ({})",
        result.scanned_at,
        format_duration_ms(result.scan_duration_ms)
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "Security checks:");
    print_checks_table(&mut out, &report.checks, cfg.color);

    let _ = writeln!(out);
    if result.threats.is_empty() {
        let _ = writeln!(out, "Threats: none detected");
    } else {
        let _ = writeln!(out, "Threats ({}):", result.threats.len());
        for threat in &result.threats {
            let _ = writeln!(out, "- {threat}");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Recommendations:");
    for rec in &result.recommendations {
        let _ = writeln!(out, "- {rec}");
    }
}

pub fn print_checks(checks: &[SecurityCheck], cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    print_checks_table(&mut out, checks, cfg.color);
}

fn print_checks_table(out: &mut dyn Write, checks: &[SecurityCheck], color: bool) {
    let label_status = "Status";
    let label_name = "Check";
    let label_desc = "Description";

    let status_w = checks
        .iter()
        .map(|c| visible_width_ansi(c.status.as_str()))
        .max()
        .unwrap_or(0)
        .max(visible_width_ansi(label_status));
    let name_w = checks
        .iter()
        .map(|c| visible_width_ansi(&c.name))
        .max()
        .unwrap_or(0)
        .max(visible_width_ansi(label_name));

    let _ = writeln!(
        out,
        "{}  {}  {}",
        pad_end_ansi(label_status, status_w),
        pad_end_ansi(label_name, name_w),
        label_desc
    );
    let _ = writeln!(
        out,
        "{}  {}  {}",
        "-".repeat(status_w),
        "-".repeat(name_w),
        "-".repeat(visible_width_ansi(label_desc))
    );
    for check in checks {
        let status = pad_end_ansi(&format_status(check.status, color), status_w);
        let name = pad_end_ansi(&check.name, name_w);
        let _ = writeln!(out, "{status}  {name}  {}", check.description);
    }
}

pub fn format_risk(risk: RiskLevel, color: bool) -> String {
    let s = risk.as_str().to_ascii_uppercase();
    if !color {
        return s;
    }

    let code = match risk {
        RiskLevel::Low => "32",
        RiskLevel::Medium => "33",
        RiskLevel::High => "38;5;208",
        RiskLevel::Critical => "31",
    };
    format!("\x1b[{code}m{s}\x1b[0m")
}

pub fn format_status(status: CheckStatus, color: bool) -> String {
    let s = status.as_str();
    if !color {
        return s.to_string();
    }

    let code = match status {
        CheckStatus::Passed => "32",
        CheckStatus::Warning => "33",
        CheckStatus::Failed => "31",
    };
    format!("\x1b[{code}m{s}\x1b[0m")
}

pub fn score_bar(score: u8) -> String {
    let filled = (usize::from(score.min(100)) * SCORE_BAR_WIDTH + 50) / 100;
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(SCORE_BAR_WIDTH - filled)
    )
}

pub fn format_duration_ms(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}

pub fn pad_end_ansi(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn visible_width_ansi(s: &str) -> usize {
    let mut width: usize = 0;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            let _ = chars.next();
            for ch2 in chars.by_ref() {
                if ch2 == 'm' {
                    break;
                }
            }
            continue;
        }
        width = width.saturating_add(UnicodeWidthChar::width(ch).unwrap_or(0));
    }
    width
}
