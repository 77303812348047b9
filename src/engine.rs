use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use time::OffsetDateTime;

use crate::core::ScanReport;
use crate::exit::{ExitCode, ExitError};
use crate::progress::TICK_INTERVAL;
use crate::session::ScanSession;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub show_progress: bool,
    pub simulate_delay: bool,
    pub log_scans: bool,
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub report: ScanReport,
    pub log_path: Option<PathBuf>,
}

#[derive(Clone)]
pub struct Engine {
    opts: EngineOptions,
    home_dir: PathBuf,
}

impl Engine {
    pub fn new(opts: EngineOptions, home_dir: PathBuf) -> Self {
        Self { opts, home_dir }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.opts
    }

    /// Validates, plays the stage animation when visible, and analyzes `raw` once.
    pub fn scan(&self, raw: &str, command: &'static str) -> Result<ScanOutcome> {
        let started_at = OffsetDateTime::now_utc();
        let mut session = ScanSession::default();
        session.start_scan(raw)?;

        use std::io::IsTerminal;
        let progress_enabled =
            self.opts.show_progress && self.opts.simulate_delay && std::io::stderr().is_terminal();
        if progress_enabled {
            play_stages(&mut session);
        }

        let report = session
            .complete_scan()
            .map_err(|err| anyhow::Error::from(ExitError::new(ExitCode::ScanFailed, err)))?
            .clone();

        let log_path = self.record(command, started_at, &report)?;
        Ok(ScanOutcome { report, log_path })
    }

    /// Writes the scan log when logging is enabled; `None` otherwise.
    pub fn record(
        &self,
        command: &'static str,
        started_at: OffsetDateTime,
        report: &ScanReport,
    ) -> Result<Option<PathBuf>> {
        if !self.opts.log_scans {
            return Ok(None);
        }
        let finished_at = OffsetDateTime::now_utc();
        let path =
            crate::logs::write_scan_log(&self.home_dir, command, started_at, finished_at, report)
                .context("scan finished, but writing the scan log failed")?;
        Ok(Some(path))
    }
}

fn play_stages(session: &mut ScanSession) {
    let pb = indicatif::ProgressBar::new(100);
    pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    if let Ok(style) =
        indicatif::ProgressStyle::with_template("{spinner} [{bar:30}] {pos:>3}% {msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }

    loop {
        std::thread::sleep(TICK_INTERVAL);
        let Some(pos) = session.tick(Instant::now()) else {
            break;
        };
        pb.set_position(pos.percent.round() as u64);
        pb.set_message(pos.stage.name);
        if pos.is_complete() {
            break;
        }
    }

    pb.finish_and_clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RiskLevel;

    fn engine() -> Engine {
        Engine::new(
            EngineOptions {
                show_progress: false,
                simulate_delay: true,
                log_scans: false,
            },
            std::env::temp_dir(),
        )
    }

    #[test]
    fn scan_without_visible_progress_returns_immediately() {
        let started = Instant::now();
        let outcome = engine().scan("https://www.wikipedia.org", "scan").expect("scan");
        assert!(started.elapsed() < crate::progress::StagePlan::default().total());
        assert_eq!(outcome.report.result.risk_level, RiskLevel::Low);
        assert_eq!(outcome.report.schema_version, "1.0");
        assert!(outcome.log_path.is_none());
    }

    #[test]
    fn scan_rejects_invalid_url_with_invalid_args() {
        let err = engine().scan("", "scan").expect_err("empty url");
        assert_eq!(crate::exit::exit_code(&err), 2);
    }
}
