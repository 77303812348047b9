use std::panic;
use std::time::Instant;

use anyhow::{Result, anyhow, bail};

use crate::core::ScanReport;
use crate::progress::{StagePlan, StagePosition};

pub const ANALYSIS_FAILED: &str = "Failed to scan URL. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Input,
    Scanning,
    Results,
}

#[derive(Debug, Clone)]
pub struct ScanInFlight {
    pub url: String,
    pub started_at: Instant,
    pub position: StagePosition,
}

#[derive(Debug, Clone)]
enum SessionState {
    Input,
    Scanning(ScanInFlight),
    Results(Box<ScanReport>),
}

/// Single holder of the user-visible scan state.
///
/// `Input --start_scan--> Scanning --complete_scan--> Results --reset--> Input`.
/// `tick` only moves the progress of the scan in flight.
#[derive(Debug, Clone)]
pub struct ScanSession {
    plan: StagePlan,
    state: SessionState,
    error: Option<String>,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new(StagePlan::default())
    }
}

impl ScanSession {
    pub fn new(plan: StagePlan) -> Self {
        Self {
            plan,
            state: SessionState::Input,
            error: None,
        }
    }

    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    pub fn phase(&self) -> ScanPhase {
        match self.state {
            SessionState::Input => ScanPhase::Input,
            SessionState::Scanning(_) => ScanPhase::Scanning,
            SessionState::Results(_) => ScanPhase::Results,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn in_flight(&self) -> Option<&ScanInFlight> {
        match &self.state {
            SessionState::Scanning(scan) => Some(scan),
            _ => None,
        }
    }

    pub fn report(&self) -> Option<&ScanReport> {
        match &self.state {
            SessionState::Results(report) => Some(report),
            _ => None,
        }
    }

    /// Validates `raw` and enters `Scanning`. A rejected URL leaves the
    /// session in `Input` with the message recorded.
    pub fn start_scan(&mut self, raw: &str) -> Result<()> {
        if self.phase() != ScanPhase::Input {
            bail!("a scan is already in progress or showing results; reset first");
        }
        let url = match crate::target::validate(raw) {
            Ok(url) => url,
            Err(err) => {
                self.error = Some(err.to_string());
                return Err(crate::exit::invalid_args_err(err));
            }
        };

        self.error = None;
        self.state = SessionState::Scanning(ScanInFlight {
            url,
            started_at: Instant::now(),
            position: self.plan.position(std::time::Duration::ZERO),
        });
        Ok(())
    }

    pub fn tick(&mut self, now: Instant) -> Option<StagePosition> {
        let plan = self.plan;
        let SessionState::Scanning(scan) = &mut self.state else {
            return None;
        };
        scan.position = plan.position(now.saturating_duration_since(scan.started_at));
        Some(scan.position)
    }

    /// Runs the analysis once and enters `Results`.
    pub fn complete_scan(&mut self) -> Result<&ScanReport> {
        let SessionState::Scanning(scan) = &self.state else {
            bail!("no scan in progress");
        };
        let url = scan.url.clone();
        let started_at = scan.started_at;

        let outcome = panic::catch_unwind(|| {
            let result = crate::rules::analyze_since(&url, started_at);
            let checks = crate::rules::checks(&url);
            ScanReport::new(result, checks)
        });

        match outcome {
            Ok(report) => {
                self.state = SessionState::Results(Box::new(report));
                self.report().ok_or_else(|| anyhow!(ANALYSIS_FAILED))
            }
            Err(_) => {
                self.state = SessionState::Input;
                self.error = Some(ANALYSIS_FAILED.to_string());
                Err(anyhow!(ANALYSIS_FAILED))
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = SessionState::Input;
        self.error = None;
    }
}
