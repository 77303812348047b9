use std::time::Duration;

pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStage {
    pub id: &'static str,
    pub name: &'static str,
    pub duration_ms: u64,
}

pub const SCAN_STAGES: &[ScanStage] = &[
    ScanStage {
        id: "analyzing",
        name: "Analyzing URL",
        duration_ms: 500,
    },
    ScanStage {
        id: "domain",
        name: "Checking Domain",
        duration_ms: 800,
    },
    ScanStage {
        id: "security",
        name: "Security Scan",
        duration_ms: 600,
    },
    ScanStage {
        id: "threats",
        name: "Threat Detection",
        duration_ms: 700,
    },
    ScanStage {
        id: "complete",
        name: "Generating Report",
        duration_ms: 400,
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagePosition {
    pub index: usize,
    pub stage: ScanStage,
    pub percent: f64,
}

impl StagePosition {
    pub fn is_complete(&self) -> bool {
        self.percent >= 100.0
    }
}

/// Maps elapsed time onto a list of weighted stages.
#[derive(Debug, Clone, Copy)]
pub struct StagePlan {
    stages: &'static [ScanStage],
    total_ms: u64,
}

impl Default for StagePlan {
    fn default() -> Self {
        Self::new(SCAN_STAGES)
    }
}

impl StagePlan {
    /// Panics if `stages` is empty.
    pub const fn new(stages: &'static [ScanStage]) -> Self {
        assert!(!stages.is_empty(), "a stage plan needs at least one stage");
        let mut total_ms = 0;
        let mut i = 0;
        while i < stages.len() {
            total_ms += stages[i].duration_ms;
            i += 1;
        }
        Self { stages, total_ms }
    }

    pub fn stages(&self) -> &'static [ScanStage] {
        self.stages
    }

    pub fn total(&self) -> Duration {
        Duration::from_millis(self.total_ms)
    }

    pub fn position(&self, elapsed: Duration) -> StagePosition {
        let last = self.stages.len().saturating_sub(1);
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        if self.total_ms == 0 || elapsed_ms >= self.total_ms {
            return StagePosition {
                index: last,
                stage: self.stages[last],
                percent: 100.0,
            };
        }

        let mut stage_end = 0u64;
        let mut index = last;
        for (i, stage) in self.stages.iter().enumerate() {
            stage_end += stage.duration_ms;
            if elapsed_ms < stage_end {
                index = i;
                break;
            }
        }

        let percent = (elapsed_ms as f64 / self.total_ms as f64 * 100.0).min(100.0);
        StagePosition {
            index,
            stage: self.stages[index],
            percent,
        }
    }
}
