use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bucketed view of a 0–100 risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Scores above 100 land in `Critical`; callers clamp before bucketing.
    pub const fn from_score(score: u8) -> Self {
        match score {
            0..=24 => RiskLevel::Low,
            25..=49 => RiskLevel::Medium,
            50..=74 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    /// Inclusive score bounds of the bucket.
    pub const fn score_bounds(self) -> (u8, u8) {
        match self {
            RiskLevel::Low => (0, 24),
            RiskLevel::Medium => (25, 49),
            RiskLevel::High => (50, 74),
            RiskLevel::Critical => (75, 100),
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            RiskLevel::Low => "This URL appears to be safe to visit",
            RiskLevel::Medium => "This URL shows some warning signs - proceed with caution",
            RiskLevel::High => "This URL has multiple risk factors - avoid if possible",
            RiskLevel::Critical => "This URL is likely dangerous - do not visit",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            _ => Err(format!(
                "invalid risk level: {s} (expected low|medium|high|critical)"
            )),
        }
    }
}
