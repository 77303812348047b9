use crate::core::RiskLevel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub url: String,
    pub is_secure: bool,
    pub risk_level: RiskLevel,
    pub risk_score: u8,
    pub threats: Vec<String>,
    pub recommendations: Vec<String>,
    pub scanned_at: String,
    pub scan_duration_ms: u64,
}
