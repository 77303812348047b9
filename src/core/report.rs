use crate::core::{ScanResult, SecurityCheck};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub schema_version: String,
    pub tool_version: String,
    pub result: ScanResult,
    pub checks: Vec<SecurityCheck>,
}

impl ScanReport {
    pub fn new(result: ScanResult, checks: Vec<SecurityCheck>) -> Self {
        Self {
            schema_version: "1.0".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            result,
            checks,
        }
    }
}
