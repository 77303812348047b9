mod check;
mod report;
mod result;
mod risk;

pub use check::{CheckStatus, SecurityCheck};
pub use report::ScanReport;
pub use result::ScanResult;
pub use risk::RiskLevel;
