use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::RiskLevel;

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub ui: UiConfig,
    pub scan: ScanConfig,
    pub log: LogConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiConfig {
    pub color: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanConfig {
    pub simulate_delay: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on: Option<RiskLevel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogConfig {
    pub enabled: bool,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            ui: UiConfig { color: true },
            scan: ScanConfig {
                simulate_delay: true,
                fail_on: None,
            },
            log: LogConfig { enabled: false },
            config_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    ui: Option<RawUiConfig>,
    scan: Option<RawScanConfig>,
    log: Option<RawLogConfig>,
}

#[derive(Debug, Deserialize)]
struct RawUiConfig {
    color: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawScanConfig {
    simulate_delay: Option<bool>,
    fail_on: Option<RiskLevel>,
}

#[derive(Debug, Deserialize)]
struct RawLogConfig {
    enabled: Option<bool>,
}

pub fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .context("HOME is not set")
}

pub fn default_config_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/securecheck/config.toml")
}

pub fn load(config_path: Option<&Path>, home_dir: &Path) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::default();

    let path = config_path
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| default_config_path(home_dir));

    if path.exists() {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&s).context("failed to parse config file (TOML)")?;
        apply_raw_config(&mut cfg, raw);
        cfg.config_path = Some(path.display().to_string());
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig) {
    if let Some(ui) = raw.ui {
        if let Some(color) = ui.color {
            cfg.ui.color = color;
        }
    }

    if let Some(scan) = raw.scan {
        if let Some(simulate_delay) = scan.simulate_delay {
            cfg.scan.simulate_delay = simulate_delay;
        }
        if let Some(fail_on) = scan.fail_on {
            cfg.scan.fail_on = Some(fail_on);
        }
    }

    if let Some(log) = raw.log {
        if let Some(enabled) = log.enabled {
            cfg.log.enabled = enabled;
        }
    }
}

fn apply_env_overrides(cfg: &mut EffectiveConfig) -> Result<()> {
    if let Ok(v) = std::env::var("SECURECHECK_UI_COLOR") {
        cfg.ui.color = parse_bool(&v).with_context(|| "SECURECHECK_UI_COLOR")?;
    }
    if let Ok(v) = std::env::var("SECURECHECK_SCAN_SIMULATE_DELAY") {
        cfg.scan.simulate_delay =
            parse_bool(&v).with_context(|| "SECURECHECK_SCAN_SIMULATE_DELAY")?;
    }
    if let Ok(v) = std::env::var("SECURECHECK_SCAN_FAIL_ON") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.scan.fail_on = Some(
                v.parse::<RiskLevel>()
                    .map_err(anyhow::Error::msg)
                    .with_context(|| "SECURECHECK_SCAN_FAIL_ON")?,
            );
        }
    }
    if let Ok(v) = std::env::var("SECURECHECK_LOG_ENABLED") {
        cfg.log.enabled = parse_bool(&v).with_context(|| "SECURECHECK_LOG_ENABLED")?;
    }

    Ok(())
}

fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!(
            "invalid boolean: {s} (expected true|false|1|0|yes|no|on|off)"
        )),
    }
}
