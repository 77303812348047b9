use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};

fn securecheck_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_securecheck"));
    cmd.env("HOME", home);
    cmd.env_remove("SECURECHECK_CONFIG");
    cmd.env_remove("SECURECHECK_UI_COLOR");
    cmd.env_remove("SECURECHECK_SCAN_SIMULATE_DELAY");
    cmd.env_remove("SECURECHECK_SCAN_FAIL_ON");
    cmd.env_remove("SECURECHECK_LOG_ENABLED");
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    securecheck_cmd(home)
        .args(args)
        .output()
        .expect("run securecheck")
}

fn make_temp_home() -> PathBuf {
    static HOME_SEQ: AtomicU64 = AtomicU64::new(0);

    let temp = std::env::temp_dir();
    let seq = HOME_SEQ.fetch_add(1, Ordering::Relaxed);
    let uniq = format!("securecheck-scan-json-test-{}-{seq}", std::process::id());
    let home = temp.join(uniq);
    let _ = std::fs::remove_dir_all(&home);
    std::fs::create_dir_all(&home).expect("create home");
    home
}

fn scan_json(home: &Path, url: &str) -> serde_json::Value {
    let out = run(home, &["--json", "scan", url]);
    assert!(
        out.status.success(),
        "url={url} stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("parse json")
}

fn strings(v: &serde_json::Value) -> Vec<String> {
    v.as_array()
        .expect("array")
        .iter()
        .map(|s| s.as_str().expect("string").to_string())
        .collect()
}

#[test]
fn plain_http_ip_login_page_is_high_risk() {
    let home = make_temp_home();
    let v = scan_json(&home, "http://192.168.1.1/login.php");

    assert_eq!(v["schema_version"].as_str(), Some("1.0"));
    let result = &v["result"];
    assert_eq!(result["url"].as_str(), Some("http://192.168.1.1/login.php"));
    assert_eq!(result["is_secure"].as_bool(), Some(false));
    let level = result["risk_level"].as_str().expect("risk_level");
    assert!(level == "high" || level == "critical", "level={level}");
    let score = result["risk_score"].as_u64().expect("risk_score");
    assert!((50..=100).contains(&score), "score={score}");

    let threats = strings(&result["threats"]);
    assert!(threats.iter().any(|t| t.contains("HTTPS")), "{threats:?}");
    assert!(threats.iter().any(|t| t.contains("IP address")), "{threats:?}");
    assert!(!strings(&result["recommendations"]).is_empty());
    assert!(result["scanned_at"].as_str().is_some_and(|s| !s.is_empty()));
    assert!(result["scan_duration_ms"].as_u64().is_some());
}

#[test]
fn well_known_https_site_is_low_risk() {
    let home = make_temp_home();
    let v = scan_json(&home, "https://www.wikipedia.org");

    let result = &v["result"];
    assert_eq!(result["is_secure"].as_bool(), Some(true));
    assert_eq!(result["risk_level"].as_str(), Some("low"));
    assert_eq!(result["risk_score"].as_u64(), Some(0));
    assert!(strings(&result["threats"]).is_empty());
    assert_eq!(strings(&result["recommendations"]).len(), 1);
}

#[test]
fn scheme_less_input_is_normalized_to_https() {
    let home = make_temp_home();
    let v = scan_json(&home, "example.com");
    assert_eq!(v["result"]["url"].as_str(), Some("https://example.com"));
    assert_eq!(v["result"]["is_secure"].as_bool(), Some(true));
}

#[test]
fn checks_command_prints_four_checks_in_fixed_order() {
    let home = make_temp_home();
    let out = run(&home, &["--json", "checks", "http://192.168.1.1/login.php"]);
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    let checks = v.as_array().expect("array");
    let names: Vec<&str> = checks
        .iter()
        .map(|c| c["name"].as_str().expect("name"))
        .collect();
    assert_eq!(
        names,
        [
            "HTTPS Encryption",
            "Domain Reputation",
            "Suspicious Patterns",
            "Redirect Chain"
        ]
    );
    assert_eq!(checks[0]["status"].as_str(), Some("failed"));
    assert_eq!(checks[1]["status"].as_str(), Some("failed"));
    for check in checks {
        let status = check["status"].as_str().expect("status");
        assert!(["passed", "warning", "failed"].contains(&status));
        assert!(check["description"].as_str().is_some_and(|d| !d.is_empty()));
    }
}

#[test]
fn repeated_scans_agree() {
    let home = make_temp_home();
    let url = "http://paypa1-secure-login.tk/verify?next=https://evil.example";
    let a = scan_json(&home, url);
    let b = scan_json(&home, url);
    for key in ["risk_score", "risk_level", "threats", "recommendations"] {
        assert_eq!(a["result"][key], b["result"][key], "key={key}");
    }
    assert_eq!(a["checks"], b["checks"]);
}

#[test]
fn text_output_shows_risk_and_checks() {
    let home = make_temp_home();
    let out = run(&home, &["--no-color", "scan", "http://192.168.1.1/login.php"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("HTTPS Encryption"), "{stdout}");
    assert!(stdout.contains("Threats ("), "{stdout}");
    assert!(!stdout.contains('\x1b'), "no ANSI codes when not a TTY");
}

#[test]
fn quiet_suppresses_text_output() {
    let home = make_temp_home();
    let out = run(&home, &["--quiet", "scan", "https://www.wikipedia.org"]);
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
}
