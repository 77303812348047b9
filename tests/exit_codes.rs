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
    let uniq = format!("securecheck-exit-test-{}-{seq}", std::process::id());
    let home = temp.join(uniq);
    let _ = std::fs::remove_dir_all(&home);
    std::fs::create_dir_all(&home).expect("create home");
    home
}

fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdirs");
    }
    std::fs::write(path, bytes).expect("write");
}

#[test]
fn clean_scan_exits_zero() {
    let home = make_temp_home();
    let out = run(&home, &["scan", "https://www.wikipedia.org"]);
    assert_eq!(
        out.status.code(),
        Some(0),
        "stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
}

#[test]
fn empty_url_is_invalid_args() {
    let home = make_temp_home();
    let out = run(&home, &["scan", ""]);
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty(), "no result may be printed");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Please enter a URL"), "stderr={stderr}");
    assert!(stderr.contains("check the URL"), "stderr={stderr}");
}

#[test]
fn non_http_scheme_is_invalid_args() {
    let home = make_temp_home();
    let out = run(&home, &["--json", "scan", "ftp://files.example.com/a.zip"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());
}

#[test]
fn fail_on_reached_exits_three_after_printing() {
    let home = make_temp_home();
    let out = run(
        &home,
        &["--json", "scan", "http://192.168.1.1/login.php", "--fail-on", "high"],
    );
    assert_eq!(out.status.code(), Some(3));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    let level = v["result"]["risk_level"].as_str().expect("risk_level");
    assert!(level == "high" || level == "critical", "level={level}");
}

#[test]
fn fail_on_not_reached_exits_zero() {
    let home = make_temp_home();
    let out = run(
        &home,
        &["scan", "https://www.wikipedia.org", "--fail-on", "medium"],
    );
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn unknown_fail_on_level_is_invalid_args() {
    let home = make_temp_home();
    let out = run(&home, &["scan", "https://example.com", "--fail-on", "severe"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn broken_config_is_invalid_args() {
    let home = make_temp_home();
    write_file(
        home.join(".config/securecheck/config.toml").as_path(),
        b"[scan\nfail_on = ",
    );
    let out = run(&home, &["scan", "https://example.com"]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("config file"), "stderr={stderr}");
    assert!(!stderr.contains("check the URL"), "stderr={stderr}");
}

#[test]
fn unsupported_completion_shell_is_invalid_args() {
    let home = make_temp_home();
    let out = run(&home, &["completion", "powershell"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn completion_for_bash_succeeds() {
    let home = make_temp_home();
    let out = run(&home, &["completion", "bash"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("securecheck"));
}

#[test]
fn ui_without_tty_is_invalid_args() {
    let home = make_temp_home();
    let out = run(&home, &["ui"]);
    assert_eq!(out.status.code(), Some(2));

    let out = run(&home, &["--json", "ui"]);
    assert_eq!(out.status.code(), Some(2));
}
