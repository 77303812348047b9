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
    let uniq = format!("securecheck-report-md-test-{}-{seq}", std::process::id());
    let home = temp.join(uniq);
    let _ = std::fs::remove_dir_all(&home);
    std::fs::create_dir_all(&home).expect("create home");
    home
}

#[test]
fn markdown_report_has_all_sections() {
    let home = make_temp_home();
    let out = run(&home, &["report", "--markdown", "http://192.168.1.1/login.php"]);
    assert!(
        out.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    let md = String::from_utf8(out.stdout).expect("utf8");
    assert!(md.starts_with("# securecheck report\n"), "{md}");
    assert!(md.contains("- URL: `http://192.168.1.1/login.php`"));
    assert!(md.contains("## Security checks (4)"));
    assert!(md.contains("| HTTPS Encryption | failed |"));
    assert!(md.contains("## Threats ("));
    assert!(md.contains("## Recommendations"));
    assert!(!md.contains("_No threats detected._"));
}

#[test]
fn markdown_report_for_clean_url() {
    let home = make_temp_home();
    let out = run(&home, &["report", "--markdown", "https://www.wikipedia.org"]);
    assert!(out.status.success());

    let md = String::from_utf8(out.stdout).expect("utf8");
    assert!(md.contains("**LOW** (0/100)"), "{md}");
    assert!(md.contains("## Threats (0)"));
    assert!(md.contains("_No threats detected._"));
}

#[test]
fn json_wins_over_markdown() {
    let home = make_temp_home();
    let out = run(
        &home,
        &["--json", "report", "--markdown", "https://www.wikipedia.org"],
    );
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert_eq!(v["checks"].as_array().map(Vec::len), Some(4));
}
