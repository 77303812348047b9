use std::io;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use serde::Serialize;

use crate::core::{RiskLevel, ScanReport};
use crate::engine::{Engine, EngineOptions, ScanOutcome};
use crate::ui::UiConfig;

#[derive(Debug, Parser)]
#[command(
    name = "securecheck",
    version,
    about = "Scores how risky a URL looks from its structure alone, without contacting it"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Skip the staged progress animation.
    #[arg(long = "no-delay", global = true)]
    pub no_delay: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze a URL and print the full result.
    Scan(ScanArgs),
    /// Print only the four security checks for a URL.
    Checks(ChecksArgs),
    /// Print a shareable report for a URL.
    Report(ReportArgs),
    /// Interactive terminal UI.
    Ui(UiArgs),
    Completion(CompletionArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    pub url: String,
    /// Exit with code 3 when the risk level reaches this level.
    #[arg(long)]
    pub fail_on: Option<RiskLevel>,
}

#[derive(Debug, Args)]
pub struct ChecksArgs {
    pub url: String,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    pub url: String,
    #[arg(long)]
    pub markdown: bool,
}

#[derive(Debug, Args)]
pub struct UiArgs {}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let stdin_is_tty = io::stdin().is_terminal();
    let stdout_is_tty = io::stdout().is_terminal();
    let stderr_is_tty = io::stderr().is_terminal();

    let home_dir = crate::config::home_dir().map_err(crate::exit::invalid_args_err)?;

    let env_config_path = std::env::var_os("SECURECHECK_CONFIG").map(PathBuf::from);
    let cfg = crate::config::load(
        cli.config.as_deref().or(env_config_path.as_deref()),
        &home_dir,
    )
    .map_err(crate::exit::invalid_args_err)?;

    let color = stdout_is_tty && cfg.ui.color && !cli.no_color;

    let ui_cfg = UiConfig {
        color,
        stdin_is_tty,
        stdout_is_tty,
        stderr_is_tty,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    let is_ui_mode = matches!(&cli.command, Commands::Ui(_));
    let engine = Engine::new(
        EngineOptions {
            show_progress: ui_cfg.stderr_is_tty && !cli.quiet && !cli.json && !is_ui_mode,
            simulate_delay: cfg.scan.simulate_delay && !cli.no_delay,
            log_scans: cfg.log.enabled,
        },
        home_dir,
    );

    match cli.command {
        Commands::Scan(args) => {
            let outcome = engine.scan(&args.url, "scan")?;
            report_log_path(&outcome, &ui_cfg);
            let report = &outcome.report;
            if cli.json {
                write_json(report)?;
            } else {
                crate::ui::print_report(report, &ui_cfg);
            }

            if let Some(fail_on) = args.fail_on.or(cfg.scan.fail_on) {
                let level = report.result.risk_level;
                if level >= fail_on {
                    return Err(crate::exit::risk_threshold(format!(
                        "risk level {level} reached the --fail-on threshold ({fail_on})"
                    )));
                }
            }
        }
        Commands::Checks(args) => {
            let outcome = engine.scan(&args.url, "checks")?;
            report_log_path(&outcome, &ui_cfg);
            if cli.json {
                write_json(&outcome.report.checks)?;
            } else {
                crate::ui::print_checks(&outcome.report.checks, &ui_cfg);
            }
        }
        Commands::Report(args) => {
            let outcome = engine.scan(&args.url, "report")?;
            report_log_path(&outcome, &ui_cfg);
            if cli.json {
                write_json(&outcome.report)?;
            } else if args.markdown {
                write_markdown(&outcome.report)?;
            } else {
                crate::ui::print_report(&outcome.report, &ui_cfg);
            }
        }
        Commands::Ui(_args) => {
            if cli.json {
                return Err(crate::exit::invalid_args("ui cannot be combined with --json"));
            }
            if !(ui_cfg.stdin_is_tty && ui_cfg.stdout_is_tty) {
                return Err(crate::exit::invalid_args(
                    "ui requires a TTY (stdin + stdout)",
                ));
            }
            crate::tui::run(engine, ui_cfg.color)?;
        }
        Commands::Completion(args) => {
            let shell = parse_shell(&args.shell)?;
            let mut cmd = Cli::command();
            let mut out = std::io::stdout().lock();
            clap_complete::generate(shell, &mut cmd, "securecheck", &mut out);
        }
        Commands::Config(args) => {
            if args.show {
                if cli.json {
                    write_json(&cfg)?;
                } else {
                    println!("{}", toml::to_string_pretty(&cfg)?);
                }
            } else if !ui_cfg.quiet {
                eprintln!("config: use `securecheck config --show`");
            }
        }
    }

    Ok(())
}

fn report_log_path(outcome: &ScanOutcome, ui_cfg: &UiConfig) {
    if !ui_cfg.verbose {
        return;
    }
    if let Some(path) = &outcome.log_path {
        eprintln!("log: {}", path.display());
    }
}

fn write_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    use std::io::Write;

    let buf = serde_json::to_vec_pretty(value)?;

    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(&buf) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn write_markdown(report: &ScanReport) -> Result<()> {
    use std::io::Write;

    let markdown = format_markdown_report(report);
    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(markdown.as_bytes()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn format_markdown_report(report: &ScanReport) -> String {
    use std::fmt::Write as _;

    let result = &report.result;
    let mut out = String::new();

    let _ = writeln!(out, "# securecheck report");
    let _ = writeln!(out);
    let _ = writeln!(out, "- URL: `{}`", result.url);
    let _ = writeln!(
        out,
        "- Risk level: **{}** ({}/100)",
        result.risk_level.as_str().to_ascii_uppercase(),
        result.risk_score
    );
    let _ = writeln!(out, "- Assessment: {}", result.risk_level.description());
    let _ = writeln!(
        out,
        "- HTTPS: {}",
        if result.is_secure { "yes" } else { "no" }
    );
    let _ = writeln!(out, "- Scanned at: {}", result.scanned_at);
    let _ = writeln!(
        out,
        "- Scan duration: {}",
        crate::ui::format_duration_ms(result.scan_duration_ms)
    );
    let _ = writeln!(out, "- Tool version: {}", report.tool_version);

    let _ = writeln!(out);
    let _ = writeln!(out, "## Security checks ({})", report.checks.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "| Check | Status | Details |");
    let _ = writeln!(out, "|---|---|---|");
    for check in &report.checks {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            escape_table_cell(&check.name),
            check.status,
            escape_table_cell(&check.description)
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## Threats ({})", result.threats.len());
    let _ = writeln!(out);
    if result.threats.is_empty() {
        let _ = writeln!(out, "_No threats detected._");
    } else {
        for threat in &result.threats {
            let _ = writeln!(out, "- {threat}");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## Recommendations");
    let _ = writeln!(out);
    for rec in &result.recommendations {
        let _ = writeln!(out, "- {rec}");
    }

    out
}

fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

fn parse_shell(s: &str) -> Result<clap_complete::Shell> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "bash" => Ok(clap_complete::Shell::Bash),
        "zsh" => Ok(clap_complete::Shell::Zsh),
        "fish" => Ok(clap_complete::Shell::Fish),
        other => Err(crate::exit::invalid_args(format!(
            "unsupported shell: {other} (expected bash|zsh|fish)"
        ))),
    }
}
