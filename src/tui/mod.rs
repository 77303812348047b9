use std::io;
use std::panic;
use std::time::Instant;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap};
use time::OffsetDateTime;
use unicode_width::UnicodeWidthChar;

use crate::core::{CheckStatus, RiskLevel, ScanReport};
use crate::engine::Engine;
use crate::progress::{StagePosition, TICK_INTERVAL};
use crate::session::{ScanPhase, ScanSession};

pub fn run(engine: Engine, color: bool) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter the alternate screen")?;

    let mut tui = Tui {
        terminal: Terminal::new(CrosstermBackend::new(stdout))
            .context("failed to initialize the terminal")?,
    };
    tui.terminal.clear().ok();

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        run_app(&mut tui.terminal, &engine, color)
    }));

    let _ = tui.terminal.show_cursor();
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen);

    match res {
        Ok(res) => res,
        Err(_) => Err(anyhow::anyhow!(
            "the UI panicked (the terminal state should have been restored)"
        )),
    }
}

struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Input,
    Scanning,
    Results,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageMark {
    Done,
    Active,
    Pending,
}

struct App {
    session: ScanSession,
    input: String,
    color: bool,
    simulate_delay: bool,
    show_help: bool,
    results_scroll: u16,
    tick: u64,
    scan_started_at: Option<OffsetDateTime>,
    status: Option<String>,
}

impl App {
    fn new(color: bool, simulate_delay: bool) -> Self {
        Self {
            session: ScanSession::default(),
            input: String::new(),
            color,
            simulate_delay,
            show_help: false,
            results_scroll: 0,
            tick: 0,
            scan_started_at: None,
            status: None,
        }
    }

    fn screen(&self) -> Screen {
        if self.show_help {
            return Screen::Help;
        }
        match self.session.phase() {
            ScanPhase::Input => Screen::Input,
            ScanPhase::Scanning => Screen::Scanning,
            ScanPhase::Results => Screen::Results,
        }
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    engine: &Engine,
    color: bool,
) -> Result<()> {
    let mut app = App::new(color, engine.options().simulate_delay);

    let tick_rate = TICK_INTERVAL;
    let mut last_tick = Instant::now();

    loop {
        advance(&mut app, engine, Instant::now());
        terminal.draw(|f| draw(f, &mut app)).context("failed to draw")?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).context("failed to poll terminal events")? {
            match event::read().context("failed to read a terminal event")? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Press && handle_key(&mut app, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick = app.tick.wrapping_add(1);
            last_tick = Instant::now();
        }
    }

    Ok(())
}

/// Moves the scan in flight forward; finishes it once the stages have played
/// out, or right away when the delay is off.
fn advance(app: &mut App, engine: &Engine, now: Instant) {
    if app.session.phase() != ScanPhase::Scanning {
        return;
    }
    let position = app.session.tick(now);
    let done = !app.simulate_delay || position.is_some_and(|p| p.is_complete());
    if !done {
        return;
    }

    let Ok(report) = app.session.complete_scan().cloned() else {
        // The session already holds the retry message and is back on input.
        return;
    };
    app.results_scroll = 0;
    let started_at = app
        .scan_started_at
        .take()
        .unwrap_or_else(OffsetDateTime::now_utc);
    app.status = match engine.record("ui", started_at, &report) {
        Ok(Some(path)) => Some(format!("log: {}", path.display())),
        Ok(None) => None,
        Err(err) => Some(format!("{err:#}")),
    };
}

/// Returns `true` when the UI should quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    match app.screen() {
        Screen::Help => {
            app.show_help = false;
            false
        }
        Screen::Input => handle_input_key(app, key),
        Screen::Scanning => matches!(key.code, KeyCode::Char('q') | KeyCode::Esc),
        Screen::Results => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => true,
            KeyCode::Enter | KeyCode::Char('n') => {
                app.session.reset();
                app.results_scroll = 0;
                app.status = None;
                false
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.results_scroll = app.results_scroll.saturating_add(1);
                false
            }
            KeyCode::Up | KeyCode::Char('k') => {
                app.results_scroll = app.results_scroll.saturating_sub(1);
                false
            }
            KeyCode::PageDown => {
                app.results_scroll = app.results_scroll.saturating_add(10);
                false
            }
            KeyCode::PageUp => {
                app.results_scroll = app.results_scroll.saturating_sub(10);
                false
            }
            KeyCode::Char('?') => {
                app.show_help = true;
                false
            }
            _ => false,
        },
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('u') {
            app.input.clear();
        }
        return false;
    }

    match key.code {
        KeyCode::Esc => return true,
        KeyCode::F(1) => app.show_help = true,
        KeyCode::Enter => {
            if app.session.start_scan(&app.input).is_ok() {
                app.input.clear();
                app.status = None;
                app.scan_started_at = Some(OffsetDateTime::now_utc());
            }
        }
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char(c) => app.input.push(c),
        _ => {}
    }
    false
}

fn draw(f: &mut ratatui::Frame, app: &mut App) {
    let size = f.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(size);

    draw_header(f, chunks[0], app);
    draw_footer(f, chunks[2], app);

    match app.screen() {
        Screen::Input => draw_input(f, chunks[1], app),
        Screen::Scanning => draw_scanning(f, chunks[1], app),
        Screen::Results => draw_results(f, chunks[1], app),
        Screen::Help => draw_help(f, chunks[1]),
    }
}

fn draw_header(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let title = match app.screen() {
        Screen::Input => "securecheck - new scan",
        Screen::Scanning => "securecheck - scanning",
        Screen::Results => "securecheck - results",
        Screen::Help => "securecheck - help",
    };
    let right = format!("v{}", env!("CARGO_PKG_VERSION"));

    let line = Line::from(vec![
        Span::styled(title, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::styled(right, Style::default().fg(Color::DarkGray)),
    ]);

    let w = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(w, area);
}

fn draw_footer(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let keys = match app.screen() {
        Screen::Input => "Enter: scan  Ctrl-U: clear  F1: help  Esc: quit",
        Screen::Scanning => "q: quit",
        Screen::Results => "Enter/n: scan another URL  ↑↓/j/k: scroll  ?: help  q: quit",
        Screen::Help => "any key: back",
    };
    let hint = Style::default().fg(Color::DarkGray);
    let mut lines = vec![Line::from(Span::styled(keys, hint))];
    if let Some(status) = &app.status {
        lines.push(Line::from(Span::styled(status.clone(), hint)));
    }
    f.render_widget(Paragraph::new(lines), area);
}

fn draw_input(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let popup = centered_rect(70, 40, area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(1),
        ])
        .split(popup);

    let inner_width = usize::from(chunks[0].width.saturating_sub(2));
    let visible = tail_fit(&app.input, inner_width.saturating_sub(1));
    let input = Paragraph::new(visible).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Enter a URL to scan"),
    );
    f.render_widget(input, chunks[0]);

    let cursor_x = chunks[0].x + 1 + display_width(visible) as u16;
    f.set_cursor(cursor_x, chunks[0].y + 1);

    if let Some(err) = app.session.error() {
        let style = if app.color {
            Style::default().fg(Color::Red)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let w = Paragraph::new(Line::from(Span::styled(err.to_string(), style)))
            .wrap(Wrap { trim: false });
        f.render_widget(w, chunks[1]);
    }

    let about = Paragraph::new(Text::from(vec![
        Line::from("The URL is scored from its structure only; nothing is fetched."),
        Line::from("URLs without a scheme are treated as https://"),
    ]))
    .style(Style::default().fg(Color::DarkGray))
    .wrap(Wrap { trim: true });
    f.render_widget(about, chunks[2]);
}

fn draw_scanning(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let Some(scan) = app.session.in_flight() else {
        return;
    };
    let spinner = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
    let s = spinner[(app.tick as usize) % spinner.len()];

    let popup = centered_rect(70, 60, area);
    let block = Block::default().borders(Borders::ALL).title("Scanning");
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    let url = Paragraph::new(Line::from(vec![
        Span::styled(s, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::raw(scan.url.clone()),
    ]))
    .wrap(Wrap { trim: true });
    f.render_widget(url, chunks[0]);

    let pos = scan.position;
    let gauge_style = if app.color {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let gauge = Gauge::default()
        .gauge_style(gauge_style)
        .ratio((pos.percent / 100.0).clamp(0.0, 1.0))
        .label(format!("{:>3.0}%  {}", pos.percent, pos.stage.name));
    f.render_widget(gauge, chunks[1]);

    let items: Vec<ListItem> = app
        .session
        .plan()
        .stages()
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            let (marker, style) = match stage_mark(i, &pos) {
                StageMark::Done => ("[x]", Style::default().fg(Color::DarkGray)),
                StageMark::Active => ("[>]", Style::default().add_modifier(Modifier::BOLD)),
                StageMark::Pending => ("[ ]", Style::default()),
            };
            ListItem::new(Line::from(Span::styled(
                format!("{marker} {}", stage.name),
                style,
            )))
        })
        .collect();
    f.render_widget(List::new(items), chunks[3]);
}

fn draw_results(f: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let Some(report) = app.session.report() else {
        return;
    };
    let lines = results_lines(report, app.color);
    let max_scroll = u16::try_from(lines.len().saturating_sub(1)).unwrap_or(u16::MAX);
    app.results_scroll = app.results_scroll.min(max_scroll);

    let w = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("Scan results"))
        .wrap(Wrap { trim: false })
        .scroll((app.results_scroll, 0));
    f.render_widget(w, area);
}

fn draw_help(f: &mut ratatui::Frame, area: Rect) {
    let text = Text::from(vec![
        Line::from(Span::styled(
            "securecheck UI",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Input:"),
        Line::from("  Enter  : start the scan"),
        Line::from("  Ctrl-U : clear the input"),
        Line::from("  Esc    : quit"),
        Line::from(""),
        Line::from("Results:"),
        Line::from("  Enter / n      : scan another URL"),
        Line::from("  ↑↓ / j/k       : scroll"),
        Line::from("  PgUp / PgDn    : scroll by page"),
        Line::from("  q / Esc        : quit"),
        Line::from(""),
        Line::from("Ctrl-C quits from any screen."),
    ]);
    let w = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: false });
    f.render_widget(w, area);
}

fn results_lines(report: &ScanReport, color: bool) -> Vec<Line<'static>> {
    let result = &report.result;
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();

    lines.push(Line::from(vec![
        Span::styled(
            format!("{} RISK", result.risk_level.as_str().to_ascii_uppercase()),
            risk_style(result.risk_level, color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "  {}/100  {}",
            result.risk_score,
            crate::ui::score_bar(result.risk_score)
        )),
    ]));
    lines.push(Line::from(result.risk_level.description()));
    lines.push(Line::from(""));
    lines.push(Line::from(format!("URL:        {}", result.url)));
    lines.push(Line::from(format!(
        "HTTPS:      {}",
        if result.is_secure { "yes" } else { "no" }
    )));
    lines.push(Line::from(format!(
        "Scanned at: {} ({})",
        result.scanned_at,
        crate::ui::format_duration_ms(result.scan_duration_ms)
    )));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Security checks", bold)));
    for check in &report.checks {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<8}", check.status.as_str()),
                status_style(check.status, color),
            ),
            Span::styled(check.name.clone(), bold),
            Span::raw(format!("  {}", check.description)),
        ]));
    }

    lines.push(Line::from(""));
    if result.threats.is_empty() {
        lines.push(Line::from(Span::styled("No threats detected", bold)));
    } else {
        lines.push(Line::from(Span::styled(
            format!("Threats ({})", result.threats.len()),
            bold,
        )));
        for threat in &result.threats {
            lines.push(Line::from(format!("- {threat}")));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Recommendations", bold)));
    for rec in &result.recommendations {
        lines.push(Line::from(format!("- {rec}")));
    }

    lines
}

fn stage_mark(index: usize, pos: &StagePosition) -> StageMark {
    if pos.is_complete() || index < pos.index {
        StageMark::Done
    } else if index == pos.index {
        StageMark::Active
    } else {
        StageMark::Pending
    }
}

fn display_width(s: &str) -> usize {
    s.chars()
        .map(|c| UnicodeWidthChar::width(c).unwrap_or(0))
        .sum()
}

/// Longest suffix of `s` that fits in `width` columns.
fn tail_fit(s: &str, width: usize) -> &str {
    let mut used = 0usize;
    let mut start = s.len();
    for (i, c) in s.char_indices().rev() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        start = i;
    }
    &s[start..]
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn risk_style(risk: RiskLevel, enabled: bool) -> Style {
    if !enabled {
        return Style::default();
    }
    match risk {
        RiskLevel::Low => Style::default().fg(Color::Green),
        RiskLevel::Medium => Style::default().fg(Color::Yellow),
        RiskLevel::High => Style::default().fg(Color::LightRed),
        RiskLevel::Critical => Style::default().fg(Color::Red),
    }
}

fn status_style(status: CheckStatus, enabled: bool) -> Style {
    if !enabled {
        return Style::default();
    }
    match status {
        CheckStatus::Passed => Style::default().fg(Color::Green),
        CheckStatus::Warning => Style::default().fg(Color::Yellow),
        CheckStatus::Failed => Style::default().fg(Color::Red),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOptions;
    use crate::progress::StagePlan;
    use std::time::Duration;

    fn test_engine() -> Engine {
        Engine::new(
            EngineOptions {
                show_progress: false,
                simulate_delay: false,
                log_scans: false,
            },
            std::env::temp_dir(),
        )
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, s: &str) {
        for c in s.chars() {
            assert!(!handle_key(app, key(KeyCode::Char(c))));
        }
    }

    #[test]
    fn enter_on_empty_input_shows_error_and_stays_on_input() {
        let mut app = App::new(false, false);
        assert!(!handle_key(&mut app, key(KeyCode::Enter)));
        assert_eq!(app.screen(), Screen::Input);
        assert_eq!(app.session.error(), Some("Please enter a URL"));
    }

    #[test]
    fn scan_without_delay_completes_on_next_advance() {
        let engine = test_engine();
        let mut app = App::new(false, false);
        type_text(&mut app, "http://192.168.1.1/login.php");
        assert!(!handle_key(&mut app, key(KeyCode::Enter)));
        assert_eq!(app.screen(), Screen::Scanning);
        assert!(app.input.is_empty());

        advance(&mut app, &engine, Instant::now());
        assert_eq!(app.screen(), Screen::Results);
        let report = app.session.report().expect("report");
        assert!(!report.result.is_secure);
        assert!(app.status.is_none());

        assert!(!handle_key(&mut app, key(KeyCode::Char('n'))));
        assert_eq!(app.screen(), Screen::Input);
        assert!(app.session.report().is_none());
    }

    #[test]
    fn scan_with_delay_waits_for_the_last_stage() {
        let engine = test_engine();
        let mut app = App::new(false, true);
        type_text(&mut app, "example.com");
        handle_key(&mut app, key(KeyCode::Enter));

        let started = app.session.in_flight().expect("in flight").started_at;
        advance(&mut app, &engine, started + Duration::from_millis(100));
        assert_eq!(app.screen(), Screen::Scanning);

        let total = StagePlan::default().total();
        advance(&mut app, &engine, started + total);
        assert_eq!(app.screen(), Screen::Results);
    }

    #[test]
    fn q_types_into_input_but_quits_from_results() {
        let engine = test_engine();
        let mut app = App::new(false, false);
        assert!(!handle_key(&mut app, key(KeyCode::Char('q'))));
        assert_eq!(app.input, "q");
        handle_key(&mut app, key(KeyCode::Backspace));
        assert!(app.input.is_empty());

        type_text(&mut app, "https://www.wikipedia.org");
        handle_key(&mut app, key(KeyCode::Enter));
        advance(&mut app, &engine, Instant::now());
        assert!(handle_key(&mut app, key(KeyCode::Char('q'))));
    }

    #[test]
    fn ctrl_c_quits_everywhere() {
        let mut app = App::new(false, false);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(handle_key(&mut app, ctrl_c));
        app.show_help = true;
        assert!(handle_key(&mut app, ctrl_c));
    }

    #[test]
    fn stage_marks_follow_position() {
        let plan = StagePlan::default();
        let pos = plan.position(Duration::from_millis(600));
        assert_eq!(pos.index, 1);
        assert_eq!(stage_mark(0, &pos), StageMark::Done);
        assert_eq!(stage_mark(1, &pos), StageMark::Active);
        assert_eq!(stage_mark(2, &pos), StageMark::Pending);

        let done = plan.position(plan.total());
        assert!((0..plan.stages().len()).all(|i| stage_mark(i, &done) == StageMark::Done));
    }

    #[test]
    fn tail_fit_keeps_the_end_of_long_input() {
        assert_eq!(tail_fit("https://example.com", 7), "ple.com");
        assert_eq!(tail_fit("short", 10), "short");
        assert_eq!(tail_fit("ab危険", 4), "危険");
        assert_eq!(tail_fit("anything", 0), "");
    }

    #[test]
    fn results_lines_cover_every_section() {
        let url = "http://192.168.1.1/login.php";
        let report = ScanReport::new(crate::rules::analyze(url), crate::rules::checks(url));
        let lines = results_lines(&report, false);
        let text: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();

        assert!(text[0].starts_with("HIGH RISK") || text[0].starts_with("CRITICAL RISK"));
        for check in &report.checks {
            assert!(text.iter().any(|l| l.contains(&check.name)));
        }
        assert!(text.iter().any(|l| l.starts_with("Threats (")));
        assert!(text.iter().any(|l| l == "Recommendations"));
    }

    #[test]
    fn centered_rect_stays_inside_area() {
        let area = Rect::new(0, 0, 100, 40);
        let r = centered_rect(60, 50, area);
        assert!(r.x >= area.x && r.right() <= area.right());
        assert!(r.y >= area.y && r.bottom() <= area.bottom());
        assert_eq!(r.width, 60);
    }
}
