//! Interactive TUI application.

#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

use crate::client::state::{DnssecCell, Slot, MSG_PENDING};
use crate::client::{Orchestrator, ResultsState, StunGatherer, Update};
use crate::error::{Error, Result};
use crate::lookup::AddressRecord;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Gauge, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum View {
    #[default]
    Results,
    Help,
}

pub struct App {
    orchestrator: Arc<Orchestrator<StunGatherer>>,
    server: String,
    state: ResultsState,
    current_view: View,
    /// Receiver of the run in progress; dropped on restart
    updates: Option<mpsc::UnboundedReceiver<Update>>,
    runs: usize,
    /// Table state for scrolling.
    table_state: TableState,
}

impl App {
    #[must_use]
    pub fn new(orchestrator: Orchestrator<StunGatherer>, server: impl Into<String>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            server: server.into(),
            state: ResultsState::new(),
            current_view: View::default(),
            updates: None,
            runs: 0,
            table_state: TableState::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        ensure_terminal(std::io::stdout().is_terminal())?;

        // Initialize terminal with raw mode and alternate screen
        let mut terminal = ratatui::init();

        self.start_check();
        let res = self.run_loop(&mut terminal).await;

        // Restore terminal state
        ratatui::restore();

        res
    }

    async fn run_loop(&mut self, terminal: &mut ratatui::DefaultTerminal) -> Result<()> {
        loop {
            // 1. Fold in everything the tasks reported
            self.drain_updates();

            // 2. Render UI
            terminal.draw(|f| self.draw(f))?;

            // 3. Handle keyboard events (non-blocking with 50ms timeout)
            if crossterm::event::poll(Duration::from_millis(50))? {
                if let crossterm::event::Event::Key(key) = crossterm::event::read()? {
                    if !self.handle_key(key) {
                        break;
                    }
                }
            }

            tokio::task::yield_now().await;
        }

        Ok(())
    }

    fn drain_updates(&mut self) {
        let Some(rx) = self.updates.as_mut() else {
            return;
        };
        while let Ok(update) = rx.try_recv() {
            self.state.apply(update);
        }
        if self.state.is_complete() {
            self.updates = None;
        }
    }

    fn testing(&self) -> bool {
        self.updates.is_some()
    }

    /// Start a fresh run. A run still in flight is abandoned.
    fn start_check(&mut self) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state = ResultsState::new();
        self.updates = Some(rx);
        self.runs += 1;
        self.table_state.select(None);
        Arc::clone(&self.orchestrator).spawn(tx);
        tracing::debug!(run = self.runs, "Check started");
    }

    fn handle_key(&mut self, key: crossterm::event::KeyEvent) -> bool {
        use crossterm::event::{KeyCode, KeyModifiers};

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => false,

            KeyCode::Tab => {
                self.current_view = match self.current_view {
                    View::Results => View::Help,
                    View::Help => View::Results,
                };
                true
            }
            KeyCode::Char('1') => {
                self.current_view = View::Results;
                true
            }
            KeyCode::Char('2') | KeyCode::Char('?') => {
                self.current_view = View::Help;
                true
            }

            KeyCode::Char('r') => {
                self.current_view = View::Results;
                self.start_check();
                true
            }

            KeyCode::Up | KeyCode::Char('k') => {
                let selected = self.table_state.selected().unwrap_or(0);
                self.table_state.select(Some(selected.saturating_sub(1)));
                true
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let max = self.state.dnssec.len().saturating_sub(1);
                let next = self.table_state.selected().map_or(0, |s| (s + 1).min(max));
                self.table_state.select(Some(next));
                true
            }

            KeyCode::Esc if self.current_view == View::Help => {
                self.current_view = View::Results;
                true
            }
            KeyCode::Char('q') => false,

            _ => true,
        }
    }

    fn draw(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(12),
                Constraint::Length(6),
            ])
            .split(f.area());

        self.draw_title_bar(f, chunks[0]);
        self.draw_tabs(f, chunks[1]);

        match self.current_view {
            View::Results => self.draw_results(f, chunks[2]),
            View::Help => Self::draw_help(f, chunks[2]),
        }

        self.draw_status_bar(f, chunks[3]);
    }

    fn draw_title_bar(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(24),
                Constraint::Min(10),
                Constraint::Length(40),
            ])
            .split(area);

        let title = Paragraph::new("IP & DNSSEC Check").style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
        f.render_widget(title, chunks[0]);

        let version = Paragraph::new(concat!("ipcheck v", env!("CARGO_PKG_VERSION")))
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(version, chunks[1]);

        let server = Paragraph::new(self.server.as_str())
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Right);
        f.render_widget(server, chunks[2]);
    }

    fn draw_tabs(&self, f: &mut Frame, area: Rect) {
        let titles = [(View::Results, "Results"), (View::Help, "Help")];
        let tab_text: String = titles
            .iter()
            .map(|(view, title)| {
                if *view == self.current_view {
                    format!("[{title}] ")
                } else {
                    format!(" {title}  ")
                }
            })
            .collect();
        let tabs = Paragraph::new(tab_text).style(Style::default().fg(Color::White));
        f.render_widget(tabs, area);
    }

    fn draw_results(&mut self, f: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(9), Constraint::Min(8)])
            .split(area);

        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(33),
                Constraint::Percentage(34),
                Constraint::Percentage(33),
            ])
            .split(rows[0]);

        f.render_widget(address_panel(" IPv4 ", &self.state.ipv4), top[0]);
        f.render_widget(address_panel(" IPv6 ", &self.state.ipv6), top[1]);
        f.render_widget(self.webrtc_panel(), top[2]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
            .split(rows[1]);

        self.draw_dnssec_table(f, bottom[0]);
        f.render_widget(self.fingerprint_panel(), bottom[1]);
    }

    fn webrtc_panel(&self) -> Paragraph<'static> {
        let lines = match &self.state.webrtc {
            Slot::Ready(report) => {
                let list = |ips: &[std::net::IpAddr]| {
                    if ips.is_empty() {
                        "-".to_string()
                    } else {
                        ips.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
                    }
                };
                let additional = self.state.additional_addresses();
                let mut lines = vec![
                    field("Public", list(&report.public)),
                    field("Private", list(&report.private)),
                ];
                let style = if additional.is_empty() {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::Yellow)
                };
                lines.push(Line::from(vec![
                    Span::styled("Leaked:   ", Style::default().fg(Color::DarkGray)),
                    Span::styled(list(&additional), style),
                ]));
                if report.mdns_hidden > 0 {
                    lines.push(field("mDNS", format!("{} hidden", report.mdns_hidden)));
                }
                lines
            }
            slot => vec![placeholder_line(slot.placeholder().unwrap_or(MSG_PENDING), slot)],
        };

        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(panel(" WebRTC "))
    }

    fn fingerprint_panel(&self) -> Paragraph<'static> {
        let mut lines = Vec::new();
        match &self.state.fingerprint {
            Slot::Ready(fp) => {
                lines.push(field("System", format!("{} / {}", fp.os, fp.arch)));
                lines.push(field("CPUs", fp.cpu_count.to_string()));
                lines.push(field(
                    "Locale",
                    fp.locale.clone().unwrap_or_else(|| "-".to_string()),
                ));
                let zone = fp
                    .time_zone
                    .as_ref()
                    .map_or_else(|| fp.utc_offset.clone(), |tz| format!("{tz} ({})", fp.utc_offset));
                lines.push(field("Timezone", zone));
            }
            slot => lines.push(placeholder_line(MSG_PENDING, slot)),
        }
        if let Slot::Ready(headers) = &self.state.headers {
            if let Some(ua) = &headers.user_agent {
                lines.push(field("Seen UA", ua.clone()));
            }
            if let Some(lang) = &headers.accept_language {
                lines.push(field("Language", lang.clone()));
            }
        }

        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(panel(" Fingerprint "))
    }

    fn draw_dnssec_table(&mut self, f: &mut Frame, area: Rect) {
        let rows: Vec<Row> = self.state.dnssec.iter().map(dnssec_row).collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(12),
                Constraint::Length(8),
                Constraint::Length(9),
                Constraint::Min(20),
            ],
        )
        .header(
            Row::new(vec!["Algorithm", "Test", "Result", "Detail"])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .block(panel(" DNSSEC "))
        .row_highlight_style(Style::default().bg(Color::Blue));

        // Use stateful rendering for scroll support
        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn draw_help(f: &mut Frame, area: Rect) {
        use ratatui::widgets::Clear;

        f.render_widget(Clear, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Title
                Constraint::Min(1),    // Content
                Constraint::Length(2), // Footer
            ])
            .split(area);

        let title = Paragraph::new("ipcheck - Help")
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center);
        f.render_widget(title, chunks[0]);

        let help_items = [
            ("r", "Restart the check"),
            ("j/k or Up/Down", "Scroll DNSSEC results"),
            ("1/2", "Switch tabs (Results/Help)"),
            ("Tab", "Cycle through tabs"),
            ("q", "Quit application"),
        ];

        let rows: Vec<Row> = help_items
            .iter()
            .map(|(key, desc)| {
                Row::new(vec![
                    Cell::from(format!("  {key}  ")).style(Style::default().fg(Color::Yellow)),
                    Cell::from(*desc).style(Style::default().fg(Color::White)),
                ])
            })
            .collect();

        let help_table = Table::new(rows, [Constraint::Length(16), Constraint::Min(30)])
            .block(panel(" Keyboard Shortcuts "))
            .column_spacing(2);

        f.render_widget(help_table, chunks[1]);

        let footer = Paragraph::new("Press [Esc] or [1] to return to results")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(footer, chunks[2]);
    }

    fn draw_status_bar(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Length(3)])
            .split(area);

        let total = self.state.dnssec.len();
        let done = self.state.dnssec_done();
        let summary = self.state.dnssec_summary();

        let verdict = if done < total {
            Span::styled("checking…", Style::default().fg(Color::DarkGray))
        } else if summary.validates {
            Span::styled("yes", Style::default().fg(Color::Green))
        } else {
            Span::styled("no", Style::default().fg(Color::Red))
        };

        let mut spans = vec![
            Span::raw("Resolver validates DNSSEC: "),
            verdict,
            Span::raw(format!("  |  Passed: {}  Failed: {}", summary.passed, summary.failed)),
        ];
        if !self.testing() {
            spans.push(Span::styled(
                "  |  [r] restart",
                Style::default().fg(Color::DarkGray),
            ));
        }

        let stats = Paragraph::new(Line::from(spans)).block(panel(" Summary "));
        f.render_widget(stats, chunks[0]);

        let progress = if total > 0 {
            ((done * 100) / total).min(100) as u16
        } else {
            0
        };
        let gauge = Gauge::default()
            .block(panel(&format!(" DNSSEC {done}/{total} ({progress}%) ")))
            .gauge_style(Style::default().fg(Color::Cyan))
            .percent(progress);

        f.render_widget(gauge, chunks[1]);
    }
}

fn panel(title: &str) -> Block<'static> {
    Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
}

fn field(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<9} "), Style::default().fg(Color::DarkGray)),
        Span::raw(value),
    ])
}

fn placeholder_line<T>(text: &str, slot: &Slot<T>) -> Line<'static> {
    let color = if slot.is_pending() {
        Color::DarkGray
    } else {
        Color::Yellow
    };
    Line::from(Span::styled(text.to_string(), Style::default().fg(color)))
}

fn address_panel(title: &str, slot: &Slot<AddressRecord>) -> Paragraph<'static> {
    let lines = match slot {
        Slot::Ready(record) => {
            let geo = &record.geo;
            let location: Vec<&str> = [&geo.city, &geo.region, &geo.country]
                .into_iter()
                .filter_map(|v| v.as_deref())
                .collect();
            let or_dash = |v: Option<&String>| v.cloned().unwrap_or_else(|| "-".to_string());
            vec![
                Line::from(Span::styled(
                    record.ip.clone(),
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                )),
                field("Hostname", or_dash(record.hostname.as_ref())),
                field(
                    "Location",
                    if location.is_empty() {
                        "-".to_string()
                    } else {
                        location.join(", ")
                    },
                ),
                field("Org", or_dash(geo.org.as_ref())),
                field("Timezone", or_dash(geo.timezone.as_ref())),
            ]
        }
        slot => vec![placeholder_line(slot.placeholder().unwrap_or(MSG_PENDING), slot)],
    };

    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(panel(title))
}

fn dnssec_row(cell: &DnssecCell) -> Row<'static> {
    let (verdict, style, detail) = match &cell.result {
        Slot::Pending => (
            MSG_PENDING.to_string(),
            Style::default().fg(Color::DarkGray),
            String::new(),
        ),
        Slot::Ready(r) if r.passed => (
            "PASS".to_string(),
            Style::default().fg(Color::Green),
            r.domain.clone(),
        ),
        Slot::Ready(r) => (
            "FAIL".to_string(),
            Style::default().fg(Color::Red),
            r.error.clone().unwrap_or_else(|| r.domain.clone()),
        ),
        Slot::Failed(msg) => (
            "ERROR".to_string(),
            Style::default().fg(Color::Yellow),
            msg.clone(),
        ),
    };

    Row::new(vec![
        Cell::from(cell.algorithm.label()),
        Cell::from(cell.condition.as_str()),
        Cell::from(verdict).style(style),
        Cell::from(detail),
    ])
}

/// The interactive view needs a real terminal on stdout.
fn ensure_terminal(is_terminal: bool) -> Result<()> {
    if is_terminal {
        Ok(())
    } else {
        Err(Error::tui(
            "stdout is not a terminal; use `ipcheck check` for line or JSON output",
        ))
    }
}
