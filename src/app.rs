use std::collections::VecDeque;
use std::rc::Rc;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::model::config::{ConfigAccessor, ConfigExt};
use crate::model::mode::Mode;
use crate::msg::Msg;
use crate::plugin::PluginManager;
use crate::report::{Notice, Severity};
use crate::update::check::current_version;
use crate::update::{UpdateOutcome, UpdatePrompt, UpdateService, UpdateState, check_for_updates_now};

const DEFAULT_APP_NAME: &str = "MK Processor";
const MAX_NOTIFICATIONS: usize = 50;

pub struct App {
    pub mode: Mode,
    pub plugin_manager: PluginManager,
    config: Rc<dyn ConfigAccessor>,
    updates: Rc<dyn UpdateService>,
    pub should_quit: bool,
    /// Status-line history, newest last.
    pub notifications: VecDeque<String>,
    notices: VecDeque<Notice>,
    update_prompt: Option<UpdatePrompt>,
    last_update_state: Option<UpdateState>,
}

impl App {
    pub fn new(
        plugin_manager: PluginManager,
        config: Rc<dyn ConfigAccessor>,
        updates: Rc<dyn UpdateService>,
    ) -> Self {
        let notifications = VecDeque::from(plugin_manager.startup_notifications());

        Self {
            mode: Mode::Normal,
            plugin_manager,
            config,
            updates,
            should_quit: false,
            notifications,
            notices: VecDeque::new(),
            update_prompt: None,
            last_update_state: None,
        }
    }

    /// `"{name} {version}"`, used for the header and the terminal title.
    pub fn title(&self) -> String {
        let name: String = self.config.get("app", "name", DEFAULT_APP_NAME.to_string());
        format!("{name} {}", current_version(&*self.config))
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push_back(notice);
        self.sync_mode();
    }

    pub fn offer_update(&mut self, prompt: UpdatePrompt) {
        self.push_notification(format!(
            "update {}: {}",
            prompt.version(),
            UpdateState::Offered
        ));
        if let Some(previous) = self.update_prompt.replace(prompt) {
            previous.decline();
        }
        self.sync_mode();
    }

    pub fn current_notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    pub fn has_update_offer(&self) -> bool {
        self.update_prompt.is_some()
    }

    pub fn last_update_state(&self) -> Option<UpdateState> {
        self.last_update_state
    }

    // ── MVU: Update ──────────────────────────────────────────────

    pub fn update(&mut self, msg: Msg) {
        match msg {
            Msg::Key(key) => self.handle_key(key),
            Msg::CheckForUpdates => self.check_for_updates(),
            Msg::AcceptUpdate => self.accept_update(),
            Msg::DeclineUpdate => self.decline_update(),
            Msg::DismissNotice => {
                self.notices.pop_front();
            }
            Msg::Quit => self.should_quit = true,
            Msg::Tick | Msg::Resize(..) => {}
        }
        self.sync_mode();
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.update(Msg::Quit);
            return;
        }

        let msg = match self.mode {
            Mode::Notice => Some(Msg::DismissNotice),
            Mode::UpdateOffer => match key.code {
                KeyCode::Char('u') | KeyCode::Enter => Some(Msg::AcceptUpdate),
                KeyCode::Char('l') | KeyCode::Esc => Some(Msg::DeclineUpdate),
                _ => None,
            },
            Mode::Normal => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => Some(Msg::Quit),
                KeyCode::Char('c') => Some(Msg::CheckForUpdates),
                _ => None,
            },
        };

        if let Some(msg) = msg {
            self.update(msg);
        }
    }

    fn check_for_updates(&mut self) {
        match check_for_updates_now(&*self.config, &*self.updates) {
            Ok(Some(check)) => {
                let prompt =
                    UpdatePrompt::offer(check, Rc::clone(&self.config), Rc::clone(&self.updates));
                self.offer_update(prompt);
            }
            Ok(None) => self.notices.push_back(Notice::info(
                "No Updates",
                format!(
                    "You are running the latest version ({}).",
                    current_version(&*self.config)
                ),
            )),
            Err(err) => {
                tracing::warn!("manual update check failed: {err}");
                self.notices.push_back(Notice::warning(
                    "Update Check Failed",
                    format!("Could not check for updates.\n\nError: {err}"),
                ));
            }
        }
    }

    fn accept_update(&mut self) {
        let Some(prompt) = self.update_prompt.take() else {
            return;
        };
        let outcome = prompt.accept();
        self.record_outcome(outcome);
    }

    fn decline_update(&mut self) {
        let Some(prompt) = self.update_prompt.take() else {
            return;
        };
        let outcome = prompt.decline();
        self.record_outcome(outcome);
    }

    fn record_outcome(&mut self, outcome: UpdateOutcome) {
        self.push_notification(format!("update {}: {}", outcome.version, outcome.state));
        if let Some(notice) = outcome.notice {
            self.notices.push_back(notice);
        }
        self.last_update_state = Some(outcome.state);
    }

    fn push_notification(&mut self, message: String) {
        self.notifications.push_back(message);
        while self.notifications.len() > MAX_NOTIFICATIONS {
            self.notifications.pop_front();
        }
    }

    fn sync_mode(&mut self) {
        self.mode = if !self.notices.is_empty() {
            Mode::Notice
        } else if self.has_update_offer() {
            Mode::UpdateOffer
        } else {
            Mode::Normal
        };
    }

    // ── MVU: View ────────────────────────────────────────────────

    pub fn view(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Min(1),    // plugins
                Constraint::Length(1), // status bar
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0]);
        self.render_plugins(frame, chunks[1]);
        self.render_status_bar(frame, chunks[2]);

        match self.mode {
            Mode::Notice => {
                if let Some(notice) = self.current_notice() {
                    render_notice_overlay(frame, notice, "any key to close");
                }
            }
            Mode::UpdateOffer => {
                if let Some(prompt) = &self.update_prompt {
                    self.render_update_overlay(frame, prompt);
                }
            }
            Mode::Normal => {}
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let header = Line::from(vec![
            Span::styled(
                format!(" {} ", self.title()),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  c: check for updates  q: quit"),
        ]);
        frame.render_widget(Paragraph::new(header), area);
    }

    fn render_plugins(&self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = self
            .plugin_manager
            .list_rows()
            .into_iter()
            .map(Line::from)
            .collect();

        let manager = &self.plugin_manager;
        let block = Block::default().borders(Borders::ALL).title(format!(
            " Plugins ({}, {} errors) {} ",
            manager.registry().len(),
            manager.error_count(),
            manager.root_dir().display()
        ));
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let latest = self.notifications.back().map(String::as_str).unwrap_or("");
        let mut spans = vec![Span::styled(
            format!(" {} ", self.mode.label()),
            Style::default().fg(Color::Black).bg(Color::Magenta),
        )];
        if let Some(state) = self.last_update_state() {
            spans.push(Span::styled(
                format!(" update: {state} "),
                Style::default().fg(Color::Black).bg(Color::Cyan),
            ));
        }
        spans.push(Span::raw(format!(" {latest}")));
        let status = Line::from(spans);
        frame.render_widget(Paragraph::new(status), area);
    }

    fn render_update_overlay(&self, frame: &mut Frame, prompt: &UpdatePrompt) {
        let area = centered_rect(60, 50, frame.area());
        frame.render_widget(Clear, area);

        let lines = vec![
            Line::from(Span::styled(
                format!("MK Processor {} is available!", prompt.version()),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!(
                "You are currently using version {}",
                prompt.running_version()
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Release Notes:",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(prompt.release_notes().to_string()),
            Line::from(""),
            Line::from(Span::styled(
                "u: Update Now   l: Later",
                Style::default().fg(Color::Cyan),
            )),
        ];

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Update Available ");
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
            area,
        );
    }
}

/// Modal rendering of a notice, shared with the critical failure dialog.
pub fn render_notice_overlay(frame: &mut Frame, notice: &Notice, hint: &str) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);

    let color = match notice.severity {
        Severity::Info => Color::Cyan,
        Severity::Warning => Color::Yellow,
        Severity::Critical => Color::Red,
    };

    let mut lines: Vec<Line> = notice.message.lines().map(Line::from).collect();
    if let Some(detail) = &notice.detail {
        lines.push(Line::from(""));
        lines.extend(detail.lines().map(|line| {
            Line::from(Span::styled(line.to_string(), Style::default().fg(Color::DarkGray)))
        }));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        hint.to_string(),
        Style::default().fg(color),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(format!(" {} ", notice.title));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
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
