use crate::bounded_log::{BoundedLog, LogEntry};
use crate::roster::{RosterPresentation, PLACEHOLDER_RUNNING, PLACEHOLDER_STOPPED};
use crate::router::EnemyDebugRecord;
use crate::session::ConsoleSession;
use crate::status_slot::ConversationStream;
use crate::theme::{self, icons};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const HEADER_ROWS: u16 = 1;
const INPUT_ROWS: u16 = 3;
const MIN_CHAT_ROWS: u16 = 3;
/// Rows the layout keeps away from the debug pane.
pub const RESERVED_ROWS: u16 = HEADER_ROWS + INPUT_ROWS + MIN_CHAT_ROWS;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ChatTab {
    #[default]
    Copilot,
    Enemy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DebugTab {
    #[default]
    Log,
    Enemy,
    Strategy,
}

impl DebugTab {
    pub fn next(self) -> Self {
        match self {
            DebugTab::Log => DebugTab::Enemy,
            DebugTab::Enemy => DebugTab::Strategy,
            DebugTab::Strategy => DebugTab::Log,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InputTarget {
    #[default]
    Copilot,
    Enemy,
    Strategy,
}

impl InputTarget {
    pub fn next(self) -> Self {
        match self {
            InputTarget::Copilot => InputTarget::Enemy,
            InputTarget::Enemy => InputTarget::Strategy,
            InputTarget::Strategy => InputTarget::Copilot,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InputTarget::Copilot => "Copilot",
            InputTarget::Enemy => "Enemy",
            InputTarget::Strategy => "Strategy",
        }
    }
}

/// Purely presentational state; nothing here is synced with the backend.
#[derive(Clone, Debug, Default)]
pub struct ViewState {
    pub chat_tab: ChatTab,
    pub debug_tab: DebugTab,
    pub input: String,
    pub target: InputTarget,
    pub show_help: bool,
    pub should_quit: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Regions {
    pub header: Rect,
    pub chat: Rect,
    pub roster: Rect,
    pub debug: Rect,
    pub input: Rect,
}

impl Regions {
    /// The debug pane's top border doubles as the drag handle.
    pub fn is_resizer_row(&self, row: u16) -> bool {
        self.debug.height > 0 && row == self.debug.y
    }
}

pub fn layout_regions(area: Rect, debug_height: u16) -> Regions {
    let debug_height = debug_height.min(area.height.saturating_sub(RESERVED_ROWS));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_ROWS),
            Constraint::Min(0),
            Constraint::Length(debug_height),
            Constraint::Length(INPUT_ROWS),
        ])
        .split(area);
    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);
    Regions {
        header: rows[0],
        chat: middle[0],
        roster: middle[1],
        debug: rows[2],
        input: rows[3],
    }
}

pub fn render(f: &mut Frame, session: &ConsoleSession, view: &ViewState) {
    let regions = layout_regions(f.size(), session.panel.height());

    render_header(f, session, regions.header);
    render_chat(f, session, view, regions.chat);
    render_roster(f, session, regions.roster);
    render_debug(f, session, view, regions.debug);
    render_input(f, view, regions.input);

    if view.show_help {
        render_help(f, f.size());
    }
}

fn render_header(f: &mut Frame, session: &ConsoleSession, area: Rect) {
    let state = &session.state;
    let links = &state.links;
    let link = |up: bool| {
        Span::styled(
            if up { icons::LINK_UP } else { icons::LINK_DOWN },
            theme::link_style(up),
        )
    };

    let mut spans = vec![
        Span::styled("THE-Seed ", theme::HEADER_STYLE),
        Span::raw("socket "),
        link(links.socket),
        Span::raw("  game "),
        link(links.game),
        Span::raw("  ai "),
        Span::styled(state.fsm.state_label.clone(), theme::HEADER_STYLE),
    ];
    if let (Some(step), Some(plan)) = (state.fsm.step_index, state.fsm.plan_length) {
        spans.push(Span::styled(format!(" {step}/{plan}"), theme::MUTED_STYLE));
    }
    if let Some(agent) = &state.enemy_agent {
        let run = if agent.running { "running" } else { "stopped" };
        let mut text = format!("  enemy {run} tick {}", agent.tick_count);
        if let Some(interval) = agent.interval_seconds {
            text.push_str(&format!(" every {}s", crate::roster::format_number(interval)));
        }
        spans.push(Span::raw(text));
    }
    if let Some(vnc) = &links.service_vnc {
        spans.push(Span::styled(format!("  vnc {vnc}"), theme::MUTED_STYLE));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_chat(f: &mut Frame, session: &ConsoleSession, view: &ViewState, area: Rect) {
    let (stream, title) = match view.chat_tab {
        ChatTab::Copilot => (&session.state.primary, " [Copilot] | Enemy "),
        ChatTab::Enemy => (&session.state.adversary, " Copilot | [Enemy] "),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);
    let lines = conversation_lines(stream);
    f.render_widget(Paragraph::new(tail(lines, inner.height)), inner);
}

fn conversation_lines(stream: &ConversationStream) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in stream.transcript().visible() {
        let style = theme::role_style(message.role);
        for (idx, text) in message.text.lines().enumerate() {
            let prefix = if idx == 0 {
                format!("{:>4} ", theme::role_prefix(message.role))
            } else {
                "     ".to_string()
            };
            lines.push(Line::from(vec![
                Span::styled(prefix, theme::MUTED_STYLE),
                Span::styled(text.to_string(), style),
            ]));
        }
    }
    if let Some(status) = stream.status() {
        lines.push(Line::from(vec![
            Span::styled(format!("{:>4} ", icons::WORKING), theme::MUTED_STYLE),
            Span::styled(
                format!("{} {}", status.label, status.detail),
                theme::STATUS_ROW_STYLE,
            ),
        ]));
    }
    lines
}

fn render_roster(f: &mut Frame, session: &ConsoleSession, area: Rect) {
    let strategy = &session.state.strategy;
    let controls = strategy.controls();
    let toggle = |enabled: bool| if enabled { "on" } else { "off" };
    let title = format!(
        " Strategy: {} (start {} / stop {}) ",
        strategy.state_label(),
        toggle(controls.start_enabled),
        toggle(controls.stop_enabled)
    );
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines: Vec<Line> = match strategy.presentation() {
        RosterPresentation::Unavailable => vec![Line::from(Span::styled(
            "Strategy stack unavailable",
            Style::default().fg(Color::Yellow),
        ))],
        RosterPresentation::Placeholder { running } => {
            let text = if running {
                PLACEHOLDER_RUNNING
            } else {
                PLACEHOLDER_STOPPED
            };
            vec![Line::from(Span::styled(text, theme::MUTED_STYLE))]
        }
        RosterPresentation::Listing(roster) => {
            let mut lines = vec![Line::from(Span::styled(
                roster.summary_line(),
                theme::HEADER_STYLE,
            ))];
            for company in &roster.companies {
                lines.push(Line::from(Span::styled(
                    company.title_line(),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(Span::styled(
                    company.meta_line(),
                    theme::MUTED_STYLE,
                )));
                if company.members.is_empty() {
                    lines.push(Line::from("  empty"));
                }
                for member in &company.members {
                    lines.push(Line::from(format!("  {}", member.line())));
                }
            }
            lines
        }
    };
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn render_debug(f: &mut Frame, session: &ConsoleSession, view: &ViewState, area: Rect) {
    if area.height == 0 {
        return;
    }
    let state = &session.state;
    let tab = |tab: DebugTab, label: &str| {
        if view.debug_tab == tab {
            Span::styled(format!(" {label} "), theme::ACTIVE_TAB_STYLE)
        } else {
            Span::raw(format!(" {label} "))
        }
    };
    let filter = match view.debug_tab {
        DebugTab::Log => state.master_log.filter().label(),
        DebugTab::Enemy => state.enemy_debug.filter().label(),
        DebugTab::Strategy => "all",
    };
    let title = Line::from(vec![
        tab(DebugTab::Log, "Log"),
        tab(DebugTab::Enemy, "Enemy"),
        tab(DebugTab::Strategy, "Strategy"),
        Span::styled(format!(" filter: {filter} "), theme::MUTED_STYLE),
    ]);
    let border_style = if session.panel.is_dragging() {
        theme::RESIZER_ACTIVE_STYLE
    } else {
        theme::RESIZER_STYLE
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = match view.debug_tab {
        DebugTab::Log => log_lines(&state.master_log),
        DebugTab::Enemy => enemy_debug_lines(&state.enemy_debug),
        DebugTab::Strategy => log_lines(state.strategy.debug_log()),
    };
    f.render_widget(Paragraph::new(tail(lines, inner.height)), inner);
}

fn entry_lines(entry: &LogEntry, lines: &mut Vec<Line<'static>>) {
    let style = Style::default().fg(theme::level_color(entry.level));
    for (idx, text) in entry.text.lines().enumerate() {
        let stamp = if idx == 0 {
            format!("{} ", entry.time_label())
        } else {
            "         ".to_string()
        };
        lines.push(Line::from(vec![
            Span::styled(stamp, theme::MUTED_STYLE),
            Span::styled(text.to_string(), style),
        ]));
    }
}

fn log_lines(log: &BoundedLog<LogEntry>) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for entry in log.visible() {
        entry_lines(entry, &mut lines);
    }
    lines
}

fn enemy_debug_lines(log: &BoundedLog<EnemyDebugRecord>) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for record in log.visible() {
        match record {
            EnemyDebugRecord::Status(entry) => entry_lines(entry, &mut lines),
            EnemyDebugRecord::Tick(tick) => {
                let (icon, level) = if tick.success {
                    (icons::TICK_OK, seed_core::LogLevel::Success)
                } else {
                    (icons::TICK_FAILED, seed_core::LogLevel::Error)
                };
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("{icon} "),
                        Style::default().fg(theme::level_color(level)),
                    ),
                    Span::styled(
                        tick.header_line(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ]));
                for detail in tick.detail_lines() {
                    lines.push(Line::from(Span::styled(
                        format!("    {detail}"),
                        theme::MUTED_STYLE,
                    )));
                }
            }
        }
    }
    lines
}

fn render_input(f: &mut Frame, view: &ViewState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} (Tab to switch, ? for help) ", view.target.label()));
    let inner = block.inner(area);
    f.render_widget(block, area);
    let line = Line::from(vec![
        Span::styled("> ", theme::HEADER_STYLE),
        Span::raw(view.input.clone()),
    ]);
    f.render_widget(Paragraph::new(line), inner);
    let cursor_x = inner
        .x
        .saturating_add(2)
        .saturating_add(view.input.chars().count() as u16)
        .min(inner.x.saturating_add(inner.width.saturating_sub(1)));
    f.set_cursor(cursor_x, inner.y);
}

fn render_help(f: &mut Frame, area: Rect) {
    let width = area.width.min(64);
    let height = area.height.min(22);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    f.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let key = |keys: &'static str, text: &'static str| {
        Line::from(vec![
            Span::styled(format!("{keys:<14}"), Style::default().fg(Color::Cyan)),
            Span::raw(text),
        ])
    };
    let text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        key("Enter", "Send input to the selected target"),
        key("Tab", "Switch input target"),
        key("F2", "Toggle Copilot / Enemy chat"),
        key("F3", "Switch debug tab"),
        key("F4", "Cycle log filter"),
        key("F5", "Clear current debug tab"),
        key("F6 / F7", "Enemy agent start / stop"),
        key("F8 / F9", "Strategy stack start / stop"),
        key("Ctrl-N", "New match (reset all)"),
        key("/interval N", "Set enemy interval (10-300s)"),
        key("/service ACT", "pull build start stop restart start_ai stop_ai"),
        key("/status", "Refresh service status"),
        key("Drag border", "Resize debug pane"),
        key("Esc", "Close help"),
        key("Ctrl-C", "Quit"),
    ];
    f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), inner);
}

fn tail(lines: Vec<Line<'static>>, height: u16) -> Vec<Line<'static>> {
    let height = usize::from(height);
    if lines.len() <= height {
        return lines;
    }
    let skip = lines.len() - height;
    lines.into_iter().skip(skip).collect()
}
