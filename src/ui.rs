//! Terminal UI rendering for the console.
//!
//! Layout, top to bottom: the output log, a separator, the `] ` input line
//! and a one-line status bar. Completion hints float just above the input
//! line while there are any.
//!
//! This module renders from RenderState (immutable snapshot) - it never
//! mutates application state.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::autoconnect::State as AutoState;
use crate::output::{ConsoleLine, LineStyle};
use crate::render::{RenderState, StatusView};
use crate::session::ConnectionState;

// Color tokens (selection uses REVERSED modifier to adapt to terminal theme)
const COLOR_TEXT_DIMMED: Color = Color::Gray;
const COLOR_TEXT_MUTED: Color = Color::DarkGray;
const COLOR_SEPARATOR: Color = Color::White;

// Output line colors
const COLOR_ECHO: Color = Color::Cyan;
const COLOR_ERROR: Color = Color::Red;
const COLOR_NOTICE: Color = Color::Yellow;

// Connection state colors
const COLOR_SESSION: Color = Color::Green;
const COLOR_TRANSPORT_ONLY: Color = Color::Yellow;
const COLOR_DISCONNECTED: Color = Color::Red;

const PROMPT: &str = "] ";
const TARGET_WIDTH: usize = 24;

pub fn draw(frame: &mut Frame, state: &RenderState) {
    let area = frame.area();

    if area.height < 3 {
        frame.render_widget(Paragraph::new(render_input_line(state)), area);
        return;
    }

    let separator_height = if area.height > 4 { 1 } else { 0 };
    let chunks = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(separator_height),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .split(area);

    render_output(frame, state, chunks[0]);
    if separator_height > 0 {
        render_separator(frame, state, chunks[1]);
    }
    frame.render_widget(Paragraph::new(render_input_line(state)), chunks[2]);
    frame.render_widget(
        Paragraph::new(render_status_line(&state.status, area.width)),
        chunks[3],
    );

    if !state.hints.is_empty() {
        render_hints(frame, state, chunks[2], chunks[0]);
    }
}

/// Output log, bottom-aligned like a terminal.
fn render_output(frame: &mut Frame, state: &RenderState, area: Rect) {
    let visible = area.height as usize;
    let start = state.lines.len().saturating_sub(visible);
    let mut lines: Vec<Line> = Vec::with_capacity(visible);
    let padding = visible.saturating_sub(state.lines.len());
    lines.extend((0..padding).map(|_| Line::default()));
    lines.extend(state.lines[start..].iter().map(console_line));
    frame.render_widget(Paragraph::new(lines), area);
}

fn line_style(style: LineStyle) -> Style {
    match style {
        LineStyle::Normal => Style::default(),
        LineStyle::Echo => Style::default().fg(COLOR_ECHO),
        LineStyle::Error => Style::default().fg(COLOR_ERROR),
        LineStyle::Notice => Style::default().fg(COLOR_NOTICE),
        LineStyle::Color(rgb) => Style::default().fg(Color::Rgb(rgb.r, rgb.g, rgb.b)),
    }
}

fn console_line(line: &ConsoleLine) -> Line<'static> {
    Line::from(Span::styled(line.text.clone(), line_style(line.style)))
}

/// Solid divider; shows how far up the log is scrolled.
fn render_separator(frame: &mut Frame, state: &RenderState, area: Rect) {
    let width = area.width as usize;
    let line = if state.scroll > 0 {
        let label = format!(" +{} ", state.scroll);
        let rule = "─".repeat(width.saturating_sub(label.chars().count()));
        Line::from(vec![
            Span::styled(rule, Style::default().fg(COLOR_SEPARATOR)),
            Span::styled(label, Style::default().fg(COLOR_NOTICE)),
        ])
    } else {
        Line::from(Span::styled(
            "─".repeat(width),
            Style::default().fg(COLOR_SEPARATOR),
        ))
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_input_line(state: &RenderState) -> Line<'static> {
    let cursor_style = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::SLOW_BLINK);
    Line::from(vec![
        Span::styled(PROMPT, Style::default().fg(COLOR_TEXT_DIMMED)),
        Span::styled(state.input.clone(), Style::default().fg(Color::White)),
        Span::styled("_", cursor_style),
    ])
}

fn connection_color(connection: ConnectionState) -> Color {
    match connection {
        ConnectionState::ConnectedWithSession => COLOR_SESSION,
        ConnectionState::ConnectedTransportOnly => COLOR_TRANSPORT_ONLY,
        ConnectionState::Disconnected => COLOR_DISCONNECTED,
    }
}

/// Target, connection state, auto-connect and capture switches. The dot
/// blinks while a session is up.
fn render_status_line(status: &StatusView, width: u16) -> Line<'static> {
    let sep_style = Style::default().fg(COLOR_TEXT_MUTED);
    let key_style = Style::default().fg(COLOR_TEXT_DIMMED);

    let dot = if status.connection.has_session() && !status.blink {
        " "
    } else {
        "●"
    };
    let mut spans = vec![
        Span::styled(dot, Style::default().fg(connection_color(status.connection))),
        Span::raw(" "),
        Span::styled(
            truncate(&status.target, TARGET_WIDTH),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(" │ ", sep_style),
        Span::styled(
            status.connection_label(),
            Style::default().fg(connection_color(status.connection)),
        ),
    ];

    if status.connection.has_session() {
        spans.push(Span::styled(" │ ", sep_style));
        spans.push(Span::styled(
            format!("{} remote commands", status.remote_commands),
            key_style,
        ));
    }

    spans.push(Span::styled(" │ ", sep_style));
    spans.push(Span::styled(autoconnect_label(status), key_style));

    let spew = format!(
        " game {} debug {} ",
        on_off(status.capture_game),
        on_off(status.capture_debug)
    );
    let content_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    let spacer = (width as usize)
        .saturating_sub(content_width)
        .saturating_sub(spew.chars().count());
    if spacer > 0 {
        spans.push(Span::raw(" ".repeat(spacer)));
        spans.push(Span::styled(spew, Style::default().fg(COLOR_TEXT_MUTED)));
    }

    Line::from(spans)
}

fn autoconnect_label(status: &StatusView) -> String {
    if !status.autoconnect_enabled {
        return "auto off".to_string();
    }
    match status.autoconnect {
        AutoState::Idle => "auto idle".to_string(),
        AutoState::Connecting => "auto connecting".to_string(),
        AutoState::SessionActive { next_ping } => format!("ping in {}", next_ping),
        AutoState::Backoff { remaining } => format!("retry in {}", remaining),
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Hint popup, stacked upward from the input line.
fn render_hints(frame: &mut Frame, state: &RenderState, input: Rect, output: Rect) {
    let height = (state.hints.len() as u16).min(output.height);
    if height == 0 {
        return;
    }
    let longest = state.hints.iter().map(|h| h.chars().count()).max().unwrap_or(0);
    let x = input.x + PROMPT.len() as u16;
    let width = ((longest + 2) as u16).min(input.width.saturating_sub(x - input.x));
    let popup = Rect {
        x,
        y: input.y.saturating_sub(height),
        width,
        height,
    };

    let lines: Vec<Line> = state
        .hints
        .iter()
        .take(height as usize)
        .enumerate()
        .map(|(i, hint)| {
            let style = if state.hint_index == Some(i) {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default().fg(COLOR_TEXT_DIMMED)
            };
            Line::from(Span::styled(format!(" {} ", hint), style))
        })
        .collect();

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines), popup);
}

fn truncate(s: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 1).collect();
        format!("{}~", truncated)
    }
}
