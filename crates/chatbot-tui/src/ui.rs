use chatbot_core::{ChatMessage, ChatRole};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{block::Title, Block, BorderType, Borders, Clear, Padding, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::App;

const PANEL_WIDTH: u16 = 48;
const PANEL_HEIGHT: u16 = 24;
const BUBBLE_WIDTH: u16 = 10;
const BUBBLE_HEIGHT: u16 = 3;
const SEND_WIDTH: u16 = 8;
// Gap between the widget and the terminal's bottom-right corner
const MARGIN: u16 = 1;

const USER_COLOR: Color = Color::Cyan;
const ASSISTANT_COLOR: Color = Color::Yellow;

/// Split `word` after as many characters as fit in `width` columns.
/// Always takes at least one character so callers make progress.
fn split_at_width(word: &str, width: usize) -> (&str, &str) {
    let mut used = 0;
    for (idx, c) in word.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            let idx = if idx == 0 { c.len_utf8() } else { idx };
            return word.split_at(idx);
        }
        used += w;
    }
    (word, "")
}

/// Wrap text to fit within a given number of terminal columns.
/// Breaks on word boundaries; a single word wider than the line is split.
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_width = 0;

    for word in text.split_whitespace() {
        let mut word = word;

        // Hard-split words that can never fit
        while word.width() > width {
            if current_width > 0 {
                lines.push(std::mem::take(&mut current_line));
                current_width = 0;
            }
            let (head, rest) = split_at_width(word, width);
            lines.push(head.to_string());
            word = rest;
        }

        let word_width = word.width();
        if word.is_empty() {
            continue;
        }

        if current_width == 0 {
            current_line = word.to_string();
            current_width = word_width;
        } else if current_width + 1 + word_width <= width {
            current_line.push(' ');
            current_line.push_str(word);
            current_width += 1 + word_width;
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line = word.to_string();
            current_width = word_width;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Anchor a box of the given size to the bottom-right corner of `area`.
fn bottom_right(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(MARGIN));
    let height = height.min(area.height.saturating_sub(MARGIN));
    Rect::new(
        area.x + area.width.saturating_sub(width + MARGIN),
        area.y + area.height.saturating_sub(height + MARGIN),
        width,
        height,
    )
}

/// Build the message log as pre-wrapped lines. Messages take at most 80% of
/// the log width, user turns hug the right edge.
fn message_lines(messages: &[ChatMessage], pending: usize, frame: u8, width: u16) -> Vec<Line<'static>> {
    let bubble_width = (width as usize * 4 / 5).max(1);
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in messages {
        let (label, color, alignment) = match msg.role {
            ChatRole::User => ("You", USER_COLOR, Alignment::Right),
            ChatRole::Assistant => ("Assistant", ASSISTANT_COLOR, Alignment::Left),
        };

        lines.push(
            Line::from(Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
            .alignment(alignment),
        );
        for raw in msg.content.lines() {
            for wrapped in wrap_text_to_width(raw, bubble_width) {
                lines.push(Line::from(wrapped).alignment(alignment));
            }
        }
        lines.push(Line::default());
    }

    if pending > 0 {
        lines.push(Line::from(Span::styled(
            "Assistant",
            Style::default().fg(ASSISTANT_COLOR).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat(frame as usize + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    if app.widget.bubble_visible() {
        app.close_area = None;
        app.send_area = None;
        app.log_area = None;
        render_bubble(app, frame, area);
    } else {
        app.bubble_area = None;
        render_panel(app, frame, area);
    }
}

fn render_bubble(app: &mut App, frame: &mut Frame, area: Rect) {
    let hint = Paragraph::new(Line::from(vec![
        Span::styled("Enter", Style::default().fg(USER_COLOR).add_modifier(Modifier::BOLD)),
        Span::raw(" open chat  "),
        Span::styled("q", Style::default().fg(USER_COLOR).add_modifier(Modifier::BOLD)),
        Span::raw(" quit"),
    ]))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(hint, Rect::new(area.x, area.y, area.width, area.height.min(1)));

    let bubble_area = bottom_right(area, BUBBLE_WIDTH, BUBBLE_HEIGHT);
    app.bubble_area = Some(bubble_area);

    let bubble = Paragraph::new("Chat")
        .alignment(Alignment::Center)
        .style(Style::default().fg(USER_COLOR).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(USER_COLOR)),
        );

    frame.render_widget(bubble, bubble_area);
}

fn render_panel(app: &mut App, frame: &mut Frame, area: Rect) {
    let panel_area = bottom_right(area, PANEL_WIDTH, PANEL_HEIGHT);
    frame.render_widget(Clear, panel_area);

    let panel = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(USER_COLOR))
        .title(Line::from(" Assistant ").style(Style::default().add_modifier(Modifier::BOLD)))
        .title(Title::from(" x ").alignment(Alignment::Right));
    let inner = panel.inner(panel_area);
    frame.render_widget(panel, panel_area);

    // Right-aligned title sits just inside the top-right corner
    app.close_area = Some(Rect::new(
        panel_area.x + panel_area.width.saturating_sub(4),
        panel_area.y,
        3u16.min(panel_area.width),
        1,
    ));

    let [log_area, input_row] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(inner);
    let [input_area, send_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(SEND_WIDTH),
    ])
    .areas(input_row);

    app.log_area = Some(log_area);
    app.send_area = Some(send_area);

    render_log(app, frame, log_area);
    render_input(app, frame, input_area);

    let send = Paragraph::new("Send")
        .alignment(Alignment::Center)
        .style(Style::default().fg(USER_COLOR).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL).border_type(BorderType::Rounded));
    frame.render_widget(send, send_area);
}

fn render_log(app: &mut App, frame: &mut Frame, area: Rect) {
    // One column of padding on each side
    let text_width = area.width.saturating_sub(2);
    let lines = message_lines(
        app.widget.log(),
        app.widget.pending(),
        app.animation_frame,
        text_width,
    );

    let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    let max_scroll = total.saturating_sub(area.height);
    app.widget.clamp_scroll(max_scroll);
    let top = max_scroll - app.widget.scroll();

    let log = Paragraph::new(Text::from(lines))
        .block(Block::default().padding(Padding::horizontal(1)))
        .scroll((top, 0));

    frame.render_widget(log, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ASSISTANT_COLOR));

    // Horizontal scrolling keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.widget.cursor();
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.widget.input().is_empty() {
        Paragraph::new(Span::styled(
            "Type a message...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let visible_text: String = app
            .widget
            .input()
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(USER_COLOR))
    };

    frame.render_widget(input.block(input_block), area);

    if inner_width > 0 {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}
