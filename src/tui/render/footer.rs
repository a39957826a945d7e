use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::notify::{Notification, NotificationLevel};

use super::super::state::InputMode;
use super::super::terminal_text::ansi_line;

fn prompt_line(input_mode: &InputMode, viewer_status: Option<&str>) -> Line<'static> {
    let active = Style::default().fg(Color::Yellow);
    match input_mode {
        InputMode::Search(query) => Line::from(vec![
            Span::styled("/", active),
            Span::raw(query.clone()),
            Span::styled("▏", active),
        ]),
        InputMode::Insert(line) => Line::from(vec![
            Span::styled("> ", active),
            Span::styled(line.clone(), Style::default().fg(Color::Gray)),
            Span::styled("▏", active),
        ]),
        InputMode::Command => match viewer_status {
            Some(status) => ansi_line(status, Style::default()),
            None => Line::default(),
        },
    }
}

fn hint_line(input_mode: &InputMode, notice: Option<&Notification>) -> Line<'static> {
    if let Some(notice) = notice {
        let color = match notice.level {
            NotificationLevel::Info => Color::Green,
            NotificationLevel::Warning => Color::Yellow,
            NotificationLevel::Error => Color::Red,
        };
        return Line::from(Span::styled(notice.message.clone(), Style::default().fg(color)));
    }
    let muted = Style::default().fg(Color::DarkGray);
    let hints = match input_mode {
        InputMode::Search(_) => "enter search  |  esc cancel",
        InputMode::Insert(_) => "enter send  |  esc cancel",
        InputMode::Command => "focus (h/l)  |  dock (v)  |  follow (f)  |  search (/)  |  help (?)  |  quit (q)",
    };
    Line::from(Span::styled(hints, muted))
}

pub(super) fn render_footer(
    frame: &mut Frame<'_>,
    area: Rect,
    viewer_status: Option<&str>,
    input_mode: &InputMode,
    notice: Option<&Notification>,
) {
    let footer = Paragraph::new(vec![
        prompt_line(input_mode, viewer_status),
        hint_line(input_mode, notice),
    ]);
    frame.render_widget(footer, area);
}
