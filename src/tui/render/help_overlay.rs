use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use super::header::panel_block;

fn heading(title: &'static str) -> Line<'static> {
    Line::from(vec![Span::styled(
        title,
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    )])
}

pub(super) fn render_help_overlay(frame: &mut Frame<'_>, area: Rect) {
    let help_lines = vec![
        heading("Dock"),
        Line::from("h/l  left/right   focus previous/next process"),
        Line::from("v                 toggle dock (collapsed/open)"),
        Line::from("F                 toggle auto show/hide"),
        Line::from("c                 clear finished processes"),
        Line::from("x                 stop focused process (again to force)"),
        Line::from("i                 send a line to the process stdin"),
        Line::from("q  ctrl+c         quit and stop managed processes"),
        Line::from(""),
        heading("Log viewer"),
        Line::from("j/k  up/down      scroll one line"),
        Line::from("pgup/pgdn         scroll one page"),
        Line::from("g/G  home/end     jump to oldest/newest"),
        Line::from("f                 toggle tail follow"),
        Line::from("s                 cycle stream filter"),
        Line::from("/                 search, n/N next/previous match"),
        Line::from("?  esc            close this help"),
    ];
    let help = Paragraph::new(help_lines).block(panel_block(Some(" Help "), false, Color::Magenta));
    frame.render_widget(help, area);
}
