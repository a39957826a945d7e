use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

const NORMAL: [Color; 8] = [
    Color::Black,
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::Gray,
];

const BRIGHT: [Color; 8] = [
    Color::DarkGray,
    Color::LightRed,
    Color::LightGreen,
    Color::LightYellow,
    Color::LightBlue,
    Color::LightMagenta,
    Color::LightCyan,
    Color::White,
];

/// Converts a log line into a ratatui line. Colours, bold and reverse video
/// (what the painter and most build tools emit) carry over; other CSI
/// sequences are dropped.
pub(super) fn ansi_line(raw: &str, base: Style) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut style = base;
    let mut rest = raw;
    while let Some(start) = rest.find('\u{1b}') {
        push_text(&mut spans, &rest[..start], style);
        let after_escape = &rest[start + 1..];
        let Some(params) = after_escape.strip_prefix('[') else {
            rest = after_escape;
            continue;
        };
        let Some(end) = params.find(|ch: char| ('@'..='~').contains(&ch)) else {
            rest = "";
            break;
        };
        if params[end..].starts_with('m') {
            style = apply_sgr(style, &params[..end], base);
        }
        rest = &params[end + 1..];
    }
    push_text(&mut spans, rest, style);
    if spans.is_empty() {
        return Line::from("");
    }
    Line::from(spans)
}

fn push_text(spans: &mut Vec<Span<'static>>, text: &str, style: Style) {
    if !text.is_empty() {
        spans.push(Span::styled(text.to_owned(), style));
    }
}

fn apply_sgr(current: Style, params: &str, base: Style) -> Style {
    if params.is_empty() {
        return base;
    }
    params
        .split(';')
        .filter_map(|code| code.parse::<usize>().ok())
        .fold(current, |style, code| match code {
            0 => base,
            1 => style.add_modifier(Modifier::BOLD),
            7 => style.add_modifier(Modifier::REVERSED),
            22 => style.remove_modifier(Modifier::BOLD),
            27 => style.remove_modifier(Modifier::REVERSED),
            30..=37 => style.fg(NORMAL[code - 30]),
            39 => style.fg(base.fg.unwrap_or(Color::Reset)),
            90..=97 => style.fg(BRIGHT[code - 90]),
            _ => style,
        })
}
