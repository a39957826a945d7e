use unicode_width::UnicodeWidthChar;

const ESC: char = '\u{1b}';
const BEL: char = '\u{0007}';

/// Removes terminal escape sequences from `raw`.
///
/// Handles CSI sequences (`ESC [ ... final`), OSC sequences such as hyperlinks
/// (`ESC ] ... BEL` or `ESC ] ... ESC \`) and APC sequences (`ESC _ ...`).
pub fn strip_ansi(raw: &str) -> String {
    if !raw.contains(ESC) {
        return raw.to_owned();
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != ESC {
            out.push(ch);
            continue;
        }
        match chars.peek().copied() {
            Some('[') => {
                chars.next();
                for next in chars.by_ref() {
                    if ('@'..='~').contains(&next) {
                        break;
                    }
                }
            }
            Some(']') | Some('_') => {
                chars.next();
                while let Some(next) = chars.next() {
                    if next == BEL {
                        break;
                    }
                    if next == ESC && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    out
}

/// Terminal column width of `raw`, ignoring escape sequences.
pub fn visible_width(raw: &str) -> usize {
    strip_ansi(raw)
        .chars()
        .map(|ch| ch.width().unwrap_or(0))
        .sum()
}

/// Cuts `raw` so that its visible width does not exceed `width`.
///
/// Escape sequences are copied through without counting toward the width. When
/// a styled string is cut, a reset is appended so the style does not bleed into
/// whatever the caller renders next.
pub fn truncate_to_width(raw: &str, width: usize) -> String {
    if visible_width(raw) <= width {
        return raw.to_owned();
    }
    let mut out = String::with_capacity(raw.len());
    let mut used = 0usize;
    let mut saw_escape = false;
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == ESC && chars.peek() == Some(&'[') {
            saw_escape = true;
            out.push(ch);
            if let Some(open) = chars.next() {
                out.push(open);
            }
            for next in chars.by_ref() {
                out.push(next);
                if ('@'..='~').contains(&next) {
                    break;
                }
            }
            continue;
        }
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        used += ch_width;
        out.push(ch);
    }
    if saw_escape {
        out.push_str("\u{1b}[0m");
    }
    out
}

/// Pads `raw` with trailing spaces up to `width` visible columns.
pub fn pad_to_width(raw: &str, width: usize) -> String {
    let current = visible_width(raw);
    if current >= width {
        return raw.to_owned();
    }
    format!("{raw}{}", " ".repeat(width - current))
}
