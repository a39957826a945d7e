use anstyle::{AnsiColor, Color, Effects, Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Auto,
    Always,
    Never,
}

impl OutputMode {
    pub fn from_env() -> Self {
        match std::env::var("PROCDOCK_COLOR").ok().as_deref() {
            Some("always") => OutputMode::Always,
            Some("never") => OutputMode::Never,
            _ => OutputMode::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub accent: Style,
    pub muted: Style,
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub label: Style,
    pub highlight: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Style::new()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan)))
                .bold(),
            muted: Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))),
            success: Style::new()
                .fg_color(Some(Color::Ansi(AnsiColor::Green)))
                .bold(),
            warning: Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
            error: Style::new()
                .fg_color(Some(Color::Ansi(AnsiColor::Red)))
                .bold(),
            label: Style::new()
                .fg_color(Some(Color::Ansi(AnsiColor::Blue)))
                .bold(),
            highlight: Style::new().effects(Effects::BOLD | Effects::INVERT),
        }
    }
}

/// Theme plus the decision whether to emit escapes at all.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    pub theme: Theme,
    pub enabled: bool,
}

impl Painter {
    pub fn new(enabled: bool) -> Self {
        Self {
            theme: Theme::default(),
            enabled,
        }
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn paint(&self, style: Style, text: &str) -> String {
        if !self.enabled || text.is_empty() {
            return text.to_owned();
        }
        format!("{}{}{}", style.render(), text, style.render_reset())
    }

    pub fn accent(&self, text: &str) -> String {
        self.paint(self.theme.accent, text)
    }

    pub fn muted(&self, text: &str) -> String {
        self.paint(self.theme.muted, text)
    }

    pub fn success(&self, text: &str) -> String {
        self.paint(self.theme.success, text)
    }

    pub fn warning(&self, text: &str) -> String {
        self.paint(self.theme.warning, text)
    }

    pub fn error(&self, text: &str) -> String {
        self.paint(self.theme.error, text)
    }

    pub fn highlight(&self, text: &str) -> String {
        self.paint(self.theme.highlight, text)
    }
}

pub fn resolve_color_enabled(mode: OutputMode, is_tty: bool) -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    match mode {
        OutputMode::Always => true,
        OutputMode::Never => false,
        OutputMode::Auto => is_tty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_painter_emits_no_escapes() {
        let painter = Painter::plain();
        assert_eq!(painter.warning("careful"), "careful");
    }

    #[test]
    fn enabled_painter_wraps_text_in_style_and_reset() {
        let painter = Painter::new(true);
        let painted = painter.error("boom");
        assert!(painted.starts_with('\u{1b}'));
        assert!(painted.contains("boom"));
        assert_eq!(crate::ansi::strip_ansi(&painted), "boom");
    }

    #[test]
    fn forced_modes_ignore_tty_detection() {
        if std::env::var_os("NO_COLOR").is_some() {
            return;
        }
        assert!(resolve_color_enabled(OutputMode::Always, false));
        assert!(!resolve_color_enabled(OutputMode::Never, true));
        assert!(resolve_color_enabled(OutputMode::Auto, true));
    }
}
