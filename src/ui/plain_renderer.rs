use std::io::{IsTerminal, Write};

use anstream::{AutoStream, ColorChoice};

use crate::ansi::strip_ansi;
use crate::log_store::{LogLine, StreamKind};
use crate::ui::renderer::{Renderer, UiResult};
use crate::ui::table::render_table;
use crate::ui::theme::{resolve_color_enabled, OutputMode, Painter};
use crate::ui::widgets::{KeyValue, MessageBlock, NoticeLevel, SummaryCounts, TableSpec};

pub struct PlainRenderer<W: Write> {
    writer: W,
    painter: Painter,
}

impl<W: Write> PlainRenderer<W> {
    pub fn new(writer: W, color_enabled: bool) -> Self {
        Self {
            writer,
            painter: Painter::new(color_enabled),
        }
    }

    pub fn painter(&self) -> Painter {
        self.painter
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_block(&mut self, marker: String, block: &MessageBlock) -> UiResult<()> {
        writeln!(self.writer, "{marker} {}", block.title)?;
        writeln!(self.writer, "  {}", block.body)?;
        if let Some(hint) = &block.hint {
            let hint_label = self.painter.muted("hint");
            writeln!(self.writer, "  {hint_label}: {hint}")?;
        }
        Ok(())
    }
}

fn color_choice(mode: OutputMode) -> ColorChoice {
    match mode {
        OutputMode::Auto => ColorChoice::Auto,
        OutputMode::Always => ColorChoice::AlwaysAnsi,
        OutputMode::Never => ColorChoice::Never,
    }
}

impl PlainRenderer<AutoStream<std::io::Stdout>> {
    pub fn stdout(mode: OutputMode) -> Self {
        let stream = AutoStream::new(std::io::stdout(), color_choice(mode));
        let color_enabled = resolve_color_enabled(mode, std::io::stdout().is_terminal());
        Self::new(stream, color_enabled)
    }
}

impl PlainRenderer<AutoStream<std::io::Stderr>> {
    pub fn stderr(mode: OutputMode) -> Self {
        let stream = AutoStream::new(std::io::stderr(), color_choice(mode));
        let color_enabled = resolve_color_enabled(mode, std::io::stderr().is_terminal());
        Self::new(stream, color_enabled)
    }
}

impl<W: Write> Renderer for PlainRenderer<W> {
    fn text(&mut self, body: &str) -> UiResult<()> {
        write!(self.writer, "{body}")?;
        if !body.ends_with('\n') {
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn section(&mut self, title: &str) -> UiResult<()> {
        let rendered = self.painter.accent(title);
        let underline = self.painter.muted(&"─".repeat(title.chars().count()));
        writeln!(self.writer, "{rendered}")?;
        writeln!(self.writer, "{underline}")?;
        Ok(())
    }

    fn notice(&mut self, level: NoticeLevel, body: &str) -> UiResult<()> {
        let (label, marker) = match level {
            NoticeLevel::Info => ("info", self.painter.accent("•")),
            NoticeLevel::Success => ("ok", self.painter.success("•")),
            NoticeLevel::Warning => ("warn", self.painter.warning("•")),
            NoticeLevel::Error => ("error", self.painter.error("•")),
        };
        let label = self.painter.muted(label);
        writeln!(self.writer, "{marker} {label}: {body}")?;
        Ok(())
    }

    fn error_block(&mut self, block: &MessageBlock) -> UiResult<()> {
        let marker = self.painter.error("[error]");
        self.write_block(marker, block)
    }

    fn warning_block(&mut self, block: &MessageBlock) -> UiResult<()> {
        let marker = self.painter.warning("[warning]");
        self.write_block(marker, block)
    }

    fn key_values(&mut self, items: &[KeyValue]) -> UiResult<()> {
        for item in items {
            let key = self.painter.paint(self.painter.theme.label, &item.key);
            writeln!(self.writer, "{key}: {}", item.value)?;
        }
        Ok(())
    }

    fn summary(&mut self, counts: SummaryCounts) -> UiResult<()> {
        let running = self.painter.accent(&counts.running.to_string());
        let done = self.painter.success(&counts.done.to_string());
        let failed = self.painter.error(&counts.failed.to_string());
        writeln!(
            self.writer,
            "summary  running:{running}  done:{done}  failed:{failed}"
        )?;
        Ok(())
    }

    fn table(&mut self, spec: &TableSpec) -> UiResult<()> {
        let rendered = render_table(spec);
        writeln!(self.writer, "{rendered}")?;
        Ok(())
    }

    fn log_line(&mut self, line: &LogLine) -> UiResult<()> {
        let text = if self.painter.enabled {
            line.text.clone()
        } else {
            strip_ansi(&line.text)
        };
        let tag = match line.kind {
            StreamKind::Stdout => self.painter.muted("[out]"),
            StreamKind::Stderr => self.painter.warning("[err]"),
        };
        writeln!(self.writer, "{tag} {text}")?;
        Ok(())
    }
}
