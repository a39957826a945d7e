use std::fmt::{Display, Formatter};

use crate::log_store::LogLine;
use crate::ui::widgets::{KeyValue, MessageBlock, NoticeLevel, SummaryCounts, TableSpec};

pub type UiResult<T> = Result<T, UiError>;

#[derive(Debug)]
pub enum UiError {
    Io(std::io::Error),
}

impl Display for UiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UiError::Io(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for UiError {}

impl From<std::io::Error> for UiError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

pub trait Renderer {
    fn text(&mut self, body: &str) -> UiResult<()>;
    fn section(&mut self, title: &str) -> UiResult<()>;
    fn notice(&mut self, level: NoticeLevel, body: &str) -> UiResult<()>;

    fn error_block(&mut self, block: &MessageBlock) -> UiResult<()>;
    fn warning_block(&mut self, block: &MessageBlock) -> UiResult<()>;

    fn key_values(&mut self, items: &[KeyValue]) -> UiResult<()>;
    fn summary(&mut self, counts: SummaryCounts) -> UiResult<()>;
    fn table(&mut self, spec: &TableSpec) -> UiResult<()>;

    /// One captured output line, tagged with its stream.
    fn log_line(&mut self, line: &LogLine) -> UiResult<()>;
}
