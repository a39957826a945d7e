use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, warn};

const STDOUT_TAG: &[u8] = b"1:";
const STDERR_TAG: &[u8] = b"2:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn label(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }

    fn tag(self) -> &'static [u8] {
        match self {
            StreamKind::Stdout => STDOUT_TAG,
            StreamKind::Stderr => STDERR_TAG,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    #[serde(rename = "type")]
    pub kind: StreamKind,
    pub text: String,
}

impl LogLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            kind: StreamKind::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            kind: StreamKind::Stderr,
            text: text.into(),
        }
    }
}

/// How a log file's lines are interpreted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    /// Raw lines from a single-stream file; every line is stdout.
    Plain,
    /// `1:`/`2:` tagged lines from the combined file.
    Combined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFiles {
    pub stdout_file: PathBuf,
    pub stderr_file: PathBuf,
    pub combined_file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LogSizes {
    pub stdout: u64,
    pub stderr: u64,
}

impl LogFiles {
    pub fn for_process(dir: &Path, id: &str) -> Self {
        Self {
            stdout_file: dir.join(format!("{id}-stdout.log")),
            stderr_file: dir.join(format!("{id}-stderr.log")),
            combined_file: dir.join(format!("{id}-combined.log")),
        }
    }

    pub fn paths(&self) -> [&Path; 3] {
        [
            self.stdout_file.as_path(),
            self.stderr_file.as_path(),
            self.combined_file.as_path(),
        ]
    }

    /// Best-effort removal; missing files are not an error.
    pub fn remove(&self) {
        for path in self.paths() {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => debug!(path = %path.display(), %error, "failed to remove log file"),
            }
        }
    }

    pub fn sizes(&self) -> LogSizes {
        LogSizes {
            stdout: file_size(&self.stdout_file),
            stderr: file_size(&self.stderr_file),
        }
    }
}

fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|meta| meta.len()).unwrap_or(0)
}

/// Append-only sink for one process's output.
///
/// Raw chunks go verbatim to the per-stream files and, as they arrive, to the
/// combined file with a stream tag at the start of every line. An
/// unterminated line stays open at the end of the combined file; when the
/// other stream writes first, that line is closed so each combined line
/// carries bytes from one stream only.
pub struct LogWriter {
    process: String,
    stdout: Mutex<File>,
    stderr: Mutex<File>,
    combined: Mutex<CombinedSink>,
}

struct CombinedSink {
    file: File,
    /// Stream whose line is unterminated at the end of the file.
    open_line: Option<StreamKind>,
}

impl LogWriter {
    /// Creates (or truncates) all three files for `process`.
    pub fn create(process: impl Into<String>, files: &LogFiles) -> io::Result<Self> {
        let stdout = open_fresh(&files.stdout_file)?;
        let stderr = open_fresh(&files.stderr_file)?;
        let combined = open_fresh(&files.combined_file)?;
        Ok(Self {
            process: process.into(),
            stdout: Mutex::new(stdout),
            stderr: Mutex::new(stderr),
            combined: Mutex::new(CombinedSink {
                file: combined,
                open_line: None,
            }),
        })
    }

    pub fn append(&self, kind: StreamKind, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        {
            let mut raw = lock(match kind {
                StreamKind::Stdout => &self.stdout,
                StreamKind::Stderr => &self.stderr,
            });
            if let Err(error) = raw.write_all(chunk) {
                warn!(process = %self.process, stream = kind.label(), %error, "log append failed");
            }
        }

        let mut sink = lock(&self.combined);
        let mut rendered = Vec::with_capacity(chunk.len() + 2 * STDOUT_TAG.len() + 1);
        let mut at_line_start = match sink.open_line {
            Some(open) if open == kind => false,
            Some(_) => {
                rendered.push(b'\n');
                true
            }
            None => true,
        };
        for piece in chunk.split_inclusive(|byte| *byte == b'\n') {
            if at_line_start {
                rendered.extend_from_slice(kind.tag());
            }
            rendered.extend_from_slice(piece);
            at_line_start = piece.ends_with(b"\n");
        }
        sink.open_line = (!at_line_start).then_some(kind);
        sink.write(&self.process, &rendered);
    }

    /// Terminates the combined file's open line if it belongs to `kind`.
    pub fn flush_partial(&self, kind: StreamKind) {
        let mut sink = lock(&self.combined);
        if sink.open_line != Some(kind) {
            return;
        }
        sink.open_line = None;
        sink.write(&self.process, b"\n");
    }
}

impl CombinedSink {
    fn write(&mut self, process: &str, bytes: &[u8]) {
        if let Err(error) = self.file.write_all(bytes) {
            warn!(process = %process, %error, "combined log append failed");
        }
    }
}

fn open_fresh(path: &Path) -> io::Result<File> {
    File::create(path)?;
    OpenOptions::new().append(true).open(path)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Splits file content into lines, dropping the empty tail left by a final newline.
pub fn split_lines(content: &str) -> Vec<&str> {
    let mut lines = content.split('\n').collect::<Vec<&str>>();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}

pub fn parse_combined_line(line: &str) -> LogLine {
    if let Some(text) = line.strip_prefix("2:") {
        return LogLine::stderr(text);
    }
    LogLine::stdout(line.strip_prefix("1:").unwrap_or(line))
}

pub fn parse_lines(content: &str, format: LineFormat) -> Vec<LogLine> {
    let lines = split_lines(content);
    match format {
        LineFormat::Plain => lines.into_iter().map(LogLine::stdout).collect(),
        LineFormat::Combined => lines.into_iter().map(parse_combined_line).collect(),
    }
}

/// Reads the whole file; unreadable files yield no lines.
pub fn read_lines(path: &Path, format: LineFormat) -> Vec<LogLine> {
    match read_text(path) {
        Some(content) => parse_lines(&content, format),
        None => Vec::new(),
    }
}

pub fn read_text(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(error) => {
            debug!(path = %path.display(), %error, "log read failed");
            None
        }
    }
}

pub fn read_tail_lines(path: &Path, tail: usize) -> Vec<String> {
    let Some(content) = read_text(path) else {
        return Vec::new();
    };
    let lines = split_lines(&content);
    let skip = lines.len().saturating_sub(tail);
    lines[skip..].iter().map(|line| (*line).to_owned()).collect()
}

pub fn tail<T>(mut items: Vec<T>, count: usize) -> Vec<T> {
    let skip = items.len().saturating_sub(count);
    items.drain(..skip);
    items
}
