use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "PROCDOCK_CONFIG";

#[derive(Debug, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    process_list: Option<ProcessListSection>,
    #[serde(default)]
    output: Option<OutputSection>,
    #[serde(default)]
    execution: Option<ExecutionSection>,
    #[serde(default)]
    widget: Option<WidgetSection>,
    #[serde(default)]
    dock: Option<DockSection>,
    #[serde(default)]
    kill: Option<KillSection>,
}

#[derive(Debug, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ProcessListSection {
    max_visible_processes: Option<usize>,
    max_preview_lines: Option<usize>,
}

#[derive(Debug, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct OutputSection {
    default_tail_lines: Option<usize>,
    max_output_lines: Option<usize>,
}

#[derive(Debug, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ExecutionSection {
    shell_path: Option<PathBuf>,
}

#[derive(Debug, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct WidgetSection {
    show_status_widget: Option<bool>,
}

#[derive(Debug, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DockSection {
    follow_enabled: Option<bool>,
    poll_interval_ms: Option<u64>,
}

#[derive(Debug, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct KillSection {
    term_timeout_ms: Option<u64>,
    kill_timeout_ms: Option<u64>,
}

/// Fully resolved settings; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessesConfig {
    pub max_visible_processes: usize,
    pub max_preview_lines: usize,
    pub default_tail_lines: usize,
    pub max_output_lines: usize,
    pub shell_path: Option<PathBuf>,
    pub show_status_widget: bool,
    pub follow_enabled: bool,
    pub poll_interval: Duration,
    pub term_timeout: Duration,
    pub kill_timeout: Duration,
}

impl Default for ProcessesConfig {
    fn default() -> Self {
        Self {
            max_visible_processes: 8,
            max_preview_lines: 12,
            default_tail_lines: 100,
            max_output_lines: 200,
            shell_path: None,
            show_status_widget: true,
            follow_enabled: true,
            poll_interval: Duration::from_millis(500),
            term_timeout: Duration::from_millis(3000),
            kill_timeout: Duration::from_millis(200),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        error: std::io::Error,
    },
    Parse {
        path: PathBuf,
        error: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, error } => {
                write!(f, "failed to read config {}: {error}", path.display())
            }
            ConfigError::Parse { path, error } => {
                write!(f, "failed to parse config {}: {error}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ProcessesConfig {
    pub fn from_toml_str(source: &str, path: &Path) -> Result<Self, ConfigError> {
        let file = toml::from_str::<ConfigFile>(source).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })?;
        Ok(Self::resolve(file))
    }

    /// Loads `path`; a missing file resolves to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(source) => Self::from_toml_str(&source, path),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                error,
            }),
        }
    }

    pub fn load_default() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    fn resolve(file: ConfigFile) -> Self {
        let defaults = Self::default();
        let process_list = file.process_list.unwrap_or_default();
        let output = file.output.unwrap_or_default();
        let execution = file.execution.unwrap_or_default();
        let widget = file.widget.unwrap_or_default();
        let dock = file.dock.unwrap_or_default();
        let kill = file.kill.unwrap_or_default();

        let max_output_lines = output
            .max_output_lines
            .unwrap_or(defaults.max_output_lines)
            .max(1);
        Self {
            max_visible_processes: process_list
                .max_visible_processes
                .unwrap_or(defaults.max_visible_processes),
            max_preview_lines: process_list
                .max_preview_lines
                .unwrap_or(defaults.max_preview_lines),
            default_tail_lines: output
                .default_tail_lines
                .unwrap_or(defaults.default_tail_lines)
                .min(max_output_lines),
            max_output_lines,
            shell_path: execution.shell_path.filter(|path| !path.as_os_str().is_empty()),
            show_status_widget: widget
                .show_status_widget
                .unwrap_or(defaults.show_status_widget),
            follow_enabled: dock.follow_enabled.unwrap_or(defaults.follow_enabled),
            poll_interval: dock
                .poll_interval_ms
                .map(|ms| Duration::from_millis(ms.clamp(50, 5000)))
                .unwrap_or(defaults.poll_interval),
            term_timeout: kill
                .term_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.term_timeout),
            kill_timeout: kill
                .kill_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.kill_timeout),
        }
    }

    /// Tail length for output queries, capped at `max_output_lines`.
    pub fn clamp_tail(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_tail_lines)
            .min(self.max_output_lines)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("procdock").join("config.toml"))
}
