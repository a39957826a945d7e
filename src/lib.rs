pub mod ansi;
pub mod config;
pub mod dock;
pub mod log_store;
pub mod notify;
pub mod process_manager;
pub mod shell;
pub mod status;
pub mod tui;
pub mod ui;
pub mod viewer;

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(RunArgs),
    Exec(ExecArgs),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    pub name: Option<String>,
    pub cwd: Option<PathBuf>,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecArgs {
    /// Trailing lines to print; the config default applies when unset.
    pub tail: Option<usize>,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliParseError {
    MissingNameValue,
    MissingCwdValue,
    InvalidTail(Option<String>),
    MissingCommand,
    UnknownArgument(String),
}

impl std::fmt::Display for CliParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliParseError::MissingNameValue => write!(f, "--name requires a value"),
            CliParseError::MissingCwdValue => write!(f, "--cwd requires a value"),
            CliParseError::InvalidTail(None) => write!(f, "--tail requires a value"),
            CliParseError::InvalidTail(Some(value)) => {
                write!(f, "--tail expects a line count, got `{value}`")
            }
            CliParseError::MissingCommand => write!(f, "no command given"),
            CliParseError::UnknownArgument(arg) => write!(f, "unknown argument: {arg}"),
        }
    }
}

impl std::error::Error for CliParseError {}

pub fn parse_command<I>(args: I) -> Result<Command, CliParseError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let Some(cmd) = args.next() else {
        return Ok(Command::Help);
    };

    match cmd.as_str() {
        "--help" | "-h" | "help" => Ok(Command::Help),
        "run" => parse_run(args),
        "exec" => parse_exec(args),
        other => Err(CliParseError::UnknownArgument(other.to_owned())),
    }
}

fn parse_run<I>(args: I) -> Result<Command, CliParseError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut name: Option<String> = None;
    let mut cwd: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--name" => {
                let Some(value) = args.next() else {
                    return Err(CliParseError::MissingNameValue);
                };
                name = Some(value);
            }
            "--cwd" => {
                let Some(path) = args.next() else {
                    return Err(CliParseError::MissingCwdValue);
                };
                cwd = Some(PathBuf::from(path));
            }
            "--help" | "-h" => return Ok(Command::Help),
            "--" => break,
            other => return Err(CliParseError::UnknownArgument(other.to_owned())),
        }
    }

    let command = join_command(args)?;
    Ok(Command::Run(RunArgs { name, cwd, command }))
}

fn parse_exec<I>(args: I) -> Result<Command, CliParseError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter().peekable();
    let mut tail: Option<usize> = None;

    // Options come first; the first other word starts the command.
    while let Some(arg) = args.peek() {
        match arg.as_str() {
            "--tail" => {
                args.next();
                let value = args.next().ok_or(CliParseError::InvalidTail(None))?;
                let count = value
                    .parse::<usize>()
                    .map_err(|_| CliParseError::InvalidTail(Some(value)))?;
                tail = Some(count);
            }
            "--" => {
                args.next();
                break;
            }
            _ => break,
        }
    }

    let command = join_command(args)?;
    Ok(Command::Exec(ExecArgs { tail, command }))
}

/// Rejoins the remaining words into one shell command line.
fn join_command<I>(args: I) -> Result<String, CliParseError>
where
    I: IntoIterator<Item = String>,
{
    let command = args.into_iter().collect::<Vec<String>>().join(" ");
    if command.trim().is_empty() {
        return Err(CliParseError::MissingCommand);
    }
    Ok(command)
}

pub fn print_usage() {
    eprintln!(
        "procdock\n\nUSAGE:\n  procdock run [--name <NAME>] [--cwd <DIR>] -- <command...>\n  procdock exec [--tail <N>] <command...>\n\nCOMMANDS:\n  run               Start a command in the background and open the dock\n  exec              Run a command, print its tagged output, exit with its code\n\nOPTIONS (run):\n  --name <NAME>     Display name (defaults to one inferred from the command)\n  --cwd <DIR>       Working directory (defaults to the current directory)\n\nOPTIONS (exec):\n  --tail <N>        Print the last N lines (capped by [output] max_output_lines)\n\nENVIRONMENT:\n  PROCDOCK_CONFIG   Path to config.toml\n  PROCDOCK_COLOR    auto | always | never\n  PROCDOCK_LOG      tracing filter, e.g. procdock=debug\n\nGENERAL:\n  -h, --help        Print help\n"
    );
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
