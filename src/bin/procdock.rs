use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use procdock::config::ProcessesConfig;
use procdock::dock::DockStateManager;
use procdock::notify::{end_notification, NotificationLevel};
use procdock::process_manager::{ManagerOptions, NotifyPrefs, ProcessManager};
use procdock::tui::run_dock_tui;
use procdock::ui::{MessageBlock, NoticeLevel, OutputMode, PlainRenderer, Renderer};
use procdock::{parse_command, print_usage, Command, ExecArgs, RunArgs};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "PROCDOCK_LOG";
const EXEC_POLL: Duration = Duration::from_millis(50);

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let output_mode = OutputMode::from_env();
    let cmd = match parse_command(args) {
        Ok(cmd) => cmd,
        Err(err) => {
            let mut renderer = PlainRenderer::stderr(output_mode);
            let _ = renderer.error_block(
                &MessageBlock::new("Invalid command arguments", err.to_string())
                    .with_hint("Run `procdock --help` to see supported command forms"),
            );
            print_usage();
            std::process::exit(2);
        }
    };

    let code = match cmd {
        Command::Help => {
            print_usage();
            0
        }
        Command::Run(args) => with_manager(output_mode, |config, manager| {
            run_command(config, manager, args, output_mode)
        }),
        Command::Exec(args) => with_manager(output_mode, |config, manager| {
            exec_command(config, &manager, args, output_mode)
        }),
    };
    std::process::exit(code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads configuration and builds the manager; the manager is dropped (and
/// its session logs removed) before the exit code is returned.
fn with_manager<F>(output_mode: OutputMode, body: F) -> i32
where
    F: FnOnce(&ProcessesConfig, Arc<ProcessManager>) -> i32,
{
    let config = match ProcessesConfig::load_default() {
        Ok(config) => config,
        Err(err) => {
            let mut renderer = PlainRenderer::stderr(output_mode);
            let _ = renderer.error_block(&MessageBlock::new("Invalid configuration", err.to_string()));
            return 1;
        }
    };
    let manager = match ProcessManager::new(ManagerOptions::from_config(&config)) {
        Ok(manager) => Arc::new(manager),
        Err(err) => {
            let mut renderer = PlainRenderer::stderr(output_mode);
            let _ = renderer.error_block(
                &MessageBlock::new("Process manager unavailable", err.to_string())
                    .with_hint("Set [execution] shell_path in the procdock config"),
            );
            return 1;
        }
    };
    body(&config, manager)
}

fn run_command(
    config: &ProcessesConfig,
    manager: Arc<ProcessManager>,
    args: RunArgs,
    output_mode: OutputMode,
) -> i32 {
    let cwd = match args.cwd {
        Some(cwd) => cwd,
        None => match std::env::current_dir() {
            Ok(cwd) => cwd,
            Err(err) => {
                let mut renderer = PlainRenderer::stderr(output_mode);
                let _ = renderer.error_block(&MessageBlock::new(
                    "Working directory unavailable",
                    err.to_string(),
                ));
                return 1;
            }
        },
    };

    let dock = Arc::new(DockStateManager::new(config.follow_enabled));
    let record = manager.start(args.name.as_deref(), &args.command, &cwd, NotifyPrefs::default());
    dock.set_focus(Some(&record.id));

    match run_dock_tui(manager, dock, config) {
        Ok(counts) => i32::from(counts.failed > 0),
        Err(err) => {
            let mut renderer = PlainRenderer::stderr(output_mode);
            let _ = renderer.error_block(&MessageBlock::new("Dock session failed", err.to_string()));
            1
        }
    }
}

fn exec_command(
    config: &ProcessesConfig,
    manager: &ProcessManager,
    args: ExecArgs,
    output_mode: OutputMode,
) -> i32 {
    let cwd = std::env::current_dir().unwrap_or_else(|_| std::env::temp_dir());
    let started = manager.start(None, &args.command, &cwd, NotifyPrefs::default());
    let finished = loop {
        match manager.get(&started.id) {
            Some(record) if record.is_live() => thread::sleep(EXEC_POLL),
            Some(record) => break record,
            None => return 1,
        }
    };

    let mut stdout = PlainRenderer::stdout(output_mode);
    for line in manager
        .get_combined_output(&finished.id, config.clamp_tail(args.tail))
        .unwrap_or_default()
    {
        if stdout.log_line(&line).is_err() {
            break;
        }
    }

    if let Some(notification) = end_notification(&finished, SystemTime::now()) {
        let level = match notification.level {
            NotificationLevel::Info => NoticeLevel::Success,
            NotificationLevel::Warning => NoticeLevel::Warning,
            NotificationLevel::Error => NoticeLevel::Error,
        };
        let mut stderr = PlainRenderer::stderr(output_mode);
        let _ = stderr.notice(level, &notification.message);
    }

    finished.exit_code.unwrap_or(1)
}
