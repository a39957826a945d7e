use std::io::{ErrorKind, Read, Write};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command as ProcessCommand, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use nix::sys::signal::{kill, Signal};
use nix::unistd::{setpgid, Pid};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ProcessesConfig;
use crate::log_store::{
    self, LineFormat, LogFiles, LogLine, LogSizes, LogWriter, StreamKind,
};
use crate::shell::{resolve_shell_executable, ShellNotFound, DEFAULT_KNOWN_SHELL_PATHS};

mod events;
mod kill_timer;
mod naming;
mod record;

pub use events::{EventBus, ProcessEvent, Subscription};
pub use naming::infer_name;
pub use record::{NotifyPrefs, ProcessRecord, ProcessStatus};

use kill_timer::KillTimer;

const PUMP_BUFFER_BYTES: usize = 8 * 1024;

#[derive(Debug)]
pub enum ProcessManagerError {
    Shell(ShellNotFound),
    LogDir {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl std::fmt::Display for ProcessManagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessManagerError::Shell(err) => write!(f, "{err}"),
            ProcessManagerError::LogDir { path, error } => write!(
                f,
                "failed to create log directory `{}`: {error}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ProcessManagerError {}

impl From<ShellNotFound> for ProcessManagerError {
    fn from(value: ShellNotFound) -> Self {
        Self::Shell(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillSignal {
    Term,
    Kill,
    Int,
    Hup,
}

impl KillSignal {
    fn as_nix(self) -> Signal {
        match self {
            KillSignal::Term => Signal::SIGTERM,
            KillSignal::Kill => Signal::SIGKILL,
            KillSignal::Int => Signal::SIGINT,
            KillSignal::Hup => Signal::SIGHUP,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_ascii_uppercase();
        match upper.strip_prefix("SIG").unwrap_or(&upper) {
            "TERM" | "15" => Some(KillSignal::Term),
            "KILL" | "9" => Some(KillSignal::Kill),
            "INT" | "2" => Some(KillSignal::Int),
            "HUP" | "1" => Some(KillSignal::Hup),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KillOptions {
    /// Defaults to SIGTERM.
    pub signal: Option<KillSignal>,
    /// Defaults to the manager's term/kill timeout for the chosen signal.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    /// The requested signal was sent and an escalation timer armed.
    Signalled,
    /// A repeat request on a stopping process; SIGKILL was sent right away.
    Escalated,
    /// The process had already finished; nothing changed.
    AlreadyFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillError {
    NotFound,
}

impl KillError {
    pub fn reason(self) -> &'static str {
        match self {
            KillError::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for KillError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

impl std::error::Error for KillError {}

#[derive(Debug)]
pub enum StdinError {
    NotFound,
    ProcessExited,
    StdinClosed,
    Write(std::io::Error),
}

impl StdinError {
    pub fn reason(&self) -> &'static str {
        match self {
            StdinError::NotFound => "not_found",
            StdinError::ProcessExited => "process_exited",
            StdinError::StdinClosed => "stdin_closed",
            StdinError::Write(_) => "write_error",
        }
    }
}

impl std::fmt::Display for StdinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StdinError::Write(error) => write!(f, "write_error: {error}"),
            other => f.write_str(other.reason()),
        }
    }
}

impl std::error::Error for StdinError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub status: ProcessStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FullOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerOptions {
    /// Parent of the session log directory.
    pub log_root: PathBuf,
    pub shell_path: Option<PathBuf>,
    pub known_shell_paths: Vec<PathBuf>,
    pub term_timeout: Duration,
    pub kill_timeout: Duration,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self::from_config(&ProcessesConfig::default())
    }
}

impl ManagerOptions {
    pub fn from_config(config: &ProcessesConfig) -> Self {
        Self {
            log_root: std::env::temp_dir(),
            shell_path: config.shell_path.clone(),
            known_shell_paths: DEFAULT_KNOWN_SHELL_PATHS
                .iter()
                .map(PathBuf::from)
                .collect(),
            term_timeout: config.term_timeout,
            kill_timeout: config.kill_timeout,
        }
    }

    pub fn with_log_root(mut self, log_root: impl Into<PathBuf>) -> Self {
        self.log_root = log_root.into();
        self
    }
}

struct ManagedProcess {
    record: ProcessRecord,
    stdin: Option<Arc<Mutex<Option<ChildStdin>>>>,
    kill_requested: bool,
    timer: Option<KillTimer>,
}

#[derive(Default)]
struct Registry {
    counter: u64,
    entries: Vec<ManagedProcess>,
}

impl Registry {
    fn get(&self, id: &str) -> Option<&ManagedProcess> {
        self.entries.iter().find(|entry| entry.record.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut ManagedProcess> {
        self.entries.iter_mut().find(|entry| entry.record.id == id)
    }
}

struct Shared {
    registry: Mutex<Registry>,
    events: EventBus,
    log_dir: PathBuf,
    shell: PathBuf,
    term_timeout: Duration,
    kill_timeout: Duration,
}

/// Owns every managed process for one session.
///
/// Output is captured into per-process files under a session directory that is
/// removed by [`ProcessManager::cleanup`] (also run on drop).
pub struct ProcessManager {
    shared: Arc<Shared>,
}

impl ProcessManager {
    pub fn new(options: ManagerOptions) -> Result<Self, ProcessManagerError> {
        let shell =
            resolve_shell_executable(options.shell_path.as_deref(), &options.known_shell_paths)?;
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let log_dir = options
            .log_root
            .join(format!("procdock-{}-{stamp}", std::process::id()));
        std::fs::create_dir_all(&log_dir).map_err(|error| ProcessManagerError::LogDir {
            path: log_dir.clone(),
            error,
        })?;
        debug!(log_dir = %log_dir.display(), shell = %shell.display(), "process manager ready");

        Ok(Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                events: EventBus::default(),
                log_dir,
                shell,
                term_timeout: options.term_timeout,
                kill_timeout: options.kill_timeout,
            }),
        })
    }

    pub fn log_dir(&self) -> &Path {
        &self.shared.log_dir
    }

    pub fn shell(&self) -> &Path {
        &self.shared.shell
    }

    /// Spawns `command` through the shell and returns immediately.
    ///
    /// Spawn failures do not surface here: the returned record is already
    /// `exited` with `exit_code = -1` and the error is in the stderr log.
    pub fn start(
        &self,
        name: Option<&str>,
        command: &str,
        cwd: &Path,
        notify: NotifyPrefs,
    ) -> ProcessRecord {
        let id = {
            let mut registry = self.shared.lock_registry();
            registry.counter += 1;
            format!("proc_{}", registry.counter)
        };
        let name = name
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| infer_name(command));
        let log_files = LogFiles::for_process(&self.shared.log_dir, &id);
        let mut record = ProcessRecord {
            id: id.clone(),
            name,
            pid: None,
            command: command.to_owned(),
            cwd: cwd.to_path_buf(),
            start_time: SystemTime::now(),
            end_time: None,
            status: ProcessStatus::Running,
            exit_code: None,
            success: None,
            log_files: log_files.clone(),
            notify,
        };

        let writer = match LogWriter::create(id.clone(), &log_files) {
            Ok(writer) => Arc::new(writer),
            Err(error) => {
                warn!(process = %id, %error, "failed to create log files");
                return self.record_spawn_failure(record, None, &error);
            }
        };

        let mut child = match self.spawn_shell(command, cwd) {
            Ok(child) => child,
            Err(error) => {
                return self.record_spawn_failure(record, Some(writer.as_ref()), &error)
            }
        };
        record.pid = Some(child.id());
        let stdin = child.stdin.take().map(|pipe| Arc::new(Mutex::new(Some(pipe))));
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        self.shared.lock_registry().entries.push(ManagedProcess {
            record: record.clone(),
            stdin,
            kill_requested: false,
            timer: None,
        });
        debug!(process = %id, pid = ?record.pid, command, "process started");
        self.shared.events.emit(&ProcessEvent::ProcessStarted {
            info: record.clone(),
        });

        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = stdout {
            pumps.push(spawn_pump(stdout, StreamKind::Stdout, writer.clone()));
        }
        if let Some(stderr) = stderr {
            pumps.push(spawn_pump(stderr, StreamKind::Stderr, writer.clone()));
        }

        let shared = self.shared.clone();
        thread::spawn(move || {
            let status = child.wait();
            for pump in pumps {
                let _ = pump.join();
            }
            match status {
                Ok(status) => shared.finish(&id, Some(status)),
                Err(error) => {
                    writer.append(
                        StreamKind::Stderr,
                        format!("Process error: {error}\n").as_bytes(),
                    );
                    shared.finish(&id, None);
                }
            }
        });

        record
    }

    fn spawn_shell(&self, command: &str, cwd: &Path) -> std::io::Result<Child> {
        let mut process = ProcessCommand::new(&self.shared.shell);
        process
            .arg("-lc")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group: detached from the caller's terminal signals, and
        // lets kill() reach the whole pipeline.
        unsafe {
            process.pre_exec(|| {
                setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(|error| std::io::Error::new(ErrorKind::Other, error.to_string()))
            });
        }
        process.spawn()
    }

    fn record_spawn_failure(
        &self,
        mut record: ProcessRecord,
        writer: Option<&LogWriter>,
        error: &std::io::Error,
    ) -> ProcessRecord {
        warn!(process = %record.id, command = %record.command, %error, "spawn failed");
        if let Some(writer) = writer {
            writer.append(
                StreamKind::Stderr,
                format!("Process error: {error}\n").as_bytes(),
            );
        }
        record.status = ProcessStatus::Exited;
        record.exit_code = Some(-1);
        record.success = Some(false);
        record.end_time = Some(SystemTime::now());

        let started = ProcessRecord {
            status: ProcessStatus::Running,
            exit_code: None,
            success: None,
            end_time: None,
            ..record.clone()
        };
        self.shared.lock_registry().entries.push(ManagedProcess {
            record: record.clone(),
            stdin: None,
            kill_requested: false,
            timer: None,
        });
        self.shared
            .events
            .emit(&ProcessEvent::ProcessStarted { info: started });
        self.shared.events.emit(&ProcessEvent::ProcessEnded {
            info: record.clone(),
        });
        record
    }

    pub fn list(&self) -> Vec<ProcessRecord> {
        self.shared
            .lock_registry()
            .entries
            .iter()
            .map(|entry| entry.record.clone())
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<ProcessRecord> {
        self.shared
            .lock_registry()
            .get(id)
            .map(|entry| entry.record.clone())
    }

    /// Resolves `query` as an exact id, then a name substring, then a command
    /// substring (both case-insensitive), returning the first hit.
    pub fn find(&self, query: &str) -> Option<ProcessRecord> {
        let registry = self.shared.lock_registry();
        if let Some(entry) = registry.get(query) {
            return Some(entry.record.clone());
        }
        let needle = query.to_lowercase();
        let records = || registry.entries.iter().map(|entry| &entry.record);
        records()
            .find(|record| record.name.to_lowercase().contains(&needle))
            .or_else(|| records().find(|record| record.command.to_lowercase().contains(&needle)))
            .cloned()
    }

    pub fn has_live_processes(&self) -> bool {
        self.shared
            .lock_registry()
            .entries
            .iter()
            .any(|entry| entry.record.is_live())
    }

    /// Graceful-then-forced termination.
    ///
    /// On a running process this sends the requested signal, moves it to
    /// `terminating` and arms a timer; if the process is still alive when the
    /// timer fires it moves to `terminate_timeout` and receives SIGKILL. A
    /// repeat request while stopping sends SIGKILL immediately.
    pub fn kill(&self, id: &str, options: KillOptions) -> Result<KillOutcome, KillError> {
        let mut registry = self.shared.lock_registry();
        let entry = registry.get_mut(id).ok_or(KillError::NotFound)?;
        match entry.record.status {
            ProcessStatus::Killed | ProcessStatus::Exited => Ok(KillOutcome::AlreadyFinished),
            ProcessStatus::Terminating | ProcessStatus::TerminateTimeout => {
                if let Some(timer) = entry.timer.take() {
                    timer.cancel();
                }
                entry.record.status = ProcessStatus::TerminateTimeout;
                debug!(process = %id, "repeat kill request, escalating to SIGKILL");
                signal_process_group(id, entry.record.pid, Signal::SIGKILL);
                Ok(KillOutcome::Escalated)
            }
            ProcessStatus::Running => {
                let signal = options.signal.unwrap_or(KillSignal::Term);
                let timeout = options.timeout.unwrap_or(match signal {
                    KillSignal::Kill => self.shared.kill_timeout,
                    _ => self.shared.term_timeout,
                });
                entry.kill_requested = true;
                entry.record.status = ProcessStatus::Terminating;
                debug!(process = %id, ?signal, ?timeout, "terminating process");
                signal_process_group(id, entry.record.pid, signal.as_nix());

                let shared = Arc::downgrade(&self.shared);
                let target = id.to_owned();
                entry.timer = Some(KillTimer::arm(timeout, move || {
                    if let Some(shared) = Weak::upgrade(&shared) {
                        shared.escalate(&target);
                    }
                }));
                Ok(KillOutcome::Signalled)
            }
        }
    }

    /// Requests termination of every running process.
    pub fn kill_all(&self) {
        let running = self
            .list()
            .into_iter()
            .filter(|record| record.status == ProcessStatus::Running)
            .map(|record| record.id)
            .collect::<Vec<String>>();
        for id in running {
            let _ = self.kill(&id, KillOptions::default());
        }
    }

    pub fn write_to_stdin(&self, id: &str, data: &[u8], end: bool) -> Result<(), StdinError> {
        let pipe = {
            let registry = self.shared.lock_registry();
            let entry = registry.get(id).ok_or(StdinError::NotFound)?;
            if !entry.record.is_live() {
                return Err(StdinError::ProcessExited);
            }
            entry.stdin.clone().ok_or(StdinError::StdinClosed)?
        };

        let mut guard = lock(&pipe);
        let stdin = guard.as_mut().ok_or(StdinError::StdinClosed)?;
        stdin
            .write_all(data)
            .and_then(|_| stdin.flush())
            .map_err(StdinError::Write)?;
        if end {
            *guard = None;
        }
        Ok(())
    }

    /// Drops every finished record and deletes its log files.
    pub fn clear_finished(&self) -> usize {
        let removed = {
            let mut registry = self.shared.lock_registry();
            let (finished, live): (Vec<ManagedProcess>, Vec<ManagedProcess>) = registry
                .entries
                .drain(..)
                .partition(|entry| entry.record.status.is_terminal());
            registry.entries = live;
            finished
        };
        for entry in &removed {
            entry.record.log_files.remove();
        }
        removed.len()
    }

    pub fn get_output(&self, id: &str, tail_lines: usize) -> Option<ProcessOutput> {
        let record = self.get(id)?;
        Some(ProcessOutput {
            stdout: log_store::read_tail_lines(&record.log_files.stdout_file, tail_lines),
            stderr: log_store::read_tail_lines(&record.log_files.stderr_file, tail_lines),
            status: record.status,
        })
    }

    pub fn get_combined_output(&self, id: &str, tail_lines: usize) -> Option<Vec<LogLine>> {
        let files = self.get_log_files(id)?;
        let lines = log_store::read_lines(&files.combined_file, LineFormat::Combined);
        Some(log_store::tail(lines, tail_lines))
    }

    pub fn get_full_output(&self, id: &str) -> Option<FullOutput> {
        let files = self.get_log_files(id)?;
        Some(FullOutput {
            stdout: log_store::read_text(&files.stdout_file).unwrap_or_default(),
            stderr: log_store::read_text(&files.stderr_file).unwrap_or_default(),
        })
    }

    pub fn get_log_files(&self, id: &str) -> Option<LogFiles> {
        self.shared
            .lock_registry()
            .get(id)
            .map(|entry| entry.record.log_files.clone())
    }

    pub fn get_file_size(&self, id: &str) -> Option<LogSizes> {
        self.get_log_files(id).map(|files| files.sizes())
    }

    pub fn on_event<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ProcessEvent) + Send + Sync + 'static,
    {
        self.shared.events.subscribe(listener)
    }

    /// Kills everything still running and removes the session log directory.
    pub fn cleanup(&self) {
        self.kill_all();
        if let Err(error) = std::fs::remove_dir_all(&self.shared.log_dir) {
            if error.kind() != ErrorKind::NotFound {
                debug!(log_dir = %self.shared.log_dir.display(), %error, "log dir cleanup failed");
            }
        }
    }
}

impl Drop for ProcessManager {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl Shared {
    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        lock(&self.registry)
    }

    fn escalate(&self, id: &str) {
        let mut registry = self.lock_registry();
        let Some(entry) = registry.get_mut(id) else {
            return;
        };
        if entry.record.status != ProcessStatus::Terminating {
            return;
        }
        entry.timer = None;
        entry.record.status = ProcessStatus::TerminateTimeout;
        debug!(process = %id, "terminate timeout, escalating to SIGKILL");
        signal_process_group(id, entry.record.pid, Signal::SIGKILL);
    }

    /// Terminal transition once the child is reaped and its pipes drained.
    /// `None` means waiting on the child failed.
    fn finish(&self, id: &str, status: Option<ExitStatus>) {
        let info = {
            let mut registry = self.lock_registry();
            let Some(entry) = registry.get_mut(id) else {
                return;
            };
            if entry.record.status.is_terminal() {
                return;
            }
            if let Some(timer) = entry.timer.take() {
                timer.cancel();
            }
            entry.stdin = None;

            let record = &mut entry.record;
            match status {
                Some(status) => {
                    let by_signal = status.signal().is_some();
                    record.status = if entry.kill_requested || by_signal {
                        ProcessStatus::Killed
                    } else {
                        ProcessStatus::Exited
                    };
                    record.exit_code = status.code();
                    record.success = Some(status.code() == Some(0));
                }
                None => {
                    record.status = ProcessStatus::Exited;
                    record.exit_code = Some(-1);
                    record.success = Some(false);
                }
            }
            record.end_time = Some(SystemTime::now());
            debug!(process = %id, status = %record.status, exit_code = ?record.exit_code, "process ended");
            record.clone()
        };
        self.events.emit(&ProcessEvent::ProcessEnded { info });
    }
}

fn spawn_pump<R>(mut source: R, kind: StreamKind, writer: Arc<LogWriter>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = [0u8; PUMP_BUFFER_BYTES];
        loop {
            match source.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => writer.append(kind, &buffer[..read]),
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => {
                    debug!(stream = kind.label(), %error, "output pipe read failed");
                    break;
                }
            }
        }
        writer.flush_partial(kind);
    })
}

/// Delivery failures (typically ESRCH for an already-reaped group) are ignored.
fn signal_process_group(id: &str, pid: Option<u32>, signal: Signal) {
    let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()).filter(|pid| *pid > 0) else {
        return;
    };
    if let Err(error) = kill(Pid::from_raw(-pid), signal) {
        debug!(process = %id, pid, ?signal, %error, "signal delivery failed");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
