use std::io;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnableLineWrap, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;
use ratatui::Terminal;
use tracing::warn;

use crate::process_manager::ProcessManager;
use crate::ui::table::process_table;
use crate::ui::{OutputMode, PlainRenderer, Renderer, SummaryCounts};

use super::DockTuiError;

const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

pub(super) type TuiTerminal = Terminal<CrosstermBackend<io::Stdout>>;

pub(super) fn init_terminal() -> Result<TuiTerminal, io::Error> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

/// Puts the terminal back into cooked mode on the main screen.
pub(super) fn restore_terminal(terminal: &mut TuiTerminal) -> Result<(), io::Error> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, EnableLineWrap)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Stops every managed process, waits up to `grace` (covering SIGKILL
/// escalation) while showing progress, then prints the final table.
pub(super) fn shutdown_and_render_summary(
    terminal: &mut TuiTerminal,
    manager: &ProcessManager,
    grace: Duration,
) -> Result<SummaryCounts, DockTuiError> {
    if manager.has_live_processes() {
        let _ = draw_shutdown_status(terminal, "Shutdown: sending SIGTERM to managed processes...");
        manager.kill_all();
        let deadline = Instant::now() + grace;
        while manager.has_live_processes() && Instant::now() < deadline {
            let _ = draw_shutdown_status(
                terminal,
                "Shutdown: waiting for managed processes to exit...",
            );
            thread::sleep(SHUTDOWN_POLL);
        }
        if manager.has_live_processes() {
            warn!("managed processes still running after shutdown grace period");
        }
    }

    restore_terminal(terminal)?;

    let records = manager.list();
    let counts = SummaryCounts::from_records(&records);
    if !records.is_empty() {
        let mut renderer = PlainRenderer::stdout(OutputMode::from_env());
        renderer.section("Processes")?;
        renderer.table(&process_table(&records, SystemTime::now()))?;
        renderer.summary(counts)?;
    }
    Ok(counts)
}

fn draw_shutdown_status(terminal: &mut TuiTerminal, status: &str) -> Result<(), io::Error> {
    terminal.draw(|frame| {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let footer = Paragraph::new(status.to_owned()).style(Style::default().fg(Color::Yellow));
        frame.render_widget(footer, chunks[1]);
    })?;
    Ok(())
}
