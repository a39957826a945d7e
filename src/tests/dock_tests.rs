use super::{DockState, DockStateManager, DockUpdate, DockVisibility, FocusDirection};
use std::sync::{Arc, Mutex};

const IDS: [&str; 3] = ["proc-1", "proc-2", "proc-3"];

fn recorder(manager: &DockStateManager) -> (Arc<Mutex<Vec<DockState>>>, super::DockSubscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = manager.subscribe(move |state| {
        sink.lock().expect("lock").push(state.clone());
    });
    seen.lock().expect("lock").clear();
    (seen, subscription)
}

fn visibility(manager: &DockStateManager) -> DockVisibility {
    manager.get_state().visibility
}

fn focus(manager: &DockStateManager) -> Option<String> {
    manager.get_state().focused_process_id
}

#[test]
fn starts_hidden_and_unfocused() {
    let manager = DockStateManager::new(true);
    assert_eq!(
        manager.get_state(),
        DockState {
            visibility: DockVisibility::Hidden,
            follow_enabled: true,
            focused_process_id: None,
        }
    );
    assert!(!DockStateManager::new(false).get_state().follow_enabled);
}

#[test]
fn set_state_applies_partial_updates() {
    let manager = DockStateManager::new(true);
    manager.set_state(DockUpdate::visibility(DockVisibility::Collapsed));
    manager.set_state(DockUpdate::follow_enabled(false));
    manager.set_state(DockUpdate::focus(Some("test-process".to_owned())));

    let state = manager.get_state();
    assert_eq!(state.visibility, DockVisibility::Collapsed);
    assert!(!state.follow_enabled);
    assert_eq!(state.focused_process_id.as_deref(), Some("test-process"));
}

#[test]
fn unchanged_values_do_not_notify() {
    let manager = DockStateManager::new(true);
    let (seen, _subscription) = recorder(&manager);

    manager.set_state(DockUpdate::follow_enabled(true));
    manager.hide();
    manager.set_focus(None);
    manager.handle_process_exit("proc-1");
    assert!(seen.lock().expect("lock").is_empty());

    manager.set_state(DockUpdate::visibility(DockVisibility::Open));
    assert_eq!(seen.lock().expect("lock").len(), 1);
}

#[test]
fn one_notification_per_call_even_when_several_fields_change() {
    let manager = DockStateManager::new(true);
    let (seen, _subscription) = recorder(&manager);

    manager.set_focus(Some("proc-1"));
    let seen = seen.lock().expect("lock");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].visibility, DockVisibility::Open);
    assert_eq!(seen[0].focused_process_id.as_deref(), Some("proc-1"));
}

#[test]
fn subscribe_delivers_current_state_immediately() {
    let manager = DockStateManager::new(false);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _subscription = manager.subscribe(move |state| {
        sink.lock().expect("lock").push(state.clone());
    });
    assert_eq!(*seen.lock().expect("lock"), vec![manager.get_state()]);
}

#[test]
fn unsubscribe_stops_notifications() {
    let manager = DockStateManager::new(true);
    let (seen, subscription) = recorder(&manager);
    subscription.unsubscribe();

    manager.set_state(DockUpdate::visibility(DockVisibility::Collapsed));
    assert!(seen.lock().expect("lock").is_empty());
}

#[test]
fn panicking_listener_does_not_block_others() {
    let manager = DockStateManager::new(true);
    let _noisy = manager.subscribe(|state| {
        if state.visibility == DockVisibility::Open {
            panic!("listener failure");
        }
    });
    let (seen, _subscription) = recorder(&manager);

    manager.expand();
    assert_eq!(seen.lock().expect("lock").len(), 1);
}

#[test]
fn toggle_visibility_cycles_through_states() {
    let manager = DockStateManager::new(true);
    manager.toggle_visibility();
    assert_eq!(visibility(&manager), DockVisibility::Collapsed);
    manager.toggle_visibility();
    assert_eq!(visibility(&manager), DockVisibility::Open);
    manager.toggle_visibility();
    assert_eq!(visibility(&manager), DockVisibility::Collapsed);
}

#[test]
fn expand_collapse_and_hide() {
    let manager = DockStateManager::new(true);
    manager.expand();
    assert_eq!(visibility(&manager), DockVisibility::Open);
    manager.collapse();
    assert_eq!(visibility(&manager), DockVisibility::Collapsed);
    manager.hide();
    assert_eq!(visibility(&manager), DockVisibility::Hidden);
}

#[test]
fn toggle_follow_flips_the_flag() {
    let manager = DockStateManager::new(true);
    manager.toggle_follow();
    assert!(!manager.get_state().follow_enabled);
    manager.toggle_follow();
    assert!(manager.get_state().follow_enabled);
}

#[test]
fn focusing_opens_but_unfocusing_keeps_visibility() {
    let manager = DockStateManager::new(true);
    manager.set_focus(Some("my-process"));
    assert_eq!(focus(&manager).as_deref(), Some("my-process"));
    assert_eq!(visibility(&manager), DockVisibility::Open);

    manager.collapse();
    manager.set_focus(None);
    assert_eq!(focus(&manager), None);
    assert_eq!(visibility(&manager), DockVisibility::Collapsed);
}

#[test]
fn cycle_focus_starts_at_the_ends_without_focus() {
    let manager = DockStateManager::new(true);
    manager.cycle_focus(&IDS, FocusDirection::Next);
    assert_eq!(focus(&manager).as_deref(), Some("proc-1"));

    let manager = DockStateManager::new(true);
    manager.cycle_focus(&IDS, FocusDirection::Prev);
    assert_eq!(focus(&manager).as_deref(), Some("proc-3"));
}

#[test]
fn cycle_focus_moves_and_wraps() {
    let manager = DockStateManager::new(true);
    manager.set_focus(Some("proc-1"));
    manager.cycle_focus(&IDS, FocusDirection::Next);
    assert_eq!(focus(&manager).as_deref(), Some("proc-2"));
    manager.cycle_focus(&IDS, FocusDirection::Prev);
    assert_eq!(focus(&manager).as_deref(), Some("proc-1"));
    manager.cycle_focus(&IDS, FocusDirection::Prev);
    assert_eq!(focus(&manager).as_deref(), Some("proc-3"));
    manager.cycle_focus(&IDS, FocusDirection::Next);
    assert_eq!(focus(&manager).as_deref(), Some("proc-1"));
}

#[test]
fn cycle_focus_ignores_empty_lists_and_recovers_from_stale_focus() {
    let manager = DockStateManager::new(true);
    manager.set_focus(Some("proc-1"));
    manager.cycle_focus::<&str>(&[], FocusDirection::Next);
    assert_eq!(focus(&manager).as_deref(), Some("proc-1"));

    manager.set_focus(Some("unknown-process"));
    manager.cycle_focus(&IDS, FocusDirection::Next);
    assert_eq!(focus(&manager).as_deref(), Some("proc-1"));

    let owned = IDS.iter().map(|id| id.to_string()).collect::<Vec<String>>();
    manager.set_focus(Some("gone"));
    manager.cycle_focus(&owned, FocusDirection::Prev);
    assert_eq!(focus(&manager).as_deref(), Some("proc-3"));
}

#[test]
fn auto_show_only_reveals_a_hidden_dock_when_following() {
    let manager = DockStateManager::new(true);
    manager.auto_show();
    assert_eq!(visibility(&manager), DockVisibility::Collapsed);

    manager.expand();
    manager.auto_show();
    assert_eq!(visibility(&manager), DockVisibility::Open);

    let quiet = DockStateManager::new(false);
    let (seen, _subscription) = recorder(&quiet);
    quiet.auto_show();
    assert_eq!(visibility(&quiet), DockVisibility::Hidden);
    assert!(seen.lock().expect("lock").is_empty());
}

#[test]
fn auto_hide_respects_follow_mode() {
    let manager = DockStateManager::new(true);
    manager.expand();
    manager.auto_hide();
    assert_eq!(visibility(&manager), DockVisibility::Hidden);

    let manager = DockStateManager::new(false);
    manager.expand();
    manager.auto_hide();
    assert_eq!(visibility(&manager), DockVisibility::Open);
}

#[test]
fn process_exit_clears_only_matching_focus() {
    let manager = DockStateManager::new(true);
    manager.set_focus(Some("proc-1"));
    assert!(!manager.handle_process_exit("proc-2"));
    assert_eq!(focus(&manager).as_deref(), Some("proc-1"));

    assert!(manager.handle_process_exit("proc-1"));
    assert_eq!(focus(&manager), None);
    assert_eq!(visibility(&manager), DockVisibility::Open);
}

fn record(id: &str) -> crate::process_manager::ProcessRecord {
    use crate::log_store::LogFiles;
    use crate::process_manager::{NotifyPrefs, ProcessRecord, ProcessStatus};
    use std::path::{Path, PathBuf};

    ProcessRecord {
        id: id.to_owned(),
        name: id.to_owned(),
        pid: None,
        command: "true".to_owned(),
        cwd: PathBuf::from("/tmp"),
        start_time: std::time::SystemTime::now(),
        end_time: None,
        status: ProcessStatus::Running,
        exit_code: None,
        success: None,
        log_files: LogFiles::for_process(Path::new("/tmp/procdock-dock"), id),
        notify: NotifyPrefs::default(),
    }
}

fn started(id: &str) -> crate::process_manager::ProcessEvent {
    crate::process_manager::ProcessEvent::ProcessStarted { info: record(id) }
}

fn ended(id: &str) -> crate::process_manager::ProcessEvent {
    crate::process_manager::ProcessEvent::ProcessEnded { info: record(id) }
}

#[test]
fn lifecycle_hides_only_after_the_last_live_process_ends() {
    let dock = Arc::new(DockStateManager::new(true));
    let driver = super::LifecycleDriver::new(Arc::clone(&dock));

    driver.handle(&started("proc_1"));
    driver.handle(&started("proc_2"));
    assert_eq!(visibility(&dock), DockVisibility::Collapsed);
    dock.set_focus(Some("proc_1"));

    driver.handle(&ended("proc_1"));
    assert_eq!(focus(&dock), None);
    assert_eq!(visibility(&dock), DockVisibility::Open);

    driver.handle(&ended("proc_2"));
    assert_eq!(visibility(&dock), DockVisibility::Hidden);
}

#[test]
fn already_live_processes_keep_the_dock_visible() {
    let dock = Arc::new(DockStateManager::new(true));
    let driver = super::LifecycleDriver::new(Arc::clone(&dock));
    driver.live.lock().expect("lock").insert("proc_1".to_owned());

    driver.handle(&started("proc_2"));
    driver.handle(&ended("proc_2"));
    assert_eq!(visibility(&dock), DockVisibility::Collapsed);
}

#[test]
fn start_racing_the_last_exit_never_leaves_a_live_process_hidden() {
    for round in 0..200 {
        let dock = Arc::new(DockStateManager::new(true));
        let driver = Arc::new(super::LifecycleDriver::new(Arc::clone(&dock)));
        driver.handle(&started("proc_old"));

        let ending = Arc::clone(&driver);
        let exit_thread = std::thread::spawn(move || ending.handle(&ended("proc_old")));
        let starting = Arc::clone(&driver);
        let start_thread = std::thread::spawn(move || starting.handle(&started("proc_new")));
        exit_thread.join().expect("exit thread");
        start_thread.join().expect("start thread");

        assert_eq!(
            visibility(&dock),
            DockVisibility::Collapsed,
            "round {round}: dock hidden with proc_new still live"
        );
    }
}
