use super::{LogFileViewer, SearchInfo, StreamFilter};
use crate::ansi::visible_width;
use crate::log_store::LineFormat;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_workspace(name: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    let root = std::env::temp_dir().join(format!("procdock-viewer-{name}-{ts}"));
    fs::create_dir_all(&root).expect("mkdir workspace");
    root
}

fn combined_file(name: &str, lines: &[&str]) -> PathBuf {
    let path = temp_workspace(name).join("proc_1-combined.log");
    let mut body = lines.join("\n");
    body.push('\n');
    fs::write(&path, body).expect("write combined log");
    path
}

fn numbered(count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("1:line {n}")).collect()
}

fn numbered_file(name: &str, count: usize) -> PathBuf {
    let lines = numbered(count);
    let refs = lines.iter().map(String::as_str).collect::<Vec<&str>>();
    combined_file(name, &refs)
}

#[test]
fn following_view_shows_the_tail() {
    let path = numbered_file("tail", 10);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined).with_follow(true);

    let rendered = viewer.render_lines(80, 3);
    assert_eq!(rendered, vec!["line 8", "line 9", "line 10"]);
    assert!(viewer.is_following());
}

#[test]
fn following_view_picks_up_appended_lines() {
    let path = numbered_file("grow", 4);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined).with_follow(true);
    assert_eq!(viewer.render_lines(80, 2), vec!["line 3", "line 4"]);

    let mut body = fs::read_to_string(&path).expect("read");
    body.push_str("2:late error\n");
    fs::write(&path, body).expect("append");

    assert_eq!(viewer.render_lines(80, 2), vec!["line 4", "late error"]);
}

#[test]
fn positive_scroll_moves_toward_older_output_and_stops_following() {
    let path = numbered_file("scroll", 10);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined).with_follow(true);
    viewer.render_lines(80, 3);

    viewer.scroll_by(2);
    assert!(!viewer.is_following());
    assert_eq!(viewer.render_lines(80, 3), vec!["line 6", "line 7", "line 8"]);

    viewer.scroll_by(-1);
    assert_eq!(viewer.render_lines(80, 3), vec!["line 7", "line 8", "line 9"]);
}

#[test]
fn scrolling_is_clamped_to_the_file() {
    let path = numbered_file("clamp", 10);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined);
    viewer.render_lines(80, 3);

    viewer.scroll_by(500);
    assert_eq!(viewer.render_lines(80, 3), vec!["line 1", "line 2", "line 3"]);

    viewer.scroll_by(-500);
    assert_eq!(viewer.render_lines(80, 3), vec!["line 8", "line 9", "line 10"]);
}

#[test]
fn top_and_bottom_jumps() {
    let path = numbered_file("jumps", 10);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined).with_follow(true);
    viewer.render_lines(80, 4);

    viewer.scroll_to_top();
    assert!(!viewer.is_following());
    assert_eq!(
        viewer.render_lines(80, 4),
        vec!["line 1", "line 2", "line 3", "line 4"]
    );

    viewer.scroll_to_bottom();
    assert!(!viewer.is_following());
    assert_eq!(
        viewer.render_lines(80, 4),
        vec!["line 7", "line 8", "line 9", "line 10"]
    );
}

#[test]
fn scroll_to_bottom_keeps_a_following_view_following() {
    let path = numbered_file("bottom-follow", 5);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined).with_follow(true);
    viewer.scroll_to_bottom();
    assert!(viewer.is_following());
}

#[test]
fn toggle_follow_resumes_tail_tracking() {
    let path = numbered_file("toggle", 10);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined);
    viewer.render_lines(80, 3);
    viewer.scroll_to_top();

    assert!(viewer.toggle_follow());
    assert_eq!(viewer.render_lines(80, 3), vec!["line 8", "line 9", "line 10"]);
    assert!(!viewer.toggle_follow());
    assert!(!viewer.is_following());
}

#[test]
fn stream_filter_cycles_back_to_combined_after_three_steps() {
    let path = numbered_file("cycle", 2);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined);
    assert_eq!(viewer.stream_filter(), StreamFilter::Combined);

    assert_eq!(viewer.cycle_stream_filter(), StreamFilter::Stdout);
    assert_eq!(viewer.cycle_stream_filter(), StreamFilter::Stderr);
    assert_eq!(viewer.cycle_stream_filter(), StreamFilter::Combined);
}

#[test]
fn stream_filter_narrows_rendered_lines() {
    let path = combined_file(
        "filter",
        &["1:out one", "2:err one", "untagged", "2:err two", "1:out two"],
    );
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined).with_follow(true);

    viewer.cycle_stream_filter();
    assert_eq!(
        viewer.render_lines(80, 10),
        vec!["out one", "untagged", "out two"]
    );

    viewer.cycle_stream_filter();
    assert_eq!(viewer.render_lines(80, 10), vec!["err one", "err two"]);
}

#[test]
fn search_starts_at_the_last_match_and_wraps_around() {
    let path = combined_file(
        "wrap",
        &["1:alpha ERROR", "1:beta", "2:error two", "1:gamma", "1:Error three"],
    );
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined);
    viewer.set_search("error");

    let start = viewer.search_info().expect("search active");
    assert_eq!(
        start,
        SearchInfo {
            query: "error".to_owned(),
            current: 3,
            total: 3,
        }
    );
    assert_eq!(viewer.current_match_line(), Some(4));

    viewer.next_match();
    assert_eq!(viewer.current_match_line(), Some(0));
    viewer.next_match();
    viewer.next_match();
    assert_eq!(viewer.search_info(), Some(start.clone()));

    viewer.prev_match();
    assert_eq!(viewer.current_match_line(), Some(2));
}

#[test]
fn search_ignores_ansi_sequences() {
    let path = combined_file("ansi", &["1:\u{1b}[31mfa\u{1b}[0mil here", "1:ok"]);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined);
    viewer.set_search("fail");
    assert_eq!(viewer.search_info().map(|info| info.total), Some(1));
}

#[test]
fn search_centers_the_selected_match() {
    let path = combined_file(
        "center",
        &[
            "1:l0", "1:l1", "1:l2", "1:l3", "1:needle", "1:l5", "1:l6", "1:l7", "1:l8", "1:l9",
            "1:l10", "1:l11",
        ],
    );
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined).with_follow(true);
    viewer.set_search("needle");
    assert!(!viewer.is_following());

    let rendered = viewer.render_lines(80, 5);
    assert_eq!(rendered, vec!["l2", "l3", "needle", "l5", "l6"]);
}

#[test]
fn empty_query_clears_search() {
    let path = numbered_file("clear", 3);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined);
    viewer.set_search("line");
    assert!(viewer.search_info().is_some());

    viewer.set_search("");
    assert_eq!(viewer.search_info(), None);

    viewer.set_search("line 2");
    viewer.clear_search();
    assert_eq!(viewer.search_info(), None);
    viewer.next_match();
    assert_eq!(viewer.current_match_line(), None);
}

#[test]
fn changing_filter_invalidates_match_positions() {
    let path = combined_file("invalidate", &["1:hit out", "2:hit err", "1:miss"]);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined);
    viewer.set_search("hit");
    assert_eq!(viewer.current_match_line(), Some(1));

    viewer.cycle_stream_filter();
    assert_eq!(viewer.current_match_line(), None);

    viewer.render_lines(80, 5);
    let info = viewer.search_info().expect("query survives");
    assert_eq!(info.total, 1);
    assert_eq!(info.current, 0);
}

#[test]
fn current_match_is_clamped_when_matches_shrink() {
    let path = combined_file("shrink", &["1:hit a", "1:hit b", "1:hit c"]);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined);
    viewer.set_search("hit");
    assert_eq!(viewer.search_info().map(|info| info.current), Some(3));

    fs::write(&path, "1:hit only\n1:other\n").expect("rewrite");
    viewer.render_lines(80, 5);
    let info = viewer.search_info().expect("search active");
    assert_eq!((info.current, info.total), (1, 1));
}

#[test]
fn missing_file_renders_placeholder() {
    let path = temp_workspace("missing").join("nope.log");
    let mut viewer = LogFileViewer::new(&path, LineFormat::Plain);
    assert_eq!(viewer.render_lines(40, 5), vec!["(no output yet)"]);
    assert!(viewer.render_lines(40, 0).is_empty());

    let bar = viewer.render_status_bar(30);
    assert_eq!(visible_width(&bar), 30);
    assert!(bar.contains("empty"));
}

#[test]
fn rendered_lines_respect_width() {
    let path = combined_file("width", &["1:0123456789abcdef", "1:日本語のテキスト"]);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined);
    for line in viewer.render_lines(7, 5) {
        assert!(visible_width(&line) <= 7, "{line:?} too wide");
    }
}

#[test]
fn status_bar_reports_position_and_filter_at_exact_width() {
    let path = numbered_file("status", 10);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined);
    viewer.render_lines(80, 3);
    viewer.scroll_to_top();
    viewer.render_lines(80, 3);

    let bar = viewer.render_status_bar(40);
    assert_eq!(visible_width(&bar), 40);
    assert!(bar.contains("30%  L3/10"), "{bar:?}");

    viewer.cycle_stream_filter();
    let bar = viewer.render_status_bar(40);
    assert_eq!(visible_width(&bar), 40);
    assert!(bar.contains("[stdout]"), "{bar:?}");
}

#[test]
fn status_bar_shows_following_and_search_state() {
    let path = numbered_file("status-follow", 6);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined).with_follow(true);
    let bar = viewer.render_status_bar(50);
    assert_eq!(visible_width(&bar), 50);
    assert!(bar.contains("following"));

    viewer.set_search("line");
    let bar = viewer.render_status_bar(50);
    assert!(bar.starts_with("/line  6/6"), "{bar:?}");

    viewer.set_search("zzz");
    let bar = viewer.render_status_bar(50);
    assert!(bar.starts_with("no matches: \"zzz\""), "{bar:?}");
    assert_eq!(visible_width(&bar), 50);
}

#[test]
fn status_bar_truncates_on_narrow_widths() {
    let path = numbered_file("narrow", 6);
    let mut viewer = LogFileViewer::new(&path, LineFormat::Combined);
    viewer.set_search("a-very-long-query-that-does-not-fit");
    let bar = viewer.render_status_bar(12);
    assert_eq!(visible_width(&bar), 12);
}

#[test]
fn independent_viewers_do_not_share_state() {
    let path = numbered_file("independent", 8);
    let mut first = LogFileViewer::new(&path, LineFormat::Combined).with_follow(true);
    let mut second = LogFileViewer::new(&path, LineFormat::Combined).with_follow(true);
    first.render_lines(80, 2);
    second.render_lines(80, 2);

    first.scroll_to_top();
    first.set_search("line 1");
    assert!(second.is_following());
    assert_eq!(second.search_info(), None);
    assert_eq!(second.render_lines(80, 2), vec!["line 7", "line 8"]);
}
