use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use opsdeck::catalog::{Catalog, Category};
use opsdeck::config::Config;
use opsdeck::input::Key;
use opsdeck::overlay::{self, CancelToken, ExecPlan, JobOutcome, RawModeGuard};
use opsdeck::render::BufferSurface;
use opsdeck::theme::Theme;

fn write_unit(root: &Path, key: &str, stem: &str, header: &str, body: &str) {
    let dir = root.join("actions").join(key);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join(format!("{stem}.sh")),
        format!("{header}\nrun() {{\n{body}\n}}\n"),
    )
    .unwrap();
}

fn open_catalog(root: &Path, name: &str, key: &str) -> (Catalog, Vec<Category>) {
    fs::create_dir_all(root).unwrap();
    fs::write(
        root.join("categories.toml"),
        format!("[[categories]]\nname = \"{name}\"\nkey = \"{key}\"\n"),
    )
    .unwrap();
    let catalog = Catalog::open(root.to_path_buf()).unwrap();
    let categories = catalog.load_categories().unwrap();
    (catalog, categories)
}

fn dump(surface: &BufferSurface, height: u16) -> String {
    (0..height)
        .map(|r| surface.row_text(r))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pump that just burns the poll interval, like an idle keyboard.
fn idle_pump(_timeout: Duration) -> Option<Key> {
    std::thread::sleep(Duration::from_millis(10));
    None
}

#[test]
fn missing_dependency_blocks_execution() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(
        dir.path(),
        "tools",
        "x",
        "DESCRIPTION=\"Needs a ghost\"\nDEPENDENCIES=\"sh opsdeck-test-no-such-command\"",
        "    echo hi",
    );
    let (catalog, categories) = open_catalog(dir.path(), "Tools", "tools");
    let action = &catalog.load_actions(&categories[0])[0];

    let missing = overlay::missing_dependencies(action);
    assert_eq!(missing, vec!["opsdeck-test-no-such-command".to_string()]);
    assert_eq!(
        overlay::plan(action, &Config::default()),
        ExecPlan::Blocked(missing)
    );
}

#[test]
fn plan_requires_confirmation_only_for_destructive_with_toggle_on() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(
        dir.path(),
        "tools",
        "wipe",
        "DESCRIPTION=\"Wipe\"\nDESTRUCTIVE=true\nDEPENDENCIES=\"sh\"",
        "    echo gone",
    );
    let (catalog, categories) = open_catalog(dir.path(), "Tools", "tools");
    let action = &catalog.load_actions(&categories[0])[0];

    assert_eq!(overlay::plan(action, &Config::default()), ExecPlan::NeedsConfirm);

    let relaxed = Config {
        confirmation_enabled: false,
        ..Config::default()
    };
    assert_eq!(overlay::plan(action, &relaxed), ExecPlan::Ready);
}

#[test]
fn command_on_path_finds_real_commands() {
    assert!(overlay::command_on_path("sh"));
    assert!(!overlay::command_on_path("opsdeck-test-no-such-command"));
}

#[test]
fn completed_job_renders_output_and_completed_footer() {
    let dir = tempfile::tempdir().unwrap();
    // The worked example: System|show_info printing OK.
    write_unit(
        dir.path(),
        "System",
        "show_info",
        "DESCRIPTION=\"Show System Information\"",
        "    echo OK",
    );
    let (catalog, categories) = open_catalog(dir.path(), "System", "System");
    let action = catalog.load_actions(&categories[0])[0].clone();

    // Recent is recorded before the overlay runs.
    catalog.record_recent(&action.reference).unwrap();
    assert_eq!(catalog.recent()[0].serialize(), "System|show_info");

    let mut job = overlay::spawn_job(&action).unwrap();
    let token = CancelToken::new();
    let mut surface = BufferSurface::new(80, 24);
    let theme = Theme::builtin_dark();
    let outcome = overlay::supervise(&mut surface, &theme, &action, &mut job, &token, idle_pump);

    assert_eq!(outcome, JobOutcome::Completed);
    let screen = dump(&surface, 24);
    assert!(screen.contains("OK"));
    assert!(screen.contains("completed, Enter to close"));
    assert!(screen.contains("Show System Information"));
}

#[test]
fn cancellation_terminates_the_job_and_shows_stopped_state() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(
        dir.path(),
        "tools",
        "slow",
        "DESCRIPTION=\"Sleep forever\"",
        "    sleep 30",
    );
    let (catalog, categories) = open_catalog(dir.path(), "Tools", "tools");
    let action = catalog.load_actions(&categories[0])[0].clone();

    let mut job = overlay::spawn_job(&action).unwrap();
    let token = CancelToken::new();
    let mut surface = BufferSurface::new(80, 24);
    let theme = Theme::builtin_dark();

    let started = Instant::now();
    let mut pressed = false;
    let outcome = overlay::supervise(&mut surface, &theme, &action, &mut job, &token, |_| {
        if pressed {
            std::thread::sleep(Duration::from_millis(10));
            None
        } else {
            pressed = true;
            Some(Key::CtrlC)
        }
    });

    assert_eq!(outcome, JobOutcome::Stopped);
    // Graceful SIGTERM, not a 30 second wait.
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!job.is_running());
    let screen = dump(&surface, 24);
    assert!(screen.contains("stopped by user"));
    assert!(screen.contains("stopped, Enter to close"));
}

#[test]
fn cancel_token_is_shared_between_clones() {
    let token = CancelToken::new();
    let clone = token.clone();
    assert!(!token.is_cancelled());
    clone.cancel();
    assert!(token.is_cancelled());
}

#[test]
fn output_lines_longer_than_the_overlay_are_clipped() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(
        dir.path(),
        "tools",
        "wide",
        "DESCRIPTION=\"Wide output\"",
        "    printf 'A%.0s' $(seq 1 200); echo",
    );
    let (catalog, categories) = open_catalog(dir.path(), "Tools", "tools");
    let action = catalog.load_actions(&categories[0])[0].clone();

    let mut job = overlay::spawn_job(&action).unwrap();
    let token = CancelToken::new();
    let mut surface = BufferSurface::new(60, 20);
    let theme = Theme::builtin_dark();
    let outcome = overlay::supervise(&mut surface, &theme, &action, &mut job, &token, idle_pump);

    assert_eq!(outcome, JobOutcome::Completed);
    // The 200-char line was clipped to the overlay's inner width (48 here),
    // not wrapped across rows.
    let longest_run = (0..20)
        .map(|row| {
            let text = surface.row_text(row);
            text.split(|c| c != 'A').map(str::len).max().unwrap_or(0)
        })
        .max()
        .unwrap_or(0);
    assert!(longest_run > 0);
    assert!(longest_run <= 48);
}

#[test]
fn save_log_copies_the_output_buffer() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(
        dir.path(),
        "tools",
        "noisy",
        "DESCRIPTION=\"Noisy\"",
        "    echo log-me",
    );
    let (catalog, categories) = open_catalog(dir.path(), "Tools", "tools");
    let action = catalog.load_actions(&categories[0])[0].clone();

    let mut job = overlay::spawn_job(&action).unwrap();
    job.wait();
    let logs = dir.path().join("logs");
    let saved = job.save_log(&logs, &action.reference.unit_stem).unwrap();
    let contents = fs::read_to_string(saved).unwrap();
    assert!(contents.contains("log-me"));
}

#[test]
fn raw_mode_guard_is_safe_without_a_tty() {
    // Off-terminal both acquire and release are best-effort no-ops.
    let guard = RawModeGuard::acquire();
    drop(guard);
}
