use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use crossterm::terminal;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::catalog::Action;
use crate::config::Config;
use crate::input::{Key, KeySource};
use crate::render::{frame_line, pad_clip, CellStyle, Surface};
use crate::theme::Theme;

/// Fixed cadence at which the overlay re-reads the output buffer and repaints
/// its content rows while the job is alive.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cooperative cancellation flag handed into the supervision loop. Set when
/// the single recognized interrupt (Ctrl-C) arrives during Running.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scoped raw-mode acquisition. Records the prior terminal state and restores
/// it on drop, on every exit path including unwinds. Restoration is
/// best-effort: failing to restore must not crash the render loop.
pub struct RawModeGuard {
    was_raw: bool,
}

impl RawModeGuard {
    #[must_use]
    pub fn acquire() -> Self {
        let was_raw = terminal::is_raw_mode_enabled().unwrap_or(false);
        if !was_raw {
            let _ = terminal::enable_raw_mode();
        }
        Self { was_raw }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if !self.was_raw {
            let _ = terminal::disable_raw_mode();
        }
    }
}

/// Outcome of the pre-flight checks for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecPlan {
    /// Missing dependency commands; nothing may run.
    Blocked(Vec<String>),
    /// Destructive and confirmation is globally enabled.
    NeedsConfirm,
    Ready,
}

#[must_use]
pub fn plan(action: &Action, config: &Config) -> ExecPlan {
    let missing = missing_dependencies(action);
    if !missing.is_empty() {
        return ExecPlan::Blocked(missing);
    }
    if action.destructive && config.confirmation_enabled {
        return ExecPlan::NeedsConfirm;
    }
    ExecPlan::Ready
}

#[must_use]
pub fn missing_dependencies(action: &Action) -> Vec<String> {
    action
        .dependencies
        .iter()
        .filter(|name| !command_on_path(name))
        .cloned()
        .collect()
}

#[must_use]
pub fn command_on_path(name: &str) -> bool {
    let Some(paths) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&paths).any(|dir| is_executable(&dir.join(name)))
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Stopped,
}

/// A spawned action entry point. The child runs in its own process group with
/// combined stdout/stderr redirected into a temporary buffer file; the file is
/// written only by the child and read only by the supervisor.
pub struct Job {
    child: Child,
    output: NamedTempFile,
}

/// Spawns the action's `run` entry point as a background job.
///
/// # Errors
/// Returns error if the buffer file or the child cannot be created.
pub fn spawn_job(action: &Action) -> Result<Job> {
    let output = NamedTempFile::new().context("creating output buffer")?;
    let stdout = output.reopen().context("reopening output buffer")?;
    // Cloned handle shares the file offset, so the two streams interleave
    // instead of overwriting each other.
    let stderr = stdout.try_clone().context("cloning output handle")?;
    let child = Command::new("bash")
        .arg("-c")
        .arg(action.entry_command())
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .process_group(0)
        .spawn()
        .with_context(|| format!("spawning {}", action.reference))?;
    debug!(action = %action.reference, pid = child.id(), "spawned job");
    Ok(Job { child, output })
}

impl Job {
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Graceful group termination: SIGTERM to the process group, then wait.
    /// There is deliberately no force-kill escalation if the child ignores the
    /// signal.
    pub fn terminate(&mut self) {
        let pgid = self.child.id() as i32;
        let rc = unsafe { libc::killpg(pgid, libc::SIGTERM) };
        if rc != 0 {
            warn!(pgid, "killpg failed");
        }
        let _ = self.child.wait();
    }

    pub fn wait(&mut self) {
        let _ = self.child.wait();
    }

    /// Current contents of the output buffer.
    #[must_use]
    pub fn output_text(&self) -> String {
        fs::read_to_string(self.output.path()).unwrap_or_default()
    }

    /// Copies the output buffer into `dir` as `<stem>-<unix_ts>.log`.
    ///
    /// # Errors
    /// Returns error if the log directory or file cannot be written.
    pub fn save_log(&self, dir: &Path, stem: &str) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let dest = dir.join(format!("{stem}-{ts}.log"));
        fs::copy(self.output.path(), &dest)
            .with_context(|| format!("writing {}", dest.display()))?;
        Ok(dest)
    }
}

/// Bordered sub-region of the screen used for confirmation, output and status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayRect {
    pub top: u16,
    pub left: u16,
    pub width: u16,
    pub height: u16,
}

impl OverlayRect {
    #[must_use]
    pub fn centered(surface_width: u16, surface_height: u16) -> Self {
        let width = surface_width.saturating_sub(8).max(24);
        let height = surface_height.saturating_sub(6).max(8);
        Self {
            top: surface_height.saturating_sub(height) / 2,
            left: surface_width.saturating_sub(width) / 2,
            width,
            height,
        }
    }

    #[must_use]
    pub fn content_rows(&self) -> u16 {
        self.height.saturating_sub(2)
    }

    #[must_use]
    pub fn inner_width(&self) -> u16 {
        self.width.saturating_sub(4)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Footer {
    Running,
    Completed,
    Stopped,
}

/// Drives one Running job to a terminal state: repaints the overlay's content
/// rows from the buffer tail on a fixed interval, reacts to the cancellation
/// token, and switches the footer to the matching visual state. `pump` blocks
/// up to the poll interval and yields any key pressed meanwhile; the
/// interactive caller backs it with the real event queue, tests feed it
/// scripted keys.
pub fn supervise<S: Surface>(
    surface: &mut S,
    theme: &Theme,
    action: &Action,
    job: &mut Job,
    token: &CancelToken,
    mut pump: impl FnMut(Duration) -> Option<Key>,
) -> JobOutcome {
    let (w, h) = surface.size();
    let rect = OverlayRect::centered(w, h);
    draw_frame(surface, theme, rect, &action.description);
    draw_footer(surface, theme, rect, Footer::Running);
    let _ = surface.flush();

    loop {
        if token.is_cancelled() {
            job.terminate();
            blank_content(surface, theme, rect);
            surface.put(
                rect.top + 1,
                rect.left + 2,
                &pad_clip("stopped by user", rect.inner_width() as usize),
                CellStyle::fg(theme.accent_warning),
            );
            draw_footer(surface, theme, rect, Footer::Stopped);
            let _ = surface.flush();
            return JobOutcome::Stopped;
        }
        let running = job.is_running();
        draw_content(surface, theme, rect, &job.output_text());
        if !running {
            draw_footer(surface, theme, rect, Footer::Completed);
            let _ = surface.flush();
            return JobOutcome::Completed;
        }
        let _ = surface.flush();
        if let Some(Key::CtrlC) = pump(POLL_INTERVAL) {
            token.cancel();
        }
    }
}

/// Blocks until Enter, with raw/no-echo mode scoped to this wait. The guard
/// restores the prior terminal mode on every exit path.
///
/// # Errors
/// Returns error if reading input fails.
pub fn wait_for_dismissal<K: KeySource>(keys: &mut K) -> Result<()> {
    let _guard = RawModeGuard::acquire();
    loop {
        if keys.next_key()? == Key::Enter {
            return Ok(());
        }
    }
}

fn draw_frame<S: Surface>(surface: &mut S, theme: &Theme, rect: OverlayRect, title: &str) {
    let border = CellStyle::fg(theme.border);
    surface.put(
        rect.top,
        rect.left,
        &frame_line("┌", "─", "┐", rect.width),
        border,
    );
    let title_text: String = title.chars().take(rect.inner_width() as usize).collect();
    surface.put(
        rect.top,
        rect.left + 2,
        &format!(" {title_text} "),
        CellStyle::fg(theme.text_primary).bold(),
    );
    blank_content(surface, theme, rect);
    surface.put(
        rect.top + rect.height - 1,
        rect.left,
        &frame_line("└", "─", "┘", rect.width),
        border,
    );
}

fn blank_content<S: Surface>(surface: &mut S, theme: &Theme, rect: OverlayRect) {
    let border = CellStyle::fg(theme.border);
    let blank = " ".repeat(rect.width.saturating_sub(2) as usize);
    for i in 0..rect.content_rows() {
        let row = rect.top + 1 + i;
        surface.put(row, rect.left, "│", border);
        surface.put(row, rect.left + 1, &blank, CellStyle::fg(theme.text_primary));
        surface.put(row, rect.left + rect.width - 1, "│", border);
    }
}

/// Tail of the buffer into the content rows; every line is clipped to the
/// inner width and padded so stale characters from longer lines are erased.
fn draw_content<S: Surface>(surface: &mut S, theme: &Theme, rect: OverlayRect, output: &str) {
    let rows = rect.content_rows() as usize;
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(rows);
    let tail = &lines[start..];
    let width = rect.inner_width() as usize;
    for slot in 0..rows {
        let text = tail.get(slot).copied().unwrap_or("");
        surface.put(
            rect.top + 1 + slot as u16,
            rect.left + 2,
            &pad_clip(text, width),
            CellStyle::fg(theme.text_primary),
        );
    }
}

fn draw_footer<S: Surface>(surface: &mut S, theme: &Theme, rect: OverlayRect, footer: Footer) {
    let (text, style) = match footer {
        Footer::Running => (
            " running, Ctrl-C to stop ",
            CellStyle::fg(theme.accent_warning),
        ),
        Footer::Completed => (
            " completed, Enter to close ",
            CellStyle::fg(theme.accent_success),
        ),
        Footer::Stopped => (
            " stopped, Enter to close ",
            CellStyle::fg(theme.accent_danger),
        ),
    };
    surface.put(rect.top + rect.height - 1, rect.left + 2, text, style);
}

/// Modal y/n confirmation for destructive actions. Drawn into the overlay
/// region; the caller reads the single-character answer.
pub fn draw_confirm<S: Surface>(surface: &mut S, theme: &Theme, action: &Action) {
    let (w, h) = surface.size();
    let rect = OverlayRect::centered(w, h);
    draw_frame(surface, theme, rect, "Confirm destructive action");
    let width = rect.inner_width() as usize;
    surface.put(
        rect.top + 1,
        rect.left + 2,
        &pad_clip(&action.description, width),
        CellStyle::fg(theme.text_primary),
    );
    surface.put(
        rect.top + 3,
        rect.left + 2,
        &pad_clip("run it? [y/N]", width),
        CellStyle::fg(theme.accent_danger).bold(),
    );
    let _ = surface.flush();
}

/// Inline report for a Blocked invocation: lists the missing dependency
/// commands and waits for any key before returning to the menu.
pub fn draw_blocked<S: Surface>(surface: &mut S, theme: &Theme, missing: &[String]) {
    let (w, h) = surface.size();
    let rect = OverlayRect::centered(w, h);
    draw_frame(surface, theme, rect, "Missing dependencies");
    let width = rect.inner_width() as usize;
    surface.put(
        rect.top + 1,
        rect.left + 2,
        &pad_clip("cannot run, these commands were not found:", width),
        CellStyle::fg(theme.text_primary),
    );
    for (i, name) in missing.iter().enumerate() {
        let row = rect.top + 3 + i as u16;
        if row >= rect.top + rect.height - 1 {
            break;
        }
        surface.put(
            row,
            rect.left + 4,
            &pad_clip(name, width.saturating_sub(2)),
            CellStyle::fg(theme.accent_danger),
        );
    }
    surface.put(
        rect.top + rect.height - 1,
        rect.left + 2,
        " press any key ",
        CellStyle::fg(theme.text_muted),
    );
    let _ = surface.flush();
}
