use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// One decoded keystroke. Crossterm already decodes arrow escape sequences, so
/// the input layer is a thin mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Esc,
    Backspace,
    Char(char),
    CtrlC,
    Resize,
    Other,
}

/// Blocks until the next key (or resize) event.
///
/// # Errors
/// Returns error if the event stream fails.
pub fn read_key() -> Result<Key> {
    loop {
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => return Ok(map_key(key)),
            Event::Resize(_, _) => return Ok(Key::Resize),
            _ => {}
        }
    }
}

/// Non-blocking poll used by the execution overlay's render loop.
///
/// # Errors
/// Returns error if the event stream fails.
pub fn poll_key(timeout: Duration) -> Result<Option<Key>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(map_key(key))),
        Event::Resize(_, _) => Ok(Some(Key::Resize)),
        _ => Ok(None),
    }
}

/// Where the app's keystrokes come from. The terminal implementation blocks
/// on the real event queue; tests substitute a scripted sequence so the whole
/// input loop runs off-terminal.
pub trait KeySource {
    /// Blocks until the next key.
    ///
    /// # Errors
    /// Returns error if the underlying source fails.
    fn next_key(&mut self) -> Result<Key>;

    /// Waits up to `timeout` for a key; used while a job is running.
    fn poll_key(&mut self, timeout: Duration) -> Option<Key>;
}

/// The interactive source backed by crossterm's event queue.
pub struct TermKeys;

impl KeySource for TermKeys {
    fn next_key(&mut self) -> Result<Key> {
        read_key()
    }

    fn poll_key(&mut self, timeout: Duration) -> Option<Key> {
        poll_key(timeout).ok().flatten()
    }
}

fn map_key(key: KeyEvent) -> Key {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char(c) = key.code {
            if c == 'c' {
                return Key::CtrlC;
            }
        }
    }
    match key.code {
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Esc,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Char(c) => Key::Char(c),
        _ => Key::Other,
    }
}
