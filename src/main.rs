use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

use opsdeck::app::App;
use opsdeck::catalog::Catalog;
use opsdeck::input::TermKeys;
use opsdeck::render::TermSurface;

#[derive(Parser)]
#[command(name = "opsdeck", version, about = "Full-screen menu for categorized shell actions")]
struct Cli {
    /// Remove the opsdeck state directory (~/.opsdeck) and exit.
    #[arg(long)]
    uninstall: bool,
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "opsdeck error");
            eprintln!("opsdeck: {e:#}");
            1
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = state_root()?;
    fs::create_dir_all(&root).with_context(|| format!("creating {}", root.display()))?;
    init_tracing(&root)?;

    if cli.uninstall {
        return uninstall(&root);
    }

    let catalog = Catalog::open(root)?;
    let mut app = App::new(catalog)?;
    let guard = TerminalGuard::enter()?;
    let mut surface = TermSurface::new()?;
    let result = app.run(&mut surface, &mut TermKeys);
    drop(guard);
    result?;
    Ok(0)
}

/// `OPSDECK_HOME` overrides the default `~/.opsdeck` (tests rely on this).
fn state_root() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("OPSDECK_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".opsdeck"))
}

/// Logs go to a file inside the state directory; stderr would scribble over
/// the raw-mode screen.
fn init_tracing(root: &std::path::Path) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(root.join("opsdeck.log"))
        .with_context(|| format!("opening log file in {}", root.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn uninstall(root: &std::path::Path) -> Result<i32> {
    print!("remove {} and all saved state? [y/N] ", root.display());
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    if matches!(answer.trim(), "y" | "Y") {
        fs::remove_dir_all(root).with_context(|| format!("removing {}", root.display()))?;
        println!("removed {}", root.display());
    } else {
        println!("aborted");
    }
    Ok(0)
}

/// Restores the terminal unconditionally on every exit path, including panics
/// that unwind through `main`.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("enabling raw mode")?;
        execute!(io::stdout(), EnterAlternateScreen, Hide)
            .context("entering alternate screen")?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}
