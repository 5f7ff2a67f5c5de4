//! Macro button board.
//!
//! Loads a board config, validates it, and runs it headless: button faces
//! are printed to stdout and presses are read from stdin as `row col` lines.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use macroboard::console::ConsolePresenter;
use macroboard::core::model::Position;
use macroboard::error::ConfigError;
use macroboard::exit_codes;
use macroboard::io::config::{DocumentFormat, load_config, render_config, write_config};
use macroboard::io::paths::{BoardPaths, resolve_config_path, resolve_settings_path};
use macroboard::io::process::ShellRunner;
use macroboard::io::settings::load_settings;
use macroboard::logging;
use macroboard::session::Session;
use tracing::{info, warn};

/// How often the UI loop drains engine events while waiting for input.
const FRAME: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(
    name = "macroboard",
    version,
    about = "Grid of shell-command buttons driven by per-button state machines"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a board config and print a summary.
    Check {
        /// Board config (defaults to the platform config directory).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print or write the canonical form of a valid board config.
    Fmt {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write here instead of stdout; the format follows the extension.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the board headless, reading `row col` presses from stdin.
    Run {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Engine settings (defaults to settings.toml beside the config).
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },
    /// Print the default config and settings paths.
    Path,
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        let code = if err.downcast_ref::<ConfigError>().is_some() {
            exit_codes::INVALID_CONFIG
        } else {
            exit_codes::RUNTIME
        };
        std::process::exit(code);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Check { config } => cmd_check(config.as_deref()),
        Command::Fmt { config, output } => cmd_fmt(config.as_deref(), output.as_deref()),
        Command::Run { config, settings } => cmd_run(config.as_deref(), settings.as_deref()),
        Command::Path => {
            let paths = BoardPaths::platform()?;
            println!("{}", paths.config_path.display());
            println!("{}", paths.settings_path.display());
            Ok(())
        }
    }
}

fn cmd_check(config: Option<&Path>) -> Result<()> {
    let path = resolve_config_path(config)?;
    let grid = load_config(&path)?;
    println!(
        "{}: ok ({} x {} grid, {} buttons)",
        path.display(),
        grid.rows,
        grid.columns,
        grid.buttons.len()
    );
    Ok(())
}

fn cmd_fmt(config: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let path = resolve_config_path(config)?;
    let grid = load_config(&path)?;
    match output {
        Some(output) => {
            write_config(output, &grid).with_context(|| format!("write {}", output.display()))?;
        }
        None => {
            let rendered = render_config(&grid, DocumentFormat::from_path(&path))?;
            std::io::stdout()
                .write_all(rendered.as_bytes())
                .context("write stdout")?;
        }
    }
    Ok(())
}

enum Input {
    Press(Position),
    Quit,
}

fn cmd_run(config: Option<&Path>, settings: Option<&Path>) -> Result<()> {
    let config_path = resolve_config_path(config)?;
    let grid = load_config(&config_path)?;
    let settings_path = resolve_settings_path(settings, &config_path);
    let settings = load_settings(&settings_path)?;
    let presenter = ConsolePresenter::new(std::io::stdout());
    let mut session = Session::new(grid, ShellRunner::from_settings(&settings), presenter);
    session.populate()?;

    let inputs = spawn_stdin_reader();
    loop {
        session.pump();
        match inputs.recv_timeout(FRAME) {
            Ok(Input::Press(position)) => {
                if !session.config().contains(position) {
                    warn!(%position, "position is outside the grid");
                } else if !session.press(position)? {
                    warn!(%position, "no button at position");
                }
            }
            Ok(Input::Quit) => return Ok(()),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // stdin closed: let running sequences finish so piped presses complete.
    while !session.settle(Duration::from_secs(60)) {
        info!(in_flight = session.in_flight(), "waiting for commands to finish");
    }
    Ok(())
}

/// Read presses on a separate thread so the UI loop keeps draining events.
fn spawn_stdin_reader() -> mpsc::Receiver<Input> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let input = match line.trim() {
                "" => continue,
                "q" | "quit" => Input::Quit,
                other => match parse_press(other) {
                    Some(position) => Input::Press(position),
                    None => {
                        warn!(input = other, "expected `row col`");
                        continue;
                    }
                },
            };
            if tx.send(input).is_err() {
                break;
            }
        }
    });
    rx
}

/// Parse `row col` or `row,col`.
fn parse_press(line: &str) -> Option<Position> {
    let mut parts = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty());
    let row = parts.next()?.parse().ok()?;
    let col = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Position::new(row, col))
}
