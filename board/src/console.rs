//! Line-oriented presenter for running a board without a window.

use std::io::Write;

use tracing::warn;

use crate::core::model::{EMPTY_BUTTON_BG_COLOR, GridConfig, Position, State};
use crate::session::Presenter;

/// Writes one line per placed cell and per refreshed button.
///
/// ```text
/// grid 1x2 spacing 5 padding 5
/// [0,0] Stream (bg #00ff00, fg #ffffff)
/// [0,1] - (bg #cccccc)
/// [0,0] => Offline (bg #ff0000, fg #ffffff)
/// ```
pub struct ConsolePresenter<W: Write> {
    out: W,
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, line: std::fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!(err = %e, "failed to write button face");
        }
    }
}

fn cell(position: Position) -> String {
    format!("[{},{}]", position.row, position.col)
}

impl<W: Write> Presenter for ConsolePresenter<W> {
    fn layout(&mut self, config: &GridConfig) {
        let mut header = format!(
            "grid {}x{} spacing {} padding {}",
            config.rows, config.columns, config.spacing, config.padding
        );
        if config.borderless {
            header.push_str(" borderless");
        }
        if config.window.use_auto_fullscreen_mode {
            header.push_str(" fullscreen");
        }
        if let Some((x, y)) = config.window.position() {
            header.push_str(&format!(" at {x},{y}"));
        }
        self.line(format_args!("{header}"));
    }

    fn place(&mut self, position: Position, face: Option<&State>) {
        match face {
            Some(state) => self.line(format_args!(
                "{} {} (bg #{}, fg #{})",
                cell(position),
                state.text,
                state.bg_color,
                state.fg_color
            )),
            None => self.line(format_args!(
                "{} - (bg #{EMPTY_BUTTON_BG_COLOR})",
                cell(position)
            )),
        }
    }

    fn refresh(&mut self, position: Position, face: &State) {
        self.line(format_args!(
            "{} => {} (bg #{}, fg #{})",
            cell(position),
            face.text,
            face.bg_color,
            face.fg_color
        ));
    }
}
