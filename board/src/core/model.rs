//! Typed board model produced by the validator.
//!
//! These types are the only representation of a board downstream of
//! [`crate::core::validator`]. They are immutable once validated and their
//! `Serialize` impls emit the canonical document shape (every key explicit),
//! which validates back to an equal value.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

/// Identifier of a state, unique within its button.
pub type StateId = i64;

/// The state every button starts in.
pub const DEFAULT_STATE_ID: StateId = 0;
/// Fallback state for exit codes that match no declared state.
pub const ERROR_SINK_STATE_ID: StateId = 1;

pub const DEFAULT_BUTTON_BG_COLOR: &str = "aaaaff";
pub const DEFAULT_BUTTON_FG_COLOR: &str = "ffffff";
/// Background of grid cells with no button defined.
pub const EMPTY_BUTTON_BG_COLOR: &str = "cccccc";

pub const DEFAULT_SPACING: u32 = 5;
pub const DEFAULT_PADDING: u32 = 5;

/// Grid cell address, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: u32,
    pub col: u32,
}

impl Position {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Serialized as `[row, col]`, the document form.
impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.row, self.col].serialize(serializer)
    }
}

/// One labelled, colored configuration of a button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct State {
    pub id: StateId,
    #[serde(rename = "txt")]
    pub text: String,
    pub bg_color: String,
    pub fg_color: String,
    #[serde(rename = "cmd")]
    pub command: String,
    /// Forces the next state regardless of the command's exit code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_state: Option<StateId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonDefinition {
    pub position: Position,
    pub autostart: bool,
    /// Buttons that mirror this button's resolved state id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affects_buttons: Option<Vec<Position>>,
    /// Declaration order is kept; ids are unique and include
    /// [`DEFAULT_STATE_ID`] (and [`ERROR_SINK_STATE_ID`] when there is more
    /// than one state).
    pub states: Vec<State>,
}

impl ButtonDefinition {
    /// Buttons with a single state never transition.
    pub fn is_multi_state(&self) -> bool {
        self.states.len() > 1
    }

    pub fn state_ids(&self) -> BTreeSet<StateId> {
        crate::core::resolver::state_id_set(&self.states)
    }
}

/// Optional window placement carried through to the presenter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowOptions {
    pub set_window_pos: bool,
    pub window_pos_x: i64,
    pub window_pos_y: i64,
    pub use_auto_fullscreen_mode: bool,
}

impl WindowOptions {
    /// Requested top-left window corner, if any.
    pub fn position(&self) -> Option<(i64, i64)> {
        self.set_window_pos
            .then_some((self.window_pos_x, self.window_pos_y))
    }
}

/// A validated board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridConfig {
    pub columns: u32,
    pub rows: u32,
    pub spacing: u32,
    pub padding: u32,
    pub borderless: bool,
    #[serde(flatten)]
    pub window: WindowOptions,
    pub buttons: Vec<ButtonDefinition>,
}

impl GridConfig {
    /// Later declarations win when two buttons share a position.
    pub fn button_at(&self, position: Position) -> Option<&ButtonDefinition> {
        self.buttons.iter().rev().find(|b| b.position == position)
    }

    pub fn contains(&self, position: Position) -> bool {
        position.row < self.rows && position.col < self.columns
    }

    /// Every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.columns).map(move |col| Position::new(row, col)))
    }
}
