//! Validation of an untyped board document into a [`GridConfig`].
//!
//! The document is whatever the config loader decoded (YAML, JSON or TOML),
//! held as a `serde_json::Value`. Validation fails fast on the first broken
//! invariant, in a fixed order:
//!
//! 1. grid dimensions and grid-wide flags
//! 2. each button in declaration order: position, state list, autostart,
//!    each state (id uniqueness, colors, text/command, follow-up type),
//!    default state, error-sink state, follow-up targets, link format
//!    (no repeats, no self-links)
//! 3. every button declaring `affects_buttons` against the buttons it links

use std::collections::{BTreeSet, HashMap, HashSet};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::core::model::{
    ButtonDefinition, DEFAULT_BUTTON_BG_COLOR, DEFAULT_BUTTON_FG_COLOR, DEFAULT_PADDING,
    DEFAULT_SPACING, DEFAULT_STATE_ID, ERROR_SINK_STATE_ID, GridConfig, Position, State, StateId,
    WindowOptions,
};
use crate::core::primitives::{is_valid_hexcolor, non_negative_int, positive_int};

/// First invariant a board document violates.
///
/// Offending values are rendered as compact JSON so the message can be shown
/// to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("config must be a mapping of settings, found {0}")]
    NotAMapping(String),

    #[error("invalid dimension '{field}': {value} (must be an integer > 0)")]
    InvalidDimension { field: &'static str, value: String },

    #[error("invalid '{field}': {value} (must be {expected})")]
    InvalidSetting {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid 'buttons': {0} (must be a list of mappings)")]
    ButtonsNotAList(String),

    #[error("button #{index}: entry must be a mapping, found {value}")]
    ButtonNotAMapping { index: usize, value: String },

    #[error("button #{index}: invalid 'position' {value} (must be [row, col] inside the grid)")]
    InvalidPosition { index: usize, value: String },

    #[error("button {position}: invalid 'states' {value} (must be a list of mappings)")]
    InvalidStates { position: Position, value: String },

    #[error("button {position}: 'states' must not be empty")]
    EmptyStates { position: Position },

    #[error("button {position}: invalid 'autostart' {value} (must be true or false)")]
    InvalidAutostart { position: Position, value: String },

    #[error("button {position}: state #{index} must be a mapping, found {value}")]
    StateNotAMapping {
        position: Position,
        index: usize,
        value: String,
    },

    #[error("button {position}: state #{index} has invalid 'id' {value} (must be an integer)")]
    InvalidStateId {
        position: Position,
        index: usize,
        value: String,
    },

    #[error("button {position}: duplicate state id {id}")]
    DuplicateStateId { position: Position, id: StateId },

    #[error("button {position}: state {id} has invalid '{field}' {value} (must be RRGGBB hex)")]
    InvalidColor {
        position: Position,
        id: StateId,
        field: &'static str,
        value: String,
    },

    #[error("button {position}: state {id} has invalid '{field}' {value} (must be a string)")]
    InvalidText {
        position: Position,
        id: StateId,
        field: &'static str,
        value: String,
    },

    #[error(
        "button {position}: state {id} has invalid 'follow_up_state' {value} (must be an integer)"
    )]
    InvalidFollowUp {
        position: Position,
        id: StateId,
        value: String,
    },

    #[error("button {position}: missing default state id 0")]
    MissingDefaultState { position: Position },

    #[error("button {position}: has several states but no error-sink state id 1")]
    MissingErrorSink { position: Position },

    #[error("button {position}: state {id} has 'follow_up_state' {target} which is not a state of this button")]
    UnknownFollowUp {
        position: Position,
        id: StateId,
        target: StateId,
    },

    #[error(
        "button {position}: invalid 'affects_buttons' {value} (must be a non-empty list of [row, col] inside the grid)"
    )]
    InvalidAffects { position: Position, value: String },

    #[error("button {position}: 'affects_buttons' must not list the button itself")]
    SelfLink { position: Position },

    #[error("button {position}: 'affects_buttons' lists {target} more than once")]
    DuplicateLink { position: Position, target: Position },

    #[error("button {position}: 'affects_buttons' entry {target} has no button defined")]
    LinkedButtonMissing { position: Position, target: Position },

    #[error("button {position}: 'affects_buttons' entry {target} has a single state and cannot follow")]
    LinkedButtonStateless { position: Position, target: Position },

    #[error(
        "button {position}: 'affects_buttons' entry {target} has state ids {found:?}, expected exactly {expected:?}"
    )]
    LinkedStateMismatch {
        position: Position,
        target: Position,
        expected: Vec<StateId>,
        found: Vec<StateId>,
    },
}

/// Validate a decoded document into an immutable [`GridConfig`].
#[instrument(skip_all)]
pub fn validate(document: &Value) -> Result<GridConfig, ValidationError> {
    let root = document
        .as_object()
        .ok_or_else(|| ValidationError::NotAMapping(describe(Some(document))))?;

    let columns = dimension(root, "columns", None)?;
    let rows = dimension(root, "rows", None)?;
    let spacing = dimension(root, "spacing", Some(DEFAULT_SPACING))?;
    let padding = dimension(root, "padding", Some(DEFAULT_PADDING))?;
    let borderless = flag(root, "borderless")?;
    let window = window_options(root)?;

    let raw_buttons = root
        .get("buttons")
        .and_then(Value::as_array)
        .ok_or_else(|| ValidationError::ButtonsNotAList(describe(root.get("buttons"))))?;

    let grid = Bounds { rows, columns };
    let buttons = raw_buttons
        .iter()
        .enumerate()
        .map(|(index, raw)| validate_button(index, raw, grid))
        .collect::<Result<Vec<_>, _>>()?;

    validate_links(&buttons)?;

    debug!(rows, columns, buttons = buttons.len(), "config validated");
    Ok(GridConfig {
        columns,
        rows,
        spacing,
        padding,
        borderless,
        window,
        buttons,
    })
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    rows: u32,
    columns: u32,
}

impl Bounds {
    /// Parse `[row, col]` inside the grid.
    fn position(self, value: &Value) -> Option<Position> {
        let pair = value.as_array().filter(|pair| pair.len() == 2)?;
        let row = non_negative_int(&pair[0]).filter(|row| *row < self.rows)?;
        let col = non_negative_int(&pair[1]).filter(|col| *col < self.columns)?;
        Some(Position::new(row, col))
    }
}

fn dimension(
    root: &Map<String, Value>,
    field: &'static str,
    default: Option<u32>,
) -> Result<u32, ValidationError> {
    match (root.get(field), default) {
        (None, Some(default)) => Ok(default),
        (value, _) => value
            .and_then(positive_int)
            .ok_or_else(|| ValidationError::InvalidDimension {
                field,
                value: describe(value),
            }),
    }
}

fn flag(root: &Map<String, Value>, field: &'static str) -> Result<bool, ValidationError> {
    match root.get(field) {
        None => Ok(false),
        Some(Value::Bool(value)) => Ok(*value),
        Some(other) => Err(ValidationError::InvalidSetting {
            field,
            value: describe(Some(other)),
            expected: "true or false",
        }),
    }
}

fn window_options(root: &Map<String, Value>) -> Result<WindowOptions, ValidationError> {
    let set_window_pos = flag(root, "set_window_pos")?;
    let use_auto_fullscreen_mode = flag(root, "use_auto_fullscreen_mode")?;

    let coordinate = |field: &'static str| -> Result<i64, ValidationError> {
        match root.get(field) {
            None if !set_window_pos => Ok(0),
            value => value
                .and_then(Value::as_i64)
                .ok_or_else(|| ValidationError::InvalidSetting {
                    field,
                    value: describe(value),
                    expected: "an integer",
                }),
        }
    };

    Ok(WindowOptions {
        set_window_pos,
        window_pos_x: coordinate("window_pos_x")?,
        window_pos_y: coordinate("window_pos_y")?,
        use_auto_fullscreen_mode,
    })
}

fn validate_button(
    index: usize,
    raw: &Value,
    grid: Bounds,
) -> Result<ButtonDefinition, ValidationError> {
    let entry = raw
        .as_object()
        .ok_or_else(|| ValidationError::ButtonNotAMapping {
            index,
            value: describe(Some(raw)),
        })?;

    let position = entry
        .get("position")
        .and_then(|value| grid.position(value))
        .ok_or_else(|| ValidationError::InvalidPosition {
            index,
            value: describe(entry.get("position")),
        })?;

    let raw_states = match entry.get("states") {
        Some(Value::Array(states)) => states,
        other => {
            return Err(ValidationError::InvalidStates {
                position,
                value: describe(other),
            });
        }
    };
    if raw_states.is_empty() {
        return Err(ValidationError::EmptyStates { position });
    }

    let autostart = match entry.get("autostart") {
        None => false,
        Some(Value::Bool(value)) => *value,
        Some(other) => {
            return Err(ValidationError::InvalidAutostart {
                position,
                value: describe(Some(other)),
            });
        }
    };

    let mut ids = BTreeSet::new();
    let mut states = Vec::with_capacity(raw_states.len());
    for (state_index, raw_state) in raw_states.iter().enumerate() {
        states.push(validate_state(position, state_index, raw_state, &mut ids)?);
    }

    if !ids.contains(&DEFAULT_STATE_ID) {
        return Err(ValidationError::MissingDefaultState { position });
    }
    if states.len() > 1 && !ids.contains(&ERROR_SINK_STATE_ID) {
        return Err(ValidationError::MissingErrorSink { position });
    }
    for state in &states {
        if let Some(target) = state.follow_up_state
            && !ids.contains(&target)
        {
            return Err(ValidationError::UnknownFollowUp {
                position,
                id: state.id,
                target,
            });
        }
    }

    let affects_buttons = entry
        .get("affects_buttons")
        .map(|value| links(position, value, grid))
        .transpose()?;

    Ok(ButtonDefinition {
        position,
        autostart,
        affects_buttons,
        states,
    })
}

fn validate_state(
    position: Position,
    index: usize,
    raw: &Value,
    ids: &mut BTreeSet<StateId>,
) -> Result<State, ValidationError> {
    let entry = raw
        .as_object()
        .ok_or_else(|| ValidationError::StateNotAMapping {
            position,
            index,
            value: describe(Some(raw)),
        })?;

    let id = entry
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| ValidationError::InvalidStateId {
            position,
            index,
            value: describe(entry.get("id")),
        })?;
    if !ids.insert(id) {
        return Err(ValidationError::DuplicateStateId { position, id });
    }

    let color = |field: &'static str, default: &str| -> Result<String, ValidationError> {
        match entry.get(field) {
            None => Ok(default.to_string()),
            Some(Value::String(value)) if is_valid_hexcolor(value) => Ok(value.clone()),
            Some(other) => Err(ValidationError::InvalidColor {
                position,
                id,
                field,
                value: describe(Some(other)),
            }),
        }
    };
    let text = |field: &'static str| -> Result<String, ValidationError> {
        match entry.get(field) {
            None => Ok(String::new()),
            Some(Value::String(value)) => Ok(value.clone()),
            Some(other) => Err(ValidationError::InvalidText {
                position,
                id,
                field,
                value: describe(Some(other)),
            }),
        }
    };

    let bg_color = color("bg_color", DEFAULT_BUTTON_BG_COLOR)?;
    let fg_color = color("fg_color", DEFAULT_BUTTON_FG_COLOR)?;
    let command = text("cmd")?;
    let label = text("txt")?;

    let follow_up_state = match entry.get("follow_up_state") {
        None => None,
        Some(value) => Some(value.as_i64().ok_or_else(|| ValidationError::InvalidFollowUp {
            position,
            id,
            value: describe(Some(value)),
        })?),
    };

    Ok(State {
        id,
        text: label,
        bg_color,
        fg_color,
        command,
        follow_up_state,
    })
}

fn links(position: Position, value: &Value, grid: Bounds) -> Result<Vec<Position>, ValidationError> {
    let invalid = |value: &Value| ValidationError::InvalidAffects {
        position,
        value: describe(Some(value)),
    };
    let entries = value
        .as_array()
        .filter(|entries| !entries.is_empty())
        .ok_or_else(|| invalid(value))?;
    let mut seen = HashSet::with_capacity(entries.len());
    let mut targets = Vec::with_capacity(entries.len());
    for entry in entries {
        let target = grid.position(entry).ok_or_else(|| invalid(entry))?;
        if target == position {
            return Err(ValidationError::SelfLink { position });
        }
        if !seen.insert(target) {
            return Err(ValidationError::DuplicateLink { position, target });
        }
        targets.push(target);
    }
    Ok(targets)
}

/// Cross-button pass: linked buttons exist, have several states, and share
/// the exact state-id set of the button that drives them.
fn validate_links(buttons: &[ButtonDefinition]) -> Result<(), ValidationError> {
    // Later declarations shadow earlier ones, matching the runtime registry.
    let by_position: HashMap<Position, &ButtonDefinition> =
        buttons.iter().map(|button| (button.position, button)).collect();

    for button in buttons {
        let Some(targets) = &button.affects_buttons else {
            continue;
        };
        let expected = button.state_ids();
        for target in targets {
            let linked = by_position.get(target).ok_or(ValidationError::LinkedButtonMissing {
                position: button.position,
                target: *target,
            })?;
            if !linked.is_multi_state() {
                return Err(ValidationError::LinkedButtonStateless {
                    position: button.position,
                    target: *target,
                });
            }
            let found = linked.state_ids();
            if found != expected {
                return Err(ValidationError::LinkedStateMismatch {
                    position: button.position,
                    target: *target,
                    expected: expected.iter().copied().collect(),
                    found: found.into_iter().collect(),
                });
            }
        }
    }
    Ok(())
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "<missing>".to_string(),
        Some(value) => value.to_string(),
    }
}
