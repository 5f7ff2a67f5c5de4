//! Live per-button state for one session.
//!
//! Built once from a validated [`GridConfig`] and owned by the
//! [`Session`](crate::session::Session) on the UI thread. Nothing is ever
//! removed; the registry lives as long as the session.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::core::model::{ButtonDefinition, DEFAULT_STATE_ID, GridConfig, Position, State, StateId};
use crate::core::resolver::state_for;

/// Runtime half of a button: which state it is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeButton {
    pub current_state_id: StateId,
}

impl Default for RuntimeButton {
    fn default() -> Self {
        Self {
            current_state_id: DEFAULT_STATE_ID,
        }
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    live: HashMap<Position, RuntimeButton>,
    definitions: HashMap<Position, Arc<ButtonDefinition>>,
}

impl Registry {
    /// Every button starts in its default state.
    ///
    /// Two buttons declared at the same position are not rejected by
    /// validation; the later declaration replaces the earlier one here.
    pub fn from_config(config: &GridConfig) -> Self {
        let mut registry = Registry::default();
        for button in &config.buttons {
            let position = button.position;
            if registry
                .definitions
                .insert(position, Arc::new(button.clone()))
                .is_some()
            {
                warn!(%position, "button declared twice, later declaration wins");
            }
            registry.live.insert(position, RuntimeButton::default());
        }
        registry
    }

    pub fn definition(&self, position: Position) -> Option<&Arc<ButtonDefinition>> {
        self.definitions.get(&position)
    }

    pub fn button(&self, position: Position) -> Option<&RuntimeButton> {
        self.live.get(&position)
    }

    /// The state currently shown at `position`.
    pub fn current_state(&self, position: Position) -> Option<&State> {
        let button = self.live.get(&position)?;
        let definition = self.definitions.get(&position)?;
        state_for(&definition.states, button.current_state_id)
    }

    /// Returns `false` if no button lives at `position`.
    pub fn set_state(&mut self, position: Position, state_id: StateId) -> bool {
        match self.live.get_mut(&position) {
            Some(button) => {
                button.current_state_id = state_id;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
