//! Mapping from state ids and exit codes to states.

use std::collections::BTreeSet;

use crate::core::model::{ERROR_SINK_STATE_ID, State, StateId};

/// Find the state with `id`.
///
/// Returns `None` rather than failing; validated buttons always resolve.
pub fn state_for(states: &[State], id: StateId) -> Option<&State> {
    states.iter().find(|state| state.id == id)
}

/// Map a command's exit code to the next state id.
///
/// The exit code is the next state if a state with that id exists;
/// any other code falls back to [`ERROR_SINK_STATE_ID`].
pub fn next_state_id(states: &[State], exit_code: i64) -> StateId {
    if state_for(states, exit_code).is_some() {
        exit_code
    } else {
        ERROR_SINK_STATE_ID
    }
}

pub fn state_id_set(states: &[State]) -> BTreeSet<StateId> {
    states.iter().map(|state| state.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states(ids: &[StateId]) -> Vec<State> {
        ids.iter()
            .map(|id| State {
                id: *id,
                text: format!("state {id}"),
                bg_color: "aaaaff".to_string(),
                fg_color: "ffffff".to_string(),
                command: String::new(),
                follow_up_state: None,
            })
            .collect()
    }

    #[test]
    fn state_for_finds_by_id_and_tolerates_missing() {
        let states = states(&[0, 1, 4]);
        assert_eq!(state_for(&states, 4).map(|s| s.id), Some(4));
        assert!(state_for(&states, 9).is_none());
        assert!(state_for(&[], 0).is_none());
    }

    #[test]
    fn declared_exit_code_maps_to_itself() {
        let states = states(&[0, 1, 7]);
        assert_eq!(next_state_id(&states, 0), 0);
        assert_eq!(next_state_id(&states, 7), 7);
    }

    #[test]
    fn undeclared_exit_code_maps_to_error_sink() {
        let states = states(&[0, 1]);
        for code in [2, 7, 127, 255, -1, i64::from(i32::MAX), i64::MIN] {
            assert_eq!(next_state_id(&states, code), ERROR_SINK_STATE_ID);
        }
    }

    #[test]
    fn state_id_set_deduplicates() {
        let states = states(&[1, 0, 1]);
        assert_eq!(state_id_set(&states), BTreeSet::from([0, 1]));
    }
}
