//! Execution engine: runs a button's commands and resolves its next state.
//!
//! # Threading
//!
//! Commands run as tasks on a background tokio runtime with one worker
//! thread, started on the first trigger and reused for the rest of the
//! process. A task never touches the [`Registry`]; it reports each resolved
//! state as an [`EngineEvent`] over a channel. The owner of the registry (the
//! UI thread) drains that channel and calls [`apply_transition`].
//!
//! # Follow-up chains
//!
//! A state with `follow_up_state` forces the next state regardless of the
//! exit code, and the engine immediately runs the command of that next state.
//! The chain ends at the first state without a follow-up. A state whose
//! follow-up is itself re-runs its command forever; that is a supported way
//! to keep a watcher command alive, not an error.

use std::sync::Arc;
use std::sync::mpsc::Sender;

use anyhow::{Context, Result};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, instrument, warn};

use crate::core::model::{ButtonDefinition, Position, StateId};
use crate::core::resolver::{next_state_id, state_for};
use crate::io::process::{CommandRunner, Completion};
use crate::registry::Registry;

/// A button resolved a new state id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub origin: Position,
    pub state_id: StateId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Published after every resolved hop of a multi-state button.
    Transition(Transition),
    /// The trigger sequence started at `origin` has finished.
    Settled { origin: Position },
}

pub struct Engine<R: CommandRunner> {
    runner: Arc<R>,
    events: Sender<EngineEvent>,
    runtime: Option<Runtime>,
}

impl<R: CommandRunner> Engine<R> {
    pub fn new(runner: R, events: Sender<EngineEvent>) -> Self {
        Self {
            runner: Arc::new(runner),
            events,
            runtime: None,
        }
    }

    /// Start a trigger sequence for `button`, beginning at `current`.
    ///
    /// Returns as soon as the task is spawned. Triggering a button whose
    /// previous sequence is still running starts an independent sequence;
    /// their transitions interleave and the last one applied wins.
    #[instrument(skip_all, fields(position = %button.position, state = current))]
    pub fn trigger(&mut self, button: Arc<ButtonDefinition>, current: StateId) -> Result<()> {
        let runner = Arc::clone(&self.runner);
        let events = self.events.clone();
        debug!("spawning trigger sequence");
        self.runtime()?
            .spawn(run_sequence(runner, button, current, events));
        Ok(())
    }

    fn runtime(&mut self) -> Result<&Runtime> {
        if self.runtime.is_none() {
            let runtime = Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("macroboard-engine")
                .enable_all()
                .build()
                .context("start engine runtime")?;
            info!("engine runtime started");
            self.runtime = Some(runtime);
        }
        self.runtime.as_ref().context("engine runtime missing")
    }
}

/// One trigger sequence: run, resolve, publish, and follow forced hops.
async fn run_sequence<R: CommandRunner>(
    runner: Arc<R>,
    button: Arc<ButtonDefinition>,
    start: StateId,
    events: Sender<EngineEvent>,
) {
    let origin = button.position;
    let mut current = start;
    loop {
        let Some(state) = state_for(&button.states, current) else {
            warn!(%origin, state = current, "button has no such state, dropping trigger");
            break;
        };

        let completion = if state.command.is_empty() {
            Completion::Exited(0)
        } else {
            info!(%origin, state = state.id, command = %state.command, "executing command");
            runner.run(&state.command).await
        };
        if !matches!(completion, Completion::Exited(_)) {
            warn!(%origin, state = state.id, ?completion, "command did not exit normally");
        }

        let next = match state.follow_up_state {
            Some(forced) => forced,
            None => next_state_id(&button.states, completion.exit_code()),
        };
        debug!(%origin, from = state.id, to = next, exit_code = completion.exit_code(), "resolved next state");

        if button.is_multi_state() {
            let event = EngineEvent::Transition(Transition {
                origin,
                state_id: next,
            });
            if events.send(event).is_err() {
                debug!(%origin, "session closed, stopping sequence");
                return;
            }
        }

        if state.follow_up_state.is_none() {
            break;
        }
        current = next;
    }

    // The session may already be gone; nothing left to report to.
    let _ = events.send(EngineEvent::Settled { origin });
}

/// Apply a transition on the registry owner's thread.
///
/// Sets the origin and every button it links to the same state id, without
/// running the linked buttons' commands. Returns the positions whose face
/// changed, origin first.
pub fn apply_transition(registry: &mut Registry, transition: &Transition) -> Vec<Position> {
    let Transition { origin, state_id } = *transition;
    let mut refreshed = Vec::new();
    if registry.set_state(origin, state_id) {
        refreshed.push(origin);
    }

    let linked = registry
        .definition(origin)
        .and_then(|definition| definition.affects_buttons.clone())
        .unwrap_or_default();
    for target in linked {
        if registry.set_state(target, state_id) {
            refreshed.push(target);
        }
    }
    refreshed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validator::validate;
    use crate::test_support::{ScriptedRunner, button, grid_document, state};
    use serde_json::json;
    use std::sync::mpsc::{Receiver, channel};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn definition(doc: serde_json::Value, index: usize) -> Arc<ButtonDefinition> {
        Arc::new(validate(&doc).expect("valid").buttons[index].clone())
    }

    /// Collect events until the sequence for `origin` settles.
    fn collect_until_settled(rx: &Receiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut seen = Vec::new();
        loop {
            let event = rx.recv_timeout(WAIT).expect("engine event");
            seen.push(event);
            if matches!(event, EngineEvent::Settled { .. }) {
                return seen;
            }
        }
    }

    fn transition(row: u32, col: u32, state_id: StateId) -> EngineEvent {
        EngineEvent::Transition(Transition {
            origin: Position::new(row, col),
            state_id,
        })
    }

    #[test]
    fn declared_exit_code_selects_state() {
        let doc = grid_document(
            1,
            1,
            vec![button(0, 0, vec![state(0, "probe"), state(1, "err"), state(3, "x")])],
        );
        let (tx, rx) = channel();
        let mut engine = Engine::new(ScriptedRunner::new().with_exit("probe", 3), tx);

        engine.trigger(definition(doc, 0), 0).expect("trigger");
        assert_eq!(
            collect_until_settled(&rx),
            vec![
                transition(0, 0, 3),
                EngineEvent::Settled {
                    origin: Position::new(0, 0)
                }
            ]
        );
    }

    #[test]
    fn undeclared_exit_code_falls_back_to_error_sink() {
        let doc = grid_document(1, 1, vec![button(0, 0, vec![state(0, "probe"), state(1, "err")])]);
        let (tx, rx) = channel();
        let mut engine = Engine::new(ScriptedRunner::new().with_exit("probe", 7), tx);

        engine.trigger(definition(doc, 0), 0).expect("trigger");
        assert_eq!(collect_until_settled(&rx)[0], transition(0, 0, 1));
    }

    #[test]
    fn launch_failure_falls_back_to_error_sink() {
        let doc = grid_document(1, 1, vec![button(0, 0, vec![state(0, "probe"), state(1, "err")])]);
        let (tx, rx) = channel();
        let runner = ScriptedRunner::new()
            .with_completion("probe", Completion::LaunchFailed("no such file".to_string()));
        let mut engine = Engine::new(runner, tx);

        engine.trigger(definition(doc, 0), 0).expect("trigger");
        assert_eq!(collect_until_settled(&rx)[0], transition(0, 0, 1));
    }

    #[test]
    fn single_state_button_publishes_no_transition() {
        let doc = grid_document(1, 1, vec![button(0, 0, vec![state(0, "true")])]);
        let (tx, rx) = channel();
        let runner = ScriptedRunner::new().with_exit("true", 5);
        let mut engine = Engine::new(runner.clone(), tx);

        engine.trigger(definition(doc, 0), 0).expect("trigger");
        assert_eq!(
            collect_until_settled(&rx),
            vec![EngineEvent::Settled {
                origin: Position::new(0, 0)
            }]
        );
        assert_eq!(runner.invocations(), vec!["true".to_string()]);
    }

    #[test]
    fn follow_up_chain_runs_each_hop_and_stops_at_exit_code_state() {
        let mut first = state(0, "one");
        first["follow_up_state"] = json!(2);
        let mut second = state(2, "two");
        second["follow_up_state"] = json!(1);
        let doc = grid_document(1, 1, vec![button(0, 0, vec![first, state(1, "three"), second])]);

        let (tx, rx) = channel();
        // Exit codes of forced hops are ignored.
        let runner = ScriptedRunner::new()
            .with_exit("one", 9)
            .with_exit("two", 9)
            .with_exit("three", 0);
        let mut engine = Engine::new(runner.clone(), tx);

        engine.trigger(definition(doc, 0), 0).expect("trigger");
        let events = collect_until_settled(&rx);
        assert_eq!(
            events,
            vec![
                transition(0, 0, 2),
                transition(0, 0, 1),
                transition(0, 0, 0),
                EngineEvent::Settled {
                    origin: Position::new(0, 0)
                },
            ]
        );
        assert_eq!(runner.invocations(), vec!["one", "two", "three"]);
    }

    #[test]
    fn self_referential_follow_up_repeats_forever() {
        let mut forever = state(0, "watch");
        forever["follow_up_state"] = json!(0);
        let doc = grid_document(1, 1, vec![button(0, 0, vec![forever, state(1, "err")])]);

        let (tx, rx) = channel();
        // Stall the fourth run so the test can observe a bounded prefix.
        let runner = ScriptedRunner::new().stall_after(3);
        let mut engine = Engine::new(runner.clone(), tx);

        engine.trigger(definition(doc, 0), 0).expect("trigger");
        for _ in 0..3 {
            assert_eq!(rx.recv_timeout(WAIT).expect("event"), transition(0, 0, 0));
        }
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        assert_eq!(runner.invocations().len(), 4);
    }

    #[test]
    fn empty_command_counts_as_success_without_running() {
        let doc = grid_document(1, 1, vec![button(0, 0, vec![state(0, ""), state(1, "err")])]);
        let (tx, rx) = channel();
        let runner = ScriptedRunner::new();
        let mut engine = Engine::new(runner.clone(), tx);

        engine.trigger(definition(doc, 0), 0).expect("trigger");
        assert_eq!(collect_until_settled(&rx)[0], transition(0, 0, 0));
        assert!(runner.invocations().is_empty());
    }

    #[test]
    fn apply_transition_updates_origin_and_linked_buttons() {
        let mut driver = button(0, 0, vec![state(0, "a"), state(1, "b")]);
        driver["affects_buttons"] = json!([[0, 1], [0, 2]]);
        let doc = grid_document(
            1,
            3,
            vec![
                driver,
                button(0, 1, vec![state(0, "c"), state(1, "d")]),
                button(0, 2, vec![state(0, "e"), state(1, "f")]),
            ],
        );
        let mut registry = Registry::from_config(&validate(&doc).expect("valid"));

        let refreshed = apply_transition(
            &mut registry,
            &Transition {
                origin: Position::new(0, 0),
                state_id: 1,
            },
        );
        assert_eq!(
            refreshed,
            vec![Position::new(0, 0), Position::new(0, 1), Position::new(0, 2)]
        );
        for col in 0..3 {
            assert_eq!(
                registry.button(Position::new(0, col)).map(|b| b.current_state_id),
                Some(1)
            );
        }
    }
}
