//! Test-only helpers: board documents, a scripted command runner, and a
//! presenter that records what it was asked to draw.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::core::model::{GridConfig, Position, State, StateId, WindowOptions};
use crate::io::process::{CommandRunner, Completion};
use crate::session::Presenter;

/// A state entry with a label derived from its id.
pub fn state(id: StateId, cmd: &str) -> Value {
    json!({ "id": id, "txt": format!("state {id}"), "cmd": cmd })
}

/// A button entry at `(row, col)`.
pub fn button(row: u32, col: u32, states: Vec<Value>) -> Value {
    json!({ "position": [row, col], "states": states })
}

/// A whole board document with default spacing and padding.
pub fn grid_document(rows: u32, columns: u32, buttons: Vec<Value>) -> Value {
    json!({ "rows": rows, "columns": columns, "buttons": buttons })
}

/// Runner returning canned completions per command line.
///
/// Unscripted commands exit with `0`. Clones share the invocation log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    script: HashMap<String, Completion>,
    stall_after: Option<usize>,
    stalled_commands: HashSet<String>,
    stalled_calls: HashSet<usize>,
    invocations: Arc<Mutex<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit(self, command: &str, code: i32) -> Self {
        self.with_completion(command, Completion::Exited(code))
    }

    pub fn with_completion(mut self, command: &str, completion: Completion) -> Self {
        self.script.insert(command.to_string(), completion);
        self
    }

    /// Every run after the first `calls` never completes.
    pub fn stall_after(mut self, calls: usize) -> Self {
        self.stall_after = Some(calls);
        self
    }

    /// Runs of `command` never complete.
    pub fn stall_on(mut self, command: &str) -> Self {
        self.stalled_commands.insert(command.to_string());
        self
    }

    /// The `call`-th run (counting from 1) never completes.
    pub fn stall_call(mut self, call: usize) -> Self {
        self.stalled_calls.insert(call);
        self
    }

    /// Command lines run so far, in order.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().expect("invocations lock").clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str) -> impl Future<Output = Completion> + Send {
        let call = {
            let mut log = self.invocations.lock().expect("invocations lock");
            log.push(command.to_string());
            log.len()
        };
        let stalled = self.stall_after.is_some_and(|limit| call > limit)
            || self.stalled_commands.contains(command)
            || self.stalled_calls.contains(&call);
        let completion = self
            .script
            .get(command)
            .cloned()
            .unwrap_or(Completion::Exited(0));
        async move {
            if stalled {
                std::future::pending::<()>().await;
            }
            completion
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterCall {
    Layout {
        rows: u32,
        columns: u32,
        borderless: bool,
        window: WindowOptions,
    },
    Place {
        position: Position,
        face: Option<State>,
    },
    Refresh {
        position: Position,
        face: State,
    },
}

#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub calls: Vec<PresenterCall>,
}

impl RecordingPresenter {
    /// `(position, state id)` of every refresh, in order.
    pub fn refreshed(&self) -> Vec<(Position, StateId)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                PresenterCall::Refresh { position, face } => Some((*position, face.id)),
                PresenterCall::Layout { .. } | PresenterCall::Place { .. } => None,
            })
            .collect()
    }
}

impl Presenter for RecordingPresenter {
    fn layout(&mut self, config: &GridConfig) {
        self.calls.push(PresenterCall::Layout {
            rows: config.rows,
            columns: config.columns,
            borderless: config.borderless,
            window: config.window,
        });
    }

    fn place(&mut self, position: Position, face: Option<&State>) {
        self.calls.push(PresenterCall::Place {
            position,
            face: face.cloned(),
        });
    }

    fn refresh(&mut self, position: Position, face: &State) {
        self.calls.push(PresenterCall::Refresh {
            position,
            face: face.clone(),
        });
    }
}
