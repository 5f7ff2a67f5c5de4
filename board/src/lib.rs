//! Macro button grid driven by per-button state machines.
//!
//! Every button on the grid owns a small finite state machine. Pressing a
//! button runs the shell command of its current state, and the command's exit
//! code selects the next state. The crate is split the same way throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (document validation, the typed
//!   model, exit-code resolution). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config files, settings, child
//!   processes). Isolated behind traits so tests can script them.
//!
//! [`engine`], [`registry`] and [`session`] tie the two together at runtime:
//! the engine executes commands on a background task loop while the session
//! owns all live state on the UI thread.

pub mod console;
pub mod core;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod registry;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
