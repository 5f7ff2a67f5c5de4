//! End-to-end board scenarios.
//!
//! Each test builds a board from a document, populates a session, presses
//! buttons and checks the registry and the faces the presenter was asked to
//! draw. Most use a scripted runner; the `shell_` tests spawn real `sh`.

use std::time::Duration;

use macroboard::core::model::{Position, StateId};
use macroboard::core::validator::{ValidationError, validate};
use macroboard::io::process::CommandRunner;
use macroboard::session::Session;
use macroboard::test_support::{RecordingPresenter, ScriptedRunner, button, grid_document, state};
use serde_json::json;

const WAIT: Duration = Duration::from_secs(10);

fn session_for(
    doc: &serde_json::Value,
    runner: ScriptedRunner,
) -> Session<ScriptedRunner, RecordingPresenter> {
    let config = validate(doc).expect("valid board");
    let mut session = Session::new(config, runner, RecordingPresenter::default());
    session.populate().expect("populate");
    session
}

fn current<R: CommandRunner>(
    session: &Session<R, RecordingPresenter>,
    row: u32,
    col: u32,
) -> Option<StateId> {
    session
        .registry()
        .button(Position::new(row, col))
        .map(|button| button.current_state_id)
}

/// Single-state button: every press re-runs the command and nothing changes.
#[test]
fn single_state_button_reruns_without_refresh() {
    let doc = grid_document(1, 1, vec![button(0, 0, vec![state(0, "true")])]);
    let runner = ScriptedRunner::new();
    let mut session = session_for(&doc, runner.clone());

    for _ in 0..3 {
        assert!(session.press(Position::new(0, 0)).expect("press"));
        assert!(session.settle(WAIT));
    }

    assert_eq!(runner.invocations(), vec!["true", "true", "true"]);
    assert_eq!(current(&session, 0, 0), Some(0));
    assert!(session.presenter().refreshed().is_empty());
}

/// Exit code 0 loops back to the declared state 0; an undeclared code
/// lands in the error sink.
#[test]
fn exit_code_selects_declared_state_or_error_sink() {
    let doc = grid_document(
        1,
        2,
        vec![
            button(0, 0, vec![state(0, "ok"), state(1, "echo err")]),
            button(0, 1, vec![state(0, "odd"), state(1, "echo err")]),
        ],
    );
    let runner = ScriptedRunner::new().with_exit("ok", 0).with_exit("odd", 7);
    let mut session = session_for(&doc, runner);

    session.press(Position::new(0, 0)).expect("press");
    session.press(Position::new(0, 1)).expect("press");
    assert!(session.settle(WAIT));

    assert_eq!(current(&session, 0, 0), Some(0));
    assert_eq!(current(&session, 0, 1), Some(1));
}

/// A linked button mirrors the resolved state without running its command.
#[test]
fn linked_button_follows_resolved_state() {
    let mut driver = button(0, 0, vec![state(0, "go live"), state(1, "go offline")]);
    driver["affects_buttons"] = json!([[0, 1]]);
    let follower = button(0, 1, vec![state(0, "follower 0"), state(1, "follower 1")]);
    let doc = grid_document(1, 2, vec![driver, follower]);

    let runner = ScriptedRunner::new().with_exit("go live", 1);
    let mut session = session_for(&doc, runner.clone());

    session.press(Position::new(0, 0)).expect("press");
    assert!(session.settle(WAIT));

    assert_eq!(current(&session, 0, 0), Some(1));
    assert_eq!(current(&session, 0, 1), Some(1));
    assert_eq!(
        session.presenter().refreshed(),
        vec![(Position::new(0, 0), 1), (Position::new(0, 1), 1)]
    );
    assert_eq!(runner.invocations(), vec!["go live"]);
}

/// Linking to an empty cell is rejected before any session exists.
#[test]
fn link_to_empty_cell_fails_validation() {
    let mut driver = button(0, 0, vec![state(0, "a"), state(1, "b")]);
    driver["affects_buttons"] = json!([[0, 1]]);
    let doc = grid_document(1, 2, vec![driver]);

    let err = validate(&doc).expect_err("should fail");
    assert!(matches!(err, ValidationError::LinkedButtonMissing { .. }));
    assert!(err.to_string().contains("(0, 1)"));
}

/// A follow-up state must exist on the same button.
#[test]
fn follow_up_to_missing_state_fails_validation() {
    let mut forced = state(0, "a");
    forced["follow_up_state"] = json!(5);
    let doc = grid_document(1, 1, vec![button(0, 0, vec![forced, state(1, "b")])]);

    let err = validate(&doc).expect_err("should fail");
    assert!(matches!(err, ValidationError::UnknownFollowUp { target: 5, .. }));
}

#[test]
fn validated_multi_state_buttons_contain_default_and_error_sink() {
    let doc = grid_document(
        2,
        2,
        vec![
            button(0, 0, vec![state(1, "a"), state(0, "b"), state(4, "c")]),
            button(1, 1, vec![state(0, "d")]),
        ],
    );
    let config = validate(&doc).expect("valid");
    for definition in config.buttons.iter().filter(|b| b.is_multi_state()) {
        let ids = definition.state_ids();
        assert!(ids.contains(&0) && ids.contains(&1));
    }
}

#[test]
fn concurrent_presses_on_different_buttons_are_independent() {
    let doc = grid_document(
        1,
        2,
        vec![
            button(0, 0, vec![state(0, "hang"), state(1, "err")]),
            button(0, 1, vec![state(0, "quick"), state(1, "err")]),
        ],
    );
    let runner = ScriptedRunner::new().with_exit("quick", 1).stall_on("hang");
    let mut session = session_for(&doc, runner.clone());

    session.press(Position::new(0, 0)).expect("press");
    session.press(Position::new(0, 1)).expect("press");
    assert!(!session.settle(Duration::from_millis(300)));

    assert_eq!(session.in_flight(), 1);
    assert_eq!(current(&session, 0, 0), Some(0));
    assert_eq!(current(&session, 0, 1), Some(1));
    assert_eq!(runner.invocations().len(), 2);
}

#[cfg(unix)]
mod shell {
    use macroboard::core::model::Position;
    use macroboard::core::validator::validate;
    use macroboard::io::process::ShellRunner;
    use macroboard::session::Session;
    use macroboard::test_support::{RecordingPresenter, button, grid_document, state};
    use serde_json::json;

    use super::{WAIT, current};

    #[test]
    fn shell_exit_codes_drive_transitions() {
        let mut driver = button(0, 0, vec![state(0, "exit 7"), state(1, "exit 0")]);
        driver["affects_buttons"] = json!([[0, 1]]);
        let doc = grid_document(
            1,
            2,
            vec![driver, button(0, 1, vec![state(0, ""), state(1, "")])],
        );
        let mut session = Session::new(
            validate(&doc).expect("valid"),
            ShellRunner::default(),
            RecordingPresenter::default(),
        );
        session.populate().expect("populate");

        // exit 7 is undeclared: error sink for both buttons.
        session.press(Position::new(0, 0)).expect("press");
        assert!(session.settle(WAIT));
        assert_eq!(current(&session, 0, 0), Some(1));
        assert_eq!(current(&session, 0, 1), Some(1));

        // exit 0 from the error sink returns to the default state.
        session.press(Position::new(0, 0)).expect("press");
        assert!(session.settle(WAIT));
        assert_eq!(current(&session, 0, 0), Some(0));
        assert_eq!(current(&session, 0, 1), Some(0));
    }

    #[test]
    fn missing_shell_lands_in_error_sink() {
        let doc = grid_document(1, 1, vec![button(0, 0, vec![state(0, "true"), state(1, "")])]);
        let runner = ShellRunner::new(vec!["/nonexistent/macroboard-shell".to_string()], None);
        let mut session = Session::new(
            validate(&doc).expect("valid"),
            runner,
            RecordingPresenter::default(),
        );
        session.populate().expect("populate");

        session.press(Position::new(0, 0)).expect("press");
        assert!(session.settle(WAIT));
        assert_eq!(current(&session, 0, 0), Some(1));
    }
}
