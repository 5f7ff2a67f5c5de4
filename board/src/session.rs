//! One running board: registry, engine and presenter on the UI thread.
//!
//! The session is the single owner of the [`Registry`]. Button presses and
//! autostart go out to the [`Engine`]; engine results come back as
//! [`EngineEvent`]s and are applied here, on the thread that owns the
//! presenter, via [`Session::pump`] or [`Session::settle`].

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError, channel};
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::model::{GridConfig, Position, State};
use crate::engine::{Engine, EngineEvent, apply_transition};
use crate::io::process::CommandRunner;
use crate::registry::Registry;

/// Presentation collaborator: draws button faces.
///
/// Called only from the thread that owns the [`Session`].
pub trait Presenter {
    /// Called once before any cell is placed, with the whole board: grid
    /// size, spacing, padding, border and window options.
    fn layout(&mut self, config: &GridConfig);

    /// Called once per grid cell, row by row, when the board is populated.
    /// `face` is `None` for cells with no button.
    fn place(&mut self, position: Position, face: Option<&State>);

    /// The button at `position` now shows `face`.
    fn refresh(&mut self, position: Position, face: &State);
}

pub struct Session<R: CommandRunner, P: Presenter> {
    config: Arc<GridConfig>,
    registry: Registry,
    engine: Engine<R>,
    events: Receiver<EngineEvent>,
    presenter: P,
    in_flight: usize,
}

impl<R: CommandRunner, P: Presenter> Session<R, P> {
    pub fn new(config: GridConfig, runner: R, presenter: P) -> Self {
        let (tx, rx) = channel();
        let registry = Registry::from_config(&config);
        Self {
            config: Arc::new(config),
            registry,
            engine: Engine::new(runner, tx),
            events: rx,
            presenter,
            in_flight: 0,
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Trigger sequences started but not yet settled.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Lay out the board, place every grid cell, then trigger autostart
    /// buttons once each in row-major order.
    ///
    /// Only the button that owns a position counts: an autostart flag on a
    /// declaration shadowed by a later one at the same position is ignored.
    #[instrument(skip_all)]
    pub fn populate(&mut self) -> Result<()> {
        self.presenter.layout(&self.config);

        let mut autostart = Vec::new();
        let cells: Vec<Position> = self.config.cells().collect();
        for position in cells {
            let face = self.registry.current_state(position);
            self.presenter.place(position, face);
            if self
                .registry
                .definition(position)
                .is_some_and(|definition| definition.autostart)
            {
                autostart.push(position);
            }
        }

        info!(
            cells = self.config.rows * self.config.columns,
            buttons = self.registry.len(),
            autostart = autostart.len(),
            "board populated"
        );
        for position in autostart {
            self.press(position)?;
        }
        Ok(())
    }

    /// Trigger the button at `position` from its current state.
    ///
    /// Returns `Ok(false)` if there is no button there.
    pub fn press(&mut self, position: Position) -> Result<bool> {
        let (Some(definition), Some(button)) = (
            self.registry.definition(position),
            self.registry.button(position),
        ) else {
            debug!(%position, "press on empty cell ignored");
            return Ok(false);
        };
        let definition = Arc::clone(definition);
        let current = button.current_state_id;
        self.engine.trigger(definition, current)?;
        self.in_flight += 1;
        Ok(true)
    }

    /// Apply every engine event that has already arrived, without blocking.
    ///
    /// Returns the number of events applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.apply(event);
                    applied += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return applied,
            }
        }
    }

    /// Block until every started sequence has settled or `timeout` passes.
    ///
    /// Returns `false` on timeout. Sequences that never end (self-repeating
    /// follow-up states) always time out.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(event) => self.apply(event),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }

    fn apply(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Transition(transition) => {
                for position in apply_transition(&mut self.registry, &transition) {
                    match self.registry.current_state(position) {
                        Some(face) => self.presenter.refresh(position, face),
                        None => warn!(%position, state = transition.state_id, "no face for state"),
                    }
                }
            }
            EngineEvent::Settled { origin } => {
                debug!(%origin, "trigger sequence settled");
                self.in_flight = self.in_flight.saturating_sub(1);
            }
        }
    }
}
