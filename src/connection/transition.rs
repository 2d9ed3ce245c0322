//! Pure state transition function

use super::state::Direction;
use super::{ConnectionState, Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConnectionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Attach a client notification carrying the new state
    fn notify(self) -> Self {
        let state = self.new_state;
        self.with_effect(Effect::NotifyClient { state })
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A connect or disconnect is already in progress")]
    InFlight,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function: same inputs, same outputs, no I/O.
pub fn transition(
    state: ConnectionState,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let opening = ConnectionState::Connecting {
        direction: Direction::Opening,
    };
    let closing = ConnectionState::Connecting {
        direction: Direction::Closing,
    };

    match (state, event) {
        (ConnectionState::Disconnected, Event::Toggle) => Ok(TransitionResult::new(opening)
            .with_effect(Effect::ResetTranscript)
            .notify()
            .with_effect(Effect::OpenSession)),

        (ConnectionState::Connected, Event::Toggle) => Ok(TransitionResult::new(closing)
            .notify()
            .with_effect(Effect::CloseSession)),

        // Ignored, not queued
        (ConnectionState::Connecting { .. }, Event::Toggle) => Err(TransitionError::InFlight),

        (
            ConnectionState::Connecting {
                direction: Direction::Opening,
            },
            Event::SessionOpened,
        ) => Ok(TransitionResult::new(ConnectionState::Connected)
            .notify()
            .with_effect(Effect::ScheduleReadyNotice)),

        (
            ConnectionState::Connecting {
                direction: Direction::Opening,
            },
            Event::OpenFailed { .. },
        )
        | (
            ConnectionState::Connecting {
                direction: Direction::Closing,
            },
            Event::SessionClosed { .. },
        ) => Ok(TransitionResult::new(ConnectionState::Disconnected).notify()),

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} while {state}"
        ))),
    }
}
