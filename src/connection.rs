//! Voice connection lifecycle state machine
//!
//! Pure transitions: the caller feeds an event and the current state in, and
//! gets the next state plus the effects to run. Nothing here performs I/O.

mod effect;
mod event;
mod state;
mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::ConnectionState;
#[cfg(test)]
pub use state::Direction;
pub use transition::{transition, TransitionError};
