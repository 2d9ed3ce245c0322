//! Effects produced by state transitions

use super::ConnectionState;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Clear the transcript before a new session starts
    ResetTranscript,

    /// Issue a token, build the agent configuration and connect
    OpenSession,

    /// Close and discard the live session
    CloseSession,

    /// Tell the user they can start speaking, after a short delay
    ScheduleReadyNotice,

    /// Publish the new state to connected clients
    NotifyClient { state: ConnectionState },
}
