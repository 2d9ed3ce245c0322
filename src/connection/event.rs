//! Events that drive the connection lifecycle

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The user pressed the voice button
    Toggle,

    /// Token issued, session constructed and handshake complete
    SessionOpened,

    /// Some step of the open sequence failed; the handle is already gone
    OpenFailed { message: String },

    /// The session was closed. `error` carries a close failure, which does
    /// not change the outcome.
    SessionClosed { error: Option<String> },
}
