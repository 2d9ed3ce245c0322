//! Mock voice collaborators
//!
//! These mocks let the controller run its full connect and disconnect
//! sequences without a network.

use crate::transcript::TranscriptItem;
use crate::voice::{
    AgentConfig, SessionToken, TokenIssuer, VoiceBackend, VoiceError, VoiceSession,
    TURN_CHANNEL_CAPACITY,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};

// ============================================================================
// Mock Token Issuer
// ============================================================================

/// Token issuer that hands out numbered tokens, or queued errors. A gated
/// issuer holds every request until `release` is called.
pub struct MockTokenIssuer {
    errors: Mutex<VecDeque<VoiceError>>,
    issued: AtomicUsize,
    gated: bool,
    released: AtomicBool,
    gate: Notify,
    started: Notify,
}

impl MockTokenIssuer {
    pub fn new() -> Self {
        Self {
            errors: Mutex::new(VecDeque::new()),
            issued: AtomicUsize::new(0),
            gated: false,
            released: AtomicBool::new(false),
            gate: Notify::new(),
            started: Notify::new(),
        }
    }

    pub fn gated() -> Self {
        Self {
            gated: true,
            ..Self::new()
        }
    }

    /// Fail the next request with `error`
    pub fn queue_error(&self, error: VoiceError) {
        self.errors.lock().unwrap().push_back(error);
    }

    /// Wait until a request is suspended in the issuer
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
        self.gate.notify_waiters();
    }

    pub fn tokens_issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

impl Default for MockTokenIssuer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenIssuer for MockTokenIssuer {
    async fn issue_session_token(&self) -> Result<SessionToken, VoiceError> {
        if self.gated {
            let released = self.gate.notified();
            tokio::pin!(released);
            released.as_mut().enable();
            // notify_one stores a permit, so a waiter that registers late still wakes
            self.started.notify_one();
            if !self.released.load(Ordering::SeqCst) {
                released.await;
            }
        }

        if let Some(error) = self.errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SessionToken::new(format!("ek_test_{n}")))
    }
}

// ============================================================================
// Mock Voice Backend
// ============================================================================

/// Test-side view of a session the backend constructed
pub struct MockSessionHandle {
    agent: AgentConfig,
    turns: mpsc::Sender<TranscriptItem>,
    close_calls: AtomicUsize,
}

impl MockSessionHandle {
    pub fn agent(&self) -> AgentConfig {
        self.agent.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Emit a conversation turn as the external session would. Turns sent
    /// after the controller stopped listening are dropped.
    pub async fn push_turn(&self, item: TranscriptItem) {
        let _ = self.turns.send(item).await;
    }
}

/// Backend that records every session it constructs
pub struct MockVoiceBackend {
    sessions: Mutex<Vec<Arc<MockSessionHandle>>>,
    connect_errors: Mutex<VecDeque<VoiceError>>,
    close_error: Mutex<Option<VoiceError>>,
}

impl MockVoiceBackend {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            connect_errors: Mutex::new(VecDeque::new()),
            close_error: Mutex::new(None),
        }
    }

    pub fn fail_next_connect(&self, error: VoiceError) {
        self.connect_errors.lock().unwrap().push_back(error);
    }

    /// Every close from now on reports `error`
    pub fn fail_close_with(&self, error: VoiceError) {
        *self.close_error.lock().unwrap() = Some(error);
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn last_session(&self) -> Option<Arc<MockSessionHandle>> {
        self.sessions.lock().unwrap().last().cloned()
    }
}

impl Default for MockVoiceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceBackend for MockVoiceBackend {
    fn create_session(&self, agent: AgentConfig, _model: &str) -> Box<dyn VoiceSession> {
        let (tx, rx) = mpsc::channel(TURN_CHANNEL_CAPACITY);
        let handle = Arc::new(MockSessionHandle {
            agent,
            turns: tx,
            close_calls: AtomicUsize::new(0),
        });
        self.sessions.lock().unwrap().push(Arc::clone(&handle));

        Box::new(MockVoiceSession {
            handle,
            turns: Some(rx),
            connect_error: self.connect_errors.lock().unwrap().pop_front(),
            close_error: self.close_error.lock().unwrap().clone(),
        })
    }
}

pub struct MockVoiceSession {
    handle: Arc<MockSessionHandle>,
    turns: Option<mpsc::Receiver<TranscriptItem>>,
    connect_error: Option<VoiceError>,
    close_error: Option<VoiceError>,
}

#[async_trait]
impl VoiceSession for MockVoiceSession {
    fn subscribe(&mut self) -> Option<mpsc::Receiver<TranscriptItem>> {
        self.turns.take()
    }

    async fn connect(&mut self, _token: &SessionToken) -> Result<(), VoiceError> {
        match self.connect_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn close(&mut self) -> Result<(), VoiceError> {
        self.handle.close_calls.fetch_add(1, Ordering::SeqCst);
        match &self.close_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
