//! Voice backend abstraction
//!
//! The realtime voice transport, speech recognition and the agent's
//! reasoning all live outside this process. These traits describe the
//! boundary: a token issuer, a backend that constructs sessions, and the
//! session handle the connection controller owns exclusively.

mod error;
pub mod openai;
pub mod relay;

pub use error::{VoiceError, VoiceErrorKind};
pub use openai::OpenAiTokenIssuer;
pub use relay::{RelayBackend, RelayHub};

use crate::tools::{ToolContext, ToolDefinition, ToolOutput, ToolRegistry};
use crate::transcript::TranscriptItem;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Capacity of a session's turn channel
pub const TURN_CHANNEL_CAPACITY: usize = 256;

/// Short-lived credential for one voice session
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    secret: String,
}

impl SessionToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Issues a fresh token for every connect attempt
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue_session_token(&self) -> Result<SessionToken, VoiceError>;
}

/// Constructs sessions bound to an agent configuration
pub trait VoiceBackend: Send + Sync {
    fn create_session(&self, agent: AgentConfig, model: &str) -> Box<dyn VoiceSession>;
}

/// A live (or connecting) voice session
#[async_trait]
pub trait VoiceSession: Send {
    /// Take the stream of conversation turns. Only the first call yields a
    /// receiver; the stream ends when the session goes away.
    fn subscribe(&mut self) -> Option<mpsc::Receiver<TranscriptItem>>;

    /// Complete the connect handshake
    async fn connect(&mut self, token: &SessionToken) -> Result<(), VoiceError>;

    /// Close the session
    async fn close(&mut self) -> Result<(), VoiceError>;
}

/// Everything the external agent is configured with
#[derive(Clone)]
pub struct AgentConfig {
    pub name: String,
    /// Briefing text projected from the answers at connect time
    pub instructions: String,
    pub tools: Arc<ToolRegistry>,
    pub tool_context: ToolContext,
}

impl AgentConfig {
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.definitions()
    }

    /// Run a tool call on behalf of the agent
    pub async fn invoke(&self, name: &str, input: Value) -> Result<ToolOutput, VoiceError> {
        self.tools
            .execute(name, input, self.tool_context.clone())
            .await
            .ok_or_else(|| VoiceError::invalid_request(format!("Unknown tool: {name}")))
    }

    pub fn generation(&self) -> u64 {
        self.tool_context.session.generation()
    }
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("name", &self.name)
            .field("instructions_len", &self.instructions.len())
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

/// Source of session generations.
///
/// Each connect attempt advances the counter; teardown advances it again,
/// which makes every guard issued for the old session stale.
#[derive(Debug, Clone, Default)]
pub struct Generations {
    current: Arc<AtomicU64>,
}

impl Generations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation and return a guard bound to it
    pub fn advance(&self) -> SessionGuard {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        SessionGuard {
            generation,
            current: Some(Arc::clone(&self.current)),
        }
    }

    /// Make every outstanding guard stale
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

/// Ties work to the session generation it was started under
#[derive(Debug, Clone)]
pub struct SessionGuard {
    generation: u64,
    current: Option<Arc<AtomicU64>>,
}

impl SessionGuard {
    /// A guard that never goes stale, for callers outside any voice session
    pub fn detached() -> Self {
        Self {
            generation: 0,
            current: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.current
            .as_ref()
            .map_or(true, |c| c.load(Ordering::SeqCst) == self.generation)
    }
}
