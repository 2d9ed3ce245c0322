//! Browser relay backend
//!
//! The audio itself flows between the browser and the realtime provider. The
//! browser page connects with the ephemeral token this process hands out and
//! relays what the provider emits back here: finished conversation turns and
//! tool calls. The hub is the rendezvous point between those HTTP requests and
//! whichever session the controller currently owns.

use super::{
    AgentConfig, SessionToken, VoiceBackend, VoiceError, VoiceSession, TURN_CHANNEL_CAPACITY,
};
use crate::tools::{ToolDefinition, ToolOutput};
use crate::transcript::TranscriptItem;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use uuid::Uuid;

struct RelayLink {
    session_id: Uuid,
    token: SessionToken,
    model: String,
    agent: AgentConfig,
    turns: mpsc::Sender<TranscriptItem>,
}

/// What the browser needs to open its side of the session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSessionView {
    pub session_id: String,
    pub client_secret: String,
    pub model: String,
    pub agent_name: String,
    pub instructions: String,
    pub tools: Vec<ToolDefinition>,
}

/// Shared slot for the live relayed session
#[derive(Clone, Default)]
pub struct RelayHub {
    link: Arc<Mutex<Option<RelayLink>>>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<RelayLink>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_linked(&self) -> bool {
        self.lock().is_some()
    }

    pub fn client_view(&self) -> Result<ClientSessionView, VoiceError> {
        let guard = self.lock();
        let link = guard.as_ref().ok_or_else(no_session)?;
        Ok(ClientSessionView {
            session_id: link.session_id.to_string(),
            client_secret: link.token.secret().to_string(),
            model: link.model.clone(),
            agent_name: link.agent.name.clone(),
            instructions: link.agent.instructions.clone(),
            tools: link.agent.definitions(),
        })
    }

    /// Forward a finished conversation turn to the session's subscriber
    pub async fn push_transcript(&self, item: TranscriptItem) -> Result<(), VoiceError> {
        let sender = self
            .lock()
            .as_ref()
            .map(|l| l.turns.clone())
            .ok_or_else(no_session)?;
        sender.send(item).await.map_err(|_| {
            VoiceError::not_connected("Voice session closed before the turn was delivered")
        })
    }

    /// Run a tool call the agent issued through the browser
    pub async fn invoke_tool(&self, name: &str, input: Value) -> Result<ToolOutput, VoiceError> {
        // Clone out of the lock; the call may outlive the session and the
        // guard inside the agent's context decides whether it still counts.
        let agent = self
            .lock()
            .as_ref()
            .map(|l| l.agent.clone())
            .ok_or_else(no_session)?;
        agent.invoke(name, input).await
    }

    fn link(&self, link: RelayLink) {
        let mut guard = self.lock();
        if let Some(previous) = guard.as_ref() {
            tracing::warn!(
                previous = %previous.session_id,
                next = %link.session_id,
                "Replacing a relay link that was never closed"
            );
        }
        *guard = Some(link);
    }

    /// Drop the link only if it still belongs to `session_id`
    fn unlink(&self, session_id: Uuid) -> bool {
        let mut guard = self.lock();
        if guard.as_ref().is_some_and(|l| l.session_id == session_id) {
            *guard = None;
            true
        } else {
            false
        }
    }
}

fn no_session() -> VoiceError {
    VoiceError::not_connected("No voice session is connected")
}

/// Backend whose sessions live in the browser and report through a `RelayHub`
#[derive(Clone)]
pub struct RelayBackend {
    hub: RelayHub,
}

impl RelayBackend {
    pub fn new(hub: RelayHub) -> Self {
        Self { hub }
    }
}

impl VoiceBackend for RelayBackend {
    fn create_session(&self, agent: AgentConfig, model: &str) -> Box<dyn VoiceSession> {
        let (tx, rx) = mpsc::channel(TURN_CHANNEL_CAPACITY);
        Box::new(RelaySession {
            id: Uuid::new_v4(),
            hub: self.hub.clone(),
            agent,
            model: model.to_string(),
            turns_tx: Some(tx),
            turns_rx: Some(rx),
        })
    }
}

struct RelaySession {
    id: Uuid,
    hub: RelayHub,
    agent: AgentConfig,
    model: String,
    turns_tx: Option<mpsc::Sender<TranscriptItem>>,
    turns_rx: Option<mpsc::Receiver<TranscriptItem>>,
}

#[async_trait]
impl VoiceSession for RelaySession {
    fn subscribe(&mut self) -> Option<mpsc::Receiver<TranscriptItem>> {
        self.turns_rx.take()
    }

    async fn connect(&mut self, token: &SessionToken) -> Result<(), VoiceError> {
        let turns = self
            .turns_tx
            .take()
            .ok_or_else(|| VoiceError::invalid_request("Relay session already connected"))?;

        self.hub.link(RelayLink {
            session_id: self.id,
            token: token.clone(),
            model: self.model.clone(),
            agent: self.agent.clone(),
            turns,
        });
        tracing::info!(
            session_id = %self.id,
            generation = self.agent.generation(),
            "Relay session linked"
        );
        Ok(())
    }

    async fn close(&mut self) -> Result<(), VoiceError> {
        if self.hub.unlink(self.id) {
            tracing::info!(session_id = %self.id, "Relay session unlinked");
        }
        Ok(())
    }
}

impl Drop for RelaySession {
    fn drop(&mut self) {
        self.hub.unlink(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ResponseStore;
    use crate::survey::Catalog;
    use crate::tools::{ToolContext, ToolRegistry};
    use crate::transcript::Role;
    use crate::voice::{Generations, SessionGuard, VoiceErrorKind};
    use serde_json::json;

    fn agent(store: &ResponseStore, session: SessionGuard) -> AgentConfig {
        AgentConfig {
            name: "Survey Assistant".to_string(),
            instructions: "Be brief".to_string(),
            tools: Arc::new(ToolRegistry::survey()),
            tool_context: ToolContext::new(store.clone(), session),
        }
    }

    fn store() -> ResponseStore {
        ResponseStore::new(Arc::new(Catalog::genai_impact()))
    }

    #[tokio::test]
    async fn test_connect_links_and_relays_turns() {
        let hub = RelayHub::new();
        let backend = RelayBackend::new(hub.clone());
        let store = store();

        let mut session = backend.create_session(agent(&store, SessionGuard::detached()), "rt-model");
        let mut turns = session.subscribe().unwrap();
        assert!(session.subscribe().is_none());
        assert!(!hub.is_linked());

        session.connect(&SessionToken::new("ek_1")).await.unwrap();
        let view = hub.client_view().unwrap();
        assert_eq!(view.client_secret, "ek_1");
        assert_eq!(view.model, "rt-model");
        assert_eq!(view.tools.len(), 2);

        hub.push_transcript(TranscriptItem::new(Role::User, json!("hello")))
            .await
            .unwrap();
        let item = turns.recv().await.unwrap();
        assert_eq!(item.display_text(), "hello");

        session.close().await.unwrap();
        assert!(!hub.is_linked());
        assert!(turns.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_requests_without_session_fail() {
        let hub = RelayHub::new();
        let err = hub
            .push_transcript(TranscriptItem::new(Role::User, json!("hi")))
            .await
            .unwrap_err();
        assert_eq!(err.kind, VoiceErrorKind::NotConnected);

        let err = hub.invoke_tool("getSurveyStatus", json!({})).await.unwrap_err();
        assert_eq!(err.kind, VoiceErrorKind::NotConnected);
        assert!(hub.client_view().is_err());
    }

    #[tokio::test]
    async fn test_invoke_tool_writes_store() {
        let hub = RelayHub::new();
        let backend = RelayBackend::new(hub.clone());
        let store = store();
        let mut session = backend.create_session(agent(&store, SessionGuard::detached()), "m");
        session.connect(&SessionToken::new("ek")).await.unwrap();

        let out = hub
            .invoke_tool(
                "recordSurveyAnswer",
                json!({"questionId": 3, "answer": "Fewer meetings", "questionType": "long-text"}),
            )
            .await
            .unwrap();
        assert!(out.success);
        assert_eq!(store.get(3).as_deref(), Some("Fewer meetings"));

        let err = hub.invoke_tool("doesNotExist", json!({})).await.unwrap_err();
        assert_eq!(err.kind, VoiceErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_old_session_close_keeps_newer_link() {
        let hub = RelayHub::new();
        let backend = RelayBackend::new(hub.clone());
        let store = store();

        let mut old = backend.create_session(agent(&store, SessionGuard::detached()), "m");
        old.connect(&SessionToken::new("old")).await.unwrap();
        let mut new = backend.create_session(agent(&store, SessionGuard::detached()), "m");
        new.connect(&SessionToken::new("new")).await.unwrap();

        old.close().await.unwrap();
        assert_eq!(hub.client_view().unwrap().client_secret, "new");

        drop(new);
        assert!(!hub.is_linked());
    }

    #[tokio::test]
    async fn test_call_under_stale_generation_changes_nothing() {
        let hub = RelayHub::new();
        let backend = RelayBackend::new(hub.clone());
        let store = store();
        let generations = Generations::new();

        let mut session = backend.create_session(agent(&store, generations.advance()), "m");
        session.connect(&SessionToken::new("ek")).await.unwrap();
        generations.invalidate();

        let out = hub
            .invoke_tool(
                "recordSurveyAnswer",
                json!({"questionId": 2, "answer": "late", "questionType": "long-text"}),
            )
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(store.get(2), None);
    }
}
