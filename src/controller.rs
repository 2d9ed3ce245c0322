//! Voice connection controller
//!
//! Owns the single live voice session. Connection events run through the
//! pure `connection::transition` function; this module executes the
//! resulting effects and feeds the events they generate back in.

#[cfg(test)]
pub mod testing;

use crate::config::AppConfig;
use crate::connection::{transition, ConnectionState, Effect, Event, TransitionError};
use crate::projector::build_briefing;
use crate::store::ResponseStore;
use crate::tools::{ToolContext, ToolRegistry};
use crate::transcript::{TranscriptItem, TranscriptLog};
use crate::voice::{
    AgentConfig, Generations, SessionGuard, TokenIssuer, VoiceBackend, VoiceError, VoiceSession,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Shown once the session is up and the agent can hear the user
pub const READY_NOTICE: &str =
    "Voice Assistant is ready! Say 'Hello' or start speaking about any question to begin your conversation.";

const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Events pushed to connected clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurveyEvent {
    ConnectionChanged { state: ConnectionState },
    TranscriptAppended { item: TranscriptItem },
    ReadyNotice { message: String },
}

/// Controller settings taken from `AppConfig`
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub model: String,
    pub agent_name: String,
    pub ready_notice_delay: Duration,
}

impl From<&AppConfig> for ControllerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.realtime_model.clone(),
            agent_name: config.agent_name.clone(),
            ready_notice_delay: config.ready_notice_delay,
        }
    }
}

struct LiveSession {
    session: Box<dyn VoiceSession>,
    guard: SessionGuard,
    /// Stops the transcript pump and any pending ready notice
    cancel: CancellationToken,
}

pub struct SessionController {
    state: Mutex<ConnectionState>,
    live: tokio::sync::Mutex<Option<LiveSession>>,
    generations: Generations,
    store: ResponseStore,
    transcript: TranscriptLog,
    tools: Arc<ToolRegistry>,
    issuer: Arc<dyn TokenIssuer>,
    backend: Arc<dyn VoiceBackend>,
    settings: ControllerSettings,
    events: broadcast::Sender<SurveyEvent>,
}

impl SessionController {
    pub fn new(
        store: ResponseStore,
        issuer: Arc<dyn TokenIssuer>,
        backend: Arc<dyn VoiceBackend>,
        settings: ControllerSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(ConnectionState::Disconnected),
            live: tokio::sync::Mutex::new(None),
            generations: Generations::new(),
            store,
            transcript: TranscriptLog::new(),
            tools: Arc::new(ToolRegistry::survey()),
            issuer,
            backend,
            settings,
            events,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ConnectionState {
        *self.lock_state()
    }

    pub fn store(&self) -> &ResponseStore {
        &self.store
    }

    pub fn transcript(&self) -> &TranscriptLog {
        &self.transcript
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SurveyEvent> {
        self.events.subscribe()
    }

    /// Connect if disconnected, disconnect if connected. A toggle while a
    /// connect or disconnect is still running is ignored.
    ///
    /// The work runs on its own task, so a caller that goes away mid-connect
    /// cannot leave the state stuck in `Connecting`. Returns the state once
    /// this toggle's work is done.
    pub async fn toggle(self: &Arc<Self>) -> ConnectionState {
        let this = Arc::clone(self);
        match tokio::spawn(async move { this.process_toggle().await }).await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(error = %e, "Connection task failed");
                self.state()
            }
        }
    }

    async fn process_toggle(&self) -> ConnectionState {
        let mut pending = vec![Event::Toggle];

        while let Some(event) = pending.pop() {
            let result = {
                let mut state = self.lock_state();
                match transition(*state, event) {
                    Ok(result) => {
                        tracing::info!(
                            from = %*state,
                            to = %result.new_state,
                            "Connection state changed"
                        );
                        *state = result.new_state;
                        result
                    }
                    Err(TransitionError::InFlight) => {
                        tracing::debug!(
                            state = %*state,
                            "Ignoring toggle while connection change is in flight"
                        );
                        return *state;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected connection event");
                        return *state;
                    }
                }
            };

            for effect in result.effects {
                if let Some(generated) = self.execute_effect(effect).await {
                    pending.push(generated);
                }
            }
        }

        self.state()
    }

    /// Close any live session; used on process shutdown
    pub async fn shutdown(self: &Arc<Self>) {
        if self.state().is_connected() {
            self.toggle().await;
        }
    }

    async fn execute_effect(&self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::ResetTranscript => {
                if !self.transcript.is_empty() {
                    tracing::debug!(dropped = self.transcript.len(), "Resetting transcript");
                    self.transcript.reset();
                }
                None
            }
            Effect::NotifyClient { state } => {
                let _ = self.events.send(SurveyEvent::ConnectionChanged { state });
                None
            }
            Effect::OpenSession => Some(match self.open_session().await {
                Ok(()) => Event::SessionOpened,
                Err(e) => {
                    tracing::error!(
                        kind = ?e.kind,
                        transient = e.kind.is_transient(),
                        error = %e,
                        "Voice connect failed"
                    );
                    Event::OpenFailed {
                        message: e.to_string(),
                    }
                }
            }),
            Effect::CloseSession => {
                let error = self.close_session().await.err().map(|e| e.to_string());
                Some(Event::SessionClosed { error })
            }
            Effect::ScheduleReadyNotice => {
                self.schedule_ready_notice().await;
                None
            }
        }
    }

    async fn open_session(&self) -> Result<(), VoiceError> {
        let guard = self.generations.advance();
        match self.try_open(guard).await {
            Ok(live) => {
                *self.live.lock().await = Some(live);
                Ok(())
            }
            Err(e) => {
                // Anything the half-built session handed out is now stale
                self.generations.invalidate();
                Err(e)
            }
        }
    }

    async fn try_open(&self, guard: SessionGuard) -> Result<LiveSession, VoiceError> {
        let token = self.issuer.issue_session_token().await?;

        let instructions = build_briefing(self.store.catalog(), &self.store.snapshot());
        let agent = AgentConfig {
            name: self.settings.agent_name.clone(),
            instructions,
            tools: Arc::clone(&self.tools),
            tool_context: ToolContext::new(self.store.clone(), guard.clone()),
        };

        let mut session = self.backend.create_session(agent, &self.settings.model);
        let turns = session
            .subscribe()
            .ok_or_else(|| VoiceError::unknown("Voice session has no turn stream"))?;
        session.connect(&token).await?;

        let cancel = CancellationToken::new();
        tokio::spawn(pump_turns(
            turns,
            guard.clone(),
            self.transcript.clone(),
            self.events.clone(),
            cancel.clone(),
        ));

        tracing::info!(
            generation = guard.generation(),
            model = %self.settings.model,
            "Voice session connected"
        );
        Ok(LiveSession {
            session,
            guard,
            cancel,
        })
    }

    async fn close_session(&self) -> Result<(), VoiceError> {
        self.generations.invalidate();
        tracing::debug!(
            generation = self.generations.current(),
            "Voice session generation retired"
        );

        let Some(mut live) = self.live.lock().await.take() else {
            tracing::warn!("Close requested with no live voice session");
            return Ok(());
        };
        live.cancel.cancel();

        let result = live.session.close().await;
        match &result {
            Ok(()) => tracing::info!(generation = live.guard.generation(), "Voice session closed"),
            Err(e) => tracing::warn!(error = %e, "Voice session close failed, discarding handle"),
        }
        result
    }

    async fn schedule_ready_notice(&self) {
        let Some((cancel, guard)) = self
            .live
            .lock()
            .await
            .as_ref()
            .map(|l| (l.cancel.child_token(), l.guard.clone()))
        else {
            return;
        };
        let delay = self.settings.ready_notice_delay;
        let events = self.events.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    if guard.is_current() {
                        let _ = events.send(SurveyEvent::ReadyNotice {
                            message: READY_NOTICE.to_string(),
                        });
                    }
                }
            }
        });
    }
}

/// Append a session's turns to the transcript until it is cancelled, ends
/// or goes stale
async fn pump_turns(
    mut turns: mpsc::Receiver<TranscriptItem>,
    guard: SessionGuard,
    transcript: TranscriptLog,
    events: broadcast::Sender<SurveyEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            item = turns.recv() => {
                let Some(item) = item else { break };
                if !guard.is_current() {
                    tracing::debug!(generation = guard.generation(), "Dropping turn from a stale voice session");
                    break;
                }
                transcript.append(item.clone());
                let _ = events.send(SurveyEvent::TranscriptAppended { item });
            }
        }
    }
    tracing::debug!(generation = guard.generation(), "Transcript pump stopped");
}
