//! API request and response types

use crate::connection::ConnectionState;
use crate::projector::SurveyStatus;
use crate::survey::Catalog;
use crate::transcript::{Role, TranscriptItem};
use crate::voice::relay::ClientSessionView;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to set an answer from the page
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub value: String,
}

/// Catalog plus current progress
#[derive(Debug, Serialize)]
pub struct SurveyResponse {
    pub questions: Catalog,
    pub status: SurveyStatus,
}

/// Result of a write from the page
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub question_id: u32,
    /// Stored value, normalised; `None` after a clear
    pub answer: Option<String>,
    pub status: SurveyStatus,
}

#[derive(Debug, Serialize)]
pub struct BriefingResponse {
    pub instructions: String,
}

/// Voice button state and, while connected, what the page needs to open
/// its side of the realtime session
#[derive(Debug, Serialize)]
pub struct VoiceResponse {
    pub state: ConnectionState,
    pub label: &'static str,
    /// Connect or disconnect running; the button is disabled
    pub busy: bool,
    /// Whether the relay currently has a session to deliver to
    pub relay_linked: bool,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<ClientSessionView>,
}

/// A finished conversation turn relayed by the page
#[derive(Debug, Deserialize)]
pub struct TranscriptTurnRequest {
    pub role: Role,
    pub content: Value,
}

#[derive(Debug, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    pub content: Value,
    pub received_at: DateTime<Utc>,
}

impl From<TranscriptItem> for TranscriptEntry {
    fn from(item: TranscriptItem) -> Self {
        Self {
            text: item.display_text(),
            role: item.role,
            content: item.content,
            received_at: item.received_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub items: Vec<TranscriptEntry>,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub accepted: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
