//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    AcceptedResponse, AnswerRequest, AnswerResponse, BriefingResponse, ErrorResponse,
    SurveyResponse, TranscriptEntry, TranscriptResponse, TranscriptTurnRequest, VoiceResponse,
};
use super::AppState;
use crate::projector::{build_briefing, survey_status, SurveyStatus};
use crate::store::{AnswerError, Channel};
use crate::survey::format_responses;
use crate::tools::ToolOutput;
use crate::transcript::TranscriptItem;
use crate::voice::{VoiceError, VoiceErrorKind};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::Value;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Catalog and progress
        .route("/api/survey", get(get_survey))
        .route("/api/status", get(get_status))
        // UI channel writes
        .route("/api/responses/export", get(export_responses))
        .route(
            "/api/responses/:id",
            put(set_response).delete(clear_response),
        )
        // Agent briefing, always projected from current answers
        .route("/api/briefing", get(get_briefing))
        // Voice lifecycle and relay
        .route("/api/voice", get(get_voice))
        .route("/api/voice/toggle", post(toggle_voice))
        .route("/api/voice/transcript", post(relay_transcript))
        .route("/api/voice/tools/:name", post(relay_tool_call))
        .route("/api/transcript", get(get_transcript))
        // SSE streaming
        .route("/api/events", get(stream_events))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

fn current_status(state: &AppState) -> SurveyStatus {
    survey_status(state.store.catalog(), &state.store.snapshot())
}

// ============================================================
// Survey
// ============================================================

async fn get_survey(State(state): State<AppState>) -> Json<SurveyResponse> {
    Json(SurveyResponse {
        questions: state.store.catalog().clone(),
        status: current_status(&state),
    })
}

async fn get_status(State(state): State<AppState>) -> Json<SurveyStatus> {
    Json(current_status(&state))
}

async fn set_response(
    State(state): State<AppState>,
    Path(question_id): Path<u32>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let stored = state.store.set(question_id, req.value, Channel::Ui)?;
    Ok(Json(AnswerResponse {
        question_id,
        answer: Some(stored).filter(|s| !s.is_empty()),
        status: current_status(&state),
    }))
}

async fn clear_response(
    State(state): State<AppState>,
    Path(question_id): Path<u32>,
) -> Json<AnswerResponse> {
    state.store.clear(question_id, Channel::Ui);
    Json(AnswerResponse {
        question_id,
        answer: None,
        status: current_status(&state),
    })
}

async fn export_responses(State(state): State<AppState>) -> impl IntoResponse {
    let text = format_responses(state.store.catalog(), &state.store.snapshot());
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text)
}

async fn get_briefing(State(state): State<AppState>) -> Json<BriefingResponse> {
    Json(BriefingResponse {
        instructions: build_briefing(state.store.catalog(), &state.store.snapshot()),
    })
}

// ============================================================
// Voice
// ============================================================

fn voice_view(state: &AppState) -> VoiceResponse {
    let connection = state.controller.state();
    let session = if connection.is_connected() {
        state.relay.client_view().ok()
    } else {
        None
    };
    VoiceResponse {
        state: connection,
        label: connection.label(),
        busy: connection.is_in_flight(),
        relay_linked: state.relay.is_linked(),
        model: state.controller.settings().model.clone(),
        session,
    }
}

async fn get_voice(State(state): State<AppState>) -> Json<VoiceResponse> {
    Json(voice_view(&state))
}

async fn toggle_voice(State(state): State<AppState>) -> Json<VoiceResponse> {
    state.controller.toggle().await;
    Json(voice_view(&state))
}

async fn relay_transcript(
    State(state): State<AppState>,
    Json(req): Json<TranscriptTurnRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), AppError> {
    state
        .relay
        .push_transcript(TranscriptItem::new(req.role, req.content))
        .await?;
    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse { accepted: true })))
}

async fn relay_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<Value>,
) -> Result<Json<ToolOutput>, AppError> {
    let output = state.relay.invoke_tool(&name, input).await?;
    Ok(Json(output))
}

async fn get_transcript(State(state): State<AppState>) -> Json<TranscriptResponse> {
    let items = state
        .controller
        .transcript()
        .items()
        .into_iter()
        .map(TranscriptEntry::from)
        .collect();
    Json(TranscriptResponse { items })
}

// ============================================================
// Streaming and misc
// ============================================================

async fn stream_events(State(state): State<AppState>) -> impl IntoResponse {
    sse_stream(&state)
}

async fn get_version() -> &'static str {
    concat!("voice_survey ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<AnswerError> for AppError {
    fn from(e: AnswerError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<VoiceError> for AppError {
    fn from(e: VoiceError) -> Self {
        match e.kind {
            VoiceErrorKind::NotConnected => AppError::Conflict(e.message),
            VoiceErrorKind::InvalidRequest => AppError::NotFound(e.message),
            _ => AppError::Internal(e.message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
