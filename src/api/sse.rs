//! Server-Sent Events support

use super::AppState;
use crate::controller::SurveyEvent;
use crate::projector::survey_status;
use crate::store::ResponseStore;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_stream::StreamExt;

/// One stream for everything the page shows: the current connection state
/// first, then status on every store change merged with controller events.
pub fn sse_stream(state: &AppState) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(std::future::ready(SurveyEvent::ConnectionChanged {
        state: state.controller.state(),
    }))
    .map(|event| Ok::<_, Infallible>(survey_event_to_axum(event)));

    let store = state.store.clone();
    // WatchStream yields the current revision first, so the page gets a
    // status snapshot straight away.
    let statuses = WatchStream::new(store.subscribe())
        .map(move |_| Ok::<_, Infallible>(status_event(&store)));

    let broadcasts =
        BroadcastStream::new(state.controller.subscribe()).filter_map(|result| match result {
            Ok(event) => Some(Ok::<_, Infallible>(survey_event_to_axum(event))),
            Err(e) => {
                tracing::debug!(error = %e, "SSE subscriber lagged");
                None
            }
        });

    let combined = init.chain(statuses.merge(broadcasts));

    Sse::new(combined).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn status_event(store: &ResponseStore) -> Event {
    let status = survey_status(store.catalog(), &store.snapshot());
    let data = json!({
        "type": "status",
        "status": status,
    });
    Event::default().event("status").data(data.to_string())
}

fn survey_event_to_axum(event: SurveyEvent) -> Event {
    let event_type = match &event {
        SurveyEvent::ConnectionChanged { .. } => "connection_changed",
        SurveyEvent::TranscriptAppended { .. } => "transcript_appended",
        SurveyEvent::ReadyNotice { .. } => "ready_notice",
    };
    let data = serde_json::to_value(&event)
        .unwrap_or_else(|e| json!({ "type": "error", "message": e.to_string() }));
    Event::default().event(event_type).data(data.to_string())
}
