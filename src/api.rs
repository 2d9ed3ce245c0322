//! HTTP API for the survey page
//!
//! The page reads and writes answers over plain JSON routes, drives the
//! voice button through `/api/voice/toggle`, and relays what the realtime
//! session produces back through `/api/voice/*`. `/api/events` pushes every
//! change as server-sent events.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::controller::SessionController;
use crate::store::ResponseStore;
use crate::voice::RelayHub;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: ResponseStore,
    pub controller: Arc<SessionController>,
    pub relay: RelayHub,
}

impl AppState {
    pub fn new(controller: Arc<SessionController>, relay: RelayHub) -> Self {
        Self {
            store: controller.store().clone(),
            controller,
            relay,
        }
    }
}
