use crate::api::handlers::event_handler::stream_events;
use axum::{Router, routing::get};

use crate::api::app_state::AppState;

pub fn create_event_router() -> Router<AppState> {
    Router::new().route("/events", get(stream_events))
}
