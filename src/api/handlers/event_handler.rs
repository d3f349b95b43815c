//! 引擎事件的 SSE 推送

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::api::app_state::AppState;

pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let stream = BroadcastStream::new(state.engine.subscribe()).filter_map(|msg| async move {
        match msg {
            Ok(event) => match Event::default().event("engine").json_data(&event) {
                Ok(sse_event) => Some(Ok(sse_event)),
                Err(e) => {
                    tracing::warn!("Failed to encode engine event: {}", e);
                    None
                }
            },
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!("SSE subscriber lagged, {} events skipped", skipped);
                Some(Ok(Event::default().event("lagged").data(skipped.to_string())))
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
