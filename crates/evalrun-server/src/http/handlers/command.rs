//! Command streaming handler.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::command::{spawn_command, CommandEvent};
use crate::state::AppState;

/// Boxed SSE event stream.
type SseEventStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// Run a command and stream its events.
///
/// Always answers 200 with `text/event-stream`; failures arrive as the
/// terminal error event, including bodies the extractor refuses.
pub async fn run_command(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Sse<SseEventStream> {
    let stream: SseEventStream = match body {
        Ok(body) => {
            info!(bytes = body.len(), "Command request received");
            let events = spawn_command(Arc::clone(&state.launcher), body.to_vec());
            Box::pin(ReceiverStream::new(events).map(to_sse))
        }
        Err(rejection) => {
            warn!(status = %rejection.status(), error = %rejection.body_text(), "Command body rejected");
            let events = [
                CommandEvent::Status("Command received"),
                CommandEvent::error(&rejection.body_text()),
            ];
            Box::pin(stream::iter(events).map(to_sse))
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: CommandEvent) -> Result<Event, Infallible> {
    Ok(Event::default().data(event.to_json().to_string()))
}
