use axum::{
    Router,
    extract::{Path, Query, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use services::services::stream::{LiveStreamRequest, live_stream};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use utils::stream_id::normalize_stream_id;

use super::error::ErrorResponse;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    pub last_id: Option<String>,
    pub working_dir: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/stream/{task_id}", get(stream_task))
}

#[instrument(
    name = "stream.stream_task",
    skip(state, query),
    fields(task_id = %task_id, last_id = ?query.last_id)
)]
async fn stream_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ErrorResponse> {
    let last_id = normalize_stream_id(query.last_id.as_deref()).map_err(|error| {
        tracing::warn!(%error, "rejecting stream request");
        ErrorResponse::bad_request(error.to_string())
    })?;

    // Dropping the response body (client went away) cancels the subscriber.
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let request = LiveStreamRequest {
        task_id,
        last_id,
        context: state.stream_context(query.working_dir),
    };
    let frames = live_stream(state.event_log(), request, state.config().stream, cancel);

    let events = frames.map(move |frame| {
        let _guard = &guard;
        frame
            .map_err(axum::Error::new)
            .and_then(|frame| frame.to_sse_event())
    });

    Ok(Sse::new(events))
}
