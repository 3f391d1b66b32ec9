use std::sync::Arc;

use axum::response::sse::Event;
use events::{ClientEvent, StreamContext, transform_event};
use futures::{StreamExt, stream::BoxStream};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::{
    heartbeat::{HeartbeatConfig, HeartbeatMonitor},
    subscriber::{EventLog, LogError, StreamRecord, SubscriberConfig, subscribe},
};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Log(#[from] LogError),
}

#[derive(Debug, Clone)]
pub struct LiveStreamRequest {
    pub task_id: String,
    /// Normalized log position to resume after.
    pub last_id: String,
    pub context: StreamContext,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LiveStreamConfig {
    pub subscriber: SubscriberConfig,
    pub heartbeat: HeartbeatConfig,
}

/// One server-sent event. Only events read from the log carry an `id`, so a client that
/// reconnects with `lastId` never resumes from a synthetic event.
#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    pub event: ClientEvent,
    pub id: Option<String>,
}

impl SseFrame {
    fn synthetic(event: ClientEvent) -> Self {
        Self { event, id: None }
    }

    pub fn to_sse_event(&self) -> Result<Event, axum::Error> {
        let event = Event::default()
            .event(self.event.name())
            .json_data(&self.event)?;
        Ok(match &self.id {
            Some(id) => event.id(id),
            None => event,
        })
    }
}

/// Decides when a turn is over: the first `completed` status after a `started` one.
#[derive(Debug, Default)]
pub struct TurnCompletion {
    started: bool,
}

impl TurnCompletion {
    /// Returns true when the stream should close after delivering `event`.
    pub fn observe(&mut self, event: &ClientEvent) -> bool {
        match event.turn_status() {
            Some("started") => {
                self.started = true;
                false
            }
            Some("completed") => self.started,
            _ => false,
        }
    }
}

/// Streams normalized events for one task until its turn completes, the upstream goes silent,
/// the log ends, or `cancel` fires.
pub fn live_stream(
    log: Arc<dyn EventLog>,
    request: LiveStreamRequest,
    config: LiveStreamConfig,
    cancel: CancellationToken,
) -> BoxStream<'static, Result<SseFrame, StreamError>> {
    async_stream::try_stream! {
        let LiveStreamRequest {
            task_id,
            last_id,
            context,
        } = request;

        let mut records = subscribe(log, task_id.clone(), last_id, config.subscriber, cancel);
        let mut heartbeat = HeartbeatMonitor::new(task_id.clone(), config.heartbeat);
        let mut completion = TurnCompletion::default();

        while let Some(record) = records.next().await {
            let record = record
                .inspect_err(|error| {
                    tracing::error!(task_id = %task_id, ?error, "error in live event stream");
                })
                .map_err(StreamError::from)?;

            let check = heartbeat.check();
            for event in check.events {
                yield SseFrame::synthetic(event);
            }
            if check.should_close {
                break;
            }

            let StreamRecord::Data { id, event } = record else {
                continue;
            };
            heartbeat.on_activity();

            let Some(event) = transform_event(&event, &context).await else {
                continue;
            };
            let closes = completion.observe(&event);
            yield SseFrame {
                event,
                id: Some(id),
            };
            if closes {
                tracing::debug!(task_id = %task_id, "turn completed, closing stream");
                break;
            }
        }
    }
    .boxed()
}
