use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use events::UpstreamEvent;
use futures::{StreamExt, stream::BoxStream};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("event log connection is closed")]
    Closed,
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

/// One raw entry of a task log. `payload` is the encoded event, if the entry carried one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: String,
    pub payload: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberConfig {
    /// Upper bound on a single blocking read.
    pub block: Duration,
    pub batch_size: usize,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            block: Duration::from_secs(30),
            batch_size: 100,
        }
    }
}

/// Opens connections to the append-only log the upstream agent writes to.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LogConnection>, LogError>;
}

/// A connection owned by exactly one subscriber.
#[async_trait]
pub trait LogConnection: Send {
    /// Waits up to `config.block` for entries strictly after `after`. `Ok(None)` means the wait
    /// ran out with nothing new.
    async fn read_after(
        &mut self,
        key: &str,
        after: &str,
        config: &SubscriberConfig,
    ) -> Result<Option<Vec<LogEntry>>, LogError>;

    fn is_open(&self) -> bool;

    async fn close(&mut self) -> Result<(), LogError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamRecord {
    Data { id: String, event: UpstreamEvent },
    /// A read timed out without new entries.
    Tick,
}

/// Follows the log for `task_id` from `last_id` until cancelled or the connection goes away.
///
/// A read failure after cancellation or on a closed connection ends the stream quietly; any other
/// failure is yielded once and ends it. The connection is closed on every exit that runs to
/// completion, and a dropped stream releases it through the connection's own drop.
pub fn subscribe(
    log: Arc<dyn EventLog>,
    task_id: String,
    last_id: String,
    config: SubscriberConfig,
    cancel: CancellationToken,
) -> BoxStream<'static, Result<StreamRecord, LogError>> {
    async_stream::stream! {
        let mut connection = match log.connect().await {
            Ok(connection) => connection,
            Err(error) => {
                yield Err(error);
                return;
            }
        };
        let mut cursor = last_id;

        'read: while !cancel.is_cancelled() {
            let entries = match connection.read_after(&task_id, &cursor, &config).await {
                Ok(entries) => entries,
                Err(error) => {
                    if cancel.is_cancelled()
                        || !connection.is_open()
                        || matches!(error, LogError::Closed)
                    {
                        tracing::debug!(task_id = %task_id, %error, "event log read ended");
                    } else {
                        yield Err(error);
                    }
                    break;
                }
            };

            let Some(entries) = entries.filter(|entries| !entries.is_empty()) else {
                if cancel.is_cancelled() {
                    break;
                }
                yield Ok(StreamRecord::Tick);
                continue;
            };

            for entry in entries {
                cursor = entry.id.clone();
                if cancel.is_cancelled() {
                    break 'read;
                }
                let event = decode_event(&task_id, &entry);
                yield Ok(StreamRecord::Data { id: entry.id, event });
            }
        }

        if let Err(error) = connection.close().await {
            tracing::warn!(task_id = %task_id, ?error, "failed to close event log connection");
        }
    }
    .boxed()
}

fn decode_event(task_id: &str, entry: &LogEntry) -> UpstreamEvent {
    let Some(payload) = entry.payload.as_deref() else {
        tracing::warn!(task_id, entry_id = %entry.id, "log entry has no event payload");
        return UpstreamEvent::Unrecognized;
    };

    match rmp_serde::from_slice::<Value>(payload) {
        Ok(value) => UpstreamEvent::from_value(value),
        Err(error) => {
            tracing::warn!(task_id, entry_id = %entry.id, %error, "undecodable log entry");
            UpstreamEvent::Unrecognized
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use futures::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::services::stream::testing::{ScriptedLog, entry};

    async fn collect(
        log: &ScriptedLog,
        last_id: &str,
        cancel: CancellationToken,
    ) -> Vec<Result<StreamRecord, LogError>> {
        subscribe(
            Arc::new(log.clone()),
            "task-1".into(),
            last_id.into(),
            SubscriberConfig::default(),
            cancel,
        )
        .collect()
        .await
    }

    #[tokio::test]
    async fn yields_ticks_and_data_and_advances_the_cursor() {
        let log = ScriptedLog::new(vec![
            Ok(None),
            Ok(Some(vec![
                entry("1700000000000-0", json!({"type": "turn_status", "status": "started"})),
                entry("1700000000000-1", json!({"type": "response.created"})),
            ])),
            Ok(Some(vec![])),
        ]);

        let records: Vec<StreamRecord> = collect(&log, "0-0", CancellationToken::new())
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(
            records,
            vec![
                StreamRecord::Tick,
                StreamRecord::Data {
                    id: "1700000000000-0".into(),
                    event: UpstreamEvent::TurnStatus {
                        status: "started".into()
                    },
                },
                StreamRecord::Data {
                    id: "1700000000000-1".into(),
                    event: UpstreamEvent::Unrecognized,
                },
                StreamRecord::Tick,
            ]
        );
        assert_eq!(
            log.cursors(),
            vec!["0-0", "0-0", "1700000000000-1", "1700000000000-1"]
        );
        assert!(log.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn resumes_from_the_given_position() {
        let log = ScriptedLog::new(vec![Ok(None)]);
        collect(&log, "1700000000123-4", CancellationToken::new()).await;
        assert_eq!(log.cursors()[0], "1700000000123-4");
    }

    #[tokio::test]
    async fn unexpected_read_errors_are_yielded_once() {
        let log = ScriptedLog::new(vec![
            Ok(None),
            Err(LogError::Redis(redis::RedisError::from((
                redis::ErrorKind::ResponseError,
                "WRONGTYPE",
            )))),
            Ok(None),
        ]);

        let records = collect(&log, "0-0", CancellationToken::new()).await;
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0], Ok(StreamRecord::Tick)));
        assert!(matches!(records[1], Err(LogError::Redis(_))));
        assert!(log.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn closed_connection_ends_quietly() {
        let log = ScriptedLog::new(vec![Err(LogError::Closed)]);
        assert!(collect(&log, "0-0", CancellationToken::new()).await.is_empty());
    }

    #[tokio::test]
    async fn cancellation_stops_before_reading() {
        let log = ScriptedLog::new(vec![Ok(None)]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(collect(&log, "0-0", cancel).await.is_empty());
        assert!(log.cursors().is_empty());
        assert!(log.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn bad_payloads_become_unrecognized_events() {
        let log = ScriptedLog::new(vec![Ok(Some(vec![
            LogEntry {
                id: "1-0".into(),
                payload: None,
            },
            LogEntry {
                id: "1-1".into(),
                payload: Some(vec![0xc1]),
            },
        ]))]);

        let records = collect(&log, "0-0", CancellationToken::new()).await;
        assert_eq!(records.len(), 2);
        for record in records {
            assert!(matches!(
                record,
                Ok(StreamRecord::Data {
                    event: UpstreamEvent::Unrecognized,
                    ..
                })
            ));
        }
    }
}
