use async_trait::async_trait;
use redis::{
    AsyncCommands, Client,
    aio::MultiplexedConnection,
    streams::{StreamReadOptions, StreamReadReply},
};

use super::subscriber::{EventLog, LogConnection, LogEntry, LogError, SubscriberConfig};

/// Stream entry field holding the MessagePack-encoded event.
const EVENT_FIELD: &str = "event";

/// Task logs stored as Redis streams keyed by task id.
#[derive(Clone)]
pub struct RedisEventLog {
    client: Client,
}

impl RedisEventLog {
    /// Validates the URL only; no connection is made until a subscriber connects.
    pub fn new(url: &str) -> Result<Self, LogError> {
        Ok(Self {
            client: Client::open(url)?,
        })
    }
}

#[async_trait]
impl EventLog for RedisEventLog {
    async fn connect(&self) -> Result<Box<dyn LogConnection>, LogError> {
        let connection = self.client.get_multiplexed_async_connection().await?;
        Ok(Box::new(RedisLogConnection {
            connection,
            open: true,
        }))
    }
}

pub struct RedisLogConnection {
    connection: MultiplexedConnection,
    open: bool,
}

#[async_trait]
impl LogConnection for RedisLogConnection {
    async fn read_after(
        &mut self,
        key: &str,
        after: &str,
        config: &SubscriberConfig,
    ) -> Result<Option<Vec<LogEntry>>, LogError> {
        if !self.open {
            return Err(LogError::Closed);
        }

        let options = StreamReadOptions::default()
            .block(config.block.as_millis() as usize)
            .count(config.batch_size);
        let reply: Option<StreamReadReply> =
            match self.connection.xread_options(&[key], &[after], &options).await {
                Ok(reply) => reply,
                Err(error) => {
                    if error.is_connection_dropped() || error.is_io_error() {
                        self.open = false;
                    }
                    return Err(error.into());
                }
            };

        let Some(reply) = reply else {
            return Ok(None);
        };
        let entries = reply
            .keys
            .into_iter()
            .flat_map(|stream| stream.ids)
            .map(|entry| {
                let payload = entry.get::<Vec<u8>>(EVENT_FIELD);
                LogEntry {
                    id: entry.id,
                    payload,
                }
            })
            .collect();

        Ok(Some(entries))
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn close(&mut self) -> Result<(), LogError> {
        if !std::mem::replace(&mut self.open, false) {
            return Ok(());
        }
        let _: () = redis::cmd("QUIT").query_async(&mut self.connection).await?;
        Ok(())
    }
}

impl Drop for RedisLogConnection {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let mut connection = self.connection.clone();
        runtime.spawn(async move {
            let quit: redis::RedisResult<()> = redis::cmd("QUIT").query_async(&mut connection).await;
            if let Err(error) = quit {
                tracing::warn!(?error, "failed to close dropped event log connection");
            }
        });
    }
}
