//! Scripted in-memory event log.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;

use super::subscriber::{EventLog, LogConnection, LogEntry, LogError, SubscriberConfig};

type ScriptedRead = Result<Option<Vec<LogEntry>>, LogError>;

/// Replays a fixed list of read results, then reports the connection as closed.
#[derive(Clone, Default)]
pub(crate) struct ScriptedLog {
    script: Arc<Mutex<VecDeque<ScriptedRead>>>,
    cursors: Arc<Mutex<Vec<String>>>,
    pub(crate) closed: Arc<AtomicBool>,
    read_delay: Duration,
}

impl ScriptedLog {
    pub(crate) fn new(script: Vec<ScriptedRead>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            ..Default::default()
        }
    }

    pub(crate) fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Positions each read started from.
    pub(crate) fn cursors(&self) -> Vec<String> {
        self.cursors.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventLog for ScriptedLog {
    async fn connect(&self) -> Result<Box<dyn LogConnection>, LogError> {
        Ok(Box::new(ScriptedConnection {
            log: self.clone(),
            open: true,
        }))
    }
}

struct ScriptedConnection {
    log: ScriptedLog,
    open: bool,
}

#[async_trait]
impl LogConnection for ScriptedConnection {
    async fn read_after(
        &mut self,
        _key: &str,
        after: &str,
        _config: &SubscriberConfig,
    ) -> Result<Option<Vec<LogEntry>>, LogError> {
        self.log.cursors.lock().unwrap().push(after.to_string());
        if !self.log.read_delay.is_zero() {
            tokio::time::sleep(self.log.read_delay).await;
        }

        let next = self.log.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            self.open = false;
            Err(LogError::Closed)
        })
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn close(&mut self) -> Result<(), LogError> {
        self.open = false;
        self.log.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) fn entry(id: &str, event: Value) -> LogEntry {
    LogEntry {
        id: id.to_string(),
        payload: Some(rmp_serde::to_vec_named(&event).unwrap()),
    }
}
