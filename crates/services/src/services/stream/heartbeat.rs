use std::time::{Duration, Instant};

use chrono::Utc;
use events::ClientEvent;

pub const HEARTBEAT_SOURCE: &str = "gateway";
pub const UPSTREAM_TIMEOUT_CODE: &str = "UPSTREAM_TIMEOUT";
pub const UPSTREAM_TIMEOUT_MESSAGE: &str = "AI service not responding. Please retry your question.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// How often the client hears from us when nothing else is sent.
    pub keepalive_interval: Duration,
    /// Silence from the upstream agent after which the stream is given up.
    pub upstream_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_secs(20),
            upstream_timeout: Duration::from_secs(50),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct HeartbeatCheck {
    pub events: Vec<ClientEvent>,
    pub should_close: bool,
}

/// Liveness bookkeeping for one live stream. Nothing runs in the background: the orchestrator
/// calls [`HeartbeatMonitor::check`] once per loop iteration.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    config: HeartbeatConfig,
    task_id: String,
    last_upstream_activity: Instant,
    last_heartbeat_sent_at: Instant,
    timed_out: bool,
}

impl HeartbeatMonitor {
    pub fn new(task_id: impl Into<String>, config: HeartbeatConfig) -> Self {
        Self::starting_at(task_id, config, Instant::now())
    }

    pub fn starting_at(task_id: impl Into<String>, config: HeartbeatConfig, now: Instant) -> Self {
        Self {
            config,
            task_id: task_id.into(),
            last_upstream_activity: now,
            last_heartbeat_sent_at: now,
            timed_out: false,
        }
    }

    /// Record a real upstream event. Ticks from the log reader must not land here.
    pub fn on_activity(&mut self) {
        self.on_activity_at(Instant::now());
    }

    pub fn on_activity_at(&mut self, now: Instant) {
        self.last_upstream_activity = now;
    }

    pub fn check(&mut self) -> HeartbeatCheck {
        self.check_at(Instant::now())
    }

    pub fn check_at(&mut self, now: Instant) -> HeartbeatCheck {
        let mut check = HeartbeatCheck::default();

        if now.saturating_duration_since(self.last_heartbeat_sent_at) >= self.config.keepalive_interval {
            check.events.push(ClientEvent::Heartbeat {
                source: HEARTBEAT_SOURCE.to_string(),
                timestamp: Utc::now(),
            });
            self.last_heartbeat_sent_at = now;
        }

        let silence = now.saturating_duration_since(self.last_upstream_activity);
        if !self.timed_out && silence > self.config.upstream_timeout {
            self.timed_out = true;
            tracing::warn!(
                task_id = %self.task_id,
                elapsed_ms = silence.as_millis() as u64,
                timeout_ms = self.config.upstream_timeout.as_millis() as u64,
                "upstream timed out, closing stream"
            );
            check.events.push(ClientEvent::Error {
                code: UPSTREAM_TIMEOUT_CODE.to_string(),
                message: UPSTREAM_TIMEOUT_MESSAGE.to_string(),
                timestamp: Utc::now(),
            });
            check.should_close = true;
        }

        check
    }
}
