//! Live delivery of a task's event log to a client.

pub mod heartbeat;
pub mod live;
pub mod redis_log;
pub mod subscriber;
#[cfg(test)]
pub(crate) mod testing;

pub use heartbeat::{HeartbeatCheck, HeartbeatConfig, HeartbeatMonitor};
pub use live::{
    LiveStreamConfig, LiveStreamRequest, SseFrame, StreamError, TurnCompletion, live_stream,
};
pub use redis_log::RedisEventLog;
pub use subscriber::{
    EventLog, LogConnection, LogEntry, LogError, StreamRecord, SubscriberConfig, subscribe,
};
