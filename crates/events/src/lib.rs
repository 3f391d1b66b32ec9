//! Event model shared by the live stream and the history reconstruction: what the upstream agent
//! writes to the log, what clients receive, and the rules that turn one into the other.

pub mod client;
pub mod context;
pub mod dispatch;
pub mod storage;
pub mod tools;
pub mod upstream;

pub use client::{ClientEvent, ToolEvent};
pub use context::StreamContext;
pub use dispatch::transform_event;
pub use upstream::UpstreamEvent;
