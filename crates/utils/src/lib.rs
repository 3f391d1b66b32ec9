pub mod sentry;
pub mod stream_id;
