use std::{env, sync::OnceLock};

use sentry_tracing::{EventFilter, SentryLayer};
use tracing::Level;

const SOURCE_TAG: &str = "gateway";

static INIT_GUARD: OnceLock<sentry::ClientInitGuard> = OnceLock::new();

fn environment() -> &'static str {
    if cfg!(debug_assertions) {
        "dev"
    } else {
        "production"
    }
}

/// Initialise the Sentry client once per process. Without `SENTRY_DSN` this is a no-op and the
/// tracing layer only records breadcrumbs into a disabled hub.
pub fn init_once() -> bool {
    let dsn = match env::var("SENTRY_DSN") {
        Ok(dsn) if !dsn.trim().is_empty() => dsn,
        _ => return false,
    };

    INIT_GUARD.get_or_init(|| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(environment().into()),
                ..Default::default()
            },
        ))
    });

    sentry::configure_scope(|scope| {
        scope.set_tag("source", SOURCE_TAG);
    });

    true
}

pub fn sentry_layer<S>() -> SentryLayer<S>
where
    S: tracing::Subscriber,
    S: for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    SentryLayer::default()
        .span_filter(|meta| {
            matches!(
                *meta.level(),
                Level::DEBUG | Level::INFO | Level::WARN | Level::ERROR
            )
        })
        .event_filter(|meta| match *meta.level() {
            Level::ERROR => EventFilter::Event,
            Level::DEBUG | Level::INFO | Level::WARN => EventFilter::Breadcrumb,
            Level::TRACE => EventFilter::Ignore,
        })
}
