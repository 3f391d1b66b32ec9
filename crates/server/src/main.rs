use server::{Server, config::GatewayConfig, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS operations
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let sentry_enabled = utils::sentry::init_once();
    init_tracing();
    tracing::info!(sentry_enabled, "tracing initialized");

    let config = GatewayConfig::from_env()?;
    Server::run(config).await
}
