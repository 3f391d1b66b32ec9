use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use db::DBService;
use events::storage::FileUrlSigner;
use services::services::{storage::S3UrlSigner, stream::RedisEventLog};
use tracing::instrument;

use crate::{AppState, config::GatewayConfig, routes};

pub struct Server;

impl Server {
    #[instrument(
        name = "gateway_server",
        skip(config),
        fields(listen_addr = %config.listen_addr)
    )]
    pub async fn run(config: GatewayConfig) -> anyhow::Result<()> {
        let db = DBService::new(&config.database_url)
            .await
            .context("failed to create postgres pool")?;

        let event_log =
            RedisEventLog::new(&config.redis_url).context("event log url is invalid")?;

        let signer = config
            .storage
            .as_ref()
            .map(|storage| Arc::new(S3UrlSigner::new(storage)) as Arc<dyn FileUrlSigner>);
        if signer.is_some() {
            tracing::info!("file URL signer initialized");
        } else {
            tracing::warn!(
                "file URL signing not configured. Set STORAGE_ACCESS_KEY_ID, STORAGE_SECRET_ACCESS_KEY, and STORAGE_ENDPOINT to enable."
            );
        }

        let state = AppState::new(db, config.clone(), Arc::new(event_log), signer);

        let router = routes::router(state);
        let addr: SocketAddr = config
            .listen_addr
            .parse()
            .context("listen address is invalid")?;
        let tcp_listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("failed to bind tcp listener")?;

        tracing::info!(%addr, "chat gateway listening");

        axum::serve(tcp_listener, router.into_make_service())
            .await
            .context("chat gateway failure")?;

        Ok(())
    }
}
