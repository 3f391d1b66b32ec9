use std::sync::Arc;

use db::DBService;
use events::{StreamContext, storage::FileUrlSigner};
use services::services::stream::EventLog;
use sqlx::PgPool;

use crate::config::GatewayConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub config: GatewayConfig,
    event_log: Arc<dyn EventLog>,
    signer: Option<Arc<dyn FileUrlSigner>>,
}

impl AppState {
    pub fn new(
        db: DBService,
        config: GatewayConfig,
        event_log: Arc<dyn EventLog>,
        signer: Option<Arc<dyn FileUrlSigner>>,
    ) -> Self {
        Self {
            db,
            config,
            event_log,
            signer,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db.pool
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn event_log(&self) -> Arc<dyn EventLog> {
        Arc::clone(&self.event_log)
    }

    pub fn stream_context(&self, working_dir: Option<String>) -> StreamContext {
        StreamContext::new(working_dir, self.signer.clone())
    }
}
