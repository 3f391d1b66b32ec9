use sqlx::{Error, PgPool, postgres::PgPoolOptions};

pub mod models;

/// Handle on the externally owned conversation tables. This crate only reads them; the schema is
/// managed by the service that writes conversations, so no migrations run from here.
#[derive(Clone)]
pub struct DBService {
    pub pool: PgPool,
}

impl DBService {
    pub async fn new(database_url: &str) -> Result<DBService, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        tracing::info!("connected to conversation database");

        Ok(DBService { pool })
    }
}
