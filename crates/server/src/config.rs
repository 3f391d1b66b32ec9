use std::{env, str::FromStr, time::Duration};

use secrecy::SecretString;
use services::services::{
    storage::StorageConfig,
    stream::{HeartbeatConfig, LiveStreamConfig, SubscriberConfig},
};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub database_url: String,
    pub listen_addr: String,
    pub redis_url: String,
    pub stream: LiveStreamConfig,
    /// Bucket holding per-session tool files, used to derive a session's working directory.
    pub session_files_bucket: Option<String>,
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable `{0}` is not set")]
    MissingVar(&'static str),
    #[error("invalid value for environment variable `{0}`")]
    InvalidVar(&'static str),
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::MissingVar("DATABASE_URL"))?;
        let listen_addr = var("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let redis_url = var("REDIS_URL").ok_or(ConfigError::MissingVar("REDIS_URL"))?;

        let stream = LiveStreamConfig {
            subscriber: SubscriberConfig {
                block: Duration::from_millis(parse_nonzero(&var, "STREAM_BLOCK_MS", 30_000)?),
                batch_size: parse_nonzero(&var, "STREAM_BATCH_SIZE", 100)?,
            },
            heartbeat: HeartbeatConfig {
                keepalive_interval: Duration::from_millis(parse_or(
                    &var,
                    "HEARTBEAT_INTERVAL_MS",
                    20_000,
                )?),
                upstream_timeout: Duration::from_millis(parse_or(
                    &var,
                    "UPSTREAM_TIMEOUT_MS",
                    50_000,
                )?),
            },
        };

        let session_files_bucket = var("SESSION_FILES_BUCKET");
        let storage = storage_from_lookup(&var)?;

        Ok(Self {
            database_url,
            listen_addr,
            redis_url,
            stream,
            session_files_bucket,
            storage,
        })
    }
}

fn storage_from_lookup(
    var: &impl Fn(&str) -> Option<String>,
) -> Result<Option<StorageConfig>, ConfigError> {
    let Some(access_key_id) = var("STORAGE_ACCESS_KEY_ID") else {
        tracing::info!("STORAGE_ACCESS_KEY_ID not set, file URL signing disabled");
        return Ok(None);
    };

    let secret_access_key = var("STORAGE_SECRET_ACCESS_KEY")
        .ok_or(ConfigError::MissingVar("STORAGE_SECRET_ACCESS_KEY"))?;
    let endpoint = var("STORAGE_ENDPOINT").ok_or(ConfigError::MissingVar("STORAGE_ENDPOINT"))?;
    let region = var("STORAGE_REGION").unwrap_or_else(|| "auto".to_string());
    let signed_url_expiry_secs = parse_or(var, "SIGNED_URL_EXPIRY_SECS", 7200)?;

    tracing::info!(endpoint = %endpoint, region = %region, "storage config loaded successfully");

    Ok(Some(StorageConfig {
        access_key_id,
        secret_access_key: SecretString::new(secret_access_key.into()),
        endpoint,
        region,
        signed_url_expiry_secs,
    }))
}

fn parse_or<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidVar(name)),
        None => Ok(default),
    }
}

/// Like [`parse_or`], but zero is rejected. `XREAD BLOCK 0` would wait forever.
fn parse_nonzero<T: FromStr + PartialEq + Default>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    let value = parse_or(var, name, default)?;
    if value == T::default() {
        return Err(ConfigError::InvalidVar(name));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        GatewayConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/chat"),
        ("REDIS_URL", "redis://localhost:6379"),
    ];

    #[test]
    fn defaults() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.stream.subscriber.block, Duration::from_secs(30));
        assert_eq!(config.stream.subscriber.batch_size, 100);
        assert_eq!(config.stream.heartbeat, HeartbeatConfig::default());
        assert!(config.session_files_bucket.is_none());
        assert!(config.storage.is_none());
    }

    #[test]
    fn required_variables() {
        assert!(matches!(
            load(&[("REDIS_URL", "redis://localhost")]),
            Err(ConfigError::MissingVar("DATABASE_URL"))
        ));
        assert!(matches!(
            load(&[("DATABASE_URL", "postgres://x"), ("REDIS_URL", " ")]),
            Err(ConfigError::MissingVar("REDIS_URL"))
        ));
    }

    #[test]
    fn numeric_overrides_must_parse() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("UPSTREAM_TIMEOUT_MS", "90000"));
        let config = load(&vars).unwrap();
        assert_eq!(config.stream.heartbeat.upstream_timeout, Duration::from_secs(90));

        vars.push(("STREAM_BATCH_SIZE", "lots"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidVar("STREAM_BATCH_SIZE"))
        ));
    }

    #[test]
    fn zero_read_settings_are_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("STREAM_BLOCK_MS", "0"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidVar("STREAM_BLOCK_MS"))
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("STREAM_BATCH_SIZE", "0"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidVar("STREAM_BATCH_SIZE"))
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("STREAM_BLOCK_MS", "1"));
        assert_eq!(
            load(&vars).unwrap().stream.subscriber.block,
            Duration::from_millis(1)
        );
    }

    #[test]
    fn storage_group() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("STORAGE_ACCESS_KEY_ID", "GOOG1"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::MissingVar("STORAGE_SECRET_ACCESS_KEY"))
        ));

        vars.push(("STORAGE_SECRET_ACCESS_KEY", "shh"));
        vars.push(("STORAGE_ENDPOINT", "https://storage.googleapis.com"));
        let storage = load(&vars).unwrap().storage.unwrap();
        assert_eq!(storage.region, "auto");
        assert_eq!(storage.signed_url_expiry_secs, 7200);
        assert_eq!(storage.secret_access_key.expose_secret(), "shh");
    }
}
