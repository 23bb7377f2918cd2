use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::{info, warn};

/// Pool settings read from env once at startup. The pool itself is built
/// here and injected through `AppState`; nothing else in the crate opens
/// connections.
#[derive(Clone, Debug)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub connect_attempts: u32,
    pub backoff_base_ms: u64,
}

impl DbConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        fn u32_env(name: &str, default: u32) -> u32 {
            std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
        }
        fn u64_env(name: &str, default: u64) -> u64 {
            std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
        }
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set for postgres-store"))?;
        Ok(Self {
            url,
            max_connections: u32_env("DB_MAX_CONNECTIONS", 5),
            acquire_timeout: Duration::from_secs(u64_env("DB_ACQUIRE_TIMEOUT_SECS", 5)),
            connect_attempts: u32_env("DB_CONNECT_ATTEMPTS", 8),
            backoff_base_ms: u64_env("DB_CONNECT_BACKOFF_MS", 200),
        })
    }
}

/// Connect with bounded retries and quadratic backoff, then return the pool.
pub async fn connect(cfg: &DbConfig) -> anyhow::Result<Pool<Postgres>> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(cfg.acquire_timeout)
            .connect(&cfg.url)
            .await
        {
            Ok(pool) => {
                info!("connected to Postgres (attempt {attempt})");
                return Ok(pool);
            }
            Err(e) => {
                if attempt >= cfg.connect_attempts {
                    return Err(anyhow::anyhow!(
                        "failed to connect to Postgres after {attempt} attempts: {e}"
                    ));
                }
                let backoff_ms = cfg.backoff_base_ms * u64::from(attempt.pow(2));
                warn!("Postgres connect attempt {attempt} failed: {e} (retrying in {backoff_ms}ms)");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }
    }
}
