#![forbid(unsafe_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use threadline_api::ApiState;
use threadline_realtime::bus::{BusConfig, CommentBus, DEFAULT_BUFFER_SIZE};
use threadline_storage::{migrate_with_pool, MemoryStorage, PostgresStorage};
use tokio::net::TcpListener;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub storage: StorageConfig,
    pub comment_buffer_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Memory,
    Postgres { database_url: String },
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_values(
            std::env::var("LISTEN_ADDR").ok(),
            std::env::var("STORAGE_BACKEND").ok(),
            std::env::var("DATABASE_URL").ok(),
            std::env::var("COMMENT_BUFFER_SIZE").ok(),
        )
    }

    fn from_values(
        listen_addr: Option<String>,
        storage_backend: Option<String>,
        database_url: Option<String>,
        comment_buffer_size: Option<String>,
    ) -> anyhow::Result<Self> {
        let listen_addr =
            SocketAddr::from_str(listen_addr.as_deref().unwrap_or(DEFAULT_LISTEN_ADDR))?;
        let storage = parse_storage(storage_backend, database_url)?;
        let comment_buffer_size = parse_buffer_size(comment_buffer_size)?;

        Ok(Self {
            listen_addr,
            storage,
            comment_buffer_size,
        })
    }
}

fn parse_storage(
    backend: Option<String>,
    database_url: Option<String>,
) -> anyhow::Result<StorageConfig> {
    let backend = backend.unwrap_or_else(|| "memory".to_owned());
    match backend.trim() {
        "memory" => Ok(StorageConfig::Memory),
        "postgres" => {
            let database_url = database_url
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| {
                    anyhow::anyhow!("DATABASE_URL must be set when STORAGE_BACKEND=postgres")
                })?;
            Ok(StorageConfig::Postgres { database_url })
        }
        other => Err(anyhow::anyhow!(
            "invalid STORAGE_BACKEND {other:?}: expected \"memory\" or \"postgres\""
        )),
    }
}

fn parse_buffer_size(value: Option<String>) -> anyhow::Result<usize> {
    let Some(value) = value else {
        return Ok(DEFAULT_BUFFER_SIZE);
    };
    let size = value
        .trim()
        .parse::<usize>()
        .map_err(|error| anyhow::anyhow!("invalid COMMENT_BUFFER_SIZE {value:?}: {error}"))?;
    if size == 0 {
        return Err(anyhow::anyhow!("COMMENT_BUFFER_SIZE must be at least 1"));
    }
    Ok(size)
}

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let state = build_state(&config).await?;
    let listener = TcpListener::bind(config.listen_addr).await?;
    serve(listener, state, shutdown_signal()).await
}

/// Opens the configured backend and wires the services around one comment bus.
pub async fn build_state(config: &AppConfig) -> anyhow::Result<ApiState> {
    let bus = Arc::new(CommentBus::new(BusConfig {
        buffer_size: config.comment_buffer_size,
    }));
    match &config.storage {
        StorageConfig::Memory => {
            tracing::warn!("using in-memory storage, data is lost on restart");
            Ok(ApiState::with_storage(Arc::new(MemoryStorage::new()), bus))
        }
        StorageConfig::Postgres { database_url } => {
            let storage = Arc::new(PostgresStorage::connect(database_url).await?);
            migrate_with_pool(storage.pool()).await?;
            Ok(ApiState::with_storage(storage, bus))
        }
    }
}

pub async fn serve<F>(listener: TcpListener, state: ApiState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!(addr = %listener.local_addr()?, "server listening");
    axum::serve(listener, threadline_api::router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
