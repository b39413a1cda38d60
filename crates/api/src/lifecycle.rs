//! Process lifecycle: startup wiring and ordered shutdown.
//!
//! The process moves through `Starting → Running → Draining → Stopped`.
//! Shutdown first stops HTTP intake, bounded by the configured grace
//! period, and only then closes the job queue and waits for every
//! fulfillment worker. No request can submit a job after the queue closes
//! because no request is still running by then.

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use catalog::{CacheError, CatalogCache, InMemoryCatalogCache, RedisCatalogCache};
use fulfillment::{SimulatedInventorySyncService, SimulatedNotificationService, WorkerPool};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryStore, PostgresStore, Store, StoreError};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinError, JoinHandle};

use crate::auth::TokenKeys;
use crate::config::Config;
use crate::{AppState, create_app};

const DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Where the process is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Draining => "draining",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Errors that end the process with a failure status.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error.
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    /// The HTTP server task panicked or was cancelled.
    #[error("Server task failed: {0}")]
    ServerTask(#[from] JoinError),

    /// Store connection or migration failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Cache connection failure.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// In-flight requests did not finish within the grace period and were
    /// aborted. The job queue was still drained.
    #[error("HTTP intake did not drain within {grace:?}")]
    IntakeDrainTimeout { grace: Duration },
}

/// Outcome of a clean shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Fulfillment jobs processed over the life of the process.
    pub jobs_processed: u64,
}

/// Owns startup and ordered shutdown of the whole process.
pub struct Lifecycle {
    config: Config,
    metrics_handle: PrometheusHandle,
    state_tx: watch::Sender<LifecycleState>,
    addr_tx: watch::Sender<Option<SocketAddr>>,
}

impl Lifecycle {
    pub fn new(config: Config, metrics_handle: PrometheusHandle) -> Self {
        let (state_tx, _) = watch::channel(LifecycleState::Starting);
        let (addr_tx, _) = watch::channel(None);
        Self {
            config,
            metrics_handle,
            state_tx,
            addr_tx,
        }
    }

    /// Subscribes to lifecycle state changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state_tx.subscribe()
    }

    /// Subscribes to the listener address, published once bound.
    pub fn local_addr(&self) -> watch::Receiver<Option<SocketAddr>> {
        self.addr_tx.subscribe()
    }

    /// Runs the process until `shutdown` resolves, then shuts down in order.
    ///
    /// `shutdown` is awaited once. Signals arriving after it resolved do
    /// not interrupt draining.
    pub async fn run<F>(self, shutdown: F) -> Result<ShutdownReport, LifecycleError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.config.jwt_secret.is_none() {
            tracing::warn!("JWT_SECRET is not set, using the development fallback secret");
        }

        let cache = self.connect_cache().await?;

        match self.config.database_url.clone() {
            Some(url) => {
                let store = PostgresStore::connect(&url, DATABASE_MAX_CONNECTIONS).await?;
                store.run_migrations().await.map_err(StoreError::from)?;
                tracing::info!("connected to PostgreSQL, migrations applied");
                self.serve(store, cache, shutdown).await
            }
            None => {
                tracing::warn!("DATABASE_URL is not set, using the in-memory store");
                self.serve(InMemoryStore::new(), cache, shutdown).await
            }
        }
    }

    async fn connect_cache(&self) -> Result<Arc<dyn CatalogCache>, LifecycleError> {
        match &self.config.redis_url {
            Some(url) => {
                let cache = RedisCatalogCache::connect(url).await?;
                tracing::info!("connected to Redis");
                Ok(Arc::new(cache))
            }
            None => {
                tracing::info!("REDIS_URL is not set, using the in-process catalog cache");
                Ok(Arc::new(InMemoryCatalogCache::new()))
            }
        }
    }

    async fn serve<S, F>(
        self,
        store: S,
        cache: Arc<dyn CatalogCache>,
        shutdown: F,
    ) -> Result<ShutdownReport, LifecycleError>
    where
        S: Store + Clone + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        let pool = WorkerPool::start(
            self.config.pool_config(),
            Arc::new(SimulatedNotificationService::new(
                self.config.notification_latency,
            )),
            Arc::new(SimulatedInventorySyncService::new(
                self.config.inventory_sync_latency,
            )),
        );
        tracing::info!(
            workers = pool.worker_count(),
            queue_capacity = self.config.queue_capacity,
            "fulfillment pool started"
        );

        let tokens = TokenKeys::new(self.config.jwt_secret().as_bytes());
        let state = Arc::new(AppState::new(store, cache, pool.submitter(), tokens));
        let app = create_app(state, self.metrics_handle.clone());

        let addr = self.config.addr();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(source) => {
                pool.stop().await;
                self.transition(LifecycleState::Stopped);
                return Err(LifecycleError::Bind { addr, source });
            }
        };
        let local_addr = listener.local_addr()?;
        self.addr_tx.send_replace(Some(local_addr));

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        self.transition(LifecycleState::Running);
        tracing::info!(addr = %local_addr, "accepting requests");

        let exited_early = tokio::select! {
            () = shutdown => None,
            joined = &mut server => Some(joined),
        };

        self.transition(LifecycleState::Draining);

        let intake = match exited_early {
            Some(joined) => {
                tracing::error!("server stopped before shutdown was requested");
                flatten(joined)
            }
            None => drain_intake(server, stop_tx, self.config.shutdown_grace).await,
        };

        // Intake is closed, so nothing can submit anymore.
        let summary = pool.stop().await;
        self.transition(LifecycleState::Stopped);

        intake?;
        tracing::info!(
            jobs_processed = summary.jobs_processed,
            "shutdown complete"
        );
        Ok(ShutdownReport {
            jobs_processed: summary.jobs_processed,
        })
    }

    fn transition(&self, state: LifecycleState) {
        tracing::info!(%state, "lifecycle state changed");
        self.state_tx.send_replace(state);
    }
}

/// Stops accepting connections and waits up to `grace` for in-flight
/// requests. Past the grace period the server task is aborted.
pub(crate) async fn drain_intake(
    mut server: JoinHandle<std::io::Result<()>>,
    stop_tx: oneshot::Sender<()>,
    grace: Duration,
) -> Result<(), LifecycleError> {
    let _ = stop_tx.send(());

    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => flatten(joined),
        Err(_) => {
            server.abort();
            tracing::error!(
                fatal = true,
                grace_secs = grace.as_secs_f64(),
                "in-flight requests did not finish within the grace period, aborting them"
            );
            Err(LifecycleError::IntakeDrainTimeout { grace })
        }
    }
}

fn flatten(joined: Result<std::io::Result<()>, JoinError>) -> Result<(), LifecycleError> {
    joined??;
    Ok(())
}
