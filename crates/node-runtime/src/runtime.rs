//! # Node Runtime
//!
//! Owns the subsystem container and the node's background tasks.
//!
//! ## Startup Sequence
//!
//! 1. Initialize subsystems in dependency order (see `container`)
//! 2. Register the bootstrap admin, if configured
//! 3. Start the broadcast monitor
//! 4. Attach transports (`spawn_console`)
//!
//! ## Shutdown Sequence
//!
//! 1. Signal shutdown to every task
//! 2. Wait for tasks to drain (bounded)
//! 3. Stop every peer

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cr_02_form_pipeline::PipelineError;
use parking_lot::Mutex;
use shared_types::PublicKeyId;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::container::{NodeConfig, SubsystemContainer};
use crate::handlers::{BroadcastMonitor, Console};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// The node runtime orchestrating all subsystems.
pub struct NodeRuntime {
    /// Subsystem container with all initialized services.
    container: Arc<SubsystemContainer>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
    /// Background tasks awaited on shutdown.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Broadcasts seen by the monitor.
    observed: Arc<AtomicU64>,
}

impl NodeRuntime {
    /// Create a new node runtime with configuration.
    pub fn new(config: NodeConfig) -> Self {
        info!("Creating Civic-Ledger node runtime");
        let container = Arc::new(SubsystemContainer::new(config));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            container,
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
            observed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start the node runtime.
    ///
    /// Returns the bootstrap admin's public key when one was configured.
    pub async fn start(&self) -> Result<Option<PublicKeyId>, PipelineError> {
        info!("===========================================");
        info!("  Civic-Ledger Node Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let monitor =
            BroadcastMonitor::subscribe(&self.container.event_bus, Arc::clone(&self.observed));
        let handle = tokio::spawn(monitor.run(self.shutdown_rx.clone()));
        self.tasks.lock().push(handle);

        let bootstrap = match self.container.config.bootstrap.admin_passphrase.as_deref() {
            Some(passphrase) => {
                let keys = self.container.admin_pipeline.bootstrap_admin(passphrase).await?;
                info!(public_key = %keys.public_key_id, "Bootstrap admin registered");
                Some(keys.public_key_id)
            }
            None => {
                warn!("No bootstrap admin configured; admin endpoint is unusable");
                None
            }
        };

        info!(
            bus_capacity = self.container.config.bus.channel_capacity,
            max_tx_bytes = self.container.config.ledger.max_tx_bytes,
            "Node running"
        );
        Ok(bootstrap)
    }

    /// Serve the line console over `reader`/`writer` until input ends or
    /// shutdown is signalled.
    pub fn spawn_console<R, W>(&self, reader: R, writer: W)
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let console = Console::new(self.container.account.clone(), self.container.admin.clone());
        let shutdown = self.shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = console.serve(reader, writer, shutdown).await {
                error!(error = %e, "Console failed");
            }
        });
        self.tasks.lock().push(handle);
    }

    /// Shutdown the node gracefully.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let tasks = std::mem::take(&mut *self.tasks.lock());
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            for task in tasks {
                if let Err(e) = task.await {
                    warn!(error = %e, "Background task ended abnormally");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!("Background tasks did not stop within {:?}", SHUTDOWN_GRACE);
        }

        self.container.peer_network.stop_all();
        info!("Shutdown complete");
    }

    /// Number of broadcasts the monitor has observed.
    pub fn broadcasts_observed(&self) -> u64 {
        self.observed.load(Ordering::Relaxed)
    }

    /// Get a reference to the subsystem container.
    pub fn container(&self) -> Arc<SubsystemContainer> {
        Arc::clone(&self.container)
    }
}
