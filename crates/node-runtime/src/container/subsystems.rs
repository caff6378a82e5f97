//! # Subsystem Container
//!
//! Holds every subsystem instance of the node and wires them together.
//!
//! ## Initialization Order
//!
//! ```text
//! Phase 1: Event bus (shared infrastructure)
//! Phase 2: Identity registry, peer network, key deriver (CR-01)
//! Phase 3: Form cache, ledger (commit engine)
//! Phase 4: Account and admin pipelines plus their command handlers (CR-02)
//! ```
//!
//! Both pipelines share one registry, one ledger and one cache, so an admin
//! sees every form an account submits.

use std::sync::Arc;

use tracing::{info, instrument};

use cr_01_identity_registry::{BusPeerNetwork, Ed25519KeyDeriver, IdentityRegistry, PeerNetwork};
use cr_02_form_pipeline::{
    AccountRole, AdminRole, CommandHandler, FormPipeline, InMemoryFormCache, InMemoryLedger,
};
use shared_bus::{EventPublisher, InMemoryEventBus};

use crate::container::config::NodeConfig;

/// Ledger backed by the in-memory form cache.
pub type NodeLedger = InMemoryLedger<InMemoryFormCache>;

/// Pipeline serving the account endpoint.
pub type AccountPipeline = FormPipeline<AccountRole, NodeLedger, InMemoryFormCache>;

/// Pipeline serving the admin endpoint.
pub type AdminPipeline = FormPipeline<AdminRole, NodeLedger, InMemoryFormCache>;

/// Central container holding all subsystem instances.
pub struct SubsystemContainer {
    /// Broadcast bus shared by every peer.
    pub event_bus: Arc<InMemoryEventBus>,

    /// Identity registry (CR-01).
    pub registry: Arc<IdentityRegistry>,

    /// Peers started for registered identities.
    pub peer_network: Arc<BusPeerNetwork>,

    /// Forms indexed for query and search.
    pub form_cache: Arc<InMemoryFormCache>,

    /// Append-only commit engine.
    pub ledger: Arc<NodeLedger>,

    /// Admin pipeline, kept for startup bootstrap.
    pub admin_pipeline: Arc<AdminPipeline>,

    /// Account endpoint.
    pub account: CommandHandler<AccountPipeline>,

    /// Admin endpoint.
    pub admin: CommandHandler<AdminPipeline>,

    /// Node configuration (immutable after initialization).
    pub config: NodeConfig,
}

impl SubsystemContainer {
    /// Create a new container with all subsystems initialized.
    #[instrument(name = "subsystem_init", skip(config))]
    pub fn new(config: NodeConfig) -> Self {
        info!("Initializing Civic-Ledger subsystem container");

        info!("Phase 1: Creating shared infrastructure");
        let event_bus = Arc::new(InMemoryEventBus::with_capacity(config.bus.channel_capacity));
        let publisher: Arc<dyn EventPublisher> = event_bus.clone();

        info!("Phase 2: Initializing identity registry");
        let registry = Arc::new(IdentityRegistry::with_acquire_timeout(
            config.registry.acquire_timeout,
        ));
        let peer_network = Arc::new(BusPeerNetwork::new(publisher));
        let network: Arc<dyn PeerNetwork> = peer_network.clone();
        info!(
            "  [1] Identity registry initialized (acquire timeout: {:?})",
            config.registry.acquire_timeout
        );

        info!("Phase 3: Initializing ledger");
        let form_cache = Arc::new(InMemoryFormCache::new());
        let ledger = Arc::new(InMemoryLedger::with_max_tx_bytes(
            Arc::clone(&form_cache),
            config.ledger.max_tx_bytes,
        ));
        info!(
            "  Ledger initialized (max {} bytes per transaction)",
            config.ledger.max_tx_bytes
        );

        info!("Phase 4: Initializing form pipelines");
        let account_pipeline: AccountPipeline = FormPipeline::new(
            Arc::clone(&registry),
            network,
            Arc::new(Ed25519KeyDeriver::new()),
            Arc::clone(&ledger),
            Arc::clone(&form_cache),
        );
        let admin_pipeline = Arc::new(account_pipeline.for_role::<AdminRole>());
        let account = CommandHandler::new(Arc::new(account_pipeline));
        let admin = CommandHandler::new(Arc::clone(&admin_pipeline));
        info!("  [2] Account and admin endpoints ready");

        info!("All subsystems initialized successfully");

        Self {
            event_bus,
            registry,
            peer_network,
            form_cache,
            ledger,
            admin_pipeline,
            account,
            admin,
            config,
        }
    }

    /// Create a container for testing with default configuration.
    #[cfg(test)]
    pub fn new_for_testing() -> Self {
        Self::new(NodeConfig::default())
    }
}
