//! # Bus-backed Peers
//!
//! One [`BusPeer`] per registered identity, publishing onto the shared
//! event bus. [`BusPeerNetwork`] owns the strong references; the registry
//! only ever sees `Weak` handles.

use crate::ports::outbound::{BroadcastError, PeerHandle, PeerNetwork};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{BroadcastEvent, ChannelId, EventPublisher};
use shared_types::PublicKeyId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// A peer connected to the node's event bus.
pub struct BusPeer {
    id: PublicKeyId,
    bus: Arc<dyn EventPublisher>,
    active: AtomicBool,
}

impl BusPeer {
    pub fn new(id: PublicKeyId, bus: Arc<dyn EventPublisher>) -> Self {
        Self {
            id,
            bus,
            active: AtomicBool::new(true),
        }
    }

    /// Stop the peer. Later broadcasts fail with `PeerStopped`.
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl PeerHandle for BusPeer {
    fn public_key_id(&self) -> &PublicKeyId {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn broadcast(&self, channel: ChannelId, payload: &str) -> Result<usize, BroadcastError> {
        if !self.is_active() {
            return Err(BroadcastError::PeerStopped(self.id.clone()));
        }
        let event = BroadcastEvent::new(channel, self.id.clone(), payload);
        Ok(self.bus.publish(event).await)
    }
}

/// Peer lifecycle manager over a shared event bus.
pub struct BusPeerNetwork {
    bus: Arc<dyn EventPublisher>,
    peers: RwLock<HashMap<PublicKeyId, Arc<BusPeer>>>,
}

impl BusPeerNetwork {
    pub fn new(bus: Arc<dyn EventPublisher>) -> Self {
        Self {
            bus,
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Number of running peers.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.peers.read().len()
    }

    /// Stop every peer, e.g. at node shutdown.
    pub fn stop_all(&self) {
        let mut peers = self.peers.write();
        for peer in peers.values() {
            peer.stop();
        }
        info!(stopped = peers.len(), "All peers stopped");
        peers.clear();
    }
}

impl PeerNetwork for BusPeerNetwork {
    fn start_peer(&self, id: &PublicKeyId) -> Arc<dyn PeerHandle> {
        let mut peers = self.peers.write();
        let peer: Arc<BusPeer> = Arc::clone(peers.entry(id.clone()).or_insert_with(|| {
            debug!(public_key = %id.short(), "Peer started");
            Arc::new(BusPeer::new(id.clone(), Arc::clone(&self.bus)))
        }));
        peer
    }

    fn stop_peer(&self, id: &PublicKeyId) -> bool {
        match self.peers.write().remove(id) {
            Some(peer) => {
                peer.stop();
                debug!(public_key = %id.short(), "Peer stopped");
                true
            }
            None => false,
        }
    }
}
