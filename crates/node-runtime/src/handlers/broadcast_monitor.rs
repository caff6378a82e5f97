//! Broadcast monitor.
//!
//! Subscribes to every channel on the bus and logs each body a peer
//! announces. Runs until the bus closes or shutdown is signalled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use shared_bus::{EventFilter, InMemoryEventBus, Subscription};
use tokio::sync::watch;
use tracing::{debug, info};

pub struct BroadcastMonitor {
    subscription: Subscription,
    observed: Arc<AtomicU64>,
}

impl BroadcastMonitor {
    /// Subscribe before any peer publishes, or earlier events are missed.
    /// Every observed broadcast increments `observed`.
    pub fn subscribe(bus: &InMemoryEventBus, observed: Arc<AtomicU64>) -> Self {
        Self {
            subscription: bus.subscribe(EventFilter::all()),
            observed,
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Broadcast monitor started");
        loop {
            tokio::select! {
                event = self.subscription.recv() => {
                    let Some(event) = event else {
                        debug!("Event bus closed");
                        break;
                    };
                    self.observed.fetch_add(1, Ordering::Relaxed);
                    info!(
                        channel = %event.channel,
                        origin = %event.origin.short(),
                        bytes = event.payload.len(),
                        "Broadcast observed"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(
            observed = self.observed.load(Ordering::Relaxed),
            "Broadcast monitor stopped"
        );
    }
}
