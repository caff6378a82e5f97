//! # Shared Bus - Broadcast Channels Between Peers
//!
//! Carries committed transaction bodies from the submitting identity's peer
//! to every other connected peer.
//!
//! ## Channels
//!
//! ```text
//! ┌──────────────┐  publish(general)   ┌──────────────┐
//! │ Submitting   │ ──────┐             │ Department   │
//! │ peer         │ ──┐   │             │ subscribers  │
//! └──────────────┘   │   ▼             └──────────────┘
//!   publish(dept)    │ ┌──────────────┐        ↑
//!                    └→│  Event Bus   │ ───────┘
//!                      └──────────────┘  subscribe(channels)
//! ```
//!
//! Every committed form is announced on the `general` channel; forms of a
//! recognised kind are also announced on their department's channel.
//! Delivery is best-effort: an event with no subscribers is dropped, which
//! never affects the durability of the committed transaction.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{BroadcastEvent, ChannelId, EventFilter};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
