//! # Broadcast Events
//!
//! Defines the event type that flows through the shared bus and the channel
//! identifiers used to address department audiences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::entities::{Department, PublicKeyId};
use std::fmt;
use uuid::Uuid;

/// Numbered broadcast channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub u8);

impl ChannelId {
    /// The default shared channel every committed form is announced on.
    pub const GENERAL: ChannelId = ChannelId(0x40);

    #[must_use]
    pub fn is_general(self) -> bool {
        self == Self::GENERAL
    }
}

impl From<Department> for ChannelId {
    fn from(department: Department) -> Self {
        Self(department.channel_number())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// A transaction body broadcast by a peer on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    /// Unique id of this broadcast.
    pub id: Uuid,
    /// Channel the event was published on.
    pub channel: ChannelId,
    /// Identity whose peer published the event.
    pub origin: PublicKeyId,
    /// Secret-free transaction body.
    pub payload: String,
    /// Publication time.
    pub published_at: DateTime<Utc>,
}

impl BroadcastEvent {
    pub fn new(channel: ChannelId, origin: PublicKeyId, payload: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            origin,
            payload: payload.into(),
            published_at: Utc::now(),
        }
    }
}

/// Filter for subscribing to specific channels.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Channels to include. Empty means all channels.
    pub channels: Vec<ChannelId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific channels.
    #[must_use]
    pub fn channels(channels: Vec<ChannelId>) -> Self {
        Self { channels }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &BroadcastEvent) -> bool {
        self.channels.is_empty() || self.channels.contains(&event.channel)
    }
}
