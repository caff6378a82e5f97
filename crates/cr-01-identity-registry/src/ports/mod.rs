//! Ports layer for the Identity Registry.
//!
//! Outbound (Driven) ports only: the registry is driven directly by the form
//! pipeline, and depends on the networking layer and key derivation.

pub mod outbound;

pub use outbound::*;
