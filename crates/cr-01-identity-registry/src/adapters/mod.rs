//! Adapters for the Identity Registry outbound ports.

pub mod keys;
pub mod peer;
