//! # Node Runtime Library
//!
//! Wires the identity registry (CR-01), the form pipelines (CR-02), the
//! ledger and the broadcast bus into one node. The binary in `main.rs` adds
//! logging, environment configuration and signal handling on top.
//!
//! ## Architectural Patterns
//!
//! - **Hexagonal Architecture**: subsystems expose ports, this crate picks the adapters
//! - **Event-Driven Broadcast**: peers announce committed forms on the shared bus only
//! - **Role Endpoints**: one command handler per role over shared collaborators

#![allow(clippy::type_complexity)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod container;
pub mod handlers;
pub mod runtime;

pub use container::{ConfigError, NodeConfig, SubsystemContainer};
pub use runtime::NodeRuntime;
