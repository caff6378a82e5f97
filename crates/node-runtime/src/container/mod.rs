//! # Subsystem Container
//!
//! Central container holding the node's subsystem instances with their
//! lifetime management and dependency injection.
//!
//! - Subsystems are initialized in dependency order (bus, registry, ledger, pipelines)
//! - Peers talk to each other only through the event bus
//! - Adapters implement the outbound ports of each subsystem

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, NodeConfig};
pub use subsystems::{AccountPipeline, AdminPipeline, NodeLedger, SubsystemContainer};
