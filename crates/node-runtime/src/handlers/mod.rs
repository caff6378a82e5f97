//! # Runtime Handlers
//!
//! Long-running tasks attached to the node: the broadcast monitor and the
//! local line console.

pub mod broadcast_monitor;
pub mod console;

pub use broadcast_monitor::BroadcastMonitor;
pub use console::Console;
