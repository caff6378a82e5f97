//! # IPC Layer - Form Pipeline
//!
//! Command parsing, dispatch and response shaping for a role endpoint. The
//! real-time transport sits outside this crate and only exchanges
//! [`Command`] and [`CommandResponse`] values with it.

pub mod handler;
pub mod payloads;

pub use handler::CommandHandler;
pub use payloads::{Command, CommandResponse};
