//! # Form Pipeline Subsystem (CR-02)
//!
//! Authenticated submission, query, search and resolve of civic forms.
//!
//! ## Purpose
//!
//! Every command enters through a role-parameterised pipeline, is checked
//! against the role's command set, authenticated against the identity
//! registry (CR-01), and only then reaches the commit engine, the form
//! cache or the broadcast channel.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Role check precedes authentication | `service.rs` - `authorize()` first in every entry point |
//! | Auth failure precedes any external call | `service.rs` - `authenticate()` before commit/cache |
//! | Secret never committed or broadcast | `service.rs` - `strip_secret()`; `adapters/ledger.rs` rejects it |
//! | No broadcast unless committed | `service.rs` - `submit()` returns early on non-ok |
//! | Broadcast never changes the result | `service.rs` - `broadcast()` logs and swallows |
//! | Registry not held across commit | `Authenticator` returns a snapshot |
//! | Accounts see only their own forms | `domain/role.rs` - `own_forms_only()` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ipc/       - Command parsing, CommandHandler, CommandResponse  │
//! │  adapters/  - InMemoryLedger, InMemoryFormCache                 │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - FormPipelineApi                            │
//! │  ports/outbound.rs - CommitEngine, FormCache                    │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/role.rs    - Operation, Role, AccountRole, AdminRole    │
//! │  domain/errors.rs  - PipelineError                              │
//! │  service.rs        - FormPipeline<R, C, F>                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod ipc;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryFormCache, InMemoryLedger, LedgerEntry, DEFAULT_MAX_TX_BYTES};
pub use domain::{AccountRole, AdminRole, Operation, PipelineError, Role};
pub use ipc::{Command, CommandHandler, CommandResponse};
pub use ports::{CommitEngine, FormCache, FormPipelineApi, Resolution};
pub use service::FormPipeline;
