//! # Pipeline Errors
//!
//! Every failure a pipeline entry point can report. Each maps to a single
//! caller-facing `ResultCode`.

use crate::domain::role::Operation;
use cr_01_identity_registry::{KeyDerivationError, RegistryError};
use shared_types::{CodecError, FormId, PublicKeyId, ResultCode};
use thiserror::Error;

/// Errors from the form pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// Registry or authentication failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The command is outside the role's command set.
    #[error("{operation} is not available to the {role} role")]
    OperationNotPermitted {
        operation: Operation,
        role: &'static str,
    },

    /// The acting identity lacks admin privilege.
    #[error("Identity {0} is not an admin")]
    Unauthorized(PublicKeyId),

    /// A payload field could not be decoded.
    #[error(transparent)]
    MalformedPayload(#[from] CodecError),

    /// The passphrase could not be turned into a keypair.
    #[error("Invalid passphrase: {0}")]
    InvalidPassphrase(#[from] KeyDerivationError),

    /// Command name not recognised by the transport parser.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Wrong number of positional arguments.
    #[error("{command} expects {expected} arguments, got {got}")]
    WrongArity {
        command: &'static str,
        expected: usize,
        got: usize,
    },

    /// The form id is not in the cache, or not visible to the caller.
    #[error("Form {0} not found")]
    FormNotFound(FormId),

    /// The commit engine refused the transaction.
    #[error("Commit rejected ({code}): {log}")]
    CommitRejected { code: ResultCode, log: String },
}

impl PipelineError {
    /// Caller-facing result code. Commit rejections keep the engine's code.
    #[must_use]
    pub fn code(&self) -> ResultCode {
        match self {
            Self::Registry(e) => e.code(),
            Self::OperationNotPermitted { .. } | Self::Unauthorized(_) => ResultCode::Unauthorized,
            Self::MalformedPayload(_) | Self::InvalidPassphrase(_) | Self::WrongArity { .. } => {
                ResultCode::MalformedPayload
            }
            Self::UnknownCommand(_) => ResultCode::UnknownRequest,
            Self::FormNotFound(_) => ResultCode::FormNotFound,
            Self::CommitRejected { code, .. } => *code,
        }
    }
}
