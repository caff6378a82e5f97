//! # Commit Results
//!
//! Outcome type returned by the commit engine, and the result codes that
//! every caller-facing response carries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable result codes surfaced to callers.
///
/// Codes below 10 are produced by the commit engine itself; the rest map the
/// identity and pipeline error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ResultCode {
    Ok = 0,
    InternalError = 1,
    EncodingError = 2,
    Unauthorized = 3,
    UnknownRequest = 4,

    DuplicateIdentity = 10,
    IdentityNotFound = 11,
    InvalidCredentials = 12,
    RegistryUnavailable = 13,

    MalformedPayload = 20,
    FormNotFound = 21,
}

impl ResultCode {
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.as_u32())
    }
}

/// Result of appending a transaction to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResult {
    /// Outcome code; `Ok` means the transaction is durable.
    pub code: ResultCode,
    /// Engine-defined payload (the assigned form id on success).
    pub data: Vec<u8>,
    /// Human-readable log line.
    pub log: String,
}

impl CommitResult {
    pub fn ok(data: impl Into<Vec<u8>>, log: impl Into<String>) -> Self {
        Self {
            code: ResultCode::Ok,
            data: data.into(),
            log: log.into(),
        }
    }

    pub fn error(code: ResultCode, log: impl Into<String>) -> Self {
        Self {
            code,
            data: Vec::new(),
            log: log.into(),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }

    /// The payload interpreted as UTF-8, if it is.
    #[must_use]
    pub fn data_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}
