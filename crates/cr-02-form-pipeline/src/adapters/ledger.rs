//! # In-Memory Ledger
//!
//! Single-node `CommitEngine`: validates a transaction body, appends it to an
//! ordered log and indexes the resulting form in the cache.
//!
//! ```text
//! body ──validate──→ [ log: height 1, 2, 3, ... ] ──index──→ FormCache
//!         │
//!         └── rejected: EncodingError, nothing appended
//! ```
//!
//! Form ids are the first 16 hex characters of
//! `SHA-256(height_be_bytes || body)`.

use crate::ports::outbound::{CommitEngine, FormCache};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use shared_types::codec::{contains_field, tags};
use shared_types::{CommitResult, Form, FormId, FormStatus, ResultCode, TransactionBody};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default upper bound on a transaction body, in bytes.
pub const DEFAULT_MAX_TX_BYTES: usize = 64 * 1024;

const FORM_ID_HEX_LEN: usize = 16;

/// One committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub height: u64,
    pub form_id: FormId,
    pub body: String,
    pub committed_at: DateTime<Utc>,
}

/// Append-only transaction log backed by memory.
pub struct InMemoryLedger<F: FormCache> {
    entries: RwLock<Vec<LedgerEntry>>,
    cache: Arc<F>,
    max_tx_bytes: usize,
}

impl<F: FormCache> InMemoryLedger<F> {
    pub fn new(cache: Arc<F>) -> Self {
        Self::with_max_tx_bytes(cache, DEFAULT_MAX_TX_BYTES)
    }

    pub fn with_max_tx_bytes(cache: Arc<F>, max_tx_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            cache,
            max_tx_bytes,
        }
    }

    /// Height of the last committed entry; 0 when empty.
    pub fn height(&self) -> u64 {
        self.entries.read().len() as u64
    }

    /// Entry at `height` (1-based).
    pub fn entry(&self, height: u64) -> Option<LedgerEntry> {
        let index = usize::try_from(height.checked_sub(1)?).ok()?;
        self.entries.read().get(index).cloned()
    }

    fn validate(&self, body: &[u8]) -> Result<TransactionBody, String> {
        if body.len() > self.max_tx_bytes {
            return Err(format!(
                "transaction body is {} bytes, limit is {}",
                body.len(),
                self.max_tx_bytes
            ));
        }
        let text = std::str::from_utf8(body).map_err(|e| format!("body is not UTF-8: {e}"))?;
        if contains_field(text, tags::PRIVKEY) {
            return Err("transaction body carries an auth secret".to_string());
        }
        TransactionBody::decode(text).map_err(|e| e.to_string())
    }
}

fn form_id_for(height: u64, body: &[u8]) -> FormId {
    let mut hasher = Sha256::new();
    hasher.update(height.to_be_bytes());
    hasher.update(body);
    let mut id = hex::encode(hasher.finalize());
    id.truncate(FORM_ID_HEX_LEN);
    FormId::new(id)
}

#[async_trait]
impl<F: FormCache + 'static> CommitEngine for InMemoryLedger<F> {
    async fn append(&self, body: &[u8]) -> CommitResult {
        let decoded = match self.validate(body) {
            Ok(decoded) => decoded,
            Err(reason) => {
                warn!(reason = %reason, "Transaction rejected");
                return CommitResult::error(ResultCode::EncodingError, reason);
            }
        };

        let entry = {
            let mut entries = self.entries.write();
            let height = entries.len() as u64 + 1;
            let entry = LedgerEntry {
                height,
                form_id: form_id_for(height, body),
                body: String::from_utf8_lossy(body).into_owned(),
                committed_at: Utc::now(),
            };
            entries.push(entry.clone());
            entry
        };

        self.cache.insert(Form {
            id: entry.form_id.clone(),
            kind: decoded.kind,
            address: decoded.address,
            description: decoded.description,
            spec_field: decoded.spec_field,
            submitter: decoded.submitter,
            status: FormStatus::Open,
            height: entry.height,
            submitted_at: entry.committed_at,
            resolved_at: None,
        });

        debug!(height = entry.height, form_id = %entry.form_id, "Transaction committed");
        CommitResult::ok(
            entry.form_id.as_str().as_bytes().to_vec(),
            format!("committed at height {}", entry.height),
        )
    }
}
