//! # Core Domain Entities
//!
//! Defines the civic reporting entities shared by every subsystem.
//!
//! ## Clusters
//!
//! - **Identity**: `PublicKeyId`, `Privilege`
//! - **Forms**: `Form`, `FormId`, `FormStatus`, `StatusFilter`, `SearchCriteria`
//! - **Routing**: `ServiceKind`, `Department`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Length of a public key identifier in hex characters (32-byte Ed25519 key).
pub const PUBLIC_KEY_HEX_LEN: usize = 64;

/// Public identifier of a registered identity.
///
/// Lowercase hex of the identity's Ed25519 verifying key. The registry treats
/// it as opaque: an identifier that was never issued simply is not found.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKeyId(String);

impl PublicKeyId {
    /// Wrap an identifier received from a caller.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the identifier from raw verifying key bytes.
    #[must_use]
    pub fn from_key_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        self.0.get(..end).unwrap_or(&self.0)
    }
}

impl fmt::Display for PublicKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Privilege held by a registered identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    /// Ordinary account holder.
    Account,
    /// Administrator: may grant, revoke and resolve.
    Admin,
}

impl Privilege {
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account => f.write_str("account"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

// =============================================================================
// CLUSTER B: FORMS
// =============================================================================

/// Identifier assigned to a form by the commit engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(String);

impl FormId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a committed form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    Open,
    Resolved,
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Resolved => f.write_str("resolved"),
        }
    }
}

/// Status restriction applied to a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Open,
    Resolved,
    #[default]
    Any,
}

impl StatusFilter {
    /// Parse the transport's status argument. An empty string means `Any`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "resolved" => Some(Self::Resolved),
            "" | "any" | "all" => Some(Self::Any),
            _ => None,
        }
    }

    #[must_use]
    pub fn admits(self, status: FormStatus) -> bool {
        match self {
            Self::Any => true,
            Self::Open => status == FormStatus::Open,
            Self::Resolved => status == FormStatus::Resolved,
        }
    }
}

/// A committed complaint or service request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    /// Identifier assigned at commit time.
    pub id: FormId,
    /// Service kind as submitted (e.g. "pothole").
    pub kind: String,
    /// Street address the form refers to.
    pub address: String,
    /// Free-text description.
    pub description: String,
    /// Kind-specific structured field (label given by `ServiceKind`).
    pub spec_field: String,
    /// Identity that submitted the form.
    pub submitter: PublicKeyId,
    /// Current status.
    pub status: FormStatus,
    /// Log height at which the form was committed.
    pub height: u64,
    /// Commit time.
    pub submitted_at: DateTime<Utc>,
    /// Time of resolution, if resolved.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Form {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.status == FormStatus::Resolved
    }

    /// Transition to `Resolved`. Returns `false` if the form was already resolved.
    pub fn resolve(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_resolved() {
            return false;
        }
        self.status = FormStatus::Resolved;
        self.resolved_at = Some(at);
        true
    }
}

/// Predicate for form searches. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Exact (case-insensitive) service kind.
    pub kind: Option<String>,
    /// Case-insensitive substring of the address.
    pub address: Option<String>,
    /// Case-insensitive substring of the kind-specific field.
    pub spec_field: Option<String>,
    /// Restrict to forms submitted by this identity.
    pub submitter: Option<PublicKeyId>,
}

impl SearchCriteria {
    /// Restrict the search to a single submitter.
    #[must_use]
    pub fn submitted_by(mut self, submitter: PublicKeyId) -> Self {
        self.submitter = Some(submitter);
        self
    }

    #[must_use]
    pub fn matches(&self, form: &Form) -> bool {
        let kind_match = self
            .kind
            .as_deref()
            .map_or(true, |k| form.kind.eq_ignore_ascii_case(k));
        let address_match = self
            .address
            .as_deref()
            .map_or(true, |a| contains_ignore_case(&form.address, a));
        let spec_match = self
            .spec_field
            .as_deref()
            .map_or(true, |s| contains_ignore_case(&form.spec_field, s));
        let submitter_match = self
            .submitter
            .as_ref()
            .map_or(true, |s| &form.submitter == s);

        kind_match && address_match && spec_match && submitter_match
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_lowercase()
        .contains(&needle.to_lowercase())
}

// =============================================================================
// CLUSTER C: ROUTING
// =============================================================================

/// City department owning a class of service requests.
///
/// Each department has its own broadcast channel; `General` is the default
/// shared channel every committed form is announced on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    General,
    Streets,
    Sanitation,
    Infrastructure,
    Parks,
    Police,
}

impl Department {
    /// Wire number of the department's broadcast channel.
    #[must_use]
    pub fn channel_number(self) -> u8 {
        match self {
            Self::General => 0x40,
            Self::Streets => 0x41,
            Self::Sanitation => 0x42,
            Self::Infrastructure => 0x43,
            Self::Parks => 0x44,
            Self::Police => 0x45,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Streets => "streets",
            Self::Sanitation => "sanitation",
            Self::Infrastructure => "infrastructure",
            Self::Parks => "parks",
            Self::Police => "police",
        }
    }
}

/// Label used for the kind-specific field when the kind is not recognised.
pub const GENERIC_FIELD_LABEL: &str = "specfield";

/// A recognised service kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceKind {
    /// Name as it appears in the `type` field.
    pub name: &'static str,
    /// Department whose channel receives the form.
    pub department: Department,
    /// Wire tag of the kind-specific field.
    pub field_label: &'static str,
}

/// Every service kind the node routes to a department.
pub const SERVICE_KINDS: &[ServiceKind] = &[
    ServiceKind {
        name: "pothole",
        department: Department::Streets,
        field_label: "size",
    },
    ServiceKind {
        name: "sidewalk repair",
        department: Department::Streets,
        field_label: "damage",
    },
    ServiceKind {
        name: "street light out",
        department: Department::Infrastructure,
        field_label: "pole",
    },
    ServiceKind {
        name: "graffiti",
        department: Department::Sanitation,
        field_label: "surface",
    },
    ServiceKind {
        name: "missed pickup",
        department: Department::Sanitation,
        field_label: "bin",
    },
    ServiceKind {
        name: "fallen tree",
        department: Department::Parks,
        field_label: "obstruction",
    },
    ServiceKind {
        name: "abandoned vehicle",
        department: Department::Police,
        field_label: "plate",
    },
];

impl ServiceKind {
    /// Case-insensitive lookup by name.
    #[must_use]
    pub fn lookup(name: &str) -> Option<&'static ServiceKind> {
        let name = name.trim();
        SERVICE_KINDS
            .iter()
            .find(|k| k.name.eq_ignore_ascii_case(name))
    }

    /// Wire tag of the kind-specific field for `kind`.
    #[must_use]
    pub fn field_label_for(kind: &str) -> &'static str {
        Self::lookup(kind).map_or(GENERIC_FIELD_LABEL, |k| k.field_label)
    }

    /// Department for `kind`, `None` for unrecognised kinds.
    #[must_use]
    pub fn department_for(kind: &str) -> Option<Department> {
        Self::lookup(kind).map(|k| k.department)
    }
}
