//! # Role Policy
//!
//! One pipeline serves both roles; the role is a zero-sized type parameter
//! that fixes the permitted command set and the visibility of forms.
//!
//! | Operation | Account | Admin | Acting identity must be admin |
//! |-----------|---------|-------|-------------------------------|
//! | `create-account` | yes | yes | no |
//! | `create-admin` | no | yes | yes |
//! | `remove-account` | yes | yes | no |
//! | `remove-admin` | no | yes | yes (self) |
//! | `revoke-identity` | no | yes | yes |
//! | `submit-form` | yes | yes | no |
//! | `find-form` | own forms | all forms | no |
//! | `search-forms` | own forms | all forms | no |
//! | `resolve-form` | no | yes | yes |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every command the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    CreateAccount,
    CreateAdmin,
    RemoveAccount,
    RemoveAdmin,
    RevokeIdentity,
    SubmitForm,
    FindForm,
    SearchForms,
    ResolveForm,
}

impl Operation {
    pub const ALL: [Operation; 9] = [
        Operation::CreateAccount,
        Operation::CreateAdmin,
        Operation::RemoveAccount,
        Operation::RemoveAdmin,
        Operation::RevokeIdentity,
        Operation::SubmitForm,
        Operation::FindForm,
        Operation::SearchForms,
        Operation::ResolveForm,
    ];

    /// Transport name of the command.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::CreateAccount => "create-account",
            Self::CreateAdmin => "create-admin",
            Self::RemoveAccount => "remove-account",
            Self::RemoveAdmin => "remove-admin",
            Self::RevokeIdentity => "revoke-identity",
            Self::SubmitForm => "submit-form",
            Self::FindForm => "find-form",
            Self::SearchForms => "search-forms",
            Self::ResolveForm => "resolve-form",
        }
    }

    /// Look up an operation by transport name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Whether the acting identity itself must hold admin privilege.
    #[must_use]
    pub fn requires_admin(self) -> bool {
        matches!(
            self,
            Self::CreateAdmin | Self::RemoveAdmin | Self::RevokeIdentity | Self::ResolveForm
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability set of a pipeline.
pub trait Role: Send + Sync + 'static {
    /// Role name used in logs and errors.
    const NAME: &'static str;

    /// Whether callers of this role may issue `operation` at all.
    fn permits(operation: Operation) -> bool;

    /// Whether find/search only see forms the caller submitted.
    fn own_forms_only() -> bool;
}

/// Ordinary account holder: self-targeted identity commands, own forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountRole;

impl Role for AccountRole {
    const NAME: &'static str = "account";

    fn permits(operation: Operation) -> bool {
        matches!(
            operation,
            Operation::CreateAccount
                | Operation::RemoveAccount
                | Operation::SubmitForm
                | Operation::FindForm
                | Operation::SearchForms
        )
    }

    fn own_forms_only() -> bool {
        true
    }
}

/// Administrator: every command, all forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminRole;

impl Role for AdminRole {
    const NAME: &'static str = "admin";

    fn permits(_operation: Operation) -> bool {
        true
    }

    fn own_forms_only() -> bool {
        false
    }
}
