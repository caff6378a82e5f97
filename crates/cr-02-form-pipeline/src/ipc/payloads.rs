//! # Command Payloads
//!
//! Parsed transport commands and the responses re-emitted to callers.

use crate::domain::errors::PipelineError;
use crate::domain::role::Operation;
use serde::{Deserialize, Serialize};
use shared_types::{CodecError, Form, FormId, PublicKeyId, ResultCode, StatusFilter};
use std::fmt;

/// A transport command with its positional arguments already parsed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
    CreateAccount {
        passphrase: String,
    },
    CreateAdmin {
        passphrase: String,
        pubkey: PublicKeyId,
        privkey: String,
    },
    RemoveAccount {
        pubkey: PublicKeyId,
        privkey: String,
    },
    RemoveAdmin {
        pubkey: PublicKeyId,
        privkey: String,
    },
    RevokeIdentity {
        target: PublicKeyId,
        pubkey: PublicKeyId,
        privkey: String,
    },
    SubmitForm {
        #[serde(rename = "type")]
        kind: String,
        address: String,
        description: String,
        specfield: String,
        pubkey: PublicKeyId,
        privkey: String,
    },
    FindForm {
        form_id: FormId,
        pubkey: PublicKeyId,
        privkey: String,
    },
    ResolveForm {
        form_id: FormId,
        pubkey: PublicKeyId,
        privkey: String,
    },
    SearchForms {
        #[serde(rename = "type")]
        kind: String,
        address: String,
        specfield: String,
        status: StatusFilter,
        pubkey: PublicKeyId,
        privkey: String,
    },
}

impl Command {
    /// The operation this command invokes.
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::CreateAccount { .. } => Operation::CreateAccount,
            Self::CreateAdmin { .. } => Operation::CreateAdmin,
            Self::RemoveAccount { .. } => Operation::RemoveAccount,
            Self::RemoveAdmin { .. } => Operation::RemoveAdmin,
            Self::RevokeIdentity { .. } => Operation::RevokeIdentity,
            Self::SubmitForm { .. } => Operation::SubmitForm,
            Self::FindForm { .. } => Operation::FindForm,
            Self::ResolveForm { .. } => Operation::ResolveForm,
            Self::SearchForms { .. } => Operation::SearchForms,
        }
    }

    /// Parse a named command with positional string arguments.
    ///
    /// | Command | Arguments |
    /// |---------|-----------|
    /// | `create-account` | passphrase |
    /// | `create-admin` | passphrase, pubkey, privkey |
    /// | `remove-account`, `remove-admin` | pubkey, privkey |
    /// | `revoke-identity` | target, pubkey, privkey |
    /// | `submit-form` | type, address, description, specfield, pubkey, privkey |
    /// | `find-form`, `resolve-form` | formId, pubkey, privkey |
    /// | `search-forms` | type, address, specfield, status, pubkey, privkey |
    pub fn parse(name: &str, args: &[String]) -> Result<Self, PipelineError> {
        let operation =
            Operation::from_name(name).ok_or_else(|| PipelineError::UnknownCommand(name.to_string()))?;

        let expected = match operation {
            Operation::CreateAccount => 1,
            Operation::RemoveAccount | Operation::RemoveAdmin => 2,
            Operation::CreateAdmin
            | Operation::RevokeIdentity
            | Operation::FindForm
            | Operation::ResolveForm => 3,
            Operation::SubmitForm | Operation::SearchForms => 6,
        };
        if args.len() != expected {
            return Err(PipelineError::WrongArity {
                command: operation.name(),
                expected,
                got: args.len(),
            });
        }

        let arg = |i: usize| args[i].clone();
        let key = |i: usize| PublicKeyId::new(args[i].clone());

        let command = match operation {
            Operation::CreateAccount => Self::CreateAccount { passphrase: arg(0) },
            Operation::CreateAdmin => Self::CreateAdmin {
                passphrase: arg(0),
                pubkey: key(1),
                privkey: arg(2),
            },
            Operation::RemoveAccount => Self::RemoveAccount {
                pubkey: key(0),
                privkey: arg(1),
            },
            Operation::RemoveAdmin => Self::RemoveAdmin {
                pubkey: key(0),
                privkey: arg(1),
            },
            Operation::RevokeIdentity => Self::RevokeIdentity {
                target: key(0),
                pubkey: key(1),
                privkey: arg(2),
            },
            Operation::SubmitForm => Self::SubmitForm {
                kind: arg(0),
                address: arg(1),
                description: arg(2),
                specfield: arg(3),
                pubkey: key(4),
                privkey: arg(5),
            },
            Operation::FindForm => Self::FindForm {
                form_id: FormId::new(arg(0)),
                pubkey: key(1),
                privkey: arg(2),
            },
            Operation::ResolveForm => Self::ResolveForm {
                form_id: FormId::new(arg(0)),
                pubkey: key(1),
                privkey: arg(2),
            },
            Operation::SearchForms => Self::SearchForms {
                kind: arg(0),
                address: arg(1),
                specfield: arg(2),
                status: StatusFilter::parse(&args[3]).ok_or_else(|| CodecError::InvalidValue {
                    tag: "status".to_string(),
                    value: arg(3),
                })?,
                pubkey: key(4),
                privkey: arg(5),
            },
        };
        Ok(command)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("operation", &self.operation())
            .finish_non_exhaustive()
    }
}

/// Response re-emitted by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandResponse {
    /// Keys of a newly created identity, returned exactly once.
    Keys {
        public_key: PublicKeyId,
        private_key: String,
    },
    /// Identity command completed.
    Done { message: String },
    /// Form committed.
    Committed { form_id: FormId, log: String },
    /// A single form.
    Form { form: Form },
    /// Search results; empty means no matches.
    Forms { forms: Vec<Form> },
    /// Resolve outcome; `changed == false` when already resolved.
    Resolved { form_id: FormId, changed: bool },
    /// Any failure.
    Error { code: ResultCode, message: String },
}

impl CommandResponse {
    #[must_use]
    pub fn from_error(error: &PipelineError) -> Self {
        Self::Error {
            code: error.code(),
            message: error.to_string(),
        }
    }

    #[must_use]
    pub fn code(&self) -> ResultCode {
        match self {
            Self::Error { code, .. } => *code,
            _ => ResultCode::Ok,
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code().is_ok()
    }

    /// JSON rendering for the transport.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
