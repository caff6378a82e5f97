//! Command handler for one role's endpoint.
//!
//! Turns a parsed [`Command`] into a pipeline call and the outcome into a
//! [`CommandResponse`]. Nothing escapes as a panic or a bare error.

use crate::domain::errors::PipelineError;
use crate::ipc::payloads::{Command, CommandResponse};
use crate::ports::inbound::{FormPipelineApi, Resolution};
use shared_types::{FormId, LookupFields, SearchFields, SubmitFields};
use std::sync::Arc;
use tracing::{debug, warn};

/// Dispatches commands to a pipeline.
pub struct CommandHandler<P: FormPipelineApi + ?Sized> {
    pipeline: Arc<P>,
}

impl<P: FormPipelineApi + ?Sized> Clone for CommandHandler<P> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

impl<P: FormPipelineApi + ?Sized> CommandHandler<P> {
    pub fn new(pipeline: Arc<P>) -> Self {
        Self { pipeline }
    }

    /// Parse and handle a named command with positional arguments.
    pub async fn handle_args(&self, name: &str, args: &[String]) -> CommandResponse {
        match Command::parse(name, args) {
            Ok(command) => self.handle(command).await,
            Err(e) => {
                warn!(command = name, error = %e, "Command rejected by parser");
                CommandResponse::from_error(&e)
            }
        }
    }

    /// Handle a parsed command.
    pub async fn handle(&self, command: Command) -> CommandResponse {
        let operation = command.operation();
        match self.dispatch(command).await {
            Ok(response) => {
                debug!(operation = %operation, role = self.pipeline.role_name(), "Command handled");
                response
            }
            Err(e) => {
                warn!(
                    operation = %operation,
                    role = self.pipeline.role_name(),
                    code = %e.code(),
                    error = %e,
                    "Command failed"
                );
                CommandResponse::from_error(&e)
            }
        }
    }

    async fn dispatch(&self, command: Command) -> Result<CommandResponse, PipelineError> {
        let pipeline = &self.pipeline;
        let response = match command {
            Command::CreateAccount { passphrase } => {
                let keys = pipeline.create_account(&passphrase).await?;
                CommandResponse::Keys {
                    public_key: keys.public_key_id,
                    private_key: keys.private_key_hex.as_str().to_owned(),
                }
            }
            Command::CreateAdmin {
                passphrase,
                pubkey,
                privkey,
            } => {
                let keys = pipeline.create_admin(&passphrase, &pubkey, &privkey).await?;
                CommandResponse::Keys {
                    public_key: keys.public_key_id,
                    private_key: keys.private_key_hex.as_str().to_owned(),
                }
            }
            Command::RemoveAccount { pubkey, privkey } => {
                pipeline.remove_account(&pubkey, &privkey).await?;
                CommandResponse::Done {
                    message: format!("Identity {pubkey} removed"),
                }
            }
            Command::RemoveAdmin { pubkey, privkey } => {
                pipeline.remove_admin(&pubkey, &privkey).await?;
                CommandResponse::Done {
                    message: format!("Admin {pubkey} removed"),
                }
            }
            Command::RevokeIdentity {
                target,
                pubkey,
                privkey,
            } => {
                pipeline.revoke_identity(&target, &pubkey, &privkey).await?;
                CommandResponse::Done {
                    message: format!("Identity {target} revoked"),
                }
            }
            Command::SubmitForm {
                kind,
                address,
                description,
                specfield,
                pubkey,
                privkey,
            } => {
                let result = pipeline
                    .submit(SubmitFields {
                        kind,
                        address,
                        description,
                        spec_field: specfield,
                        public_key: pubkey,
                        secret: privkey,
                    })
                    .await?;
                if !result.is_ok() {
                    return Err(PipelineError::CommitRejected {
                        code: result.code,
                        log: result.log,
                    });
                }
                CommandResponse::Committed {
                    form_id: FormId::new(result.data_str().unwrap_or_default()),
                    log: result.log,
                }
            }
            Command::FindForm {
                form_id,
                pubkey,
                privkey,
            } => {
                let form = pipeline
                    .find(LookupFields {
                        form_id,
                        public_key: pubkey,
                        secret: privkey,
                    })
                    .await?;
                CommandResponse::Form { form }
            }
            Command::ResolveForm {
                form_id,
                pubkey,
                privkey,
            } => {
                let resolution = pipeline
                    .resolve(LookupFields {
                        form_id: form_id.clone(),
                        public_key: pubkey,
                        secret: privkey,
                    })
                    .await?;
                CommandResponse::Resolved {
                    form_id,
                    changed: resolution == Resolution::Resolved,
                }
            }
            Command::SearchForms {
                kind,
                address,
                specfield,
                status,
                pubkey,
                privkey,
            } => {
                let fields = SearchFields::new(&kind, &address, &specfield, pubkey, privkey);
                let forms = pipeline.search(fields, status).await?;
                CommandResponse::Forms { forms }
            }
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryFormCache, InMemoryLedger};
    use crate::domain::role::{AccountRole, AdminRole};
    use crate::service::FormPipeline;
    use cr_01_identity_registry::{BusPeerNetwork, Ed25519KeyDeriver, IdentityRegistry};
    use shared_bus::{EventPublisher, InMemoryEventBus};
    use shared_types::{FormStatus, PublicKeyId, ResultCode};

    type Pipeline<R> = FormPipeline<R, InMemoryLedger<InMemoryFormCache>, InMemoryFormCache>;

    fn pipelines() -> (Pipeline<AccountRole>, Pipeline<AdminRole>) {
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new());
        let cache = Arc::new(InMemoryFormCache::new());
        let account: Pipeline<AccountRole> = FormPipeline::new(
            Arc::new(IdentityRegistry::new()),
            Arc::new(BusPeerNetwork::new(bus)),
            Arc::new(Ed25519KeyDeriver::new()),
            Arc::new(InMemoryLedger::new(Arc::clone(&cache))),
            cache,
        );
        let admin = account.for_role::<AdminRole>();
        (account, admin)
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    async fn create(handler: &CommandHandler<impl FormPipelineApi>, passphrase: &str) -> String {
        match handler.handle_args("create-account", &args(&[passphrase])).await {
            CommandResponse::Keys { public_key, .. } => public_key.as_str().to_string(),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_then_find_over_the_ledger() {
        let (account, _) = pipelines();
        let handler = CommandHandler::new(Arc::new(account));
        let p = create(&handler, "abc").await;

        let response = handler
            .handle_args(
                "submit-form",
                &args(&["pothole", "1 Main St", "hole", "large", &p, "abc"]),
            )
            .await;
        let form_id = match response {
            CommandResponse::Committed { form_id, .. } => form_id,
            other => panic!("unexpected {other:?}"),
        };

        let response = handler
            .handle_args("find-form", &args(&[form_id.as_str(), &p, "abc"]))
            .await;
        match response {
            CommandResponse::Form { form } => {
                assert_eq!(form.spec_field, "large");
                assert_eq!(form.submitter, PublicKeyId::new(p));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_search_is_not_an_error() {
        let (account, _) = pipelines();
        let handler = CommandHandler::new(Arc::new(account));
        let p = create(&handler, "abc").await;

        let response = handler
            .handle_args("search-forms", &args(&["graffiti", "", "", "any", &p, "abc"]))
            .await;
        assert_eq!(response, CommandResponse::Forms { forms: Vec::new() });

        let response = handler
            .handle_args("search-forms", &args(&["graffiti", "", "", "any", &p, "bad"]))
            .await;
        assert_eq!(response.code(), ResultCode::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_account_endpoint_refuses_resolve() {
        let (account, _) = pipelines();
        let handler = CommandHandler::new(Arc::new(account));
        let p = create(&handler, "abc").await;

        let response = handler
            .handle_args("resolve-form", &args(&["F1", &p, "abc"]))
            .await;
        assert_eq!(response.code(), ResultCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_admin_resolve_flow() {
        let (account, admin) = pipelines();
        let keys = admin.bootstrap_admin("root").await.unwrap();
        let root = keys.public_key_id.as_str().to_string();
        let account = CommandHandler::new(Arc::new(account));
        let admin = CommandHandler::new(Arc::new(admin));

        let p = create(&account, "abc").await;
        let form_id = match account
            .handle_args(
                "submit-form",
                &args(&["graffiti", "9 Elm St", "tag", "wall", &p, "abc"]),
            )
            .await
        {
            CommandResponse::Committed { form_id, .. } => form_id,
            other => panic!("unexpected {other:?}"),
        };

        for expected in [true, false] {
            let response = admin
                .handle_args("resolve-form", &args(&[form_id.as_str(), &root, "root"]))
                .await;
            assert_eq!(
                response,
                CommandResponse::Resolved {
                    form_id: form_id.clone(),
                    changed: expected
                }
            );
        }

        let response = account
            .handle_args("search-forms", &args(&["", "", "", "resolved", &p, "abc"]))
            .await;
        match response {
            CommandResponse::Forms { forms } => {
                assert_eq!(forms.len(), 1);
                assert_eq!(forms[0].status, FormStatus::Resolved);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_commit_rejection_surfaces_engine_code() {
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new());
        let cache = Arc::new(InMemoryFormCache::new());
        let pipeline: Pipeline<AccountRole> = FormPipeline::new(
            Arc::new(IdentityRegistry::new()),
            Arc::new(BusPeerNetwork::new(bus)),
            Arc::new(Ed25519KeyDeriver::new()),
            Arc::new(InMemoryLedger::with_max_tx_bytes(Arc::clone(&cache), 8)),
            cache,
        );
        let handler = CommandHandler::new(Arc::new(pipeline));
        let p = create(&handler, "abc").await;

        let response = handler
            .handle_args(
                "submit-form",
                &args(&["pothole", "1 Main St", "hole", "", &p, "abc"]),
            )
            .await;
        assert_eq!(response.code(), ResultCode::EncodingError);
    }

    #[tokio::test]
    async fn test_dyn_pipeline_handler() {
        let (account, _) = pipelines();
        let pipeline: Arc<dyn FormPipelineApi> = Arc::new(account);
        let handler = CommandHandler::new(pipeline);

        let response = handler.handle_args("create-account", &args(&[""])).await;
        assert_eq!(response.code(), ResultCode::MalformedPayload);
    }
}
