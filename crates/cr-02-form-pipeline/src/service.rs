//! # Form Pipeline Service
//!
//! Application service implementing [`FormPipelineApi`] for one role.
//!
//! ## Submission Flow
//!
//! ```text
//! SubmitFields ──encode──→ payload ──read pubkey/privkey──→ authenticate
//!                                                              │
//!        ┌──────── auth failure: return error, nothing else ───┤
//!        │                                                     ▼
//!        │                                    strip privkey → body
//!        │                                                     │
//!        │                                         CommitEngine::append
//!        │                                                     │
//!        │                 not ok: return result unchanged ────┤
//!        │                                                     ▼
//!        │                      peer active? broadcast(general [, dept])
//!        │                                                     │
//!        └───────────────────────────────→ return commit result unchanged
//! ```
//!
//! The registry is consulted through `Authenticator`, which hands back a
//! snapshot after releasing the registry guard, so commit and broadcast
//! latency never blocks unrelated registry operations.

use crate::domain::errors::PipelineError;
use crate::domain::role::{AdminRole, Operation, Role};
use crate::ports::inbound::{FormPipelineApi, Resolution};
use crate::ports::outbound::{CommitEngine, FormCache};
use async_trait::async_trait;
use cr_01_identity_registry::{
    AuthSecret, Authenticator, DerivedKeys, Identity, IdentityRegistry, KeyDeriver, PeerNetwork,
};
use shared_bus::ChannelId;
use shared_types::codec::{read_public_key, read_secret, strip_secret};
use shared_types::{
    CommitResult, Form, LookupFields, Privilege, PublicKeyId, SearchFields, ServiceKind,
    StatusFilter, SubmitFields,
};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Role-parameterised form pipeline.
///
/// `R` fixes the command set and form visibility; everything else is shared,
/// so an account pipeline and an admin pipeline over the same collaborators
/// observe the same registry, ledger and cache.
pub struct FormPipeline<R: Role, C: CommitEngine, F: FormCache> {
    authenticator: Authenticator,
    network: Arc<dyn PeerNetwork>,
    keys: Arc<dyn KeyDeriver>,
    commit: Arc<C>,
    cache: Arc<F>,
    _role: PhantomData<R>,
}

impl<R: Role, C: CommitEngine, F: FormCache> FormPipeline<R, C, F> {
    pub fn new(
        registry: Arc<IdentityRegistry>,
        network: Arc<dyn PeerNetwork>,
        keys: Arc<dyn KeyDeriver>,
        commit: Arc<C>,
        cache: Arc<F>,
    ) -> Self {
        Self {
            authenticator: Authenticator::new(registry),
            network,
            keys,
            commit,
            cache,
            _role: PhantomData,
        }
    }

    /// A pipeline for another role over the same collaborators.
    #[must_use]
    pub fn for_role<S: Role>(&self) -> FormPipeline<S, C, F> {
        FormPipeline {
            authenticator: self.authenticator.clone(),
            network: Arc::clone(&self.network),
            keys: Arc::clone(&self.keys),
            commit: Arc::clone(&self.commit),
            cache: Arc::clone(&self.cache),
            _role: PhantomData,
        }
    }

    pub fn registry(&self) -> &Arc<IdentityRegistry> {
        self.authenticator.registry()
    }

    fn authorize(&self, operation: Operation) -> Result<(), PipelineError> {
        if R::permits(operation) {
            Ok(())
        } else {
            warn!(operation = %operation, role = R::NAME, "Operation refused for role");
            Err(PipelineError::OperationNotPermitted {
                operation,
                role: R::NAME,
            })
        }
    }

    async fn authenticate(&self, id: &PublicKeyId, secret: &str) -> Result<Identity, PipelineError> {
        self.authenticator
            .authenticate(id, secret)
            .await
            .map_err(|e| {
                warn!(public_key = %id.short(), error = %e, "Authentication failed");
                PipelineError::from(e)
            })
    }

    fn require_admin(identity: &Identity) -> Result<(), PipelineError> {
        if identity.is_admin() {
            Ok(())
        } else {
            warn!(public_key = %identity.public_key_id().short(), "Admin privilege required");
            Err(PipelineError::Unauthorized(identity.public_key_id().clone()))
        }
    }

    /// Derive keys and register the identity, starting its peer under the
    /// registry guard. No peer is started when registration fails.
    async fn register(
        &self,
        passphrase: &str,
        privilege: Privilege,
    ) -> Result<DerivedKeys, PipelineError> {
        let keys = self.keys.derive(passphrase)?;
        let id = &keys.public_key_id;
        self.registry()
            .add_with(id, || {
                let peer = self.network.start_peer(id);
                Identity::new(id.clone(), privilege, AuthSecret::new(passphrase), &peer)
            })
            .await?;

        info!(public_key = %id, privilege = %privilege, "Identity registered");
        Ok(keys)
    }

    /// Removal hook: stops the peer of an identity leaving the registry.
    fn stop_peer_of(&self, identity: &Identity) {
        if !self.network.stop_peer(identity.public_key_id()) {
            debug!(public_key = %identity.public_key_id().short(), "No running peer to stop");
        }
    }

    fn visible_to(form: &Form, caller: &PublicKeyId) -> bool {
        !R::own_forms_only() || form.submitter == *caller
    }

    /// Best-effort broadcast of a committed body. Failures are logged only.
    async fn broadcast(&self, identity: &Identity, body: &str, aux: Option<ChannelId>) {
        let Some(peer) = identity.peer().filter(|peer| peer.is_active()) else {
            debug!(
                public_key = %identity.public_key_id().short(),
                "Peer inactive, broadcast skipped"
            );
            return;
        };

        let mut channels = vec![ChannelId::GENERAL];
        if let Some(aux) = aux.filter(|channel| !channel.is_general()) {
            channels.push(aux);
        }

        for channel in channels {
            match peer.broadcast(channel, body).await {
                Ok(receivers) => debug!(channel = %channel, receivers, "Body broadcast"),
                Err(e) => warn!(channel = %channel, error = %e, "Broadcast failed"),
            }
        }
    }
}

impl<C: CommitEngine, F: FormCache> FormPipeline<AdminRole, C, F> {
    /// Register an admin without acting credentials. Startup use only: the
    /// registry begins empty, so the first admin cannot be created by
    /// another.
    pub async fn bootstrap_admin(&self, passphrase: &str) -> Result<DerivedKeys, PipelineError> {
        self.register(passphrase, Privilege::Admin).await
    }
}

/// Auxiliary broadcast channel for a form kind: its department's channel.
fn department_channel(kind: &str) -> Option<ChannelId> {
    ServiceKind::department_for(kind).map(ChannelId::from)
}

#[async_trait]
impl<R: Role, C: CommitEngine, F: FormCache> FormPipelineApi for FormPipeline<R, C, F> {
    fn role_name(&self) -> &'static str {
        R::NAME
    }

    async fn create_account(&self, passphrase: &str) -> Result<DerivedKeys, PipelineError> {
        self.authorize(Operation::CreateAccount)?;
        self.register(passphrase, Privilege::Account).await
    }

    async fn create_admin(
        &self,
        passphrase: &str,
        acting: &PublicKeyId,
        secret: &str,
    ) -> Result<DerivedKeys, PipelineError> {
        self.authorize(Operation::CreateAdmin)?;
        let actor = self.authenticate(acting, secret).await?;
        Self::require_admin(&actor)?;
        self.register(passphrase, Privilege::Admin).await
    }

    async fn remove_account(&self, id: &PublicKeyId, secret: &str) -> Result<(), PipelineError> {
        self.authorize(Operation::RemoveAccount)?;
        self.registry()
            .remove_with(id, secret, |removed| self.stop_peer_of(removed))
            .await?;
        info!(public_key = %id, "Identity removed");
        Ok(())
    }

    async fn remove_admin(&self, id: &PublicKeyId, secret: &str) -> Result<(), PipelineError> {
        self.authorize(Operation::RemoveAdmin)?;
        let identity = self.authenticate(id, secret).await?;
        Self::require_admin(&identity)?;
        self.registry()
            .remove_with(id, secret, |removed| self.stop_peer_of(removed))
            .await?;
        info!(public_key = %id, "Admin removed");
        Ok(())
    }

    async fn revoke_identity(
        &self,
        target: &PublicKeyId,
        acting: &PublicKeyId,
        secret: &str,
    ) -> Result<(), PipelineError> {
        self.authorize(Operation::RevokeIdentity)?;
        let actor = self.authenticate(acting, secret).await?;
        Self::require_admin(&actor)?;
        self.registry()
            .revoke_with(target, |revoked| self.stop_peer_of(revoked))
            .await?;
        info!(public_key = %target, revoked_by = %acting.short(), "Identity revoked");
        Ok(())
    }

    async fn submit(&self, fields: SubmitFields) -> Result<CommitResult, PipelineError> {
        self.authorize(Operation::SubmitForm)?;
        let aux = department_channel(&fields.kind);

        let payload = fields.encode();
        let public_key = read_public_key(&payload)?;
        let secret = read_secret(&payload)?;
        let identity = self.authenticate(&public_key, &secret).await?;

        let body = strip_secret(&payload);
        let result = self.commit.append(body.as_bytes()).await;
        if !result.is_ok() {
            warn!(code = %result.code, log = %result.log, "Commit rejected");
            return Ok(result);
        }

        info!(
            public_key = %public_key.short(),
            form_id = result.data_str().unwrap_or_default(),
            "Form committed"
        );
        self.broadcast(&identity, &body, aux).await;
        Ok(result)
    }

    async fn find(&self, fields: LookupFields) -> Result<Form, PipelineError> {
        self.authorize(Operation::FindForm)?;
        let identity = self.authenticate(&fields.public_key, &fields.secret).await?;

        self.cache
            .find_by_id(&fields.form_id)
            .filter(|form| Self::visible_to(form, identity.public_key_id()))
            .ok_or(PipelineError::FormNotFound(fields.form_id))
    }

    async fn search(
        &self,
        fields: SearchFields,
        status: StatusFilter,
    ) -> Result<Vec<Form>, PipelineError> {
        self.authorize(Operation::SearchForms)?;
        let identity = self.authenticate(&fields.public_key, &fields.secret).await?;

        let mut criteria = fields.criteria();
        if R::own_forms_only() {
            criteria = criteria.submitted_by(identity.public_key_id().clone());
        }
        let forms = self.cache.search(&criteria, status);
        debug!(matches = forms.len(), status = ?status, "Search complete");
        Ok(forms)
    }

    async fn resolve(&self, fields: LookupFields) -> Result<Resolution, PipelineError> {
        self.authorize(Operation::ResolveForm)?;
        let identity = self.authenticate(&fields.public_key, &fields.secret).await?;
        Self::require_admin(&identity)?;

        if self.cache.find_by_id(&fields.form_id).is_none() {
            return Err(PipelineError::FormNotFound(fields.form_id));
        }
        if self.cache.mark_resolved(&fields.form_id) {
            info!(form_id = %fields.form_id, "Form resolved");
            Ok(Resolution::Resolved)
        } else {
            debug!(form_id = %fields.form_id, "Form already resolved");
            Ok(Resolution::AlreadyResolved)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cache::InMemoryFormCache;
    use crate::domain::role::AccountRole;
    use cr_01_identity_registry::{BroadcastError, Ed25519KeyDeriver, PeerHandle, RegistryError};
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use shared_types::{Department, FormId, FormStatus, ResultCode};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;
    use tokio::sync::{mpsc::UnboundedReceiver, Notify};

    // =========================================================================
    // TEST DOUBLES
    // =========================================================================

    struct RecordingPeer {
        id: PublicKeyId,
        active: AtomicBool,
        sent: Mutex<Vec<(ChannelId, String)>>,
    }

    impl RecordingPeer {
        fn new(id: &PublicKeyId) -> Arc<Self> {
            Arc::new(Self {
                id: id.clone(),
                active: AtomicBool::new(true),
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PeerHandle for RecordingPeer {
        fn public_key_id(&self) -> &PublicKeyId {
            &self.id
        }

        fn is_active(&self) -> bool {
            self.active.load(Ordering::SeqCst)
        }

        async fn broadcast(
            &self,
            channel: ChannelId,
            payload: &str,
        ) -> Result<usize, BroadcastError> {
            self.sent.lock().push((channel, payload.to_string()));
            Ok(1)
        }
    }

    #[derive(Default)]
    struct RecordingNetwork {
        peers: Mutex<HashMap<PublicKeyId, Arc<RecordingPeer>>>,
    }

    impl RecordingNetwork {
        fn peer(&self, id: &PublicKeyId) -> Arc<RecordingPeer> {
            Arc::clone(&self.peers.lock()[id])
        }
    }

    impl PeerNetwork for RecordingNetwork {
        fn start_peer(&self, id: &PublicKeyId) -> Arc<dyn PeerHandle> {
            let mut peers = self.peers.lock();
            let peer: Arc<RecordingPeer> =
                Arc::clone(peers.entry(id.clone()).or_insert_with(|| RecordingPeer::new(id)));
            peer
        }

        fn stop_peer(&self, id: &PublicKeyId) -> bool {
            match self.peers.lock().get(id) {
                Some(peer) => {
                    peer.active.store(false, Ordering::SeqCst);
                    true
                }
                None => false,
            }
        }
    }

    /// Network that evicts stopped peers and parks every `stop_peer` call
    /// until the test releases it.
    struct GatedNetwork {
        peers: Mutex<HashMap<PublicKeyId, Arc<RecordingPeer>>>,
        started: AtomicUsize,
        stopping: tokio::sync::mpsc::UnboundedSender<()>,
        resume: Mutex<mpsc::Receiver<()>>,
    }

    impl GatedNetwork {
        fn new() -> (Arc<Self>, UnboundedReceiver<()>, mpsc::Sender<()>) {
            let (stopping, stopping_rx) = tokio::sync::mpsc::unbounded_channel();
            let (release, resume) = mpsc::channel();
            let network = Arc::new(Self {
                peers: Mutex::new(HashMap::new()),
                started: AtomicUsize::new(0),
                stopping,
                resume: Mutex::new(resume),
            });
            (network, stopping_rx, release)
        }

        fn current(&self, id: &PublicKeyId) -> Option<Arc<RecordingPeer>> {
            self.peers.lock().get(id).cloned()
        }

        fn started(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }

        fn running(&self) -> usize {
            self.peers.lock().len()
        }
    }

    impl PeerNetwork for GatedNetwork {
        fn start_peer(&self, id: &PublicKeyId) -> Arc<dyn PeerHandle> {
            let mut peers = self.peers.lock();
            let peer: Arc<RecordingPeer> = Arc::clone(peers.entry(id.clone()).or_insert_with(|| {
                self.started.fetch_add(1, Ordering::SeqCst);
                RecordingPeer::new(id)
            }));
            peer
        }

        fn stop_peer(&self, id: &PublicKeyId) -> bool {
            let _ = self.stopping.send(());
            let _ = self.resume.lock().recv();
            match self.peers.lock().remove(id) {
                Some(peer) => {
                    peer.active.store(false, Ordering::SeqCst);
                    true
                }
                None => false,
            }
        }
    }

    /// Commit engine returning a fixed result and counting calls.
    struct StubEngine {
        result: CommitResult,
        calls: AtomicUsize,
        bodies: Mutex<Vec<String>>,
    }

    impl StubEngine {
        fn returning(result: CommitResult) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
                bodies: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CommitEngine for StubEngine {
        async fn append(&self, body: &[u8]) -> CommitResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.bodies.lock().push(String::from_utf8_lossy(body).into_owned());
            self.result.clone()
        }
    }

    struct Harness<R: Role, C: CommitEngine> {
        pipeline: FormPipeline<R, C, InMemoryFormCache>,
        network: Arc<RecordingNetwork>,
        engine: Arc<C>,
        cache: Arc<InMemoryFormCache>,
    }

    fn harness_with<R: Role, C: CommitEngine>(engine: C) -> Harness<R, C> {
        let network = Arc::new(RecordingNetwork::default());
        let engine = Arc::new(engine);
        let cache = Arc::new(InMemoryFormCache::new());
        let pipeline = FormPipeline::new(
            Arc::new(IdentityRegistry::new()),
            Arc::clone(&network) as Arc<dyn PeerNetwork>,
            Arc::new(Ed25519KeyDeriver::new()),
            Arc::clone(&engine),
            Arc::clone(&cache),
        );
        Harness {
            pipeline,
            network,
            engine,
            cache,
        }
    }

    fn harness<R: Role>(result: CommitResult) -> Harness<R, StubEngine> {
        harness_with(StubEngine::returning(result))
    }

    fn gated_pipeline(
        registry: IdentityRegistry,
        network: &Arc<GatedNetwork>,
    ) -> Arc<FormPipeline<AccountRole, StubEngine, InMemoryFormCache>> {
        let network: Arc<dyn PeerNetwork> = network.clone();
        Arc::new(FormPipeline::new(
            Arc::new(registry),
            network,
            Arc::new(Ed25519KeyDeriver::new()),
            Arc::new(StubEngine::returning(committed())),
            Arc::new(InMemoryFormCache::new()),
        ))
    }

    fn committed() -> CommitResult {
        CommitResult::ok(b"F1".to_vec(), "committed at height 1")
    }

    fn pothole(public_key: &PublicKeyId, secret: &str) -> SubmitFields {
        SubmitFields {
            kind: "pothole".to_string(),
            address: "1 Main St".to_string(),
            description: "hole".to_string(),
            spec_field: String::new(),
            public_key: public_key.clone(),
            secret: secret.to_string(),
        }
    }

    fn open_form(id: &str, submitter: &PublicKeyId) -> Form {
        Form {
            id: FormId::new(id),
            kind: "pothole".to_string(),
            address: "1 Main St".to_string(),
            description: "hole".to_string(),
            spec_field: "large".to_string(),
            submitter: submitter.clone(),
            status: FormStatus::Open,
            height: 1,
            submitted_at: chrono::Utc::now(),
            resolved_at: None,
        }
    }

    fn lookup(id: &str, public_key: &PublicKeyId, secret: &str) -> LookupFields {
        LookupFields {
            form_id: FormId::new(id),
            public_key: public_key.clone(),
            secret: secret.to_string(),
        }
    }

    // =========================================================================
    // SUBMISSION
    // =========================================================================

    #[tokio::test]
    async fn test_submit_commits_and_broadcasts_without_secret() {
        let h = harness::<AccountRole>(committed());
        let p = h.pipeline.create_account("abc").await.unwrap().public_key_id;

        let result = h.pipeline.submit(pothole(&p, "abc")).await.unwrap();
        assert_eq!(result, committed());

        let sent = h.network.peer(&p).sent.lock().clone();
        let general: Vec<&String> = sent
            .iter()
            .filter(|(ch, _)| *ch == ChannelId::GENERAL)
            .map(|(_, body)| body)
            .collect();
        assert_eq!(general.len(), 1);
        assert!(!general[0].contains("abc"));
        assert!(!general[0].contains("privkey"));
        assert!(general[0].contains("<type>pothole</type>"));

        let committed_body = &h.engine.bodies.lock()[0];
        assert_eq!(committed_body, general[0]);
    }

    #[tokio::test]
    async fn test_submit_fans_out_to_department_channel() {
        let h = harness::<AccountRole>(committed());
        let p = h.pipeline.create_account("abc").await.unwrap().public_key_id;

        h.pipeline.submit(pothole(&p, "abc")).await.unwrap();

        let channels: Vec<ChannelId> =
            h.network.peer(&p).sent.lock().iter().map(|(ch, _)| *ch).collect();
        assert_eq!(channels, vec![ChannelId::GENERAL, Department::Streets.into()]);
    }

    #[tokio::test]
    async fn test_unknown_kind_broadcasts_on_general_only() {
        let h = harness::<AccountRole>(committed());
        let p = h.pipeline.create_account("abc").await.unwrap().public_key_id;
        let mut fields = pothole(&p, "abc");
        fields.kind = "noise complaint".to_string();

        h.pipeline.submit(fields).await.unwrap();

        let channels: Vec<ChannelId> =
            h.network.peer(&p).sent.lock().iter().map(|(ch, _)| *ch).collect();
        assert_eq!(channels, vec![ChannelId::GENERAL]);
    }

    #[tokio::test]
    async fn test_failed_authentication_never_commits() {
        let h = harness::<AccountRole>(committed());
        let p = h.pipeline.create_account("abc").await.unwrap().public_key_id;

        let err = h.pipeline.submit(pothole(&p, "wrong")).await.unwrap_err();
        assert_eq!(err.code(), ResultCode::InvalidCredentials);

        let stranger = PublicKeyId::new("cd".repeat(32));
        let err = h.pipeline.submit(pothole(&stranger, "abc")).await.unwrap_err();
        assert_eq!(err.code(), ResultCode::IdentityNotFound);

        assert_eq!(h.engine.calls(), 0);
        assert!(h.network.peer(&p).sent.lock().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_failed_authentication_never_appends(
            secret in "[ -~]{0,24}",
            foreign_key in any::<bool>(),
        ) {
            prop_assume!(secret != "abc");
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (outcome, appends, sent) = rt.block_on(async {
                let h = harness::<AccountRole>(committed());
                let p = h.pipeline.create_account("abc").await.unwrap().public_key_id;
                let submitter = if foreign_key { PublicKeyId::new("cd".repeat(32)) } else { p.clone() };
                let outcome = h.pipeline.submit(pothole(&submitter, &secret)).await;
                let sent = h.network.peer(&p).sent.lock().len();
                (outcome, h.engine.calls(), sent)
            });
            prop_assert!(outcome.is_err());
            prop_assert_eq!(appends, 0);
            prop_assert_eq!(sent, 0);
        }
    }

    #[tokio::test]
    async fn test_rejected_commit_never_broadcasts() {
        let rejection = CommitResult::error(ResultCode::EncodingError, "bad body");
        let h = harness::<AccountRole>(rejection.clone());
        let p = h.pipeline.create_account("abc").await.unwrap().public_key_id;

        let result = h.pipeline.submit(pothole(&p, "abc")).await.unwrap();
        assert_eq!(result, rejection);
        assert_eq!(h.engine.calls(), 1);
        assert!(h.network.peer(&p).sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_peer_skips_broadcast_but_keeps_result() {
        let h = harness::<AccountRole>(committed());
        let p = h.pipeline.create_account("abc").await.unwrap().public_key_id;
        h.network.peer(&p).active.store(false, Ordering::SeqCst);

        let result = h.pipeline.submit(pothole(&p, "abc")).await.unwrap();
        assert_eq!(result, committed());
        assert!(h.network.peer(&p).sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_failure_does_not_downgrade_commit() {
        struct FailingPeer(PublicKeyId);

        #[async_trait]
        impl PeerHandle for FailingPeer {
            fn public_key_id(&self) -> &PublicKeyId {
                &self.0
            }
            fn is_active(&self) -> bool {
                true
            }
            async fn broadcast(&self, _: ChannelId, _: &str) -> Result<usize, BroadcastError> {
                Err(BroadcastError::Transport("link down".to_string()))
            }
        }

        struct FailingNetwork(Mutex<Vec<Arc<dyn PeerHandle>>>);

        impl PeerNetwork for FailingNetwork {
            fn start_peer(&self, id: &PublicKeyId) -> Arc<dyn PeerHandle> {
                let peer: Arc<dyn PeerHandle> = Arc::new(FailingPeer(id.clone()));
                self.0.lock().push(Arc::clone(&peer));
                peer
            }
            fn stop_peer(&self, _: &PublicKeyId) -> bool {
                false
            }
        }

        let pipeline: FormPipeline<AccountRole, _, _> = FormPipeline::new(
            Arc::new(IdentityRegistry::new()),
            Arc::new(FailingNetwork(Mutex::new(Vec::new()))),
            Arc::new(Ed25519KeyDeriver::new()),
            Arc::new(StubEngine::returning(committed())),
            Arc::new(InMemoryFormCache::new()),
        );
        let p = pipeline.create_account("abc").await.unwrap().public_key_id;

        assert_eq!(pipeline.submit(pothole(&p, "abc")).await.unwrap(), committed());
    }

    #[tokio::test]
    async fn test_registry_not_held_across_commit() {
        struct GatedEngine {
            entered: Notify,
            release: Notify,
        }

        #[async_trait]
        impl CommitEngine for GatedEngine {
            async fn append(&self, _body: &[u8]) -> CommitResult {
                self.entered.notify_one();
                self.release.notified().await;
                CommitResult::ok(b"F1".to_vec(), "ok")
            }
        }

        let h = harness_with::<AccountRole, _>(GatedEngine {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let p = h.pipeline.create_account("abc").await.unwrap().public_key_id;
        let pipeline = Arc::new(h.pipeline);

        let submitting = {
            let pipeline = Arc::clone(&pipeline);
            let p = p.clone();
            tokio::spawn(async move { pipeline.submit(pothole(&p, "abc")).await })
        };
        h.engine.entered.notified().await;

        // Commit is in flight; registry operations must still go through.
        let len = tokio::time::timeout(Duration::from_millis(200), pipeline.registry().len())
            .await
            .expect("registry blocked by in-flight commit")
            .unwrap();
        assert_eq!(len, 1);

        h.engine.release.notify_one();
        assert!(submitting.await.unwrap().unwrap().is_ok());
    }

    // =========================================================================
    // IDENTITY COMMANDS
    // =========================================================================

    #[tokio::test]
    async fn test_create_account_returns_keys() {
        let h = harness::<AccountRole>(committed());
        let keys = h.pipeline.create_account("abc").await.unwrap();

        assert_eq!(keys.public_key_id.as_str().len(), 64);
        assert!(h.pipeline.registry().contains(&keys.public_key_id).await.unwrap());
        assert!(h.network.peer(&keys.public_key_id).is_active());
    }

    #[tokio::test]
    async fn test_duplicate_account() {
        let h = harness::<AccountRole>(committed());
        h.pipeline.create_account("abc").await.unwrap();
        let err = h.pipeline.create_account("abc").await.unwrap_err();
        assert_eq!(err.code(), ResultCode::DuplicateIdentity);
    }

    #[tokio::test]
    async fn test_remove_account_wrong_secret_leaves_registry_unchanged() {
        let h = harness::<AccountRole>(committed());
        let p = h.pipeline.create_account("abc").await.unwrap().public_key_id;

        let err = h.pipeline.remove_account(&p, "wrong").await.unwrap_err();
        assert_eq!(
            err,
            PipelineError::Registry(RegistryError::InvalidCredentials(p.clone()))
        );
        assert!(h.pipeline.registry().contains(&p).await.unwrap());
        assert!(h.network.peer(&p).is_active());
    }

    #[tokio::test]
    async fn test_remove_account_stops_peer() {
        let h = harness::<AccountRole>(committed());
        let p = h.pipeline.create_account("abc").await.unwrap().public_key_id;

        h.pipeline.remove_account(&p, "abc").await.unwrap();
        assert!(!h.pipeline.registry().contains(&p).await.unwrap());
        assert!(!h.network.peer(&p).is_active());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_recreate_during_removal_gets_live_peer() {
        let (network, mut stopping, release) = GatedNetwork::new();
        let pipeline = gated_pipeline(IdentityRegistry::new(), &network);
        let p = pipeline.create_account("abc").await.unwrap().public_key_id;

        let removing = {
            let pipeline = Arc::clone(&pipeline);
            let p = p.clone();
            tokio::spawn(async move { pipeline.remove_account(&p, "abc").await })
        };
        stopping.recv().await.expect("removal reaches peer stop");

        let recreating = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.create_account("abc").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!recreating.is_finished(), "re-registration overtook removal");

        release.send(()).unwrap();
        removing.await.unwrap().unwrap();
        assert_eq!(recreating.await.unwrap().unwrap().public_key_id, p);

        assert_eq!(pipeline.submit(pothole(&p, "abc")).await.unwrap(), committed());
        let peer = network.current(&p).expect("re-created identity has a running peer");
        assert!(peer.is_active());
        let channels: Vec<ChannelId> = peer.sent.lock().iter().map(|(ch, _)| *ch).collect();
        assert_eq!(channels, vec![ChannelId::GENERAL, Department::Streets.into()]);
        assert_eq!(network.started(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failed_registration_starts_no_peer() {
        let (network, mut stopping, release) = GatedNetwork::new();
        let registry = IdentityRegistry::with_acquire_timeout(Some(Duration::from_millis(50)));
        let pipeline = gated_pipeline(registry, &network);
        let p = pipeline.create_account("abc").await.unwrap().public_key_id;

        let err = pipeline.create_account("abc").await.unwrap_err();
        assert_eq!(err.code(), ResultCode::DuplicateIdentity);
        assert_eq!(network.started(), 1);

        // Removal parks in peer stop while it holds the registry.
        let removing = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.remove_account(&p, "abc").await })
        };
        stopping.recv().await.expect("removal reaches peer stop");

        let err = pipeline.create_account("xyz").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Registry(RegistryError::RegistryUnavailable { .. })
        ));
        assert_eq!(network.started(), 1);

        release.send(()).unwrap();
        removing.await.unwrap().unwrap();
        assert_eq!(network.running(), 0);
    }

    #[tokio::test]
    async fn test_account_role_refuses_admin_operations_before_auth() {
        let h = harness::<AccountRole>(committed());
        let p = h.pipeline.create_account("abc").await.unwrap().public_key_id;

        let err = h.pipeline.resolve(lookup("F1", &p, "abc")).await.unwrap_err();
        assert!(matches!(err, PipelineError::OperationNotPermitted { .. }));

        let err = h.pipeline.create_admin("root", &p, "abc").await.unwrap_err();
        assert_eq!(err.code(), ResultCode::Unauthorized);

        let err = h.pipeline.revoke_identity(&p, &p, "abc").await.unwrap_err();
        assert_eq!(err.code(), ResultCode::Unauthorized);

        assert_eq!(h.pipeline.registry().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_admin_requires_admin_actor() {
        let h = harness::<AdminRole>(committed());
        let account = h.pipeline.create_account("abc").await.unwrap().public_key_id;

        let err = h.pipeline.create_admin("root", &account, "abc").await.unwrap_err();
        assert_eq!(err, PipelineError::Unauthorized(account));

        let admin = h.pipeline.bootstrap_admin("boot").await.unwrap().public_key_id;
        let created = h.pipeline.create_admin("root", &admin, "boot").await.unwrap();
        let stored = h
            .pipeline
            .registry()
            .lookup(&created.public_key_id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_admin());
    }

    #[tokio::test]
    async fn test_remove_admin_rejects_plain_account() {
        let h = harness::<AdminRole>(committed());
        let account = h.pipeline.create_account("abc").await.unwrap().public_key_id;

        let err = h.pipeline.remove_admin(&account, "abc").await.unwrap_err();
        assert_eq!(err.code(), ResultCode::Unauthorized);
        assert!(h.pipeline.registry().contains(&account).await.unwrap());

        let admin = h.pipeline.bootstrap_admin("boot").await.unwrap().public_key_id;
        h.pipeline.remove_admin(&admin, "boot").await.unwrap();
        assert!(!h.pipeline.registry().contains(&admin).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_identity() {
        let h = harness::<AdminRole>(committed());
        let admin = h.pipeline.bootstrap_admin("boot").await.unwrap().public_key_id;
        let account = h.pipeline.create_account("abc").await.unwrap().public_key_id;

        h.pipeline.revoke_identity(&account, &admin, "boot").await.unwrap();
        assert!(!h.pipeline.registry().contains(&account).await.unwrap());
        assert!(!h.network.peer(&account).is_active());

        let err = h
            .pipeline
            .revoke_identity(&account, &admin, "boot")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ResultCode::IdentityNotFound);
    }

    // =========================================================================
    // QUERY / SEARCH / RESOLVE
    // =========================================================================

    #[tokio::test]
    async fn test_account_find_scoped_to_own_forms() {
        let h = harness::<AccountRole>(committed());
        let alice = h.pipeline.create_account("alice").await.unwrap().public_key_id;
        let bob = h.pipeline.create_account("bob").await.unwrap().public_key_id;
        h.cache.insert(open_form("F1", &alice));

        assert!(h.pipeline.find(lookup("F1", &alice, "alice")).await.is_ok());
        let err = h.pipeline.find(lookup("F1", &bob, "bob")).await.unwrap_err();
        assert_eq!(err, PipelineError::FormNotFound(FormId::new("F1")));

        let admin_view = h.pipeline.for_role::<AdminRole>();
        assert!(admin_view.find(lookup("F1", &bob, "bob")).await.is_ok());
    }

    #[tokio::test]
    async fn test_find_unknown_form() {
        let h = harness::<AdminRole>(committed());
        let p = h.pipeline.create_account("abc").await.unwrap().public_key_id;
        let err = h.pipeline.find(lookup("nope", &p, "abc")).await.unwrap_err();
        assert_eq!(err.code(), ResultCode::FormNotFound);
    }

    #[tokio::test]
    async fn test_search_scoping_and_empty_result() {
        let h = harness::<AccountRole>(committed());
        let alice = h.pipeline.create_account("alice").await.unwrap().public_key_id;
        let bob = h.pipeline.create_account("bob").await.unwrap().public_key_id;
        h.cache.insert(open_form("F1", &alice));

        let mine = h
            .pipeline
            .search(SearchFields::new("pothole", "", "", alice.clone(), "alice"), StatusFilter::Any)
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);

        let theirs = h
            .pipeline
            .search(SearchFields::new("pothole", "", "", bob.clone(), "bob"), StatusFilter::Any)
            .await
            .unwrap();
        assert!(theirs.is_empty());

        let err = h
            .pipeline
            .search(SearchFields::new("", "", "", bob, "nope"), StatusFilter::Any)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ResultCode::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_resolve_twice_is_noop_success() {
        let h = harness::<AdminRole>(committed());
        let admin = h.pipeline.bootstrap_admin("boot").await.unwrap().public_key_id;
        h.cache.insert(open_form("F1", &admin));

        assert_eq!(
            h.pipeline.resolve(lookup("F1", &admin, "boot")).await.unwrap(),
            Resolution::Resolved
        );
        assert_eq!(
            h.pipeline.resolve(lookup("F1", &admin, "boot")).await.unwrap(),
            Resolution::AlreadyResolved
        );
        assert_eq!(
            h.cache.find_by_id(&FormId::new("F1")).unwrap().status,
            FormStatus::Resolved
        );
    }

    #[tokio::test]
    async fn test_resolve_requires_admin_identity_and_known_form() {
        let h = harness::<AdminRole>(committed());
        let account = h.pipeline.create_account("abc").await.unwrap().public_key_id;
        let admin = h.pipeline.bootstrap_admin("boot").await.unwrap().public_key_id;
        h.cache.insert(open_form("F1", &account));

        let err = h.pipeline.resolve(lookup("F1", &account, "abc")).await.unwrap_err();
        assert_eq!(err.code(), ResultCode::Unauthorized);

        let err = h.pipeline.resolve(lookup("F9", &admin, "boot")).await.unwrap_err();
        assert_eq!(err.code(), ResultCode::FormNotFound);
    }
}
