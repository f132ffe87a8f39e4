//! In-process collaborators.
//!
//! [`MemoryBackend`] implements every service trait against shared in-memory state. The
//! demo binary runs on it, and tests use it as a double: each remote call can be made
//! to fail on demand with [`MemoryBackend::fail`], and counters expose what the core
//! asked of the backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_channel::Receiver;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use shared::{AuthChange, AuthSession, UserProfile};

use crate::core::error::RemoteError;
use crate::core::service::{
    AuthFanout, ChannelHandle, CredentialStore, IdentityProvider, ProcedureService, ProfileCallback,
    ProfileService, Providers, RealtimeProvider,
};

/// Remote call that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    CurrentSession,
    SignOut,
    FetchProfile,
    OpenChannel,
    CloseChannel,
    Procedure,
}

/// Handler backing a registered remote procedure.
pub type ProcedureHandler = Arc<dyn Fn(Value) -> Result<Value, RemoteError> + Send + Sync>;

struct OpenChannel {
    key: String,
    on_update: ProfileCallback,
}

#[derive(Default)]
struct Counters {
    sign_out_calls: AtomicUsize,
    profile_fetches: AtomicUsize,
    channels_opened: AtomicUsize,
    channels_closed: AtomicUsize,
    credential_clears: AtomicUsize,
    procedure_calls: AtomicUsize,
}

struct MemoryState {
    session: Mutex<Option<AuthSession>>,
    profiles: Mutex<HashMap<String, UserProfile>>,
    channels: Mutex<HashMap<u64, OpenChannel>>,
    procedures: Mutex<HashMap<String, ProcedureHandler>>,
    failures: Mutex<HashMap<FailurePoint, RemoteError>>,
    latency: Mutex<Duration>,
    next_channel: AtomicU64,
    auth_changes: AuthFanout,
    counters: Counters,
}

/// Shared in-memory backend; clones share state.
#[derive(Clone)]
pub struct MemoryBackend {
    state: Arc<MemoryState>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MemoryState {
                session: Mutex::new(None),
                profiles: Mutex::new(HashMap::new()),
                channels: Mutex::new(HashMap::new()),
                procedures: Mutex::new(HashMap::new()),
                failures: Mutex::new(HashMap::new()),
                latency: Mutex::new(Duration::ZERO),
                next_channel: AtomicU64::new(1),
                auth_changes: AuthFanout::new(),
                counters: Counters::default(),
            }),
        }
    }

    /// Bundle this backend as the collaborators of an [`crate::app::App`].
    pub fn providers(&self) -> Providers {
        let backend = Arc::new(self.clone());
        Providers {
            identity: backend.clone(),
            profiles: backend.clone(),
            realtime: backend.clone(),
            credentials: backend.clone(),
            procedures: backend,
        }
    }

    /// Replace the session the identity provider reports as persisted.
    pub fn set_session(&self, session: Option<AuthSession>) {
        *self.state.session.lock() = session;
    }

    pub fn insert_profile(&self, profile: UserProfile) {
        self.state.profiles.lock().insert(profile.id.clone(), profile);
    }

    /// Register a remote procedure.
    pub fn register_procedure<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Result<Value, RemoteError> + Send + Sync + 'static,
    {
        self.state
            .procedures
            .lock()
            .insert(name.into(), Arc::new(handler));
    }

    /// Make every call at `point` fail with `error` until [`MemoryBackend::recover`].
    pub fn fail(&self, point: FailurePoint, error: RemoteError) {
        self.state.failures.lock().insert(point, error);
    }

    pub fn recover(&self, point: FailurePoint) {
        self.state.failures.lock().remove(&point);
    }

    /// Artificial latency applied to procedure calls.
    pub fn set_latency(&self, latency: Duration) {
        *self.state.latency.lock() = latency;
    }

    /// Push an auth-change notification to current subscribers. Returns how many
    /// received it; nothing is kept for later subscribers.
    pub fn emit(&self, change: AuthChange) -> usize {
        match &change {
            AuthChange::SignedIn(session) | AuthChange::TokenRefreshed(session) => {
                self.set_session(Some(session.clone()))
            }
            AuthChange::SignedOut => self.set_session(None),
        }
        let delivered = self.state.auth_changes.publish(&change);
        if delivered == 0 {
            tracing::debug!("Auth change dropped, no subscriber");
        }
        delivered
    }

    /// Deliver a row change to every channel scoped to the profile id. Returns how
    /// many channels received it.
    pub fn push_profile_update(&self, profile: UserProfile) -> usize {
        self.state
            .profiles
            .lock()
            .insert(profile.id.clone(), profile.clone());

        let callbacks: Vec<ProfileCallback> = self
            .state
            .channels
            .lock()
            .values()
            .filter(|channel| channel.key == profile.id)
            .map(|channel| Arc::clone(&channel.on_update))
            .collect();

        for callback in &callbacks {
            callback(profile.clone());
        }
        callbacks.len()
    }

    /// Callback of the first open channel scoped to `key`.
    pub fn channel_callback(&self, key: &str) -> Option<ProfileCallback> {
        self.state
            .channels
            .lock()
            .values()
            .find(|channel| channel.key == key)
            .map(|channel| Arc::clone(&channel.on_update))
    }

    pub fn open_channels(&self) -> Vec<ChannelHandle> {
        let mut handles: Vec<ChannelHandle> = self
            .state
            .channels
            .lock()
            .iter()
            .map(|(id, channel)| ChannelHandle {
                id: *id,
                key: channel.key.clone(),
            })
            .collect();
        handles.sort_by_key(|handle| handle.id);
        handles
    }

    pub fn sign_out_calls(&self) -> usize {
        self.state.counters.sign_out_calls.load(Ordering::SeqCst)
    }

    pub fn profile_fetches(&self) -> usize {
        self.state.counters.profile_fetches.load(Ordering::SeqCst)
    }

    pub fn channels_opened(&self) -> usize {
        self.state.counters.channels_opened.load(Ordering::SeqCst)
    }

    pub fn channels_closed(&self) -> usize {
        self.state.counters.channels_closed.load(Ordering::SeqCst)
    }

    pub fn credential_clears(&self) -> usize {
        self.state.counters.credential_clears.load(Ordering::SeqCst)
    }

    pub fn procedure_calls(&self) -> usize {
        self.state.counters.procedure_calls.load(Ordering::SeqCst)
    }

    fn check(&self, point: FailurePoint) -> Result<(), RemoteError> {
        match self.state.failures.lock().get(&point) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn current_session(&self) -> Result<Option<AuthSession>, RemoteError> {
        self.check(FailurePoint::CurrentSession)?;
        Ok(self.state.session.lock().clone())
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        self.state.counters.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.check(FailurePoint::SignOut)?;
        *self.state.session.lock() = None;
        Ok(())
    }

    fn subscribe(&self) -> Receiver<AuthChange> {
        self.state.auth_changes.subscribe()
    }
}

#[async_trait]
impl ProfileService for MemoryBackend {
    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile, RemoteError> {
        self.state.counters.profile_fetches.fetch_add(1, Ordering::SeqCst);
        self.check(FailurePoint::FetchProfile)?;
        self.state
            .profiles
            .lock()
            .get(user_id)
            .cloned()
            .ok_or_else(|| {
                RemoteError::structured(
                    "JSON object requested, multiple (or no) rows returned",
                    Some("PGRST116".to_string()),
                )
            })
    }
}

#[async_trait]
impl RealtimeProvider for MemoryBackend {
    async fn open_channel(
        &self,
        key: &str,
        on_update: ProfileCallback,
    ) -> Result<ChannelHandle, RemoteError> {
        self.check(FailurePoint::OpenChannel)?;
        self.state.counters.channels_opened.fetch_add(1, Ordering::SeqCst);

        let id = self.state.next_channel.fetch_add(1, Ordering::SeqCst);
        self.state.channels.lock().insert(
            id,
            OpenChannel {
                key: key.to_string(),
                on_update,
            },
        );
        Ok(ChannelHandle {
            id,
            key: key.to_string(),
        })
    }

    async fn close_channel(&self, handle: ChannelHandle) -> Result<(), RemoteError> {
        // The channel is gone locally even when the provider reports a failure
        self.state.channels.lock().remove(&handle.id);
        self.state.counters.channels_closed.fetch_add(1, Ordering::SeqCst);
        self.check(FailurePoint::CloseChannel)
    }
}

impl CredentialStore for MemoryBackend {
    fn clear(&self) {
        self.state.counters.credential_clears.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProcedureService for MemoryBackend {
    async fn call(&self, name: &str, args: Value) -> Result<Value, RemoteError> {
        self.state.counters.procedure_calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self.state.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.check(FailurePoint::Procedure)?;

        let handler = self.state.procedures.lock().get(name).cloned();
        match handler {
            Some(handler) => handler(args),
            None => Err(RemoteError::structured(
                format!("Could not find the function public.{} in the schema cache", name),
                Some("PGRST202".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_unknown_profile_is_structured_error() {
        let backend = MemoryBackend::new();
        let err = backend.fetch_profile("missing").await.unwrap_err();
        assert_eq!(err.code(), Some("PGRST116"));
    }

    #[tokio::test]
    async fn test_failure_injection_is_sticky_until_recovered() {
        let backend = MemoryBackend::new();
        backend.set_session(Some(AuthSession {
            access_token: "t".to_string(),
            refresh_token: None,
            user_id: "u1".to_string(),
            email: None,
            expires_at: None,
        }));
        backend.fail(FailurePoint::CurrentSession, RemoteError::text("offline"));

        assert!(backend.current_session().await.is_err());
        assert!(backend.current_session().await.is_err());

        backend.recover(FailurePoint::CurrentSession);
        let session = backend.current_session().await.unwrap();
        assert_eq!(session.map(|s| s.user_id).as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_channels_receive_only_their_rows() {
        let backend = MemoryBackend::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&received);
        let handle = backend
            .open_channel(
                "u1",
                Arc::new(move |profile: UserProfile| sink.lock().push(profile.id)),
            )
            .await
            .unwrap();

        assert_eq!(backend.push_profile_update(UserProfile::with_id("u1")), 1);
        assert_eq!(backend.push_profile_update(UserProfile::with_id("u2")), 0);
        assert_eq!(*received.lock(), vec!["u1".to_string()]);

        backend.close_channel(handle).await.unwrap();
        assert_eq!(backend.push_profile_update(UserProfile::with_id("u1")), 0);
        assert!(backend.open_channels().is_empty());
    }

    #[tokio::test]
    async fn test_procedures() {
        let backend = MemoryBackend::new();
        backend.register_procedure("request_deposit", |args| {
            Ok(json!({ "status": "pending", "amount": args["amount"] }))
        });

        let out = backend
            .call("request_deposit", json!({ "amount": 50 }))
            .await
            .unwrap();
        assert_eq!(out["status"], "pending");
        assert_eq!(out["amount"], 50);

        let err = backend.call("missing_fn", Value::Null).await.unwrap_err();
        assert_eq!(err.code(), Some("PGRST202"));
        assert_eq!(backend.procedure_calls(), 2);
    }

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let backend = MemoryBackend::new();
        let rx = backend.subscribe();

        backend.emit(AuthChange::SignedOut);
        assert_eq!(rx.recv().await.unwrap(), AuthChange::SignedOut);
    }

    #[tokio::test]
    async fn test_emit_before_subscribe_is_not_replayed() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.emit(AuthChange::SignedOut), 0);

        let first = backend.subscribe();
        let second = backend.subscribe();
        assert!(first.try_recv().is_err());

        let session = AuthSession {
            access_token: "token".to_string(),
            refresh_token: None,
            user_id: "user-1".to_string(),
            email: None,
            expires_at: None,
        };
        assert_eq!(backend.emit(AuthChange::SignedIn(session.clone())), 2);
        assert_eq!(first.recv().await.unwrap(), AuthChange::SignedIn(session.clone()));
        assert_eq!(second.recv().await.unwrap(), AuthChange::SignedIn(session));
    }
}
