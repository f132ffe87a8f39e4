//! # Service Traits
//!
//! Traits for the remote collaborators the core mediates over, enabling dependency
//! injection: production wiring uses [`crate::services::api`], tests and the demo
//! binary use [`crate::services::memory`].

use std::sync::Arc;

use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use shared::{AuthChange, AuthSession, UserProfile};

use super::error::RemoteError;

/// Update callback handed to a realtime channel.
pub type ProfileCallback = Arc<dyn Fn(UserProfile) + Send + Sync>;

/// Handle of an open realtime channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    /// Provider-assigned channel id
    pub id: u64,
    /// Key the channel is scoped to (the user's profile row id)
    pub key: String,
}

/// Identity / session provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Session persisted from a previous launch, if any
    async fn current_session(&self) -> Result<Option<AuthSession>, RemoteError>;

    /// Revoke the current session at the provider
    async fn sign_out(&self) -> Result<(), RemoteError>;

    /// Push notifications of session start/end emitted after this call; every
    /// subscriber receives every notification
    fn subscribe(&self) -> Receiver<AuthChange>;
}

/// Profile row lookup
#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile, RemoteError>;
}

/// Realtime data provider
#[async_trait]
pub trait RealtimeProvider: Send + Sync {
    /// Open a channel scoped to `key`; every change to the row is passed to `on_update`
    async fn open_channel(
        &self,
        key: &str,
        on_update: ProfileCallback,
    ) -> Result<ChannelHandle, RemoteError>;

    /// Close a channel previously returned by [`RealtimeProvider::open_channel`]
    async fn close_channel(&self, handle: ChannelHandle) -> Result<(), RemoteError>;
}

/// Externally held credentials (token storage, cached keys)
pub trait CredentialStore: Send + Sync {
    fn clear(&self);
}

/// Remote procedure layer
#[async_trait]
pub trait ProcedureService: Send + Sync {
    async fn call(&self, name: &str, args: Value) -> Result<Value, RemoteError>;
}

/// Bundle of collaborators injected into [`crate::app::App`].
#[derive(Clone)]
pub struct Providers {
    pub identity: Arc<dyn IdentityProvider>,
    pub profiles: Arc<dyn ProfileService>,
    pub realtime: Arc<dyn RealtimeProvider>,
    pub credentials: Arc<dyn CredentialStore>,
    pub procedures: Arc<dyn ProcedureService>,
}

/// Fan-out of auth-change notifications.
///
/// Each [`AuthFanout::subscribe`] call gets its own channel, so every subscriber sees
/// every change published after it subscribed. Nothing is buffered while nobody
/// listens, and subscribers whose receiver was dropped are pruned on publish.
#[derive(Default)]
pub struct AuthFanout {
    subscribers: Mutex<Vec<Sender<AuthChange>>>,
}

impl AuthFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<AuthChange> {
        let (tx, rx) = async_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver `change` to every live subscriber. Returns how many received it.
    pub fn publish(&self, change: &AuthChange) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.try_send(change.clone()).is_ok());
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}
