//! # Session Guard
//!
//! Owns the authenticated-session lifecycle and keeps its dependent resources (cached
//! profile, realtime subscription, inactivity timer) in lock-step with it.
//!
//! ## Lifecycle
//!
//! ```text
//!              restore() / SignedIn / TokenRefreshed
//!   Anonymous ─────────────────────────────────────────▶ Authenticating
//!       ▲                                                     │
//!       │                                  1. fetch + cache profile
//!       │                                  2. open realtime channel
//!       │                                  3. arm inactivity timer
//!       │                                                     ▼
//!       └──────── logout() / inactivity / SignedOut ──── Authenticated
//!                 1. disarm timer
//!                 2. close realtime channel
//!                 3. clear profile
//!                 4. provider sign-out + clear credentials
//!                 5. redirect to the entry screen
//! ```
//!
//! Transitions are serialized by an async mutex, so the guard is the single writer of
//! the published [`SessionSnapshot`]. Navigation is driven only through the narrow
//! [`EntryRedirect`] seam.

pub mod inactivity;

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use shared::{mask_id, AuthChange, AuthSession, UserProfile};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::core::service::{ChannelHandle, ProfileCallback, Providers};
use crate::feedback::{sanitize, FeedbackController, SESSION_TIMEOUT_NOTICE};

pub use inactivity::{InactivityTimer, InputKind};

/// Session phase as seen by readers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
}

/// Published, read-only view of the session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub user_id: Option<String>,
    pub email: Option<String>,
    /// Cached profile; `None` while unknown or after a failed fetch
    pub profile: Option<UserProfile>,
    /// Whether a realtime subscription is open for this session
    pub subscribed: bool,
}

impl SessionSnapshot {
    pub fn has_session(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Why a session is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Explicit logout from a screen
    UserRequested,
    /// Inactivity countdown expired
    InactivityTimeout,
    /// The identity provider reported the sign-out itself
    ProviderSignedOut,
    /// Process shutdown: local resources only, the persisted session survives
    Shutdown,
}

impl EndReason {
    fn label(self) -> &'static str {
        match self {
            EndReason::UserRequested => "user_requested",
            EndReason::InactivityTimeout => "inactivity_timeout",
            EndReason::ProviderSignedOut => "provider_signed_out",
            EndReason::Shutdown => "shutdown",
        }
    }
}

/// Sends the user back to the unauthenticated entry screen.
#[async_trait]
pub trait EntryRedirect: Send + Sync {
    async fn redirect_to_entry(&self);
}

#[derive(Default)]
struct SessionInner {
    user_id: Option<String>,
    subscription: Option<ChannelHandle>,
    /// Bumped per established session; stale expiry callbacks compare against it
    epoch: u64,
}

/// Session lifecycle owner.
pub struct SessionGuard {
    providers: Providers,
    feedback: Arc<FeedbackController>,
    redirect: Arc<dyn EntryRedirect>,
    snapshot: Arc<watch::Sender<SessionSnapshot>>,
    inner: Mutex<SessionInner>,
    timer: InactivityTimer,
    this: Weak<SessionGuard>,
}

impl SessionGuard {
    pub fn new(
        providers: Providers,
        feedback: Arc<FeedbackController>,
        redirect: Arc<dyn EntryRedirect>,
        snapshot: watch::Sender<SessionSnapshot>,
        inactivity_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            providers,
            feedback,
            redirect,
            snapshot: Arc::new(snapshot),
            inner: Mutex::new(SessionInner::default()),
            timer: InactivityTimer::new(inactivity_timeout),
            this: this.clone(),
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn timer(&self) -> &InactivityTimer {
        &self.timer
    }

    /// Restore a session persisted by the identity provider (initial load).
    ///
    /// Returns whether a session was restored. A provider failure leaves the client
    /// anonymous.
    pub async fn restore(&self) -> bool {
        match self.providers.identity.current_session().await {
            Ok(Some(session)) => {
                self.establish(session).await;
                true
            }
            Ok(None) => {
                tracing::info!("No persisted session");
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "Could not restore session");
                false
            }
        }
    }

    /// Apply a push notification from the identity provider.
    pub async fn handle_auth_change(&self, change: AuthChange) {
        match change {
            AuthChange::SignedIn(session) | AuthChange::TokenRefreshed(session) => {
                self.establish(session).await
            }
            AuthChange::SignedOut => self.end_session(EndReason::ProviderSignedOut, None).await,
        }
    }

    /// Explicit logout.
    pub async fn logout(&self) {
        self.end_session(EndReason::UserRequested, None).await;
    }

    /// Tear down local resources without signing out at the provider.
    pub async fn shutdown(&self) {
        self.end_session(EndReason::Shutdown, None).await;
    }

    /// Forward an input event; qualifying events restart the inactivity countdown.
    ///
    /// Returns whether the countdown was restarted.
    pub fn record_interaction(&self, kind: InputKind) -> bool {
        kind.is_qualifying() && self.timer.reset()
    }

    /// Re-fetch the cached profile for the current user.
    pub async fn refresh_profile(&self) -> Option<UserProfile> {
        let inner = self.inner.lock().await;
        let user_id = inner.user_id.clone()?;
        self.load_profile(&user_id).await
    }

    /// Spawn the task applying provider notifications until the channel closes.
    pub fn spawn_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let receiver = self.providers.identity.subscribe();
        let guard = Arc::downgrade(self);

        tokio::spawn(async move {
            while let Ok(change) = receiver.recv().await {
                let Some(guard) = guard.upgrade() else {
                    break;
                };
                guard.handle_auth_change(change).await;
            }
            tracing::debug!("Auth change listener stopped");
        })
    }

    async fn establish(&self, session: AuthSession) {
        let mut inner = self.inner.lock().await;
        let user_id = session.user_id.clone();

        if inner.user_id.as_deref() == Some(user_id.as_str()) {
            tracing::debug!(user = %mask_id(&user_id), "Session already established, refreshing profile");
            self.load_profile(&user_id).await;
            return;
        }

        if inner.user_id.is_some() {
            // Another user's resources are still attached
            self.timer.disarm();
            self.close_subscription(&mut inner).await;
        }

        inner.user_id = Some(user_id.clone());
        inner.epoch = inner.epoch.wrapping_add(1);
        self.snapshot.send_replace(SessionSnapshot {
            phase: SessionPhase::Authenticating,
            user_id: Some(user_id.clone()),
            email: session.email.clone(),
            profile: None,
            subscribed: false,
        });

        self.load_profile(&user_id).await;

        let on_update = self.profile_update_callback(user_id.clone());
        match self.providers.realtime.open_channel(&user_id, on_update).await {
            Ok(handle) => inner.subscription = Some(handle),
            Err(err) => {
                tracing::warn!(error = %err, user = %mask_id(&user_id), "Realtime subscription failed, continuing without live updates")
            }
        }

        self.arm_timer(inner.epoch);

        let subscribed = inner.subscription.is_some();
        self.snapshot.send_modify(|snapshot| {
            snapshot.phase = SessionPhase::Authenticated;
            snapshot.subscribed = subscribed;
        });
        tracing::info!(user = %mask_id(&user_id), subscribed, "Session established");
    }

    /// Tear the current session down.
    ///
    /// With `expected_epoch`, only the session established at that epoch is ended; the
    /// check happens under the same lock acquisition as the teardown.
    async fn end_session(&self, reason: EndReason, expected_epoch: Option<u64>) {
        let mut inner = self.inner.lock().await;
        if inner.user_id.is_none() {
            tracing::debug!(reason = reason.label(), "No session to end");
            return;
        }
        if expected_epoch.is_some_and(|epoch| epoch != inner.epoch) {
            tracing::debug!(reason = reason.label(), "Session changed meanwhile, nothing to end");
            return;
        }

        self.timer.disarm();
        self.close_subscription(&mut inner).await;
        let user_id = inner.user_id.take().unwrap_or_default();
        self.snapshot.send_replace(SessionSnapshot::default());

        if reason == EndReason::Shutdown {
            tracing::info!(user = %mask_id(&user_id), "Session detached for shutdown");
            return;
        }

        if reason != EndReason::ProviderSignedOut {
            if let Err(err) = self.providers.identity.sign_out().await {
                tracing::warn!(error = %err, "Provider sign-out failed, local session cleared anyway");
                self.feedback.show_error(sanitize(&err));
            }
        }
        self.providers.credentials.clear();

        if reason == EndReason::InactivityTimeout {
            self.feedback.show_error(SESSION_TIMEOUT_NOTICE);
        }

        self.redirect.redirect_to_entry().await;
        tracing::info!(user = %mask_id(&user_id), reason = reason.label(), "Session ended");
    }

    async fn expire(&self, epoch: u64) {
        tracing::info!(epoch, "Inactivity countdown expired");
        self.end_session(EndReason::InactivityTimeout, Some(epoch)).await;
    }

    async fn close_subscription(&self, inner: &mut SessionInner) {
        if let Some(handle) = inner.subscription.take() {
            let channel = handle.id;
            if let Err(err) = self.providers.realtime.close_channel(handle).await {
                tracing::warn!(error = %err, channel, "Closing realtime channel failed");
            }
        }
    }

    async fn load_profile(&self, user_id: &str) -> Option<UserProfile> {
        match self.providers.profiles.fetch_profile(user_id).await {
            Ok(profile) => {
                let cached = profile.clone();
                self.snapshot.send_if_modified(|snapshot| {
                    if snapshot.user_id.as_deref() != Some(user_id) {
                        return false;
                    }
                    snapshot.profile = Some(cached);
                    true
                });
                Some(profile)
            }
            Err(err) => {
                tracing::warn!(error = %err, user = %mask_id(user_id), "Profile fetch failed");
                None
            }
        }
    }

    fn profile_update_callback(&self, user_id: String) -> ProfileCallback {
        let snapshot = Arc::downgrade(&self.snapshot);
        Arc::new(move |profile: UserProfile| {
            let Some(snapshot) = snapshot.upgrade() else {
                return;
            };
            let applied = snapshot.send_if_modified(|current| {
                if current.user_id.as_deref() != Some(user_id.as_str()) {
                    return false;
                }
                current.profile = Some(profile);
                true
            });
            if !applied {
                tracing::debug!("Dropped realtime profile update for an ended session");
            }
        })
    }

    fn arm_timer(&self, epoch: u64) {
        let this = self.this.clone();
        self.timer.arm(Arc::new(move || {
            if let Some(guard) = this.upgrade() {
                // Runs on its own task: the teardown disarms the timer that fired it
                tokio::spawn(async move { guard.expire(epoch).await });
            }
        }));
    }
}
