//! # Application Orchestrator
//!
//! The [`App`] struct composes the three stateful components of the client core and
//! exposes the surface the UI shell talks to.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        UI shell                             │
//! │   handle_input()   mount() ─▶ MountedScreen + callbacks     │
//! └───────┬─────────────────────────┬───────────────────────────┘
//!         │                         │ navigate / logout / notify
//! ┌───────▼─────────────────────────▼───────────────────────────┐
//! │  App (orchestrator)                                         │
//! │                                                             │
//! │  ┌─────────────────────┐   EntryRedirect   ┌─────────────┐  │
//! │  │ SessionGuard        │──────────────────▶│ Navigation  │  │
//! │  │ profile / realtime  │                   │ Dispatcher  │  │
//! │  │ inactivity timer    │◀──── snapshot ────│             │  │
//! │  └─────────┬───────────┘   (watch channel) └──────┬──────┘  │
//! │            │ show_error                           │ heavy   │
//! │  ┌─────────▼──────────────────────────────────────▼──────┐  │
//! │  │ FeedbackController (run_tracked, backoff, sanitizer)  │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └───────┬─────────────────────────────────────────────────────┘
//!         │ async_trait services (core::service::Providers)
//!         ▼
//!   identity · profiles · realtime · credentials · procedures
//! ```
//!
//! ## Observable State
//!
//! Rendering reads three `tokio::sync::watch` channels: [`crate::feedback::FeedbackState`],
//! [`NavigationState`] and [`SessionSnapshot`]. Each has exactly one writer.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::app::{App, Screen};
//! use client::core::config::ClientConfig;
//! use client::services::memory::MemoryBackend;
//!
//! # async fn demo() -> client::core::error::Result<()> {
//! let backend = MemoryBackend::new();
//! let app = App::new(backend.providers(), ClientConfig::from_env()?);
//!
//! app.start().await;
//! app.navigate(Screen::Home, None).await;
//!
//! let mounted = app.mount();
//! mounted.callbacks.logout();
//!
//! app.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod navigation;
mod state;

pub use navigation::{NavigationDispatcher, NavigationOutcome, ENTRY_SCREEN, GATED_FALLBACK};
pub use state::*;

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::config::ClientConfig;
use crate::core::error::{AppError, ErrorPayload, Result};
use crate::core::service::Providers;
use crate::feedback::{FeedbackController, FeedbackState, Notice};
use crate::session::{InputKind, SessionGuard, SessionSnapshot};

type NavigateFn = Arc<dyn Fn(Screen, Option<Value>) + Send + Sync>;
type LogoutFn = Arc<dyn Fn() + Send + Sync>;
type NotifyFn = Arc<dyn Fn(Notice) + Send + Sync>;

/// The callbacks every mounted screen receives.
///
/// Navigation and logout run on spawned tasks; screens never await them.
#[derive(Clone)]
pub struct ScreenCallbacks {
    navigate: NavigateFn,
    logout: LogoutFn,
    notify: NotifyFn,
}

impl ScreenCallbacks {
    pub fn navigate(&self, screen: Screen, payload: Option<Value>) {
        (self.navigate)(screen, payload)
    }

    pub fn logout(&self) {
        (self.logout)()
    }

    pub fn notify(&self, notice: Notice) {
        (self.notify)(notice)
    }

    /// Whether both values hand out the very same callbacks.
    pub fn same_as(&self, other: &ScreenCallbacks) -> bool {
        Arc::ptr_eq(&self.navigate, &other.navigate)
            && Arc::ptr_eq(&self.logout, &other.logout)
            && Arc::ptr_eq(&self.notify, &other.notify)
    }
}

impl std::fmt::Debug for ScreenCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenCallbacks").finish_non_exhaustive()
    }
}

/// The active screen as handed to the renderer.
#[derive(Debug, Clone)]
pub struct MountedScreen {
    pub screen: Screen,
    pub payload: Option<Value>,
    pub callbacks: ScreenCallbacks,
}

/// Client core orchestrator
pub struct App {
    config: ClientConfig,
    providers: Providers,
    feedback: Arc<FeedbackController>,
    session: Arc<SessionGuard>,
    navigation: Arc<NavigationDispatcher>,
    callbacks: ScreenCallbacks,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl App {
    /// Wire the components through explicit dependency injection.
    pub fn new(providers: Providers, config: ClientConfig) -> Self {
        let feedback = Arc::new(FeedbackController::new(&config));

        let (session_tx, session_rx) = watch::channel(SessionSnapshot::default());
        let navigation = Arc::new(NavigationDispatcher::new(
            session_rx,
            Arc::clone(&feedback),
            config.heavy_transition_delay,
        ));
        let session = SessionGuard::new(
            providers.clone(),
            Arc::clone(&feedback),
            navigation.clone(),
            session_tx,
            config.inactivity_timeout,
        );

        let callbacks = Self::build_callbacks(&navigation, &session, &feedback);

        tracing::info!(
            api_base_url = %config.api_base_url,
            inactivity_secs = config.inactivity_timeout.as_secs(),
            "Client core initialized"
        );

        Self {
            config,
            providers,
            feedback,
            session,
            navigation,
            callbacks,
            listener: Mutex::new(None),
        }
    }

    fn build_callbacks(
        navigation: &Arc<NavigationDispatcher>,
        session: &Arc<SessionGuard>,
        feedback: &Arc<FeedbackController>,
    ) -> ScreenCallbacks {
        let nav = Arc::clone(navigation);
        let navigate: NavigateFn = Arc::new(move |screen, payload| {
            let nav = Arc::clone(&nav);
            tokio::spawn(async move {
                nav.navigate(screen, payload).await;
            });
        });

        let guard = Arc::clone(session);
        let logout: LogoutFn = Arc::new(move || {
            let guard = Arc::clone(&guard);
            tokio::spawn(async move { guard.logout().await });
        });

        let feedback = Arc::clone(feedback);
        let notify: NotifyFn = Arc::new(move |notice| feedback.notify(notice));

        ScreenCallbacks {
            navigate,
            logout,
            notify,
        }
    }

    /// Restore the persisted session and start listening for auth changes.
    ///
    /// Returns whether a session was restored. Lands on the home screen when it was,
    /// and on the entry screen otherwise.
    pub async fn start(&self) -> bool {
        // Subscribe first: changes are not buffered for late subscribers
        {
            let mut listener = self.listener.lock();
            if let Some(previous) = listener.take() {
                previous.abort();
            }
            *listener = Some(self.session.spawn_listener());
        }

        let restored = self.session.restore().await;

        let landing = if restored { Screen::Home } else { ENTRY_SCREEN };
        self.navigation.navigate(landing, None).await;
        restored
    }

    /// Stop the listener and release session resources.
    pub async fn shutdown(&self) {
        let listener = self.listener.lock().take();
        if let Some(listener) = listener {
            listener.abort();
        }
        self.session.shutdown().await;
        self.feedback.reset();
        tracing::info!("Client core shut down");
    }

    /// Forward a raw input event. Returns whether it kept the session alive.
    pub fn handle_input(&self, kind: InputKind) -> bool {
        self.session.record_interaction(kind)
    }

    pub async fn logout(&self) {
        self.session.logout().await;
    }

    pub async fn navigate(&self, screen: Screen, payload: Option<Value>) -> NavigationOutcome {
        self.navigation.navigate(screen, payload).await
    }

    /// Navigate by page identifier (`"account-history"`).
    pub async fn navigate_to(&self, id: &str, payload: Option<Value>) -> Result<NavigationOutcome> {
        let screen: Screen = id.parse()?;
        Ok(self.navigation.navigate(screen, payload).await)
    }

    /// The active screen together with the shared callbacks.
    pub fn mount(&self) -> MountedScreen {
        let NavigationState { screen, payload } = self.navigation.state();
        MountedScreen {
            screen,
            payload,
            callbacks: self.callbacks.clone(),
        }
    }

    pub fn callbacks(&self) -> &ScreenCallbacks {
        &self.callbacks
    }

    /// See [`FeedbackController::run_tracked`].
    pub async fn run_tracked<T, E, F, Fut>(
        &self,
        action: F,
        success_message: Option<&str>,
        error_message: Option<&str>,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: ErrorPayload,
    {
        self.feedback
            .run_tracked(action, success_message, error_message)
            .await
    }

    /// Invoke a remote procedure with tracked feedback.
    ///
    /// `args` must be a JSON object of named parameters (or null). Invalid input is
    /// rejected before any remote call and never reaches the feedback indicator.
    pub async fn call_procedure(
        &self,
        name: &str,
        args: Value,
        success_message: Option<&str>,
    ) -> Result<Value> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Procedure name is required".to_string()));
        }
        if !(args.is_object() || args.is_null()) {
            return Err(AppError::Validation(
                "Procedure arguments must be a JSON object".to_string(),
            ));
        }

        let procedures = Arc::clone(&self.providers.procedures);
        let result = self
            .feedback
            .run_tracked(
                || async move { procedures.call(name, args).await },
                success_message,
                None,
            )
            .await?;
        Ok(result)
    }

    pub fn feedback(&self) -> &FeedbackController {
        &self.feedback
    }

    pub fn feedback_state(&self) -> FeedbackState {
        self.feedback.state()
    }

    pub fn navigation_state(&self) -> NavigationState {
        self.navigation.state()
    }

    pub fn session_snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn subscribe_feedback(&self) -> watch::Receiver<FeedbackState> {
        self.feedback.subscribe()
    }

    pub fn subscribe_navigation(&self) -> watch::Receiver<NavigationState> {
        self.navigation.subscribe()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    /// Re-fetch the signed-in user's profile.
    pub async fn refresh_profile(&self) -> Option<shared::UserProfile> {
        self.session.refresh_profile().await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RemoteError;
    use crate::feedback::{Phase, SESSION_TIMEOUT_NOTICE};
    use crate::services::memory::{FailurePoint, MemoryBackend};
    use crate::session::SessionPhase;
    use serde_json::json;
    use shared::{AuthChange, AuthSession, UserProfile};
    use std::time::Duration;

    fn session(user_id: &str) -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            user_id: user_id.to_string(),
            email: Some("ana@example.com".to_string()),
            expires_at: None,
        }
    }

    fn backend_with_user() -> MemoryBackend {
        let backend = MemoryBackend::new();
        let mut profile = UserProfile::with_id("user-1");
        profile.full_name = Some("Ana Souza".to_string());
        profile.balance = Some(1250.75);
        backend.insert_profile(profile);
        backend.set_session(Some(session("user-1")));
        backend
    }

    async fn wait_for_screen(app: &App, screen: Screen) {
        let mut rx = app.subscribe_navigation();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.screen == screen))
            .await
            .expect("navigation in time")
            .expect("navigation sender alive");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_with_persisted_session_lands_home() {
        let backend = backend_with_user();
        let app = App::new(backend.providers(), ClientConfig::default());

        assert!(app.start().await);
        assert_eq!(app.navigation_state().screen, Screen::Home);
        assert_eq!(app.session_snapshot().phase, SessionPhase::Authenticated);
        assert!(app.session_snapshot().subscribed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_session_lands_on_entry() {
        let backend = MemoryBackend::new();
        let app = App::new(backend.providers(), ClientConfig::default());

        assert!(!app.start().await);
        assert_eq!(app.navigation_state().screen, ENTRY_SCREEN);

        assert_eq!(
            app.navigate(Screen::Funds, None).await,
            NavigationOutcome::Committed(Screen::Register)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_changes_before_start_are_not_replayed() {
        let backend = backend_with_user();
        backend.emit(AuthChange::SignedIn(session("user-1")));
        backend.emit(AuthChange::SignedOut);

        let app = App::new(backend.providers(), ClientConfig::default());
        assert!(!app.start().await);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(backend.channels_opened(), 0);
        assert_eq!(backend.profile_fetches(), 0);
        assert!(!app.session_snapshot().has_session());
        assert_eq!(app.navigation_state().screen, ENTRY_SCREEN);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_logout_tears_down_and_redirects() {
        let backend = backend_with_user();
        let app = App::new(backend.providers(), ClientConfig::default());
        app.start().await;
        app.navigate(Screen::Profile, None).await;

        app.logout().await;

        // Everything is settled by the time logout returns
        assert!(backend.open_channels().is_empty());
        let snapshot = app.session_snapshot();
        assert!(snapshot.profile.is_none());
        assert!(!snapshot.has_session());
        assert_eq!(app.navigation_state().screen, ENTRY_SCREEN);
        assert!(!app.handle_input(InputKind::KeyDown));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mounted_screens_share_callbacks() {
        let backend = backend_with_user();
        let app = App::new(backend.providers(), ClientConfig::default());
        app.start().await;

        let home = app.mount();
        app.navigate(Screen::Deposit, Some(json!({ "method": "pix" }))).await;
        let deposit = app.mount();

        assert_eq!(home.screen, Screen::Home);
        assert_eq!(deposit.screen, Screen::Deposit);
        assert_eq!(deposit.payload, Some(json!({ "method": "pix" })));
        assert!(home.callbacks.same_as(&deposit.callbacks));
    }

    #[tokio::test(start_paused = true)]
    async fn test_screen_callbacks_drive_the_core() {
        let backend = backend_with_user();
        let app = App::new(backend.providers(), ClientConfig::default());
        app.start().await;
        let callbacks = app.mount().callbacks;

        callbacks.notify(Notice::Success("Copied PIX key".to_string()));
        assert_eq!(app.feedback_state().phase, Phase::Succeeded);

        callbacks.navigate(Screen::Withdraw, None);
        wait_for_screen(&app, Screen::Withdraw).await;

        callbacks.logout();
        wait_for_screen(&app, ENTRY_SCREEN).await;
        assert!(!app.session_snapshot().has_session());
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_procedure_success_and_failure() {
        let backend = backend_with_user();
        backend.register_procedure("request_withdrawal", |args| {
            if args["amount"].as_f64().unwrap_or(0.0) > 1000.0 {
                Err(RemoteError::structured(
                    "insufficient balance for withdrawal",
                    Some("P0001".to_string()),
                ))
            } else {
                Ok(json!({ "status": "pending" }))
            }
        });
        let app = App::new(backend.providers(), ClientConfig::default());

        let ok = app
            .call_procedure("request_withdrawal", json!({ "amount": 10 }), Some("Withdrawal requested"))
            .await
            .unwrap();
        assert_eq!(ok["status"], "pending");
        assert_eq!(app.feedback_state().message.as_deref(), Some("Withdrawal requested"));

        let err = app
            .call_procedure("request_withdrawal", json!({ "amount": 5000 }), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Remote(RemoteError::Structured { .. })));
        assert_eq!(
            app.feedback_state().message.as_deref(),
            Some("Insufficient balance for this operation.")
        );
        assert_eq!(app.feedback_state().failure_streak, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_procedure_validation_skips_feedback() {
        let backend = MemoryBackend::new();
        let app = App::new(backend.providers(), ClientConfig::default());

        let err = app.call_procedure("  ", Value::Null, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = app
            .call_procedure("request_deposit", json!([1, 2]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert_eq!(app.feedback_state(), FeedbackState::default());
        assert_eq!(backend.procedure_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_by_id() {
        let backend = backend_with_user();
        let app = App::new(backend.providers(), ClientConfig::default());
        app.start().await;

        let outcome = app.navigate_to("withdrawal-history", None).await.unwrap();
        assert_eq!(outcome, NavigationOutcome::Committed(Screen::WithdrawalHistory));
        assert!(app.navigate_to("nowhere", None).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactivity_timeout_end_to_end() {
        let backend = backend_with_user();
        let app = App::new(backend.providers(), ClientConfig::default());
        app.start().await;

        tokio::time::sleep(Duration::from_secs(30 * 60)).await;
        assert!(app.handle_input(InputKind::PointerDown));
        assert!(!app.handle_input(InputKind::Wheel));

        // Expires at the 75 minute mark; the notice stays up for 3 seconds
        tokio::time::sleep(Duration::from_secs(45 * 60 + 1)).await;
        wait_for_screen(&app, ENTRY_SCREEN).await;

        assert!(!app.session_snapshot().has_session());
        assert!(backend.open_channels().is_empty());
        let feedback = app.feedback_state();
        assert_eq!(feedback.phase, Phase::Failed);
        assert_eq!(feedback.message.as_deref(), Some(SESSION_TIMEOUT_NOTICE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_sign_in_after_start() {
        let backend = MemoryBackend::new();
        backend.insert_profile(UserProfile::with_id("user-1"));
        let app = App::new(backend.providers(), ClientConfig::default());
        app.start().await;

        backend.emit(AuthChange::SignedIn(session("user-1")));
        let mut rx = app.subscribe_session();
        tokio::time::timeout(
            Duration::from_secs(1),
            rx.wait_for(|s| s.phase == SessionPhase::Authenticated),
        )
        .await
        .expect("signed in")
        .expect("sender alive");

        assert_eq!(
            app.navigate(Screen::Shop, None).await,
            NavigationOutcome::Committed(Screen::Shop)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_keeps_persisted_session() {
        let backend = backend_with_user();
        backend.fail(FailurePoint::CloseChannel, RemoteError::text("socket gone"));
        let app = App::new(backend.providers(), ClientConfig::default());
        app.start().await;

        app.shutdown().await;
        assert!(!app.session_snapshot().has_session());
        assert_eq!(backend.sign_out_calls(), 0);

        // A new start restores the session again
        let app = App::new(backend.providers(), ClientConfig::default());
        assert!(app.start().await);
    }
}
