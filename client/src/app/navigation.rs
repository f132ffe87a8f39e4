//! # Navigation Dispatcher
//!
//! Resolves the active screen with central authentication gating and defers the
//! switch to data-heavy screens behind the shared loading indicator.
//!
//! ```text
//! navigate(screen, payload)
//!   │
//!   ├── screen == current ─────────────────────▶ Unchanged (no write)
//!   ├── no session && !public ──▶ Register ─┬── == current ──▶ Unchanged
//!   │                                       │
//!   ├── heavy ──▶ run_tracked(150ms) ──┬── newer navigation issued ──▶ Superseded
//!   │                                   └──────────────────────────────▶ Committed
//!   └── otherwise ─────────────────────────────────────────────────────▶ Committed
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;

use super::state::{NavigationState, Screen};
use crate::core::error::RemoteError;
use crate::feedback::FeedbackController;
use crate::session::{EntryRedirect, SessionSnapshot};

/// Screen shown after the session ends.
pub const ENTRY_SCREEN: Screen = Screen::Login;

/// Substitute for protected screens requested without a session.
pub const GATED_FALLBACK: Screen = Screen::Register;

/// Result of a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Already on the resolved screen; nothing was written
    Unchanged,
    /// The resolved screen is now active
    Committed(Screen),
    /// A newer navigation was issued while this one was deferred
    Superseded,
}

/// Page router with session gating.
pub struct NavigationDispatcher {
    state: watch::Sender<NavigationState>,
    session: watch::Receiver<SessionSnapshot>,
    feedback: Arc<FeedbackController>,
    heavy_delay: Duration,
    /// Id of the most recently issued navigation
    sequence: Mutex<u64>,
}

impl NavigationDispatcher {
    pub fn new(
        session: watch::Receiver<SessionSnapshot>,
        feedback: Arc<FeedbackController>,
        heavy_delay: Duration,
    ) -> Self {
        let (state, _) = watch::channel(NavigationState::default());
        Self {
            state,
            session,
            feedback,
            heavy_delay,
            sequence: Mutex::new(0),
        }
    }

    pub fn state(&self) -> NavigationState {
        self.state.borrow().clone()
    }

    pub fn current_screen(&self) -> Screen {
        self.state.borrow().screen
    }

    pub fn subscribe(&self) -> watch::Receiver<NavigationState> {
        self.state.subscribe()
    }

    /// Screen actually shown for `requested` given the current session.
    pub fn resolve(&self, requested: Screen) -> Screen {
        if requested.requires_auth() && !self.session.borrow().has_session() {
            GATED_FALLBACK
        } else {
            requested
        }
    }

    /// Navigate to `requested`, handing `payload` to the destination.
    pub async fn navigate(&self, requested: Screen, payload: Option<Value>) -> NavigationOutcome {
        let current = self.current_screen();
        if requested == current {
            return NavigationOutcome::Unchanged;
        }

        let target = self.resolve(requested);
        if target != requested {
            tracing::info!(
                requested = requested.id(),
                "Access denied without session, redirecting to {}",
                target.id()
            );
        }
        if target == current {
            return NavigationOutcome::Unchanged;
        }

        let ticket = self.issue();
        if target.is_heavy() {
            let delay = self.heavy_delay;
            let loaded = self
                .feedback
                .run_tracked(
                    || async move {
                        tokio::time::sleep(delay).await;
                        Ok::<_, RemoteError>(())
                    },
                    None,
                    None,
                )
                .await;
            if loaded.is_err() {
                return NavigationOutcome::Superseded;
            }
        }

        if self.commit(ticket, target, payload) {
            NavigationOutcome::Committed(target)
        } else {
            tracing::debug!(screen = target.id(), "Deferred navigation superseded");
            NavigationOutcome::Superseded
        }
    }

    fn issue(&self) -> u64 {
        let mut sequence = self.sequence.lock();
        *sequence = sequence.wrapping_add(1);
        *sequence
    }

    /// Commit screen and payload in one write, unless a newer navigation was issued.
    fn commit(&self, ticket: u64, screen: Screen, payload: Option<Value>) -> bool {
        let sequence = self.sequence.lock();
        if *sequence != ticket {
            return false;
        }
        self.state.send_replace(NavigationState { screen, payload });
        tracing::info!(screen = screen.id(), "Navigated");
        true
    }
}

#[async_trait]
impl EntryRedirect for NavigationDispatcher {
    async fn redirect_to_entry(&self) {
        if self.current_screen() == ENTRY_SCREEN {
            return;
        }
        let ticket = self.issue();
        self.commit(ticket, ENTRY_SCREEN, None);
    }
}
