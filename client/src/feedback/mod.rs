//! # Operation Feedback
//!
//! [`FeedbackController`] turns every asynchronous backend call into one shared visual
//! status (loading / success / error / warning), sanitizes failure messages before they
//! are displayed, and slows down retries after repeated failures.
//!
//! ## Phase Machine
//!
//! ```text
//!            run_tracked / show_loading
//!   Idle ─────────────────────────────────▶ Pending
//!    ▲                                        │
//!    │ display timeout (3s)                   ├── Ok + message ──▶ Succeeded ─┐
//!    │                                        ├── Ok ───────────▶ Idle       │
//!    │                                        └── Err ──────────▶ Failed ─────┤
//!    │                                                                        │
//!    └──────────────────────── Succeeded / Failed / Warned ◀──────────────────┘
//! ```
//!
//! Exactly one phase is active at a time. Overlapping tracked operations share the
//! indicator (last write wins) while each caller still receives its own result.
//!
//! ## Runtime
//!
//! Auto-revert timers are Tokio tasks: every phase setter must be called from within a
//! Tokio runtime.

pub mod sanitizer;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::config::ClientConfig;
use crate::core::error::ErrorPayload;

pub use sanitizer::{sanitize, sanitize_message, SanitizedKind, SESSION_TIMEOUT_NOTICE};

/// Visual feedback phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
    Warned,
}

impl Phase {
    /// Phases that revert to [`Phase::Idle`] on their own and carry a message.
    pub fn is_transient(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed | Phase::Warned)
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Pending => "pending",
            Phase::Succeeded => "succeeded",
            Phase::Failed => "failed",
            Phase::Warned => "warned",
        }
    }
}

/// Observable feedback state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedbackState {
    pub phase: Phase,
    /// Present only while the phase is transient
    pub message: Option<String>,
    /// Consecutive failed tracked operations since the last success
    pub failure_streak: u32,
    /// Monotonic time of the most recent failure
    pub last_failure: Option<Instant>,
}

/// User-facing notice pushed by screens through their injected `notify` callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
    Warning(String),
}

/// Backoff before a new tracked operation: `min(streak × step, cap)`.
pub fn backoff_delay(failure_streak: u32, step: Duration, cap: Duration) -> Duration {
    step.saturating_mul(failure_streak).min(cap)
}

struct RevertSlot {
    /// Bumped on every phase write; a revert only lands if nothing newer was written
    epoch: u64,
    handle: Option<JoinHandle<()>>,
}

/// Shared visual status for asynchronous operations.
///
/// Construct once per process (see [`crate::app::App`]) and share it as
/// `Arc<FeedbackController>`; it is the only writer of [`FeedbackState`].
///
/// # Example
///
/// ```rust,no_run
/// use client::core::config::ClientConfig;
/// use client::core::error::RemoteError;
/// use client::feedback::{FeedbackController, Phase};
///
/// # async fn demo() {
/// let feedback = FeedbackController::new(&ClientConfig::default());
///
/// let balance = feedback
///     .run_tracked(
///         || async { Ok::<_, RemoteError>(1250.75) },
///         Some("Balance updated"),
///         None,
///     )
///     .await;
///
/// assert_eq!(balance, Ok(1250.75));
/// assert_eq!(feedback.state().phase, Phase::Succeeded);
/// # }
/// ```
pub struct FeedbackController {
    state: Arc<watch::Sender<FeedbackState>>,
    revert: Arc<Mutex<RevertSlot>>,
    display: Duration,
    backoff_step: Duration,
    backoff_cap: Duration,
}

impl FeedbackController {
    pub fn new(config: &ClientConfig) -> Self {
        let (state, _) = watch::channel(FeedbackState::default());
        Self {
            state: Arc::new(state),
            revert: Arc::new(Mutex::new(RevertSlot {
                epoch: 0,
                handle: None,
            })),
            display: config.feedback_display,
            backoff_step: config.backoff_step,
            backoff_cap: config.backoff_cap,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> FeedbackState {
        self.state.borrow().clone()
    }

    /// Observe state changes (for rendering).
    pub fn subscribe(&self) -> watch::Receiver<FeedbackState> {
        self.state.subscribe()
    }

    /// Run `action` with loading/success/error feedback.
    ///
    /// Waits out the failure backoff first, then shows `Pending`. On success the
    /// failure streak resets and `success_message` (if any) is shown. On failure the
    /// streak grows, `error_message` or the sanitized error is shown, and the original
    /// error is returned unchanged.
    pub async fn run_tracked<T, E, F, Fut>(
        &self,
        action: F,
        success_message: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ErrorPayload,
    {
        let op_id = Uuid::new_v4();
        let span = tracing::debug_span!("tracked_op", %op_id);

        async move {
            self.wait_for_backoff().await;
            self.transition(Phase::Pending, None, |_| {});

            match action().await {
                Ok(value) => {
                    match success_message {
                        Some(message) => self.transition(
                            Phase::Succeeded,
                            Some(message.to_string()),
                            |state| state.failure_streak = 0,
                        ),
                        None => self.transition(Phase::Idle, None, |state| state.failure_streak = 0),
                    }
                    tracing::debug!("Tracked operation succeeded");
                    Ok(value)
                }
                Err(err) => {
                    let display = match error_message {
                        Some(message) => message.to_string(),
                        None => sanitize(&err),
                    };
                    let failed_at = Instant::now();
                    self.transition(Phase::Failed, Some(display), |state| {
                        state.failure_streak = state.failure_streak.saturating_add(1);
                        state.last_failure = Some(failed_at);
                    });

                    tracing::warn!(
                        raw_error = %err.to_remote_error(),
                        failure_streak = self.state.borrow().failure_streak,
                        "Tracked operation failed"
                    );
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    pub fn show_loading(&self) {
        self.transition(Phase::Pending, None, |_| {});
    }

    /// Leave `Pending`; a visible success/error/warning is left alone.
    pub fn hide_loading(&self) {
        if self.state.borrow().phase == Phase::Pending {
            self.transition(Phase::Idle, None, |_| {});
        }
    }

    pub fn show_success(&self, message: impl Into<String>) {
        self.transition(Phase::Succeeded, Some(message.into()), |_| {});
    }

    pub fn show_error(&self, message: impl Into<String>) {
        self.transition(Phase::Failed, Some(message.into()), |_| {});
    }

    pub fn show_warning(&self, message: impl Into<String>) {
        self.transition(Phase::Warned, Some(message.into()), |_| {});
    }

    /// Back to the initial state, failure streak included.
    pub fn reset(&self) {
        self.transition(Phase::Idle, None, |state| {
            state.failure_streak = 0;
            state.last_failure = None;
        });
    }

    /// Display a screen-originated notice.
    pub fn notify(&self, notice: Notice) {
        match notice {
            Notice::Success(message) => self.show_success(message),
            Notice::Error(message) => self.show_error(message),
            Notice::Warning(message) => self.show_warning(message),
        }
    }

    async fn wait_for_backoff(&self) {
        let (streak, last_failure) = {
            let state = self.state.borrow();
            (state.failure_streak, state.last_failure)
        };
        if streak == 0 {
            return;
        }

        let delay = backoff_delay(streak, self.backoff_step, self.backoff_cap);
        if let Some(last_failure) = last_failure {
            let elapsed = last_failure.elapsed();
            if elapsed < delay {
                let remaining = delay - elapsed;
                tracing::debug!(
                    failure_streak = streak,
                    remaining_ms = remaining.as_millis() as u64,
                    "Delaying operation after recent failures"
                );
                tokio::time::sleep(remaining).await;
            }
        }
    }

    /// Single write path for the phase: cancels the pending auto-revert, applies the
    /// new phase, and schedules a new revert for transient phases.
    fn transition(
        &self,
        phase: Phase,
        message: Option<String>,
        update: impl FnOnce(&mut FeedbackState),
    ) {
        let mut slot = self.revert.lock();
        slot.epoch = slot.epoch.wrapping_add(1);
        if let Some(handle) = slot.handle.take() {
            handle.abort();
        }

        let message = if phase.is_transient() { message } else { None };
        self.state.send_modify(|state| {
            state.phase = phase;
            state.message = message;
            update(state);
        });
        tracing::trace!(phase = phase.label(), "Feedback phase changed");

        if phase.is_transient() {
            let epoch = slot.epoch;
            let state = Arc::clone(&self.state);
            let revert = Arc::clone(&self.revert);
            let display = self.display;

            slot.handle = Some(tokio::spawn(async move {
                tokio::time::sleep(display).await;

                let mut slot = revert.lock();
                if slot.epoch != epoch {
                    return;
                }
                slot.handle = None;
                state.send_modify(|state| {
                    state.phase = Phase::Idle;
                    state.message = None;
                });
            }));
        }
    }
}

impl Drop for FeedbackController {
    fn drop(&mut self) {
        if let Some(handle) = self.revert.lock().handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RemoteError;

    fn controller() -> FeedbackController {
        FeedbackController::new(&ClientConfig::default())
    }

    async fn fail(feedback: &FeedbackController) -> Result<(), RemoteError> {
        feedback
            .run_tracked(
                || async { Err::<(), _>(RemoteError::text("Failed to fetch")) },
                None,
                None,
            )
            .await
    }

    fn assert_waited(start: Instant, millis: u64) {
        let elapsed = start.elapsed();
        let expected = Duration::from_millis(millis);
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(5),
            "waited {:?}, expected {:?}",
            elapsed,
            expected
        );
    }

    async fn succeed(feedback: &FeedbackController) -> Result<u32, RemoteError> {
        feedback
            .run_tracked(|| async { Ok::<_, RemoteError>(7) }, None, None)
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_state_is_idle() {
        let feedback = controller();
        let state = feedback.state();
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.message.is_none());
        assert_eq!(state.failure_streak, 0);
        assert!(state.last_failure.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_without_message_goes_idle() {
        let feedback = controller();
        assert_eq!(succeed(&feedback).await, Ok(7));
        assert_eq!(feedback.state().phase, Phase::Idle);
        assert!(feedback.state().message.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_is_visible_while_action_runs() {
        let feedback = controller();
        let mut rx = feedback.subscribe();

        let result = feedback
            .run_tracked(
                || async {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok::<_, RemoteError>("done")
                },
                None,
                None,
            )
            .await;
        assert_eq!(result, Ok("done"));

        // The receiver saw at least one change; the latest value is idle again
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_phase_during_action() {
        let feedback = Arc::new(controller());
        let observed = Arc::new(Mutex::new(None));

        let inner = Arc::clone(&feedback);
        let seen = Arc::clone(&observed);
        feedback
            .run_tracked(
                move || async move {
                    *seen.lock() = Some(inner.state());
                    Ok::<_, RemoteError>(())
                },
                None,
                None,
            )
            .await
            .unwrap();

        let during = observed.lock().clone().expect("action ran");
        assert_eq!(during.phase, Phase::Pending);
        assert!(during.message.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_message_auto_reverts() {
        let feedback = controller();
        feedback
            .run_tracked(|| async { Ok::<_, RemoteError>(()) }, Some("Deposit requested"), None)
            .await
            .unwrap();

        let state = feedback.state();
        assert_eq!(state.phase, Phase::Succeeded);
        assert_eq!(state.message.as_deref(), Some("Deposit requested"));

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(feedback.state().phase, Phase::Succeeded);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let state = feedback.state();
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.message.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_sanitized_and_propagated() {
        let feedback = controller();
        let raw = RemoteError::structured(
            "invalid input syntax for type uuid",
            Some("22P02".to_string()),
        );
        let expected = raw.clone();

        let result = feedback
            .run_tracked(|| async move { Err::<(), _>(raw) }, None, None)
            .await;

        assert_eq!(result, Err(expected));
        let state = feedback.state();
        assert_eq!(state.phase, Phase::Failed);
        assert_eq!(state.message.as_deref(), Some("Operation failed. Please try again."));
        assert_eq!(state.failure_streak, 1);
        assert!(state.last_failure.is_some());

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(feedback.state().phase, Phase::Idle);
        // The streak outlives the visual phase
        assert_eq!(feedback.state().failure_streak, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_error_message_is_used() {
        let feedback = controller();
        let _ = feedback
            .run_tracked(
                || async { Err::<(), _>(RemoteError::text("relation \"pix\" does not exist")) },
                None,
                Some("Could not load your PIX keys."),
            )
            .await;
        assert_eq!(
            feedback.state().message.as_deref(),
            Some("Could not load your PIX keys.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_streak_counts_and_resets() {
        let feedback = controller();
        for expected in 1..=4 {
            assert!(fail(&feedback).await.is_err());
            assert_eq!(feedback.state().failure_streak, expected);
        }

        assert!(succeed(&feedback).await.is_ok());
        assert_eq!(feedback.state().failure_streak, 0);
    }

    #[test]
    fn test_backoff_delay_growth() {
        let step = Duration::from_millis(1000);
        let cap = Duration::from_millis(5000);
        let expected = [0, 1000, 2000, 3000, 4000, 5000, 5000, 5000];

        let mut previous = Duration::ZERO;
        for (streak, millis) in expected.iter().enumerate() {
            let delay = backoff_delay(streak as u32, step, cap);
            assert_eq!(delay, Duration::from_millis(*millis));
            assert!(delay >= previous);
            previous = delay;
        }
        assert_eq!(backoff_delay(u32::MAX, step, cap), cap);
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_failures_then_success_resets_backoff() {
        let feedback = controller();

        let start = Instant::now();
        assert!(fail(&feedback).await.is_err());
        assert_waited(start, 0);

        for expected_ms in [1000u64, 2000] {
            let start = Instant::now();
            assert!(fail(&feedback).await.is_err());
            assert_waited(start, expected_ms);
        }
        assert_eq!(feedback.state().failure_streak, 3);

        // Fourth attempt waits 3000ms, then succeeds
        let start = Instant::now();
        assert!(succeed(&feedback).await.is_ok());
        assert_waited(start, 3000);
        assert_eq!(feedback.state().failure_streak, 0);

        // No backoff right after a success
        let start = Instant::now();
        assert!(fail(&feedback).await.is_err());
        assert_waited(start, 0);

        // A fresh failure only costs one step again
        let start = Instant::now();
        assert!(succeed(&feedback).await.is_ok());
        assert_waited(start, 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_counts_time_already_elapsed() {
        let feedback = controller();
        assert!(fail(&feedback).await.is_err());

        tokio::time::sleep(Duration::from_millis(600)).await;
        let start = Instant::now();
        assert!(succeed(&feedback).await.is_ok());
        assert_waited(start, 400);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_operations_keep_independent_results() {
        let feedback = controller();

        let slow = feedback.run_tracked(
            || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, RemoteError>("slow")
            },
            Some("slow done"),
            None,
        );
        let fast = feedback.run_tracked(
            || async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err::<&str, _>(RemoteError::text("Insufficient funds"))
            },
            None,
            None,
        );

        let (slow, fast) = tokio::join!(slow, fast);
        assert_eq!(slow, Ok("slow"));
        assert_eq!(fast, Err(RemoteError::text("Insufficient funds")));

        // The slow operation finished last, so its outcome drives the indicator
        let state = feedback.state();
        assert_eq!(state.phase, Phase::Succeeded);
        assert_eq!(state.message.as_deref(), Some("slow done"));
        assert_eq!(state.failure_streak, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_phase_cancels_pending_revert() {
        let feedback = controller();
        feedback.show_error("first");

        tokio::time::sleep(Duration::from_millis(2000)).await;
        feedback.show_warning("second");

        // The first revert would have fired at 3000ms
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let state = feedback.state();
        assert_eq!(state.phase, Phase::Warned);
        assert_eq!(state.message.as_deref(), Some("second"));

        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(feedback.state().phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_setters() {
        let feedback = controller();

        feedback.show_loading();
        assert_eq!(feedback.state().phase, Phase::Pending);
        assert!(feedback.state().message.is_none());

        feedback.hide_loading();
        assert_eq!(feedback.state().phase, Phase::Idle);

        feedback.show_success("Saved");
        assert_eq!(feedback.state().phase, Phase::Succeeded);
        // hide_loading never clears a visible result
        feedback.hide_loading();
        assert_eq!(feedback.state().phase, Phase::Succeeded);

        feedback.notify(Notice::Warning("Check your PIX key".to_string()));
        assert_eq!(feedback.state().phase, Phase::Warned);
        assert_eq!(feedback.state().message.as_deref(), Some("Check your PIX key"));

        feedback.reset();
        assert_eq!(feedback.state(), FeedbackState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_backoff() {
        let feedback = controller();
        for _ in 0..3 {
            let _ = fail(&feedback).await;
        }
        feedback.reset();

        let start = Instant::now();
        assert!(succeed(&feedback).await.is_ok());
        assert_waited(start, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_present_only_in_transient_phases() {
        let feedback = controller();
        let mut rx = feedback.subscribe();
        let observed = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&observed);
        let watcher = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                sink.lock().push(rx.borrow_and_update().clone());
            }
        });

        feedback.show_loading();
        tokio::task::yield_now().await;
        feedback.show_success("ok");
        tokio::task::yield_now().await;
        let _ = fail(&feedback).await;
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_secs(4)).await;

        drop(feedback);
        watcher.await.unwrap();

        let observed = observed.lock();
        assert!(!observed.is_empty());
        for state in observed.iter() {
            assert_eq!(state.message.is_some(), state.phase.is_transient(), "{:?}", state);
        }
    }
}
