//! Inactivity countdown for an authenticated session.
//!
//! The timer is armed when a session is established and rearmed from scratch on every
//! qualifying input event. The running countdown is always cancelled before a new one
//! starts, so at most one expiry callback can be pending.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Raw input event kinds forwarded by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    PointerDown,
    KeyDown,
    TouchStart,
    PointerMove,
    Scroll,
    Wheel,
}

impl InputKind {
    /// Whether this kind of event counts as user activity.
    ///
    /// Continuous events (moves, scrolling) are excluded so that a resting pointer or a
    /// momentum scroll does not keep a session alive.
    pub fn is_qualifying(self) -> bool {
        matches!(
            self,
            InputKind::PointerDown | InputKind::KeyDown | InputKind::TouchStart
        )
    }
}

/// Called once when the countdown runs out.
pub type ExpireCallback = Arc<dyn Fn() + Send + Sync>;

struct TimerSlot {
    generation: u64,
    deadline: Option<Instant>,
    handle: Option<JoinHandle<()>>,
    on_expire: Option<ExpireCallback>,
}

impl TimerSlot {
    fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.deadline = None;
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Cancelable inactivity countdown.
pub struct InactivityTimer {
    timeout: Duration,
    slot: Arc<Mutex<TimerSlot>>,
}

impl InactivityTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            slot: Arc::new(Mutex::new(TimerSlot {
                generation: 0,
                deadline: None,
                handle: None,
                on_expire: None,
            })),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start a fresh countdown that calls `on_expire` when it runs out.
    pub fn arm(&self, on_expire: ExpireCallback) {
        let mut slot = self.slot.lock();
        slot.on_expire = Some(on_expire);
        self.restart(&mut slot);
    }

    /// Restart the countdown at the full duration. Returns `false` when not armed.
    pub fn reset(&self) -> bool {
        let mut slot = self.slot.lock();
        if slot.on_expire.is_none() {
            return false;
        }
        self.restart(&mut slot);
        true
    }

    /// Cancel the countdown.
    pub fn disarm(&self) {
        let mut slot = self.slot.lock();
        slot.cancel();
        slot.on_expire = None;
    }

    pub fn is_armed(&self) -> bool {
        self.slot.lock().on_expire.is_some()
    }

    /// When the current countdown runs out, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.slot.lock().deadline
    }

    fn restart(&self, slot: &mut TimerSlot) {
        slot.cancel();

        let generation = slot.generation;
        let deadline = Instant::now() + self.timeout;
        let shared = Arc::clone(&self.slot);
        slot.deadline = Some(deadline);
        slot.handle = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;

            let on_expire = {
                let mut slot = shared.lock();
                if slot.generation != generation {
                    return;
                }
                slot.handle = None;
                slot.deadline = None;
                slot.on_expire.take()
            };
            if let Some(on_expire) = on_expire {
                tracing::debug!("Inactivity countdown expired");
                on_expire();
            }
        }));
    }
}

impl Drop for InactivityTimer {
    fn drop(&mut self) {
        self.slot.lock().cancel();
    }
}
