use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Rate limit for the conflict warning: at most one warning per cooldown
/// window, shared by every source that can detect a conflict.
pub struct ConflictGate {
    last_shown: Mutex<Option<Instant>>,
    cooldown: Duration,
}

impl ConflictGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_shown: Mutex::new(None),
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn is_cooling_down(&self) -> bool {
        let last = self.last_shown.lock().unwrap();
        matches!(*last, Some(at) if at.elapsed() < self.cooldown)
    }

    /// Claim the right to show a warning now. Returns false inside the
    /// cooldown window, otherwise records the time and returns true.
    pub fn try_acquire(&self) -> bool {
        let mut last = self.last_shown.lock().unwrap();
        if let Some(at) = *last {
            if at.elapsed() < self.cooldown {
                return false;
            }
        }
        *last = Some(Instant::now());
        true
    }
}
