/*
    pacer.rs - Fixed-delay pacing between destination mutations

    The remote API rate-limits per route; a restoration run stays under
    the limits by sleeping a fixed interval after every mutating call.
    Member re-admission hits a stricter route than structure creation, so
    the two classes carry different delays. Deliberately dumb: no
    adaptive backoff, no jitter, one mutating call in flight at a time
    (the restore phases are sequential anyway).
*/

use crate::config::RestoreConfig;
use std::time::Duration;

/// Which rate-limit bucket a mutating call lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallClass {
    /// Role, channel, overwrite, and member-role mutations
    Creation,
    /// Member re-admission via a delegated-access token
    Admission,
}

/// Enforces a minimum inter-call delay around destination mutations
#[derive(Debug, Clone)]
pub struct Pacer {
    creation_delay: Duration,
    admission_delay: Duration,
}

impl Pacer {
    pub fn new(creation_delay: Duration, admission_delay: Duration) -> Self {
        Self {
            creation_delay,
            admission_delay,
        }
    }

    pub fn from_config(config: &RestoreConfig) -> Self {
        Self::new(config.creation_delay, config.admission_delay)
    }

    /// A pacer that never sleeps, for tests
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Sleep out the post-call delay for one call class
    pub async fn throttle(&self, class: CallClass) {
        let delay = match class {
            CallClass::Creation => self.creation_delay,
            CallClass::Admission => self.admission_delay,
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
