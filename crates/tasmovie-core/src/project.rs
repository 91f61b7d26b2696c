//! Project ids tie savestates to the movie they were made with.

use std::time::{SystemTime, UNIX_EPOCH};

use sha1::{Digest, Sha1};

/// Wall-clock source used to seed new project ids.
pub trait Clock {
    /// Seconds since the Unix epoch and the sub-second part in nanoseconds.
    fn now(&self) -> (u64, u32);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> (u64, u32) {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        (elapsed.as_secs(), elapsed.subsec_nanos())
    }
}

/// Fresh 40 hex digit project id derived from the current time and `salt`.
pub fn generate_project_id(clock: &impl Clock, salt: &[u8]) -> String {
    let (secs, nanos) = clock.now();
    let mut hasher = Sha1::new();
    hasher.update(secs.to_be_bytes());
    hasher.update(nanos.to_be_bytes());
    hasher.update(salt);
    hex::encode(hasher.finalize())
}
