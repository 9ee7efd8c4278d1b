use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::personnummer::Personnummer;

/// An initiation newer than this still blocks a duplicate attempt.
pub const ONGOING_TTL: Duration = Duration::from_secs(30);

/// Records older than this are removed by the periodic sweep.
pub const SWEEP_MAX_AGE: Duration = Duration::from_secs(300);

/// Process-wide guard against duplicate authentication initiations for the
/// same identity.
///
/// The provider misbehaves on two simultaneous orders for one person, so a
/// second `start` within the staleness window is refused. This is a
/// best-effort single-process guard, not a distributed lock; the provider
/// remains the source of truth.
#[derive(Debug, Default)]
pub struct OngoingTracker {
    ongoing: Mutex<HashMap<Personnummer, Instant>>,
}

impl OngoingTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim `identity` for a new initiation.
    ///
    /// Returns `false` if a fresh record already exists. Check and insert
    /// happen under a single lock acquisition, so two near-simultaneous
    /// claims for the same identity cannot both succeed.
    pub fn try_begin(&self, identity: &Personnummer) -> bool {
        self.try_begin_at(identity, Instant::now())
    }

    fn try_begin_at(&self, identity: &Personnummer, now: Instant) -> bool {
        let mut ongoing = self.lock();
        match ongoing.get(identity) {
            Some(started) if now.saturating_duration_since(*started) < ONGOING_TTL => false,
            _ => {
                ongoing.insert(identity.clone(), now);
                true
            }
        }
    }

    /// Whether a fresh initiation exists for `identity`.
    ///
    /// A stale record found during the check is deleted on the spot.
    pub fn has_ongoing(&self, identity: &Personnummer) -> bool {
        self.has_ongoing_at(identity, Instant::now())
    }

    fn has_ongoing_at(&self, identity: &Personnummer, now: Instant) -> bool {
        let mut ongoing = self.lock();
        match ongoing.get(identity) {
            Some(started) if now.saturating_duration_since(*started) < ONGOING_TTL => true,
            Some(_) => {
                ongoing.remove(identity);
                false
            }
            None => false,
        }
    }

    /// Insert or refresh the record for `identity` unconditionally.
    ///
    /// Does not check for duplicates; prefer [`try_begin`](Self::try_begin)
    /// when the check and the insert must be one operation.
    pub fn set_ongoing(&self, identity: &Personnummer) {
        self.lock().insert(identity.clone(), Instant::now());
    }

    /// Delete the record for `identity`. No error if absent.
    pub fn clear_ongoing(&self, identity: &Personnummer) {
        self.lock().remove(identity);
    }

    /// Drop records past the sweep cutoff. Returns how many were removed.
    ///
    /// The sweep is a safety net; explicit clears on cancel and completion
    /// remain the primary removal path.
    pub fn sweep_stale(&self) -> usize {
        self.sweep_stale_at(Instant::now())
    }

    fn sweep_stale_at(&self, now: Instant) -> usize {
        let mut ongoing = self.lock();
        let before = ongoing.len();
        ongoing.retain(|_, started| now.saturating_duration_since(*started) < SWEEP_MAX_AGE);
        before - ongoing.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Personnummer, Instant>> {
        self.ongoing.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
