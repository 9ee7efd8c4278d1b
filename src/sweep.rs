use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::session::SessionBackend;
use crate::tracker::OngoingTracker;

/// Cadence of the initiation-tracker sweep.
pub const TRACKER_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Cadence of the memory-store sweep.
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Owns the recurring cleanup tasks.
///
/// Dropping the handle aborts them, so tests and shutdown paths tear down
/// cleanly instead of leaking ambient timers. The sweeps are a safety net;
/// explicit clears on cancel and completion remain the primary removal path.
///
/// Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct SweeperHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SweeperHandle {
    #[must_use]
    pub fn spawn(tracker: Arc<OngoingTracker>, sessions: Arc<SessionBackend>) -> Self {
        let tracker_task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(TRACKER_SWEEP_INTERVAL);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so the sweep
            // runs one full interval after startup.
            tick.tick().await;
            loop {
                tick.tick().await;
                let removed = tracker.sweep_stale();
                if removed > 0 {
                    tracing::debug!(removed, "swept stale initiation records");
                }
            }
        });

        let session_task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(SESSION_SWEEP_INTERVAL);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tick.tick().await;
            loop {
                tick.tick().await;
                let removed = sessions.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired session records");
                }
            }
        });

        Self {
            tasks: vec![tracker_task, session_task],
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessions;

    #[tokio::test]
    async fn drop_aborts_the_tasks() {
        let tracker = Arc::new(OngoingTracker::new());
        let sessions = Arc::new(SessionBackend::Memory(MemorySessions::new(
            Duration::from_secs(600),
        )));

        let handle = SweeperHandle::spawn(tracker, sessions);
        assert_eq!(handle.tasks.len(), 2);

        let aborts: Vec<_> = handle.tasks.iter().map(JoinHandle::abort_handle).collect();
        drop(handle);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(aborts.iter().all(tokio::task::AbortHandle::is_finished));
    }
}
