//! Session expiry and reclamation.
//!
//! Completed sessions linger for a short TTL so late status polls still
//! resolve, then their chunk data is reclaimed. Abandoned sessions (never
//! completed) are reclaimed after a much longer TTL. The scheduler combines
//! an in-process due queue, fed on each completion for promptness, with a
//! periodic durable sweep that re-derives work from the session store, so
//! reclamation survives a process restart.

use backlot_core::SessionId;
use backlot_core::config::ServerConfig;
use backlot_sessions::{SessionStore, StoreResult};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Maximum sessions reclaimed per sweep batch.
const SWEEP_BATCH_SIZE: u32 = 100;

/// A reclamation scheduled for a specific time.
#[derive(Clone, Copy, Debug)]
pub struct ScheduledReclaim {
    /// Session to reclaim.
    pub id: SessionId,
    /// When it becomes reclaimable.
    pub due: OffsetDateTime,
}

/// Cloneable handle for scheduling reclamations.
#[derive(Clone)]
pub struct ExpiryHandle {
    tx: mpsc::UnboundedSender<ScheduledReclaim>,
}

impl ExpiryHandle {
    /// Schedule a session for reclamation at `due`.
    ///
    /// Best effort: if the scheduler is gone the durable sweep still picks
    /// the session up, so a send failure is not an error.
    pub fn schedule(&self, id: SessionId, due: OffsetDateTime) {
        if self.tx.send(ScheduledReclaim { id, due }).is_err() {
            tracing::debug!(session_id = %id, "Expiry scheduler unavailable, sweep will reclaim");
        }
    }

    /// Build a handle around a raw channel. **For testing only.**
    pub fn for_testing(tx: mpsc::UnboundedSender<ScheduledReclaim>) -> Self {
        Self { tx }
    }
}

/// Background worker that reclaims expired sessions.
pub struct ExpiryScheduler {
    sessions: Arc<dyn SessionStore>,
    completed_ttl: time::Duration,
    abandoned_ttl: time::Duration,
    sweep_interval: std::time::Duration,
    rx: mpsc::UnboundedReceiver<ScheduledReclaim>,
    queue: BinaryHeap<Reverse<(OffsetDateTime, Uuid)>>,
}

impl ExpiryScheduler {
    /// Create a scheduler and its scheduling handle.
    pub fn new(sessions: Arc<dyn SessionStore>, config: &ServerConfig) -> (Self, ExpiryHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            sessions,
            completed_ttl: config.completed_session_ttl(),
            abandoned_ttl: config.abandoned_session_ttl(),
            sweep_interval: std::time::Duration::from_secs(config.sweep_interval_secs.max(1)),
            rx,
            queue: BinaryHeap::new(),
        };
        (scheduler, ExpiryHandle { tx })
    }

    /// Spawn the scheduler loop.
    ///
    /// The caller keeps the handle; the loop only exits when the runtime
    /// shuts down.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        tracing::info!(
            sweep_interval_secs = self.sweep_interval.as_secs(),
            "Expiry scheduler started"
        );

        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut channel_open = true;

        loop {
            self.reclaim_due().await;

            // Sleep until the earliest queued deadline, or idle a full sweep
            // interval when nothing is queued.
            let idle = match self.queue.peek() {
                Some(Reverse((due, _))) => {
                    let wait = *due - OffsetDateTime::now_utc();
                    if wait.is_positive() {
                        wait.unsigned_abs()
                    } else {
                        continue;
                    }
                }
                None => self.sweep_interval,
            };

            tokio::select! {
                _ = sweep.tick() => {
                    match Self::sweep_once(
                        self.sessions.as_ref(),
                        self.completed_ttl,
                        self.abandoned_ttl,
                    )
                    .await
                    {
                        Ok(0) => {}
                        Ok(reclaimed) => {
                            tracing::info!(reclaimed, "Expiry sweep reclaimed sessions");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Expiry sweep failed");
                        }
                    }
                }
                msg = self.rx.recv(), if channel_open => {
                    match msg {
                        Some(reclaim) => {
                            self.queue.push(Reverse((reclaim.due, *reclaim.id.as_uuid())));
                        }
                        None => {
                            // All handles dropped; the durable sweep keeps working.
                            channel_open = false;
                        }
                    }
                }
                _ = tokio::time::sleep(idle) => {}
            }
        }
    }

    /// Delete all queued sessions whose deadline has passed.
    async fn reclaim_due(&mut self) {
        let now = OffsetDateTime::now_utc();
        while let Some(Reverse((due, uuid))) = self.queue.peek().copied() {
            if due > now {
                break;
            }
            self.queue.pop();
            let id = SessionId::from(uuid);
            match self.sessions.delete(id).await {
                Ok(()) => tracing::debug!(session_id = %id, "Reclaimed expired session"),
                Err(e) => {
                    // The sweep will retry; dropping the entry here is safe.
                    tracing::warn!(session_id = %id, error = %e, "Failed to reclaim session");
                }
            }
        }
    }

    /// Run one durable sweep over the session store, deleting everything
    /// past its TTL. Returns the number of sessions reclaimed.
    pub async fn sweep_once(
        sessions: &dyn SessionStore,
        completed_ttl: time::Duration,
        abandoned_ttl: time::Duration,
    ) -> StoreResult<usize> {
        let now = OffsetDateTime::now_utc();
        let completed_before = now - completed_ttl;
        let created_before = now - abandoned_ttl;

        let mut reclaimed = 0;
        loop {
            let batch = sessions
                .reclaimable_sessions(completed_before, created_before, SWEEP_BATCH_SIZE)
                .await?;
            let batch_len = batch.len();
            for id in batch {
                sessions.delete(id).await?;
                reclaimed += 1;
            }
            if batch_len < SWEEP_BATCH_SIZE as usize {
                break;
            }
        }
        Ok(reclaimed)
    }
}
