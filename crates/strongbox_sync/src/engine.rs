//! The reconciliation engine.

use crate::error::{SyncError, SyncResult};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use strongbox_core::{compare, CancelToken, Dominance, Record, RecordStore};
use tracing::{debug, warn};
use uuid::Uuid;

/// Records fetched per page during a sweep.
pub const DEFAULT_PAGE_SIZE: usize = 30;

/// Wait between cycles.
pub const DEFAULT_TICK: Duration = Duration::from_secs(5);

/// Budget for the bounded first sync after sign-in.
pub const DEFAULT_FIRST_SYNC_DEADLINE: Duration = Duration::from_secs(5);

/// Granularity at which the inter-cycle wait observes cancellation.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Prefix given to the renamed loser of a conflict.
const CONFLICT_COPY_PREFIX: &str = "(COPY) ";

/// Counters accumulated across cycles.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Cycles that completed both sweeps.
    pub cycles_completed: u64,
    /// Records written into either store by reconciliation.
    pub records_copied: u64,
    /// Conflicts fanned out into copies.
    pub conflicts_resolved: u64,
    /// Message of the most recent failed cycle, cleared on success.
    pub last_error: Option<String>,
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleReport {
    /// Records written into either store.
    pub copied: u64,
    /// Conflicts fanned out.
    pub conflicts: u64,
}

/// The per-user background reconciliation task.
///
/// The engine holds the two stores, never shares record values between
/// them (every write hands over an independent clone), and observes
/// cancellation at page boundaries and between cycles. Run it on a
/// dedicated thread via [`run`](SyncEngine::run), or drive single
/// cycles with [`sync_cycle`](SyncEngine::sync_cycle).
pub struct SyncEngine {
    user_id: String,
    local: Arc<dyn RecordStore>,
    remote: Arc<dyn RecordStore>,
    tick: Duration,
    page_size: usize,
    cancel: CancelToken,
    stats: RwLock<SyncStats>,
}

impl SyncEngine {
    /// Creates an engine for one user over a local/remote store pair.
    pub fn new(
        user_id: impl Into<String>,
        local: Arc<dyn RecordStore>,
        remote: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            local,
            remote,
            tick: DEFAULT_TICK,
            page_size: DEFAULT_PAGE_SIZE,
            cancel: CancelToken::new(),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Sets the tick interval.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Sets the sweep page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Uses an externally owned cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A clone of the engine's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// A snapshot of the accumulated counters.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Runs cycles until the token is cancelled.
    ///
    /// A failed cycle is reported and swallowed; the next tick starts
    /// again from offset zero. This is the long-lived task spawned per
    /// signed-in user.
    pub fn run(&self) {
        loop {
            match self.sync_cycle() {
                Ok(report) => {
                    debug!(
                        user = %self.user_id,
                        copied = report.copied,
                        conflicts = report.conflicts,
                        "sync cycle completed"
                    );
                }
                Err(SyncError::Cancelled) => return,
                Err(e) => {
                    warn!(user = %self.user_id, error = %e, "sync cycle failed");
                    self.stats.write().last_error = Some(e.to_string());
                }
            }

            if self.wait_for_next_tick() {
                return;
            }
        }
    }

    /// Runs one full cycle: local into remote, then remote into local.
    pub fn sync_cycle(&self) -> SyncResult<CycleReport> {
        self.cycle(None)
    }

    /// Runs the bounded first sync.
    ///
    /// The deadline is observed between store calls; a call already in
    /// flight completes. Overrunning the budget aborts the cycle with
    /// [`SyncError::DeadlineElapsed`].
    pub fn first_sync(&self, deadline: Duration) -> SyncResult<CycleReport> {
        self.cycle(Some(Deadline::new(deadline)))
    }

    fn cycle(&self, deadline: Option<Deadline>) -> SyncResult<CycleReport> {
        let mut report = CycleReport::default();
        self.sweep(&*self.local, &*self.remote, deadline.as_ref(), &mut report)?;
        self.sweep(&*self.remote, &*self.local, deadline.as_ref(), &mut report)?;

        let mut stats = self.stats.write();
        stats.cycles_completed += 1;
        stats.records_copied += report.copied;
        stats.conflicts_resolved += report.conflicts;
        stats.last_error = None;
        Ok(report)
    }

    /// Reconciles every record of `source` into `target`.
    ///
    /// Writes use `update`, which creates absent records, so one sweep
    /// both propagates newer replicas forward and pulls newer target
    /// replicas back into the source.
    fn sweep(
        &self,
        source: &dyn RecordStore,
        target: &dyn RecordStore,
        deadline: Option<&Deadline>,
        report: &mut CycleReport,
    ) -> SyncResult<()> {
        let wrap =
            |e| SyncError::during_sweep(source.label(), target.label(), e);

        let mut offset = 0;
        loop {
            self.checkpoint(deadline)?;

            let page = source
                .list(&self.cancel, &self.user_id, offset, self.page_size)
                .map_err(wrap)?;
            if page.is_empty() {
                return Ok(());
            }

            for record in &page {
                match target.get(&self.cancel, &self.user_id, record.id) {
                    Err(e) if e.is_not_found() => {
                        target
                            .update(&self.cancel, &self.user_id, record)
                            .map_err(wrap)?;
                        report.copied += 1;
                    }
                    Err(e) => return Err(wrap(e)),
                    Ok(counterpart) => match compare(record, &counterpart) {
                        Dominance::Equal => {}
                        Dominance::LeftDominates => {
                            target
                                .update(&self.cancel, &self.user_id, record)
                                .map_err(wrap)?;
                            report.copied += 1;
                        }
                        Dominance::RightDominates => {
                            source
                                .update(&self.cancel, &self.user_id, &counterpart)
                                .map_err(wrap)?;
                            report.copied += 1;
                        }
                        Dominance::Conflict => {
                            // Keep both sides: the source replica wins
                            // the id, the target replica survives under
                            // a fresh id in both stores, so one cycle
                            // leaves both payloads everywhere.
                            target
                                .update(&self.cancel, &self.user_id, record)
                                .map_err(wrap)?;

                            let copy = renamed_copy(&counterpart);
                            source
                                .update(&self.cancel, &self.user_id, &copy)
                                .map_err(wrap)?;
                            target
                                .update(&self.cancel, &self.user_id, &copy)
                                .map_err(wrap)?;
                            report.copied += 3;
                            report.conflicts += 1;
                        }
                    },
                }
            }

            offset += self.page_size;
        }
    }

    fn checkpoint(&self, deadline: Option<&Deadline>) -> SyncResult<()> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        if let Some(deadline) = deadline {
            if deadline.elapsed() {
                return Err(SyncError::DeadlineElapsed {
                    deadline: deadline.budget,
                });
            }
        }
        Ok(())
    }

    /// Sleeps one tick in slices, returning true if cancelled.
    fn wait_for_next_tick(&self) -> bool {
        let until = Instant::now() + self.tick;
        while Instant::now() < until {
            if self.cancel.is_cancelled() {
                return true;
            }
            std::thread::sleep(WAIT_SLICE.min(until.saturating_duration_since(Instant::now())));
        }
        self.cancel.is_cancelled()
    }
}

struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    fn new(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    fn elapsed(&self) -> bool {
        self.started.elapsed() >= self.budget
    }
}

/// The conflict loser under a fresh identity.
fn renamed_copy(record: &Record) -> Record {
    let mut copy = record.clone();
    copy.id = Uuid::new_v4();
    copy.description = format!("{CONFLICT_COPY_PREFIX}{}", copy.description);
    copy
}
