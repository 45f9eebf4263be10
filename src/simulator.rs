//! Progress simulation for time-driven resources.
//!
//! A running machine produces one unit per product cycle. On every tick the
//! simulator credits the whole cycles elapsed since the job's cycle anchor
//! and moves the anchor forward by exactly those cycles, so the partial cycle
//! in flight carries into the next tick instead of being lost or counted
//! twice. Products without a positive cycle time are left for operators.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::ProductCatalog;
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, SchedulingError};
use crate::gateway::{Gateway, Snapshot};
use crate::queue::{CurrentJob, Diagnostic};
use crate::state_machine::{
    CompletionRecord, Job, JobStatus, RecordEvent, Resource, ResourceKind, StateMachine,
};

/// Default tick period.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// What one tick does to one running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    /// Less than one whole cycle has elapsed.
    Hold,
    /// Credit `units` and move the anchor to `anchor`.
    Advance {
        units: u32,
        progress: u32,
        anchor: DateTime<Utc>,
    },
    /// The goal is reached; `units` is what was left to make.
    Finish { units: u32 },
}

/// Compute the cycle step for a job anchored at `anchor`.
///
/// Elapsed time is measured in whole milliseconds and only complete cycles
/// are credited. Progress is clamped at the goal.
pub fn cycle_step(
    job: &Job,
    anchor: DateTime<Utc>,
    cycle: chrono::Duration,
    now: DateTime<Utc>,
) -> CycleStep {
    let cycle_ms = cycle.num_milliseconds();
    let elapsed_ms = (now - anchor).num_milliseconds();
    if cycle_ms <= 0 || elapsed_ms < cycle_ms {
        return CycleStep::Hold;
    }

    let whole = elapsed_ms / cycle_ms;
    let units = u32::try_from(whole).unwrap_or(u32::MAX);
    let progress = job
        .quantity_progress
        .saturating_add(units)
        .min(job.quantity_goal);

    if progress >= job.quantity_goal {
        CycleStep::Finish {
            units: progress.saturating_sub(job.quantity_progress),
        }
    } else {
        CycleStep::Advance {
            units,
            progress,
            anchor: anchor + chrono::Duration::milliseconds(cycle_ms * whole),
        }
    }
}

/// Summary of one simulator pass.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Running jobs looked at.
    pub examined: usize,
    /// Jobs credited with units, and how many.
    pub advanced: Vec<(Uuid, u32)>,
    /// Jobs that reached their goal this tick.
    pub completed: Vec<CompletionRecord>,
    /// Running jobs whose product has no timed cycle.
    pub inert: Vec<Uuid>,
    /// In-progress jobs returned to the queue because their machine had
    /// stopped running them.
    pub reconciled: Vec<Uuid>,
    /// Per-job failures. A failure never stops the rest of the pass.
    pub failures: Vec<(Uuid, SchedulingError)>,
}

impl TickReport {
    pub fn units_produced(&self) -> u64 {
        self.advanced.iter().map(|(_, u)| u64::from(*u)).sum()
    }
}

/// Periodically advances jobs on running machines.
pub struct ProgressSimulator<G, C> {
    gateway: Arc<G>,
    catalog: Arc<C>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl<G: Gateway, C: ProductCatalog> ProgressSimulator<G, C> {
    pub fn new(gateway: Arc<G>, catalog: Arc<C>) -> Self {
        Self {
            gateway,
            catalog,
            clock: Arc::new(SystemClock),
            interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one pass over every running machine.
    ///
    /// All decisions come from one snapshot read at the start of the pass.
    /// Only a failed snapshot read fails the tick as a whole.
    pub async fn tick(&self) -> Result<TickReport> {
        let now = self.clock.now();
        let snapshot = self.gateway.snapshot(ResourceKind::Machine).await?;
        let mut report = TickReport::default();

        self.reconcile(&snapshot, &mut report).await;

        let index = snapshot.index();
        for resource in snapshot.resources.iter().filter(|r| r.is_running()) {
            let job = match index.current_job(resource.id) {
                CurrentJob::One(job) if resource.running_job() == Some(job.id) => job,
                CurrentJob::Divergent(jobs) => {
                    warn!(
                        resource = %resource.name,
                        jobs = jobs.len(),
                        "several jobs in progress, skipping until reconciled"
                    );
                    continue;
                }
                _ => continue,
            };
            report.examined += 1;

            if let Err(e) = self.advance(resource, job, now, &mut report).await {
                warn!(job_id = %job.id, resource = %resource.name, error = %e, "tick failed for job");
                report.failures.push((job.id, e));
            }
        }

        debug!(
            examined = report.examined,
            units = report.units_produced(),
            completed = report.completed.len(),
            failures = report.failures.len(),
            "simulation tick"
        );
        Ok(report)
    }

    async fn advance(
        &self,
        resource: &Resource,
        job: &Job,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<()> {
        let Some(cycle) = self.catalog.cycle_time(&job.product_ref) else {
            report.inert.push(job.id);
            return Ok(());
        };
        // A job written without an anchor is timed from when its machine started.
        let Some(anchor) = job.last_cycle_at.or(resource.running_since()) else {
            return Ok(());
        };

        match cycle_step(job, anchor, cycle, now) {
            CycleStep::Hold => Ok(()),
            CycleStep::Advance {
                units,
                progress,
                anchor,
            } => {
                let mut updated = job.clone();
                updated.quantity_progress = progress;
                updated.last_cycle_at = Some(anchor);
                // A job cancelled or completed since the snapshot stays gone.
                if self.gateway.update_job(&updated).await? {
                    report.advanced.push((job.id, units));
                } else {
                    debug!(job_id = %job.id, "job removed during tick, progress dropped");
                }
                Ok(())
            }
            CycleStep::Finish { units } => {
                // Only the writer that removes the job records its completion.
                if !self.gateway.remove_job(job.id).await? {
                    return Ok(());
                }
                let mut finished = job.clone();
                finished.quantity_progress = finished.quantity_goal;
                finished.status = JobStatus::Completed;
                finished.last_cycle_at = None;

                let mut resource = resource.clone();
                StateMachine::release(&mut resource, job.id);
                self.gateway.write_resource(&resource).await?;

                let record = CompletionRecord::for_job(
                    &finished,
                    &resource,
                    RecordEvent::GoalReached,
                    finished.quantity_goal,
                    now,
                );
                self.gateway.append_completion_record(&record).await?;
                report.advanced.push((job.id, units));
                info!(
                    job_id = %job.id,
                    resource = %resource.name,
                    goal = finished.quantity_goal,
                    "job reached goal"
                );
                report.completed.push(record);
                Ok(())
            }
        }
    }

    /// Return in-progress jobs to the queue when their machine is no longer
    /// running them. This is what a lost race between an operator action and
    /// an earlier tick's write leaves behind.
    async fn reconcile(&self, snapshot: &Snapshot, report: &mut TickReport) {
        for diagnostic in snapshot.index().diagnostics() {
            let job_id = match diagnostic {
                Diagnostic::StalledJob { job_id, .. } => job_id,
                // Transient while a start or completion is being written.
                Diagnostic::RunningWithoutJob { .. } => continue,
                other => {
                    warn!(diagnostic = %other, "machine floor needs external reconciliation");
                    continue;
                }
            };
            let Some(mut job) = snapshot.job(job_id).cloned() else {
                continue;
            };
            job.demote();
            match self.gateway.update_job(&job).await {
                Ok(true) => {
                    info!(job_id = %job.id, "stalled job returned to queue");
                    report.reconciled.push(job.id);
                }
                Ok(false) => {}
                Err(e) => report.failures.push((job.id, e.into())),
            }
        }
    }

    /// Tick until `shutdown` is cancelled or `max_ticks` passes have run.
    pub async fn run(&self, shutdown: CancellationToken, max_ticks: Option<u64>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "progress simulator starting"
        );
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately.
        interval.tick().await;

        let mut ticks = 0u64;
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!(ticks, "progress simulator shutting down");
                    break;
                }

                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "simulation tick failed");
                    }
                    ticks += 1;
                    if max_ticks.is_some_and(|max| ticks >= max) {
                        info!(ticks, "progress simulator finished");
                        break;
                    }
                }
            }
        }
    }
}
