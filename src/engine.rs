use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, SchedulingError};
use crate::gateway::{Gateway, Snapshot};
use crate::queue::CurrentJob;
use crate::state_machine::{
    CompletionRecord, Job, JobEffect, JobStatus, NewJob, RecordEvent, Resource, ResourceKind,
    ResourceStatus, StateMachine, Transition,
};

const ALL_KINDS: [ResourceKind; 2] = [ResourceKind::Machine, ResourceKind::Station];

/// A job together with the snapshot it was found in.
struct Located {
    snapshot: Snapshot,
    job: Job,
    resource: Resource,
}

/// Result of logging packed units against a station job.
#[derive(Debug, Clone)]
pub struct ProgressOutcome {
    /// The job as stored after the increment.
    pub job: Job,
    pub record: CompletionRecord,
    /// The increment reached the goal and the job was closed.
    pub completed: bool,
}

/// Applies operator actions to jobs and resources.
///
/// Every operation reads what it needs through the gateway, validates it
/// against the state machine, and writes back whole entities. Nothing is
/// cached between calls. A rejected operation writes nothing.
pub struct SchedulingEngine<G> {
    gateway: Arc<G>,
    clock: Arc<dyn Clock>,
}

impl<G: Gateway> SchedulingEngine<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self::with_clock(gateway, Arc::new(SystemClock))
    }

    pub fn with_clock(gateway: Arc<G>, clock: Arc<dyn Clock>) -> Self {
        Self { gateway, clock }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Add a machine or station to the plant. Names are unique across kinds.
    pub async fn register_resource(
        &self,
        name: &str,
        kind: ResourceKind,
        working_hours_per_day: Option<f32>,
    ) -> Result<Resource> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SchedulingError::invalid("register", "a resource", "unnamed"));
        }
        if self.find_resource(name).await.is_ok() {
            return Err(SchedulingError::DuplicateResource(name.to_string()));
        }
        let mut resource = Resource::new(name, kind);
        if kind == ResourceKind::Machine {
            resource.working_hours_per_day = working_hours_per_day;
        }
        self.gateway.write_resource(&resource).await?;
        info!(resource = %resource.name, kind = %kind, "resource registered");
        Ok(resource)
    }

    /// Look a resource up by name, case-insensitively.
    pub async fn find_resource(&self, name: &str) -> Result<Resource> {
        for kind in ALL_KINDS {
            let resources = self.gateway.list_resources(kind).await?;
            if let Some(found) = resources
                .into_iter()
                .find(|r| r.name.eq_ignore_ascii_case(name))
            {
                return Ok(found);
            }
        }
        Err(SchedulingError::ResourceNotFound(name.to_string()))
    }

    /// Read one kind of floor and report any inconsistencies found in it.
    pub async fn floor(&self, kind: ResourceKind) -> Result<Snapshot> {
        let snapshot = self.gateway.snapshot(kind).await?;
        for diagnostic in snapshot.index().diagnostics() {
            warn!(kind = %kind, %diagnostic, "floor needs reconciliation");
        }
        Ok(snapshot)
    }

    /// Queue new work on a resource.
    ///
    /// A resource parked in a hold state is reset to idle: assigning work
    /// means it is being prepared for use. A running resource keeps running
    /// and the new job waits behind the current one.
    pub async fn assign(&self, resource_id: Uuid, request: NewJob) -> Result<Job> {
        if request.quantity_goal == 0 {
            return Err(SchedulingError::InvalidQuantity(
                "quantity goal must be at least 1".into(),
            ));
        }
        let mut resource = self.resource(resource_id).await?;

        if let Some(t) = StateMachine::prepare_for_assignment(&mut resource) {
            self.gateway.write_resource(&resource).await?;
            info!(resource = %resource.name, from = %t.from, "hold cleared by new assignment");
        }

        let job = Job::new(&resource, request, self.clock.now());
        self.gateway.write_job(&job).await?;
        info!(
            job_id = %job.id,
            resource = %resource.name,
            product = %job.product_ref,
            goal = job.quantity_goal,
            priority = job.priority,
            "job assigned"
        );
        Ok(job)
    }

    /// Put a queued job to work on its idle resource.
    pub async fn start(&self, job_id: Uuid) -> Result<Transition> {
        let Located {
            snapshot,
            mut job,
            mut resource,
        } = self.locate(job_id).await?;

        // Refuse to add a second in-progress job on top of a divergent floor.
        match snapshot.index().current_job(resource.id) {
            CurrentJob::None => {}
            CurrentJob::One(current) => {
                return Err(SchedulingError::invalid(
                    "start",
                    format!("job '{}'", job.display_name),
                    format!("{} is already working '{}'", resource.name, current.display_name),
                ));
            }
            CurrentJob::Divergent(_) => {
                return Err(SchedulingError::invalid(
                    "start",
                    format!("job '{}'", job.display_name),
                    format!("{} has several jobs in progress", resource.name),
                ));
            }
        }

        let t = StateMachine::start(&mut resource, &mut job, self.clock.now())?;
        self.gateway.write_resource(&resource).await?;
        if !self.gateway.update_job(&job).await? {
            // Removed by another client after we read it.
            self.release(&mut resource, job.id).await?;
            return Err(SchedulingError::JobNotFound(job.id));
        }
        info!(job_id = %job.id, resource = %resource.name, "job started");
        Ok(t)
    }

    /// Stop an in-progress job and return it to the queue. A partial cycle
    /// in flight is not credited.
    pub async fn pause(&self, job_id: Uuid) -> Result<Transition> {
        let Located {
            mut job,
            mut resource,
            ..
        } = self.locate(job_id).await?;

        let t = StateMachine::pause(&mut resource, &mut job)?;
        if t.from != t.to {
            self.gateway.write_resource(&resource).await?;
        }
        if !self.gateway.update_job(&job).await? {
            return Err(SchedulingError::JobNotFound(job.id));
        }
        info!(job_id = %job.id, resource = %resource.name, progress = job.quantity_progress, "job paused");
        Ok(t)
    }

    /// Operator declares a job done regardless of what is left.
    ///
    /// The outstanding units are carried on the record as the shortfall.
    /// Station progress was already recorded unit by unit, so the record
    /// counts only the shortfall; machine progress is only recorded at
    /// completion, so the record counts the whole goal.
    pub async fn complete(&self, job_id: Uuid) -> Result<CompletionRecord> {
        let Located {
            mut job,
            mut resource,
            ..
        } = self.locate(job_id).await?;

        let shortfall = job.remaining();
        let counted = match resource.kind {
            ResourceKind::Station => shortfall,
            ResourceKind::Machine => job.quantity_goal,
        };

        // Whoever removes the job first owns the completion record.
        if !self.gateway.remove_job(job.id).await? {
            return Err(SchedulingError::JobNotFound(job.id));
        }
        job.status = JobStatus::Completed;
        self.release(&mut resource, job.id).await?;

        let record = CompletionRecord::for_job(
            &job,
            &resource,
            RecordEvent::ManualCompleted,
            counted,
            self.clock.now(),
        )
        .shortfall(shortfall);
        self.gateway.append_completion_record(&record).await?;
        info!(
            job_id = %job.id,
            resource = %resource.name,
            counted,
            shortfall,
            "job completed manually"
        );
        Ok(record)
    }

    /// Drop a job without a completion record. Confirmation is the
    /// caller's concern.
    pub async fn cancel(&self, job_id: Uuid) -> Result<Job> {
        let Located {
            mut job,
            mut resource,
            ..
        } = self.locate(job_id).await?;

        if !self.gateway.remove_job(job.id).await? {
            return Err(SchedulingError::JobNotFound(job.id));
        }
        job.status = JobStatus::Completed;
        self.release(&mut resource, job.id).await?;
        info!(job_id = %job.id, resource = %resource.name, "job cancelled");
        Ok(job)
    }

    /// Record packed units against a station job.
    ///
    /// The increment is applied atomically by the store. Reaching the goal is
    /// the only way a station job completes on its own: the job is removed
    /// and the station freed.
    pub async fn log_progress(
        &self,
        job_id: Uuid,
        delta: u32,
        rejected: Option<u32>,
    ) -> Result<ProgressOutcome> {
        if delta == 0 {
            return Err(SchedulingError::InvalidQuantity(
                "logged quantity must be at least 1".into(),
            ));
        }
        let Located { mut resource, .. } = self.locate(job_id).await?;
        if resource.kind.is_time_driven() {
            return Err(SchedulingError::WrongResourceKind {
                resource: resource.name.clone(),
                expected: ResourceKind::Station,
                actual: resource.kind,
            });
        }

        let mut job = self
            .gateway
            .increment_progress(job_id, delta)
            .await?
            .ok_or(SchedulingError::JobNotFound(job_id))?;

        let before = job.quantity_progress.saturating_sub(delta);
        let counted = delta.min(job.quantity_goal.saturating_sub(before));
        let completed = job.is_done();
        let now = self.clock.now();

        let event = if completed {
            job.quantity_progress = job.quantity_goal;
            job.status = JobStatus::Completed;
            if self.gateway.remove_job(job.id).await? {
                self.release(&mut resource, job.id).await?;
            }
            RecordEvent::GoalReached
        } else {
            RecordEvent::ProgressLogged
        };
        let record =
            CompletionRecord::for_job(&job, &resource, event, counted, now).rejected(rejected);

        self.gateway.append_completion_record(&record).await?;
        info!(
            job_id = %job.id,
            resource = %resource.name,
            delta,
            progress = job.quantity_progress,
            goal = job.quantity_goal,
            completed,
            "progress logged"
        );
        Ok(ProgressOutcome {
            job,
            record,
            completed,
        })
    }

    /// Operator status change unrelated to starting work.
    ///
    /// Leaving `Running` demotes the running job back to the queue. An idle
    /// or held resource changes status without touching any job.
    pub async fn set_resource_status(
        &self,
        resource_id: Uuid,
        status: ResourceStatus,
    ) -> Result<Transition> {
        let (snapshot, mut resource) = self.resource_in_snapshot(resource_id).await?;
        let mut running = resource
            .running_job()
            .and_then(|id| snapshot.job(id))
            .cloned();

        let t = StateMachine::set_status(&mut resource, status, running.as_mut())?;
        self.gateway.write_resource(&resource).await?;
        if let (JobEffect::Demoted(_), Some(job)) = (t.job, running.as_ref())
            && self.gateway.update_job(job).await?
        {
            info!(job_id = %job.id, resource = %resource.name, "running job returned to queue");
        }
        info!(resource = %resource.name, from = %t.from, to = %t.to, "resource status changed");
        Ok(t)
    }

    pub async fn reprioritize(&self, job_id: Uuid, priority: i32) -> Result<Job> {
        let Located { mut job, .. } = self.locate(job_id).await?;
        job.priority = priority;
        if !self.gateway.update_job(&job).await? {
            return Err(SchedulingError::JobNotFound(job.id));
        }
        info!(job_id = %job.id, priority, "job reprioritized");
        Ok(job)
    }

    async fn release(&self, resource: &mut Resource, job_id: Uuid) -> Result<()> {
        let t = StateMachine::release(resource, job_id);
        if t.from != t.to {
            self.gateway.write_resource(resource).await?;
        }
        Ok(())
    }

    async fn resource(&self, resource_id: Uuid) -> Result<Resource> {
        self.resource_in_snapshot(resource_id)
            .await
            .map(|(_, resource)| resource)
    }

    async fn resource_in_snapshot(&self, resource_id: Uuid) -> Result<(Snapshot, Resource)> {
        for kind in ALL_KINDS {
            let snapshot = self.gateway.snapshot(kind).await?;
            if let Some(resource) = snapshot.resource(resource_id).cloned() {
                return Ok((snapshot, resource));
            }
        }
        Err(SchedulingError::ResourceNotFound(resource_id.to_string()))
    }

    async fn locate(&self, job_id: Uuid) -> Result<Located> {
        for kind in ALL_KINDS {
            let snapshot = self.gateway.snapshot(kind).await?;
            let Some(job) = snapshot.job(job_id).cloned() else {
                continue;
            };
            let Some(resource) = snapshot.resource(job.resource_id).cloned() else {
                warn!(job_id = %job.id, resource_id = %job.resource_id, "orphan job needs cleanup");
                return Err(SchedulingError::OrphanJob(job.id));
            };
            return Ok(Located {
                snapshot,
                job,
                resource,
            });
        }
        Err(SchedulingError::JobNotFound(job_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::gateway::MemoryGateway;
    use crate::state_machine::{HoldReason, ResourceState};
    use chrono::Utc;

    struct Floor {
        engine: SchedulingEngine<MemoryGateway>,
        gateway: Arc<MemoryGateway>,
        clock: ManualClock,
    }

    fn floor() -> Floor {
        let gateway = Arc::new(MemoryGateway::new());
        let clock = ManualClock::new(Utc::now());
        let engine = SchedulingEngine::with_clock(gateway.clone(), Arc::new(clock.clone()));
        Floor {
            engine,
            gateway,
            clock,
        }
    }

    async fn assert_paired(floor: &Floor) {
        for kind in ALL_KINDS {
            let snapshot = floor.gateway.snapshot(kind).await.unwrap();
            assert!(
                snapshot.index().diagnostics().is_empty(),
                "{:?}",
                snapshot.index().diagnostics()
            );
        }
    }

    #[tokio::test]
    async fn register_rejects_duplicate_names() {
        let f = floor();
        f.engine
            .register_resource("Press 1", ResourceKind::Machine, Some(16.0))
            .await
            .unwrap();
        let err = f
            .engine
            .register_resource("press 1", ResourceKind::Station, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::DuplicateResource(_)));
    }

    #[tokio::test]
    async fn assign_requires_existing_resource_and_positive_goal() {
        let f = floor();
        let err = f
            .engine
            .assign(Uuid::new_v4(), NewJob::new("CAP-28", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::ResourceNotFound(_)));

        let press = f
            .engine
            .register_resource("Press 1", ResourceKind::Machine, None)
            .await
            .unwrap();
        let err = f
            .engine
            .assign(press.id, NewJob::new("CAP-28", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidQuantity(_)));
    }

    #[tokio::test]
    async fn assign_clears_hold() {
        let f = floor();
        let press = f
            .engine
            .register_resource("Press 1", ResourceKind::Machine, None)
            .await
            .unwrap();
        f.engine
            .set_resource_status(press.id, ResourceStatus::MoldChange)
            .await
            .unwrap();

        let job = f
            .engine
            .assign(press.id, NewJob::new("CAP-28", 10).assignee("Rui"))
            .await
            .unwrap();
        let stored = f.gateway.resource(press.id).await.unwrap();
        assert_eq!(stored.status(), ResourceStatus::Idle);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.added_at, f.clock.now());
    }

    #[tokio::test]
    async fn start_then_pause_round_trip() {
        let f = floor();
        let press = f
            .engine
            .register_resource("Press 1", ResourceKind::Machine, None)
            .await
            .unwrap();
        let job = f
            .engine
            .assign(press.id, NewJob::new("CAP-28", 10))
            .await
            .unwrap();

        f.engine.start(job.id).await.unwrap();
        let stored = f.gateway.job(job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::InProgress);
        assert_eq!(stored.last_cycle_at, Some(f.clock.now()));
        assert_eq!(
            f.gateway.resource(press.id).await.unwrap().running_since(),
            Some(f.clock.now())
        );
        assert_paired(&f).await;

        f.clock.advance_secs(7);
        f.engine.pause(job.id).await.unwrap();
        let stored = f.gateway.job(job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Queued);
        assert!(stored.last_cycle_at.is_none());
        assert_eq!(
            f.gateway.resource(press.id).await.unwrap().status(),
            ResourceStatus::Idle
        );
        assert_paired(&f).await;
    }

    #[tokio::test]
    async fn second_start_on_busy_resource_is_rejected() {
        let f = floor();
        let press = f
            .engine
            .register_resource("Press 1", ResourceKind::Machine, None)
            .await
            .unwrap();
        let first = f
            .engine
            .assign(press.id, NewJob::new("CAP-28", 10))
            .await
            .unwrap();
        let second = f
            .engine
            .assign(press.id, NewJob::new("CAP-38", 10))
            .await
            .unwrap();

        f.engine.start(first.id).await.unwrap();
        let err = f.engine.start(second.id).await.unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidTransition { .. }));
        assert_eq!(
            f.gateway.job(second.id).await.unwrap().status,
            JobStatus::Queued
        );
        assert_paired(&f).await;
    }

    #[tokio::test]
    async fn start_refuses_resource_with_several_jobs_in_progress() {
        let f = floor();
        let press = f
            .engine
            .register_resource("Press 1", ResourceKind::Machine, None)
            .await
            .unwrap();
        for product in ["CAP-28", "CAP-38"] {
            let mut job = Job::new(&press, NewJob::new(product, 10), f.clock.now());
            job.status = JobStatus::InProgress;
            f.gateway.write_job(&job).await.unwrap();
        }
        let waiting = f
            .engine
            .assign(press.id, NewJob::new("LID-90", 10))
            .await
            .unwrap();

        let mut rx = f.gateway.subscribe();
        let err = f.engine.start(waiting.id).await.unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidTransition { .. }));
        assert!(rx.try_recv().is_err(), "a rejected start must not write");
        assert_eq!(
            f.gateway.job(waiting.id).await.unwrap().status,
            JobStatus::Queued
        );
        assert_eq!(
            f.gateway.resource(press.id).await.unwrap().status(),
            ResourceStatus::Idle
        );
    }

    #[tokio::test]
    async fn start_of_cancelled_job_is_not_found() {
        let f = floor();
        let press = f
            .engine
            .register_resource("Press 1", ResourceKind::Machine, None)
            .await
            .unwrap();
        let job = f
            .engine
            .assign(press.id, NewJob::new("CAP-28", 10))
            .await
            .unwrap();
        f.engine.cancel(job.id).await.unwrap();

        let err = f.engine.start(job.id).await.unwrap_err();
        assert!(matches!(err, SchedulingError::JobNotFound(id) if id == job.id));
        assert!(f.gateway.job(job.id).await.is_none());
        assert_paired(&f).await;
    }

    #[tokio::test]
    async fn pause_on_queued_job_is_rejected() {
        let f = floor();
        let press = f
            .engine
            .register_resource("Press 1", ResourceKind::Machine, None)
            .await
            .unwrap();
        let job = f
            .engine
            .assign(press.id, NewJob::new("CAP-28", 10))
            .await
            .unwrap();
        assert!(f.engine.pause(job.id).await.is_err());
    }

    #[tokio::test]
    async fn manual_completion_logs_shortfall() {
        let f = floor();
        let station = f
            .engine
            .register_resource("Pack A", ResourceKind::Station, None)
            .await
            .unwrap();
        let job = f
            .engine
            .assign(station.id, NewJob::new("CAP-28", 1000).assignee("Bia"))
            .await
            .unwrap();
        f.engine.start(job.id).await.unwrap();
        f.engine.log_progress(job.id, 850, None).await.unwrap();

        let record = f.engine.complete(job.id).await.unwrap();
        assert_eq!(record.quantity_counted, 150);
        assert_eq!(record.quantity_shortfall, 150);
        assert_eq!(record.event, RecordEvent::ManualCompleted);
        assert_eq!(record.assignee_name, "Bia");
        assert!(f.gateway.job(job.id).await.is_none());
        assert_eq!(
            f.gateway.resource(station.id).await.unwrap().status(),
            ResourceStatus::Idle
        );
        assert_paired(&f).await;
    }

    #[tokio::test]
    async fn manual_completion_on_machine_counts_goal() {
        let f = floor();
        let press = f
            .engine
            .register_resource("Press 1", ResourceKind::Machine, None)
            .await
            .unwrap();
        let job = f
            .engine
            .assign(press.id, NewJob::new("CAP-28", 200))
            .await
            .unwrap();

        let record = f.engine.complete(job.id).await.unwrap();
        assert_eq!(record.quantity_counted, 200);
        assert_eq!(record.quantity_shortfall, 200);
        assert!(f.engine.complete(job.id).await.is_err());
    }

    #[tokio::test]
    async fn cancel_frees_resource_without_record() {
        let f = floor();
        let press = f
            .engine
            .register_resource("Press 1", ResourceKind::Machine, None)
            .await
            .unwrap();
        let job = f
            .engine
            .assign(press.id, NewJob::new("CAP-28", 10))
            .await
            .unwrap();
        f.engine.start(job.id).await.unwrap();

        f.engine.cancel(job.id).await.unwrap();
        assert!(f.gateway.job(job.id).await.is_none());
        assert!(f.gateway.records().await.is_empty());
        assert_eq!(
            f.gateway.resource(press.id).await.unwrap().status(),
            ResourceStatus::Idle
        );
    }

    #[tokio::test]
    async fn logging_to_goal_completes_station_job() {
        let f = floor();
        let station = f
            .engine
            .register_resource("Pack A", ResourceKind::Station, None)
            .await
            .unwrap();
        let job = f
            .engine
            .assign(station.id, NewJob::new("CAP-28", 100))
            .await
            .unwrap();
        f.engine.start(job.id).await.unwrap();

        let partial = f.engine.log_progress(job.id, 60, Some(2)).await.unwrap();
        assert!(!partial.completed);
        assert_eq!(partial.job.quantity_progress, 60);
        assert_eq!(partial.record.quantity_rejected, Some(2));

        let last = f.engine.log_progress(job.id, 55, None).await.unwrap();
        assert!(last.completed);
        assert_eq!(last.record.quantity_counted, 40);
        assert_eq!(last.record.event, RecordEvent::GoalReached);
        assert_eq!(last.job.quantity_progress, 100);
        assert!(f.gateway.job(job.id).await.is_none());
        assert_eq!(
            f.gateway.resource(station.id).await.unwrap().status(),
            ResourceStatus::Idle
        );

        let counted: u32 = f
            .gateway
            .records()
            .await
            .iter()
            .map(|r| r.quantity_counted)
            .sum();
        assert_eq!(counted, 100);
    }

    #[tokio::test]
    async fn logging_rejects_machines_and_zero() {
        let f = floor();
        let press = f
            .engine
            .register_resource("Press 1", ResourceKind::Machine, None)
            .await
            .unwrap();
        let job = f
            .engine
            .assign(press.id, NewJob::new("CAP-28", 10))
            .await
            .unwrap();
        assert!(matches!(
            f.engine.log_progress(job.id, 0, None).await.unwrap_err(),
            SchedulingError::InvalidQuantity(_)
        ));
        assert!(matches!(
            f.engine.log_progress(job.id, 3, None).await.unwrap_err(),
            SchedulingError::WrongResourceKind { .. }
        ));
    }

    #[tokio::test]
    async fn hold_while_running_demotes_job() {
        let f = floor();
        let press = f
            .engine
            .register_resource("Press 1", ResourceKind::Machine, None)
            .await
            .unwrap();
        let job = f
            .engine
            .assign(press.id, NewJob::new("CAP-28", 10))
            .await
            .unwrap();
        f.engine.start(job.id).await.unwrap();

        let t = f
            .engine
            .set_resource_status(press.id, ResourceStatus::Maintenance)
            .await
            .unwrap();
        assert_eq!(t.job, JobEffect::Demoted(job.id));
        let stored = f.gateway.resource(press.id).await.unwrap();
        assert_eq!(
            stored.state,
            ResourceState::Held {
                reason: HoldReason::Maintenance
            }
        );
        assert_eq!(
            f.gateway.job(job.id).await.unwrap().status,
            JobStatus::Queued
        );
        assert_paired(&f).await;
    }

    #[tokio::test]
    async fn idle_hold_leaves_jobs_alone() {
        let f = floor();
        let press = f
            .engine
            .register_resource("Press 1", ResourceKind::Machine, None)
            .await
            .unwrap();
        let job = f
            .engine
            .assign(press.id, NewJob::new("CAP-28", 10).priority(4))
            .await
            .unwrap();
        f.engine
            .set_resource_status(press.id, ResourceStatus::Down)
            .await
            .unwrap();
        let stored = f.gateway.job(job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Queued);
        assert_eq!(stored.priority, 4);
    }

    #[tokio::test]
    async fn reprioritize_reorders_queue() {
        let f = floor();
        let press = f
            .engine
            .register_resource("Press 1", ResourceKind::Machine, None)
            .await
            .unwrap();
        let a = f
            .engine
            .assign(press.id, NewJob::new("A", 10).priority(1))
            .await
            .unwrap();
        f.clock.advance_secs(1);
        let b = f
            .engine
            .assign(press.id, NewJob::new("B", 10).priority(2))
            .await
            .unwrap();

        f.engine.reprioritize(b.id, 0).await.unwrap();
        let snapshot = f.engine.floor(ResourceKind::Machine).await.unwrap();
        let order: Vec<Uuid> = snapshot
            .index()
            .jobs_for(press.id)
            .iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(order, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn orphan_job_is_reported() {
        let f = floor();
        let ghost = Resource::new("Scrapped", ResourceKind::Machine);
        let job = Job::new(&ghost, NewJob::new("CAP-28", 10), Utc::now());
        f.gateway.write_job(&job).await.unwrap();

        let err = f.engine.start(job.id).await.unwrap_err();
        assert!(matches!(err, SchedulingError::OrphanJob(id) if id == job.id));
    }
}
