use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::job::{Job, JobStatus};
use super::resource::{Resource, ResourceState, ResourceStatus};
use crate::error::{Result, SchedulingError};

/// What a resource transition did to the job that was running on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEffect {
    Untouched,
    /// Put back in the queue with its cycle anchor cleared.
    Demoted(Uuid),
    /// Finished or cancelled; the caller removes it.
    Released(Uuid),
}

/// The result of applying a resource transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ResourceStatus,
    pub to: ResourceStatus,
    pub job: JobEffect,
}

/// Drives a `Resource` and its running `Job` through the floor state machine.
///
/// ```text
///   Idle ──start──▶ Running ──pause/complete/cancel──▶ Idle
///    ▲ │                │
///    │ └──hold──▶ Held ◀┘ (running job demoted first)
///    └────release───┘
/// ```
///
/// Every method validates first and mutates only on success, so a rejected
/// transition leaves both entities untouched.
pub struct StateMachine;

impl StateMachine {
    /// Idle → Running. The job must be queued on this resource.
    ///
    /// Time-driven jobs get a fresh cycle anchor at `now`.
    pub fn start(resource: &mut Resource, job: &mut Job, now: DateTime<Utc>) -> Result<Transition> {
        if job.resource_id != resource.id {
            return Err(SchedulingError::invalid(
                "start",
                job.label(),
                format!("queued on another resource than {}", resource.name),
            ));
        }
        if job.status != JobStatus::Queued {
            return Err(SchedulingError::invalid("start", job.label(), job.status));
        }
        let from = resource.status();
        if from != ResourceStatus::Idle {
            return Err(SchedulingError::invalid(
                "start work on",
                resource.name.clone(),
                from,
            ));
        }

        job.status = JobStatus::InProgress;
        if resource.kind.is_time_driven() {
            job.last_cycle_at = Some(now);
        }
        resource.state = ResourceState::Running {
            job_id: job.id,
            since: now,
        };

        Ok(Transition {
            from,
            to: ResourceStatus::Running,
            job: JobEffect::Untouched,
        })
    }

    /// InProgress → Queued, freeing the resource if it was running this job.
    pub fn pause(resource: &mut Resource, job: &mut Job) -> Result<Transition> {
        if job.status != JobStatus::InProgress {
            return Err(SchedulingError::invalid("pause", job.label(), job.status));
        }
        let from = resource.status();
        job.demote();
        if resource.running_job() == Some(job.id) {
            resource.state = ResourceState::Idle;
        }
        Ok(Transition {
            from,
            to: resource.status(),
            job: JobEffect::Demoted(job.id),
        })
    }

    /// Completion or cancellation exit. Frees the resource only when it is
    /// running the released job; a resource on hold stays on hold.
    pub fn release(resource: &mut Resource, job_id: Uuid) -> Transition {
        let from = resource.status();
        if resource.running_job() == Some(job_id) {
            resource.state = ResourceState::Idle;
        }
        Transition {
            from,
            to: resource.status(),
            job: JobEffect::Released(job_id),
        }
    }

    /// Operator status change to Idle or a hold state.
    ///
    /// When the resource is running, `running` must be the job it runs; that
    /// job is demoted before the resource leaves `Running`.
    pub fn set_status(
        resource: &mut Resource,
        target: ResourceStatus,
        running: Option<&mut Job>,
    ) -> Result<Transition> {
        let from = resource.status();
        if target == ResourceStatus::Running {
            return Err(SchedulingError::invalid(
                "set to running without a job",
                resource.name.clone(),
                from,
            ));
        }
        if !resource.supports(target) {
            return Err(SchedulingError::invalid(
                "hold for",
                format!("{} {}", resource.kind, resource.name),
                format!("asked for {target}"),
            ));
        }

        let mut effect = JobEffect::Untouched;
        if let Some(running_id) = resource.running_job()
            && let Some(job) = running
            && job.id == running_id
            && job.status == JobStatus::InProgress
        {
            job.demote();
            effect = JobEffect::Demoted(job.id);
        }

        resource.state = match target.hold_reason() {
            Some(reason) => ResourceState::Held { reason },
            None => ResourceState::Idle,
        };

        Ok(Transition {
            from,
            to: target,
            job: effect,
        })
    }

    /// New work clears a stale hold. A running resource keeps running.
    pub fn prepare_for_assignment(resource: &mut Resource) -> Option<Transition> {
        let from = resource.status();
        match resource.state {
            ResourceState::Held { .. } => {
                resource.state = ResourceState::Idle;
                Some(Transition {
                    from,
                    to: ResourceStatus::Idle,
                    job: JobEffect::Untouched,
                })
            }
            ResourceState::Idle | ResourceState::Running { .. } => None,
        }
    }
}
