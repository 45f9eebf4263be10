//! Per-resource ordered view over the active job collection.
//!
//! [`QueueIndex`] is a read-only projection computed on demand from a
//! snapshot of jobs and resources. It never repairs what it finds: structural
//! problems are reported as [`Diagnostic`]s for the caller to log or escalate.

use std::collections::HashSet;
use std::fmt;

use uuid::Uuid;

use crate::state_machine::{Job, JobStatus, Resource};

/// Inconsistencies visible in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The job's resource does not exist.
    OrphanJob { job_id: Uuid, resource_id: Uuid },
    /// More than one job claims to be in progress on the same resource.
    MultipleInProgress { resource_id: Uuid, job_ids: Vec<Uuid> },
    /// The resource is running a job that is not in progress on it.
    RunningWithoutJob { resource_id: Uuid, job_id: Uuid },
    /// A job is in progress but its resource is not running it.
    StalledJob { resource_id: Uuid, job_id: Uuid },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::OrphanJob {
                job_id,
                resource_id,
            } => write!(f, "job {job_id} points at missing resource {resource_id}"),
            Diagnostic::MultipleInProgress {
                resource_id,
                job_ids,
            } => write!(
                f,
                "resource {resource_id} has {} jobs in progress",
                job_ids.len()
            ),
            Diagnostic::RunningWithoutJob {
                resource_id,
                job_id,
            } => write!(
                f,
                "resource {resource_id} runs job {job_id} which is not in progress"
            ),
            Diagnostic::StalledJob {
                resource_id,
                job_id,
            } => write!(
                f,
                "job {job_id} is in progress but resource {resource_id} is not running it"
            ),
        }
    }
}

/// The job currently being worked on a resource.
#[derive(Debug, Clone)]
pub enum CurrentJob<'a> {
    None,
    One(&'a Job),
    /// Concurrent writers left several jobs in progress. None is picked.
    Divergent(Vec<&'a Job>),
}

impl<'a> CurrentJob<'a> {
    /// The single current job, if the snapshot is consistent.
    pub fn job(&self) -> Option<&'a Job> {
        match self {
            CurrentJob::One(job) => Some(job),
            CurrentJob::None | CurrentJob::Divergent(_) => None,
        }
    }
}

/// Ordered pending work per resource over one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct QueueIndex<'a> {
    jobs: &'a [Job],
    resources: &'a [Resource],
}

impl<'a> QueueIndex<'a> {
    pub fn new(jobs: &'a [Job], resources: &'a [Resource]) -> Self {
        Self { jobs, resources }
    }

    pub fn resources(&self) -> &'a [Resource] {
        self.resources
    }

    pub fn resource(&self, id: Uuid) -> Option<&'a Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// Active jobs for a resource ordered by priority, then insertion time.
    /// Unknown resources have no queue, so orphans never appear here.
    pub fn jobs_for(&self, resource_id: Uuid) -> Vec<&'a Job> {
        if self.resource(resource_id).is_none() {
            return Vec::new();
        }
        let mut jobs: Vec<&Job> = self
            .jobs
            .iter()
            .filter(|j| j.resource_id == resource_id && j.is_active())
            .collect();
        // Stable sort keeps exact ties in snapshot order.
        jobs.sort_by_key(|j| j.sort_key());
        jobs
    }

    pub fn current_job(&self, resource_id: Uuid) -> CurrentJob<'a> {
        let mut in_progress: Vec<&Job> = self
            .jobs_for(resource_id)
            .into_iter()
            .filter(|j| j.status == JobStatus::InProgress)
            .collect();
        match in_progress.len() {
            0 => CurrentJob::None,
            1 => CurrentJob::One(in_progress.remove(0)),
            _ => CurrentJob::Divergent(in_progress),
        }
    }

    pub fn next_queued(&self, resource_id: Uuid) -> Option<&'a Job> {
        self.jobs_for(resource_id)
            .into_iter()
            .find(|j| j.status == JobStatus::Queued)
    }

    pub fn orphans(&self) -> Vec<&'a Job> {
        let known: HashSet<Uuid> = self.resources.iter().map(|r| r.id).collect();
        self.jobs
            .iter()
            .filter(|j| !known.contains(&j.resource_id))
            .collect()
    }

    /// Every inconsistency in the snapshot. Empty means the pairing
    /// invariant holds for every resource.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut found: Vec<Diagnostic> = self
            .orphans()
            .into_iter()
            .map(|j| Diagnostic::OrphanJob {
                job_id: j.id,
                resource_id: j.resource_id,
            })
            .collect();

        for resource in self.resources {
            match self.current_job(resource.id) {
                CurrentJob::Divergent(jobs) => found.push(Diagnostic::MultipleInProgress {
                    resource_id: resource.id,
                    job_ids: jobs.iter().map(|j| j.id).collect(),
                }),
                CurrentJob::One(job) => {
                    if resource.running_job() != Some(job.id) {
                        found.push(Diagnostic::StalledJob {
                            resource_id: resource.id,
                            job_id: job.id,
                        });
                    }
                }
                CurrentJob::None => {
                    if let Some(job_id) = resource.running_job() {
                        found.push(Diagnostic::RunningWithoutJob {
                            resource_id: resource.id,
                            job_id,
                        });
                    }
                }
            }
        }
        found
    }
}
