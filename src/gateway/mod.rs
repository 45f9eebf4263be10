//! Persistence gateway: the durable store the engine reads from and writes to.
//!
//! The engine never holds state between operations. Every operation loads
//! what it needs through a [`Gateway`], computes the new entities, and writes
//! them back whole. Writes also publish an advisory [`ChangeNotice`] so other
//! consumers know to re-read; the notice itself is never authoritative.

mod file;
mod memory;

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub use file::FileGateway;
pub use memory::MemoryGateway;

use crate::error::GatewayError;
use crate::queue::QueueIndex;
use crate::state_machine::{CompletionRecord, Job, JobStatus, Resource, ResourceKind};

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// What changed in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    JobWritten,
    JobRemoved,
    ResourceWritten,
    RecordAppended,
}

/// "Something changed, re-read" signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    pub kind: ChangeKind,
    pub entity: Uuid,
}

impl ChangeNotice {
    pub fn new(kind: ChangeKind, entity: Uuid) -> Self {
        Self { kind, entity }
    }
}

/// Store contract consumed by the engine and the simulator.
///
/// Whole-entity upsert and delete semantics. Only
/// [`increment_progress`](Gateway::increment_progress) is guaranteed atomic
/// against concurrent writers; everything else is last-writer-wins. Writers
/// holding a job read earlier use [`update_job`](Gateway::update_job) so a
/// removal in between is never undone.
pub trait Gateway: Send + Sync {
    /// Jobs in the queue that feeds `kind` resources.
    fn list_jobs(&self, kind: ResourceKind)
    -> impl Future<Output = GatewayResult<Vec<Job>>> + Send;

    fn list_resources(
        &self,
        kind: ResourceKind,
    ) -> impl Future<Output = GatewayResult<Vec<Resource>>> + Send;

    fn write_resource(&self, resource: &Resource)
    -> impl Future<Output = GatewayResult<()>> + Send;

    fn write_job(&self, job: &Job) -> impl Future<Output = GatewayResult<()>> + Send;

    /// Replace a job that is still stored. Never inserts: returns `false`
    /// and writes nothing if the job was removed in the meantime.
    fn update_job(&self, job: &Job) -> impl Future<Output = GatewayResult<bool>> + Send;

    /// Returns whether the job was still stored.
    fn remove_job(&self, id: Uuid) -> impl Future<Output = GatewayResult<bool>> + Send;

    fn append_completion_record(
        &self,
        record: &CompletionRecord,
    ) -> impl Future<Output = GatewayResult<()>> + Send;

    /// Atomically add `delta` to a job's progress and return the stored job
    /// after the increment, or `None` if the job is gone.
    fn increment_progress(
        &self,
        job_id: Uuid,
        delta: u32,
    ) -> impl Future<Output = GatewayResult<Option<Job>>> + Send;

    /// Advisory change feed.
    fn subscribe(&self) -> broadcast::Receiver<ChangeNotice>;

    /// Jobs and resources of one kind read together.
    ///
    /// The default reads resources first, then jobs. Stores that can read
    /// both under one lock should override it.
    fn snapshot(&self, kind: ResourceKind) -> impl Future<Output = GatewayResult<Snapshot>> + Send {
        async move {
            let resources = self.list_resources(kind).await?;
            let jobs = self.list_jobs(kind).await?;
            Ok(Snapshot {
                kind,
                jobs,
                resources,
            })
        }
    }
}

/// Jobs and resources of one kind as read at one point.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub kind: ResourceKind,
    pub jobs: Vec<Job>,
    pub resources: Vec<Resource>,
}

impl Snapshot {
    pub fn index(&self) -> QueueIndex<'_> {
        QueueIndex::new(&self.jobs, &self.resources)
    }

    pub fn job(&self, id: Uuid) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn resource(&self, id: Uuid) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }
}

/// The full contents of a plant store.
///
/// Shared by the in-memory and file gateways so both apply writes the same
/// way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlantState {
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub records: Vec<CompletionRecord>,
}

impl PlantState {
    pub fn jobs_of(&self, kind: ResourceKind) -> Vec<Job> {
        self.jobs.iter().filter(|j| j.kind == kind).cloned().collect()
    }

    pub fn resources_of(&self, kind: ResourceKind) -> Vec<Resource> {
        self.resources
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    pub fn upsert_resource(&mut self, resource: &Resource) {
        match self.resources.iter_mut().find(|r| r.id == resource.id) {
            Some(slot) => *slot = resource.clone(),
            None => self.resources.push(resource.clone()),
        }
    }

    /// Completed jobs are never stored; writing one removes it instead.
    pub fn upsert_job(&mut self, job: &Job) -> ChangeKind {
        if job.status == JobStatus::Completed {
            self.remove_job(job.id);
            return ChangeKind::JobRemoved;
        }
        match self.jobs.iter_mut().find(|j| j.id == job.id) {
            Some(slot) => *slot = job.clone(),
            None => self.jobs.push(job.clone()),
        }
        ChangeKind::JobWritten
    }

    /// Like [`upsert_job`](Self::upsert_job) but only for a job that is
    /// already stored. `None` means the job is gone and nothing changed.
    pub fn replace_job(&mut self, job: &Job) -> Option<ChangeKind> {
        if !self.jobs.iter().any(|j| j.id == job.id) {
            return None;
        }
        Some(self.upsert_job(job))
    }

    pub fn remove_job(&mut self, id: Uuid) -> bool {
        let before = self.jobs.len();
        self.jobs.retain(|j| j.id != id);
        before != self.jobs.len()
    }

    pub fn increment_progress(&mut self, id: Uuid, delta: u32) -> Option<Job> {
        let job = self.jobs.iter_mut().find(|j| j.id == id)?;
        job.quantity_progress = job.quantity_progress.saturating_add(delta);
        Some(job.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::NewJob;
    use chrono::Utc;

    #[test]
    fn upsert_replaces_whole_job() {
        let machine = Resource::new("Press 1", ResourceKind::Machine);
        let mut state = PlantState::default();
        let mut job = Job::new(&machine, NewJob::new("CAP-28", 10), Utc::now());
        state.upsert_job(&job);
        job.priority = 7;
        state.upsert_job(&job);

        assert_eq!(state.jobs.len(), 1);
        assert_eq!(state.jobs[0].priority, 7);
    }

    #[test]
    fn writing_completed_job_removes_it() {
        let machine = Resource::new("Press 1", ResourceKind::Machine);
        let mut state = PlantState::default();
        let mut job = Job::new(&machine, NewJob::new("CAP-28", 10), Utc::now());
        state.upsert_job(&job);
        job.status = JobStatus::Completed;
        assert_eq!(state.upsert_job(&job), ChangeKind::JobRemoved);
        assert!(state.jobs.is_empty());
    }

    #[test]
    fn replace_never_resurrects_a_removed_job() {
        let machine = Resource::new("Press 1", ResourceKind::Machine);
        let mut state = PlantState::default();
        let mut job = Job::new(&machine, NewJob::new("CAP-28", 10), Utc::now());
        state.upsert_job(&job);

        job.quantity_progress = 3;
        assert_eq!(state.replace_job(&job), Some(ChangeKind::JobWritten));
        assert_eq!(state.jobs[0].quantity_progress, 3);

        assert!(state.remove_job(job.id));
        job.status = JobStatus::InProgress;
        assert_eq!(state.replace_job(&job), None);
        assert!(state.jobs.is_empty());
    }

    #[test]
    fn filters_by_kind() {
        let machine = Resource::new("Press 1", ResourceKind::Machine);
        let station = Resource::new("Pack A", ResourceKind::Station);
        let mut state = PlantState::default();
        state.upsert_resource(&machine);
        state.upsert_resource(&station);
        state.upsert_job(&Job::new(&station, NewJob::new("CAP-28", 10), Utc::now()));

        assert_eq!(state.resources_of(ResourceKind::Machine).len(), 1);
        assert!(state.jobs_of(ResourceKind::Machine).is_empty());
        assert_eq!(state.jobs_of(ResourceKind::Station).len(), 1);
    }
}
