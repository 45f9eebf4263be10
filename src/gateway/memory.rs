use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use super::{ChangeKind, ChangeNotice, Gateway, GatewayResult, PlantState, Snapshot};
use crate::state_machine::{CompletionRecord, Job, Resource, ResourceKind};

const DEFAULT_NOTIFY_CAPACITY: usize = 64;

/// Process-local store. Shared between an engine and a simulator via `Arc`.
#[derive(Debug)]
pub struct MemoryGateway {
    state: RwLock<PlantState>,
    notify: broadcast::Sender<ChangeNotice>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::with_state(PlantState::default(), DEFAULT_NOTIFY_CAPACITY)
    }

    pub fn with_state(state: PlantState, notify_capacity: usize) -> Self {
        let (notify, _) = broadcast::channel(notify_capacity.max(1));
        Self {
            state: RwLock::new(state),
            notify,
        }
    }

    /// Every record appended so far, oldest first.
    pub async fn records(&self) -> Vec<CompletionRecord> {
        self.state.read().await.records.clone()
    }

    pub async fn job(&self, id: Uuid) -> Option<Job> {
        self.state.read().await.jobs.iter().find(|j| j.id == id).cloned()
    }

    pub async fn resource(&self, id: Uuid) -> Option<Resource> {
        self.state
            .read()
            .await
            .resources
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    fn publish(&self, kind: ChangeKind, entity: Uuid) {
        // No subscribers is fine.
        let _ = self.notify.send(ChangeNotice::new(kind, entity));
    }
}

impl Gateway for MemoryGateway {
    async fn list_jobs(&self, kind: ResourceKind) -> GatewayResult<Vec<Job>> {
        Ok(self.state.read().await.jobs_of(kind))
    }

    async fn list_resources(&self, kind: ResourceKind) -> GatewayResult<Vec<Resource>> {
        Ok(self.state.read().await.resources_of(kind))
    }

    async fn write_resource(&self, resource: &Resource) -> GatewayResult<()> {
        self.state.write().await.upsert_resource(resource);
        self.publish(ChangeKind::ResourceWritten, resource.id);
        Ok(())
    }

    async fn write_job(&self, job: &Job) -> GatewayResult<()> {
        let change = self.state.write().await.upsert_job(job);
        self.publish(change, job.id);
        Ok(())
    }

    async fn update_job(&self, job: &Job) -> GatewayResult<bool> {
        let change = self.state.write().await.replace_job(job);
        if let Some(change) = change {
            self.publish(change, job.id);
        }
        Ok(change.is_some())
    }

    async fn remove_job(&self, id: Uuid) -> GatewayResult<bool> {
        let removed = self.state.write().await.remove_job(id);
        if removed {
            self.publish(ChangeKind::JobRemoved, id);
        }
        Ok(removed)
    }

    async fn append_completion_record(&self, record: &CompletionRecord) -> GatewayResult<()> {
        self.state.write().await.records.push(record.clone());
        self.publish(ChangeKind::RecordAppended, record.job_id);
        Ok(())
    }

    async fn increment_progress(&self, job_id: Uuid, delta: u32) -> GatewayResult<Option<Job>> {
        let updated = self.state.write().await.increment_progress(job_id, delta);
        if updated.is_some() {
            self.publish(ChangeKind::JobWritten, job_id);
        }
        Ok(updated)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.notify.subscribe()
    }

    async fn snapshot(&self, kind: ResourceKind) -> GatewayResult<Snapshot> {
        let state = self.state.read().await;
        Ok(Snapshot {
            kind,
            jobs: state.jobs_of(kind),
            resources: state.resources_of(kind),
        })
    }
}
