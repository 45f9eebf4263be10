use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::{Mutex, broadcast};
use tracing::debug;
use uuid::Uuid;

use super::{ChangeKind, ChangeNotice, Gateway, GatewayResult, PlantState, Snapshot};
use crate::state_machine::{CompletionRecord, Job, Resource, ResourceKind};

/// JSON file store shared by every CLI process pointed at the same path.
///
/// Each call re-reads the file, so separate processes see each other's
/// writes. Mutations are read-modify-write of the whole file, replaced via
/// rename; two processes writing at once race last-writer-wins, and the
/// increment is only atomic among callers in this process.
#[derive(Debug)]
pub struct FileGateway {
    path: PathBuf,
    lock: Mutex<()>,
    notify: broadcast::Sender<ChangeNotice>,
}

impl FileGateway {
    pub fn open(path: impl Into<PathBuf>, notify_capacity: usize) -> Self {
        let (notify, _) = broadcast::channel(notify_capacity.max(1));
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            notify,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> GatewayResult<PlantState> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(PlantState::default()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(PlantState::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, state: &PlantState) -> GatewayResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), jobs = state.jobs.len(), "plant state saved");
        Ok(())
    }

    /// Load, apply `f`, save. Held under the process lock.
    async fn update<T: Send>(
        &self,
        f: impl FnOnce(&mut PlantState) -> T + Send,
    ) -> GatewayResult<T> {
        let _guard = self.lock.lock().await;
        let mut state = self.load().await?;
        let out = f(&mut state);
        self.save(&state).await?;
        Ok(out)
    }

    fn publish(&self, kind: ChangeKind, entity: Uuid) {
        let _ = self.notify.send(ChangeNotice::new(kind, entity));
    }
}

impl Gateway for FileGateway {
    async fn list_jobs(&self, kind: ResourceKind) -> GatewayResult<Vec<Job>> {
        Ok(self.load().await?.jobs_of(kind))
    }

    async fn list_resources(&self, kind: ResourceKind) -> GatewayResult<Vec<Resource>> {
        Ok(self.load().await?.resources_of(kind))
    }

    async fn write_resource(&self, resource: &Resource) -> GatewayResult<()> {
        self.update(|state| state.upsert_resource(resource)).await?;
        self.publish(ChangeKind::ResourceWritten, resource.id);
        Ok(())
    }

    async fn write_job(&self, job: &Job) -> GatewayResult<()> {
        let change = self.update(|state| state.upsert_job(job)).await?;
        self.publish(change, job.id);
        Ok(())
    }

    async fn update_job(&self, job: &Job) -> GatewayResult<bool> {
        let change = self.update(|state| state.replace_job(job)).await?;
        if let Some(change) = change {
            self.publish(change, job.id);
        }
        Ok(change.is_some())
    }

    async fn remove_job(&self, id: Uuid) -> GatewayResult<bool> {
        let removed = self.update(|state| state.remove_job(id)).await?;
        if removed {
            self.publish(ChangeKind::JobRemoved, id);
        }
        Ok(removed)
    }

    async fn append_completion_record(&self, record: &CompletionRecord) -> GatewayResult<()> {
        self.update(|state| state.records.push(record.clone()))
            .await?;
        self.publish(ChangeKind::RecordAppended, record.job_id);
        Ok(())
    }

    async fn increment_progress(&self, job_id: Uuid, delta: u32) -> GatewayResult<Option<Job>> {
        let updated = self
            .update(|state| state.increment_progress(job_id, delta))
            .await?;
        if updated.is_some() {
            self.publish(ChangeKind::JobWritten, job_id);
        }
        Ok(updated)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.notify.subscribe()
    }

    async fn snapshot(&self, kind: ResourceKind) -> GatewayResult<Snapshot> {
        let state = self.load().await?;
        Ok(Snapshot {
            kind,
            jobs: state.jobs_of(kind),
            resources: state.resources_of(kind),
        })
    }
}
