use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::resource::{Resource, ResourceKind};

/// Tracks the lifecycle status of a job.
///
/// `Completed` is never stored: a job is removed from the active collection
/// in the same write that detects completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::InProgress => write!(f, "in progress"),
            JobStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Parameters for assigning new work to a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub product_ref: String,
    /// Falls back to `product_ref` when absent.
    pub display_name: Option<String>,
    pub quantity_goal: u32,
    pub priority: i32,
    pub assignee_name: String,
}

impl NewJob {
    pub fn new(product_ref: impl Into<String>, quantity_goal: u32) -> Self {
        Self {
            product_ref: product_ref.into(),
            display_name: None,
            quantity_goal,
            priority: 0,
            assignee_name: String::new(),
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn assignee(mut self, name: impl Into<String>) -> Self {
        self.assignee_name = name.into();
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// A unit of production or packing work bound to one resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub resource_id: Uuid,
    /// Queue the job lives in; always the kind of its resource.
    pub kind: ResourceKind,
    pub product_ref: String,
    pub display_name: String,
    pub quantity_goal: u32,
    pub quantity_progress: u32,
    pub status: JobStatus,
    /// Lower is more urgent.
    pub priority: i32,
    pub added_at: DateTime<Utc>,
    /// Simulation clock anchor for time-driven jobs. Advanced by whole
    /// cycles only, so the partial cycle in flight survives between ticks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cycle_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignee_name: String,
}

impl Job {
    pub fn new(resource: &Resource, request: NewJob, added_at: DateTime<Utc>) -> Self {
        let display_name = request
            .display_name
            .unwrap_or_else(|| request.product_ref.clone());
        Self {
            id: Uuid::new_v4(),
            resource_id: resource.id,
            kind: resource.kind,
            product_ref: request.product_ref,
            display_name,
            quantity_goal: request.quantity_goal,
            quantity_progress: 0,
            status: JobStatus::Queued,
            priority: request.priority,
            added_at,
            last_cycle_at: None,
            assignee_name: request.assignee_name,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.quantity_goal.saturating_sub(self.quantity_progress)
    }

    pub fn is_done(&self) -> bool {
        self.quantity_progress >= self.quantity_goal
    }

    pub fn is_active(&self) -> bool {
        self.status != JobStatus::Completed
    }

    /// Queue ordering key: priority first, then insertion time.
    pub fn sort_key(&self) -> (i32, DateTime<Utc>) {
        (self.priority, self.added_at)
    }

    /// Drop back to the queue. Any partial cycle is forfeited.
    pub(crate) fn demote(&mut self) {
        self.status = JobStatus::Queued;
        self.last_cycle_at = None;
    }

    pub(crate) fn label(&self) -> String {
        format!("job '{}'", self.display_name)
    }
}

/// Stage the counted units land in once a record is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultingStage {
    /// Molded parts waiting for a packing station.
    Molded,
    /// Packed finished goods.
    Packed,
}

impl From<ResourceKind> for ResultingStage {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Machine => ResultingStage::Molded,
            ResourceKind::Station => ResultingStage::Packed,
        }
    }
}

/// What produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordEvent {
    ProgressLogged,
    GoalReached,
    ManualCompleted,
}

/// Append-only production fact handed to the external log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub date: DateTime<Utc>,
    pub job_id: Uuid,
    pub product_ref: String,
    pub display_name: String,
    pub quantity_counted: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_rejected: Option<u32>,
    /// Units that were still outstanding when the job was closed.
    #[serde(default)]
    pub quantity_shortfall: u32,
    pub resource_name: String,
    pub assignee_name: String,
    pub resulting_stage: ResultingStage,
    pub event: RecordEvent,
}

impl CompletionRecord {
    pub fn for_job(
        job: &Job,
        resource: &Resource,
        event: RecordEvent,
        quantity_counted: u32,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            date,
            job_id: job.id,
            product_ref: job.product_ref.clone(),
            display_name: job.display_name.clone(),
            quantity_counted,
            quantity_rejected: None,
            quantity_shortfall: 0,
            resource_name: resource.name.clone(),
            assignee_name: job.assignee_name.clone(),
            resulting_stage: resource.kind.into(),
            event,
        }
    }

    pub fn rejected(mut self, rejected: Option<u32>) -> Self {
        self.quantity_rejected = rejected.filter(|r| *r > 0);
        self
    }

    pub fn shortfall(mut self, shortfall: u32) -> Self {
        self.quantity_shortfall = shortfall;
        self
    }
}
