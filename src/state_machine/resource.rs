use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two kinds of floor resource. Machines advance their jobs on a timed
/// cycle; stations only advance when an operator logs packed units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Machine,
    Station,
}

impl ResourceKind {
    /// Name of the job queue that feeds this kind of resource.
    pub fn queue_name(self) -> &'static str {
        match self {
            ResourceKind::Machine => "molding",
            ResourceKind::Station => "packing",
        }
    }

    /// Whether jobs on this kind of resource progress without operator input.
    pub fn is_time_driven(self) -> bool {
        matches!(self, ResourceKind::Machine)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Machine => write!(f, "machine"),
            ResourceKind::Station => write!(f, "station"),
        }
    }
}

/// Why a resource is parked outside the productive cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldReason {
    MoldChange,
    Maintenance,
    Down,
}

/// Flat status as shown to operators. Derived from [`ResourceState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Running,
    Idle,
    MoldChange,
    Maintenance,
    Down,
}

impl ResourceStatus {
    pub fn hold_reason(self) -> Option<HoldReason> {
        match self {
            ResourceStatus::MoldChange => Some(HoldReason::MoldChange),
            ResourceStatus::Maintenance => Some(HoldReason::Maintenance),
            ResourceStatus::Down => Some(HoldReason::Down),
            ResourceStatus::Running | ResourceStatus::Idle => None,
        }
    }
}

impl From<HoldReason> for ResourceStatus {
    fn from(reason: HoldReason) -> Self {
        match reason {
            HoldReason::MoldChange => ResourceStatus::MoldChange,
            HoldReason::Maintenance => ResourceStatus::Maintenance,
            HoldReason::Down => ResourceStatus::Down,
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceStatus::Running => write!(f, "running"),
            ResourceStatus::Idle => write!(f, "idle"),
            ResourceStatus::MoldChange => write!(f, "mold change"),
            ResourceStatus::Maintenance => write!(f, "maintenance"),
            ResourceStatus::Down => write!(f, "down"),
        }
    }
}

/// What a resource is doing right now.
///
/// The running job and the running-since timestamp only exist inside
/// `Running`, so a resource can never claim to run without a job or keep a
/// stale start time after it stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResourceState {
    Idle,
    Running { job_id: Uuid, since: DateTime<Utc> },
    Held { reason: HoldReason },
}

/// A molding machine or packing station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub kind: ResourceKind,
    pub state: ResourceState,
    /// Planning metadata for machines. Not read by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_hours_per_day: Option<f32>,
}

impl Resource {
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            state: ResourceState::Idle,
            working_hours_per_day: None,
        }
    }

    pub fn status(&self) -> ResourceStatus {
        match self.state {
            ResourceState::Idle => ResourceStatus::Idle,
            ResourceState::Running { .. } => ResourceStatus::Running,
            ResourceState::Held { reason } => reason.into(),
        }
    }

    pub fn running_since(&self) -> Option<DateTime<Utc>> {
        match self.state {
            ResourceState::Running { since, .. } => Some(since),
            _ => None,
        }
    }

    pub fn running_job(&self) -> Option<Uuid> {
        match self.state {
            ResourceState::Running { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ResourceState::Running { .. })
    }

    /// Stations have no molds and are never reported down; only
    /// maintenance is a valid hold for them.
    pub fn supports(&self, status: ResourceStatus) -> bool {
        match self.kind {
            ResourceKind::Machine => true,
            ResourceKind::Station => matches!(
                status,
                ResourceStatus::Running | ResourceStatus::Idle | ResourceStatus::Maintenance
            ),
        }
    }
}
