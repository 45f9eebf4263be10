mod job;
mod resource;
mod state;

pub use job::{CompletionRecord, Job, JobStatus, NewJob, RecordEvent, ResultingStage};
pub use resource::{HoldReason, Resource, ResourceKind, ResourceState, ResourceStatus};
pub use state::{JobEffect, StateMachine, Transition};
