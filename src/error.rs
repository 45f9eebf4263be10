use thiserror::Error;
use uuid::Uuid;

use crate::state_machine::ResourceKind;

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("Invalid transition: cannot {action} {subject} while it is {state}")]
    InvalidTransition {
        action: &'static str,
        subject: String,
        state: String,
    },

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("A resource named '{0}' already exists")]
    DuplicateResource(String),

    #[error("Job {0} references a resource that no longer exists")]
    OrphanJob(Uuid),

    #[error("Operation requires a {expected} but {resource} is a {actual}")]
    WrongResourceKind {
        resource: String,
        expected: ResourceKind,
        actual: ResourceKind,
    },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Persistence error: {0}")]
    Gateway(#[from] GatewayError),
}

impl SchedulingError {
    pub(crate) fn invalid(
        action: &'static str,
        subject: impl Into<String>,
        state: impl std::fmt::Display,
    ) -> Self {
        SchedulingError::InvalidTransition {
            action,
            subject: subject.into(),
            state: state.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchedulingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_display() {
        let err = SchedulingError::invalid("start", "job 'Cap 28mm'", "in progress");
        assert_eq!(
            err.to_string(),
            "Invalid transition: cannot start job 'Cap 28mm' while it is in progress"
        );
    }

    #[test]
    fn gateway_error_converts() {
        let io = std::io::Error::other("disk gone");
        let err: SchedulingError = GatewayError::from(io).into();
        assert!(matches!(err, SchedulingError::Gateway(GatewayError::Io(_))));
    }
}
