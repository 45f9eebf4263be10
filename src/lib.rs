//! Job queue and resource scheduling for molding and packing floors.
//!
//! - [`state_machine`]: jobs, resources, and the transitions between their states.
//! - [`queue`]: the per-resource ordered view over active jobs.
//! - [`engine`]: operator actions (assign, start, pause, complete, cancel, log).
//! - [`simulator`]: timed progress for running machines.
//! - [`gateway`]: the store everything reads from and writes to.

pub mod catalog;
pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod queue;
pub mod shutdown;
pub mod simulator;
pub mod state_machine;
pub mod ui;

pub use engine::{ProgressOutcome, SchedulingEngine};
pub use error::{GatewayError, Result, SchedulingError};
pub use simulator::{ProgressSimulator, TickReport};
