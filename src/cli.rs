//! Command-line interface built on clap.
//!
//! Defines [`Cli`] with its [`Command`] subcommands and the global
//! `--config` and `--verbose` flags.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::state_machine::ResourceStatus;

/// Floorline: job queue and scheduling for molding and packing floors.
#[derive(Debug, Parser)]
#[command(name = "floorline", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Status an operator can put a resource into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Idle,
    MoldChange,
    Maintenance,
    Down,
}

impl From<StatusArg> for ResourceStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Idle => ResourceStatus::Idle,
            StatusArg::MoldChange => ResourceStatus::MoldChange,
            StatusArg::Maintenance => ResourceStatus::Maintenance,
            StatusArg::Down => ResourceStatus::Down,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ResourceCommand {
    /// Register a new resource.
    Add {
        name: String,

        /// Planned working hours per day (machines only).
        #[arg(long)]
        hours: Option<f32>,
    },
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage molding machines.
    #[command(subcommand)]
    Machine(ResourceCommand),

    /// Manage packing stations.
    #[command(subcommand)]
    Station(ResourceCommand),

    /// Queue a job on a machine or station.
    Assign {
        /// Resource name.
        resource: String,
        /// Product reference.
        product: String,
        /// Units to produce or pack.
        goal: u32,

        /// Lower runs first.
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        priority: i32,

        /// Operator or packer of record.
        #[arg(long, default_value = "")]
        assignee: String,

        /// Name shown on the floor view.
        #[arg(long)]
        name: Option<String>,
    },

    /// Start a queued job.
    Start { job: String },

    /// Pause a running job.
    Pause { job: String },

    /// Declare a job done and log what was left.
    Complete { job: String },

    /// Drop a job without logging it.
    Cancel {
        job: String,

        /// Confirm the cancellation.
        #[arg(long)]
        yes: bool,
    },

    /// Log packed units against a station job.
    Log {
        job: String,
        quantity: u32,

        /// Units rejected at inspection.
        #[arg(long)]
        rejected: Option<u32>,
    },

    /// Change a job's priority.
    Priority {
        job: String,
        #[arg(allow_hyphen_values = true)]
        priority: i32,
    },

    /// Put a resource on hold or back to idle.
    Hold {
        resource: String,
        #[arg(value_enum)]
        status: StatusArg,
    },

    /// Show the floor.
    Status,

    /// Run the progress simulator.
    Simulate {
        /// Stop after this many ticks.
        #[arg(long)]
        ticks: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_assign() {
        let cli = Cli::parse_from([
            "floorline",
            "assign",
            "Press 1",
            "CAP-28",
            "5000",
            "--priority",
            "-1",
            "--assignee",
            "Rui",
        ]);
        match cli.command {
            Command::Assign {
                resource,
                product,
                goal,
                priority,
                assignee,
                name,
            } => {
                assert_eq!(resource, "Press 1");
                assert_eq!(product, "CAP-28");
                assert_eq!(goal, 5000);
                assert_eq!(priority, -1);
                assert_eq!(assignee, "Rui");
                assert!(name.is_none());
            }
            _ => panic!("expected Assign command"),
        }
    }

    #[test]
    fn cli_parses_hold_and_globals() {
        let cli = Cli::parse_from([
            "floorline",
            "--verbose",
            "--config",
            "plant.toml",
            "hold",
            "Press 2",
            "mold-change",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("plant.toml")));
        match cli.command {
            Command::Hold { resource, status } => {
                assert_eq!(resource, "Press 2");
                assert_eq!(ResourceStatus::from(status), ResourceStatus::MoldChange);
            }
            _ => panic!("expected Hold command"),
        }
    }

    #[test]
    fn cli_parses_machine_add() {
        let cli = Cli::parse_from(["floorline", "machine", "add", "Press 3", "--hours", "16"]);
        match cli.command {
            Command::Machine(ResourceCommand::Add { name, hours }) => {
                assert_eq!(name, "Press 3");
                assert_eq!(hours, Some(16.0));
            }
            _ => panic!("expected Machine Add"),
        }
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
