//! Tracing setup for the CLI.
//!
//! `RUST_LOG` wins when set; otherwise `info` for this crate, or `debug`
//! with `--verbose`. Logs go to stderr so command output stays clean.

use tracing_subscriber::EnvFilter;

pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "floorline=debug"
    } else {
        "floorline=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
