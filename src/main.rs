use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use floorline::cli::{Cli, Command, ResourceCommand};
use floorline::config::FloorConfig;
use floorline::gateway::{ChangeKind, FileGateway, Gateway};
use floorline::shutdown::install_shutdown_handler;
use floorline::state_machine::{NewJob, ResourceKind};
use floorline::ui::{FloorPrinter, SimulationProgress, short_id};
use floorline::{ProgressSimulator, SchedulingEngine, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => FloorConfig::load_from(path)?,
        None => FloorConfig::load()?,
    };
    let gateway = Arc::new(FileGateway::open(&config.state_file, config.notify_capacity));
    let engine = SchedulingEngine::new(gateway.clone());
    let printer = FloorPrinter::new();

    match cli.command {
        Command::Machine(ResourceCommand::Add { name, hours }) => {
            let r = engine
                .register_resource(&name, ResourceKind::Machine, hours)
                .await?;
            printer.success(&format!("machine '{}' registered", r.name));
        }
        Command::Station(ResourceCommand::Add { name, .. }) => {
            let r = engine
                .register_resource(&name, ResourceKind::Station, None)
                .await?;
            printer.success(&format!("station '{}' registered", r.name));
        }
        Command::Assign {
            resource,
            product,
            goal,
            priority,
            assignee,
            name,
        } => {
            let target = engine.find_resource(&resource).await?;
            let mut request = NewJob::new(product, goal)
                .priority(priority)
                .assignee(assignee);
            if let Some(name) = name {
                request = request.display_name(name);
            }
            let job = engine.assign(target.id, request).await?;
            printer.success(&format!(
                "job {} queued on {} ({} units)",
                short_id(job.id),
                target.name,
                job.quantity_goal
            ));
        }
        Command::Start { job } => {
            let id = resolve_job(gateway.as_ref(), &job).await?;
            engine.start(id).await?;
            printer.success(&format!("job {} started", short_id(id)));
        }
        Command::Pause { job } => {
            let id = resolve_job(gateway.as_ref(), &job).await?;
            engine.pause(id).await?;
            printer.success(&format!("job {} paused", short_id(id)));
        }
        Command::Complete { job } => {
            let id = resolve_job(gateway.as_ref(), &job).await?;
            let record = engine.complete(id).await?;
            printer.print_record(&record);
        }
        Command::Cancel { job, yes } => {
            let id = resolve_job(gateway.as_ref(), &job).await?;
            if !yes {
                printer.failure("cancelling drops the job without a record");
                bail!("refusing to cancel job {} without --yes", short_id(id));
            }
            engine.cancel(id).await?;
            printer.success(&format!("job {} cancelled", short_id(id)));
        }
        Command::Log {
            job,
            quantity,
            rejected,
        } => {
            let id = resolve_job(gateway.as_ref(), &job).await?;
            let outcome = engine.log_progress(id, quantity, rejected).await?;
            if outcome.completed {
                printer.print_record(&outcome.record);
            } else {
                printer.success(&format!(
                    "{} logged, {}/{} packed",
                    quantity, outcome.job.quantity_progress, outcome.job.quantity_goal
                ));
            }
        }
        Command::Priority { job, priority } => {
            let id = resolve_job(gateway.as_ref(), &job).await?;
            engine.reprioritize(id, priority).await?;
            printer.success(&format!("job {} now priority {priority}", short_id(id)));
        }
        Command::Hold { resource, status } => {
            let target = engine.find_resource(&resource).await?;
            let t = engine.set_resource_status(target.id, status.into()).await?;
            printer.success(&format!("{}: {} → {}", target.name, t.from, t.to));
        }
        Command::Status => {
            for kind in [ResourceKind::Machine, ResourceKind::Station] {
                let snapshot = engine.floor(kind).await?;
                printer.print_floor(&snapshot);
            }
        }
        Command::Simulate { ticks } => {
            simulate(gateway, &config, ticks).await?;
        }
    }

    Ok(())
}

/// Accept a full job id or a unique prefix of one.
async fn resolve_job(gateway: &FileGateway, input: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(input) {
        return Ok(id);
    }
    let needle = input.to_ascii_lowercase().replace('-', "");
    if needle.is_empty() {
        bail!("empty job id");
    }

    let mut matches = Vec::new();
    for kind in [ResourceKind::Machine, ResourceKind::Station] {
        for job in gateway.list_jobs(kind).await? {
            if job.id.simple().to_string().starts_with(&needle) {
                matches.push(job.id);
            }
        }
    }
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("no job matches '{input}'"),
        _ => bail!("'{input}' matches {} jobs, use a longer prefix", matches.len()),
    }
}

/// Tick the simulator and redraw the machine bars whenever the store
/// reports a change.
async fn simulate(gateway: Arc<FileGateway>, config: &FloorConfig, ticks: Option<u64>) -> Result<()> {
    let catalog = Arc::new(config.catalog());
    if catalog.is_empty() {
        tracing::warn!("no product cycle times configured; every job is inert");
    } else {
        tracing::info!(products = catalog.len(), "product catalog loaded");
    }
    let shutdown = install_shutdown_handler();
    let mut changes = gateway.subscribe();

    let simulator = Arc::new(
        ProgressSimulator::new(gateway.clone(), catalog).with_interval(config.tick_interval()),
    );
    let runner = {
        let simulator = simulator.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { simulator.run(shutdown, ticks).await })
    };
    tokio::pin!(runner);

    let mut bars = SimulationProgress::new();
    bars.update(&gateway.snapshot(ResourceKind::Machine).await?);

    loop {
        tokio::select! {
            finished = &mut runner => {
                finished?;
                break;
            }
            change = changes.recv() => {
                match change {
                    Ok(notice) if notice.kind == ChangeKind::RecordAppended => {
                        bars.println(&format!("job {} reached its goal", short_id(notice.entity)));
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
                // Notices only say something changed; redraw from the store.
                bars.update(&gateway.snapshot(ResourceKind::Machine).await?);
            }
        }
    }

    bars.finish();
    shutdown.cancel();
    Ok(())
}
