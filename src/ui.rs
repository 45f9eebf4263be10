//! Terminal output: styled floor listings and live simulation bars.
//!
//! Uses `console` for colors and `indicatif` for the per-machine progress
//! bars shown while `floorline simulate` runs.

use std::collections::HashMap;

use console::Style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use uuid::Uuid;

use crate::gateway::Snapshot;
use crate::state_machine::{CompletionRecord, Job, JobStatus, ResourceStatus};

/// `850/1000 (85%)`
pub fn progress_text(job: &Job) -> String {
    let pct = if job.quantity_goal == 0 {
        100
    } else {
        (u64::from(job.quantity_progress.min(job.quantity_goal)) * 100
            / u64::from(job.quantity_goal)) as u32
    };
    format!("{}/{} ({pct}%)", job.quantity_progress, job.quantity_goal)
}

/// Prints floor listings and operation results.
pub struct FloorPrinter {
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
    bold: Style,
}

impl Default for FloorPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl FloorPrinter {
    pub fn new() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
            bold: Style::new().bold(),
        }
    }

    fn status_style(&self, status: ResourceStatus) -> &Style {
        match status {
            ResourceStatus::Running => &self.green,
            ResourceStatus::Idle => &self.dim,
            ResourceStatus::MoldChange | ResourceStatus::Maintenance => &self.yellow,
            ResourceStatus::Down => &self.red,
        }
    }

    /// Each resource with its status and ordered queue.
    pub fn print_floor(&self, snapshot: &Snapshot) {
        let index = snapshot.index();
        println!(
            "{}",
            self.bold
                .apply_to(format!("── {} queue ──", snapshot.kind.queue_name()))
        );
        if snapshot.resources.is_empty() {
            println!("  {}", self.dim.apply_to("(no resources)"));
        }

        let mut resources: Vec<_> = snapshot.resources.iter().collect();
        resources.sort_by(|a, b| a.name.cmp(&b.name));
        for resource in resources {
            let status = resource.status();
            let since = resource
                .running_since()
                .map(|t| format!(" since {}", t.format("%H:%M:%S")))
                .unwrap_or_default();
            println!(
                "  {} [{}]{}",
                self.bold.apply_to(&resource.name),
                self.status_style(status).apply_to(status),
                self.dim.apply_to(since)
            );
            for (pos, job) in index.jobs_for(resource.id).iter().enumerate() {
                let marker = match job.status {
                    JobStatus::InProgress => self.green.apply_to("▶").to_string(),
                    _ => self.dim.apply_to(format!("{}.", pos + 1)).to_string(),
                };
                println!(
                    "    {marker} {} {} p{} {} {}",
                    job.display_name,
                    progress_text(job),
                    job.priority,
                    self.dim.apply_to(&job.assignee_name),
                    self.dim.apply_to(short_id(job.id))
                );
            }
        }

        for orphan in index.orphans() {
            println!(
                "  {} job '{}' ({}) has no resource",
                self.red.apply_to("!"),
                orphan.display_name,
                short_id(orphan.id)
            );
        }
    }

    pub fn success(&self, message: &str) {
        println!("  {} {message}", self.green.apply_to("✓"));
    }

    pub fn failure(&self, message: &str) {
        eprintln!("  {} {message}", self.red.apply_to("✗"));
    }

    /// Pretty JSON of a record, styled like a heading.
    pub fn print_record(&self, record: &CompletionRecord) {
        println!("{}", self.green.apply_to("─── Completion Record ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(record).unwrap_or_default()
        );
    }
}

pub fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

/// One progress bar per in-progress machine job, refreshed each tick.
pub struct SimulationProgress {
    multi: MultiProgress,
    style: ProgressStyle,
    bars: HashMap<Uuid, ProgressBar>,
}

impl Default for SimulationProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationProgress {
    pub fn new() -> Self {
        let style = ProgressStyle::default_bar()
            .template("{prefix:>12.bold} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        Self {
            multi: MultiProgress::new(),
            style,
            bars: HashMap::new(),
        }
    }

    /// Sync bars with the in-progress jobs of a fresh snapshot.
    pub fn update(&mut self, snapshot: &Snapshot) {
        let index = snapshot.index();
        let mut live = Vec::new();
        for resource in &snapshot.resources {
            let Some(job) = index.current_job(resource.id).job() else {
                continue;
            };
            live.push(job.id);
            let bar = self.bars.entry(job.id).or_insert_with(|| {
                let bar = self
                    .multi
                    .add(ProgressBar::new(u64::from(job.quantity_goal)));
                bar.set_style(self.style.clone());
                bar.set_prefix(resource.name.clone());
                bar
            });
            bar.set_length(u64::from(job.quantity_goal));
            bar.set_position(u64::from(job.quantity_progress));
            bar.set_message(job.display_name.clone());
        }

        self.bars.retain(|id, bar| {
            let keep = live.contains(id);
            if !keep {
                bar.finish_and_clear();
            }
            keep
        });
    }

    /// Print a line above the bars.
    pub fn println(&self, line: &str) {
        let _ = self.multi.println(line);
    }

    pub fn finish(&mut self) {
        for (_, bar) in self.bars.drain() {
            bar.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{NewJob, Resource, ResourceKind};
    use chrono::Utc;

    #[test]
    fn progress_text_rounds_down() {
        let press = Resource::new("Press 1", ResourceKind::Machine);
        let mut job = Job::new(&press, NewJob::new("CAP-28", 1000), Utc::now());
        job.quantity_progress = 857;
        assert_eq!(progress_text(&job), "857/1000 (85%)");
    }

    #[test]
    fn short_id_is_eight_hex_chars() {
        let id = Uuid::new_v4();
        let short = short_id(id);
        assert_eq!(short.len(), 8);
        assert!(id.simple().to_string().starts_with(&short));
    }
}
