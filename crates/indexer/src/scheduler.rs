//! The cooperative task scheduler.
//!
//! Named tasks run on fixed intervals inside a single worker, which
//! serializes every store write across the pipeline. A tick that exceeds
//! its timeout is cancelled; per-block durability in the walkers means a
//! cancelled tick simply resumes from its checkpoint on the next interval.
//! A failing task is logged and retried; it never stops the others or the
//! process.

use crate::{
    config::TaskConfig,
    dispatcher::EventDispatcher,
    errors::TaskError,
    status_scan::StatusAdvancer,
    traits::{DocStore, NodeProvider},
    walker::BlockWalker,
};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::{debug, error, warn};

const LOG_TARGET: &str = "scheduler";

/// A schedulable pipeline job.
#[async_trait]
pub trait Task: Send + Sync {
    /// Runs one tick of the job.
    async fn tick(&self) -> Result<(), TaskError>;
}

#[async_trait]
impl<P: NodeProvider, S: DocStore> Task for BlockWalker<P, S> {
    async fn tick(&self) -> Result<(), TaskError> {
        Self::tick(self).await
    }
}

#[async_trait]
impl<P: NodeProvider, S: DocStore> Task for EventDispatcher<P, S> {
    async fn tick(&self) -> Result<(), TaskError> {
        Self::tick(self).await
    }
}

#[async_trait]
impl<P: NodeProvider, S: DocStore> Task for StatusAdvancer<P, S> {
    async fn tick(&self) -> Result<(), TaskError> {
        Self::tick(self).await
    }
}

struct ScheduledTask {
    name: String,
    interval: Duration,
    timeout: Duration,
    task: Arc<dyn Task>,
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Fixed-interval cooperative runner over the registered tasks.
#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: Vec<ScheduledTask>,
}

impl Scheduler {
    /// An empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task under its configured schedule.
    pub fn add_task(&mut self, name: impl Into<String>, config: &TaskConfig, task: Arc<dyn Task>) {
        self.tasks.push(ScheduledTask {
            name: name.into(),
            interval: Duration::from_secs(config.interval),
            timeout: Duration::from_secs(config.timeout),
            task,
        });
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether any task is registered.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs the schedule forever. One task at a time; a due task waits for
    /// the running one to finish or be cancelled.
    pub async fn run(&self) {
        if self.tasks.is_empty() {
            warn!(target: LOG_TARGET, "No tasks configured, scheduler is idle");
            return;
        }

        let mut next_due = vec![Instant::now(); self.tasks.len()];
        loop {
            let earliest = *next_due.iter().min().expect("at least one task");
            tokio::time::sleep_until(earliest).await;

            let now = Instant::now();
            for (i, entry) in self.tasks.iter().enumerate() {
                if next_due[i] <= now {
                    run_guarded(entry).await;
                    next_due[i] = Instant::now() + entry.interval;
                }
            }
        }
    }
}

/// Runs one tick under its timeout and top-level error guard.
async fn run_guarded(entry: &ScheduledTask) {
    let started = Instant::now();
    match tokio::time::timeout(entry.timeout, entry.task.tick()).await {
        Ok(Ok(())) => {
            debug!(
                target: LOG_TARGET,
                task = %entry.name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Task tick complete"
            );
        }
        Ok(Err(err)) => {
            error!(
                target: LOG_TARGET,
                task = %entry.name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Task tick failed: {err}"
            );
        }
        Err(_) => {
            error!(
                target: LOG_TARGET,
                task = %entry.name,
                "Task cancelled after exceeding its {}s timeout",
                entry.timeout.as_secs()
            );
        }
    }
}
