//! Task scheduler - Runs plugin run tasks on cron or interval triggers
//!
//! Each (plugin, task) pair owns at most one background timer task. Every
//! firing spawns the handler separately, so stopping a timer never cancels a
//! handler that is already running.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cron::Schedule;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::application::messaging::isolation::Isolated;
use crate::domain::entities::{RunTaskDefinition, TaskContext};
use crate::domain::traits::Transport;

/// Parse a cron expression. Five-field expressions get a leading seconds field.
pub fn parse_cron(expr: &str) -> Result<Schedule, String> {
    let parsed = if expr.split_whitespace().count() == 5 {
        Schedule::from_str(&format!("0 {}", expr))
    } else {
        Schedule::from_str(expr)
    };
    parsed.map_err(|e| e.to_string())
}

/// Timing source behind one scheduled task
enum Timing {
    Interval(tokio::time::Interval),
    Cron(Box<Schedule>),
}

impl Timing {
    /// Wait for the next tick. Returns false when the schedule has no more occurrences.
    async fn next_tick(&mut self) -> bool {
        match self {
            Timing::Interval(interval) => {
                interval.tick().await;
                true
            }
            Timing::Cron(schedule) => {
                let Some(next) = schedule.upcoming(chrono::Utc).next() else {
                    return false;
                };
                let wait = (next - chrono::Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;
                true
            }
        }
    }
}

pub struct TaskScheduler {
    transport: Arc<dyn Transport>,
    timeout: Option<Duration>,
    jobs: Mutex<HashMap<String, HashMap<String, JoinHandle<()>>>>,
}

impl TaskScheduler {
    pub fn new(transport: Arc<dyn Transport>, timeout: Option<Duration>) -> Self {
        Self {
            transport,
            timeout,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn context(&self, plugin: &str, task: &RunTaskDefinition) -> TaskContext {
        TaskContext {
            plugin: plugin.to_string(),
            task: task.name.clone(),
            transport: Arc::clone(&self.transport),
        }
    }

    /// Fire a task once, detached from any schedule
    pub fn run_once(&self, plugin: &str, task: &RunTaskDefinition) -> Isolated {
        let fut = (task.handler)(self.context(plugin, task));
        Isolated::spawn(plugin, format!("task:{}", task.name), fut, self.timeout)
    }

    /// Start every run task of `plugin`
    pub fn schedule(&self, plugin: &str, tasks: &[RunTaskDefinition]) {
        for task in tasks {
            if task.trigger.immediate {
                self.run_once(plugin, task).detach();
            }

            let Some(timing) = self.timing_for(plugin, task) else {
                continue;
            };
            let handle = self.spawn_timer(plugin, task, timing);

            let Ok(mut jobs) = self.jobs.lock() else {
                tracing::error!(plugin = %plugin, task = %task.name, "Scheduler lock poisoned, stopping task");
                handle.abort();
                continue;
            };
            if let Some(previous) = jobs
                .entry(plugin.to_string())
                .or_default()
                .insert(task.name.clone(), handle)
            {
                previous.abort();
            }
            tracing::debug!(plugin = %plugin, task = %task.name, "Scheduled run task");
        }
    }

    fn timing_for(&self, plugin: &str, task: &RunTaskDefinition) -> Option<Timing> {
        if let Some(expr) = &task.trigger.cron {
            match parse_cron(expr) {
                Ok(schedule) => return Some(Timing::Cron(Box::new(schedule))),
                Err(e) => {
                    tracing::error!(plugin = %plugin, task = %task.name, "Invalid cron '{}': {}", expr, e);
                }
            }
        }

        match task.trigger.interval {
            Some(period) if !period.is_zero() => {
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Some(Timing::Interval(interval))
            }
            _ => None,
        }
    }

    fn spawn_timer(&self, plugin: &str, task: &RunTaskDefinition, mut timing: Timing) -> JoinHandle<()> {
        let plugin = plugin.to_string();
        let task = task.clone();
        let ctx = self.context(&plugin, &task);
        let timeout = self.timeout;

        tokio::spawn(async move {
            while timing.next_tick().await {
                let fut = (task.handler)(ctx.clone());
                Isolated::spawn(plugin.clone(), format!("task:{}", task.name), fut, timeout).detach();
            }
            tracing::debug!(plugin = %plugin, task = %task.name, "Schedule exhausted");
        })
    }

    /// Stop every timer owned by `plugin`, returning how many were stopped
    pub fn cancel_plugin(&self, plugin: &str) -> usize {
        let removed = match self.jobs.lock() {
            Ok(mut jobs) => jobs.remove(plugin).unwrap_or_default(),
            Err(e) => {
                tracing::error!(plugin = %plugin, "Failed to stop run tasks: {}", e);
                return 0;
            }
        };

        for (task, handle) in &removed {
            if handle.is_finished() {
                tracing::debug!(plugin = %plugin, task = %task, "Run task already stopped");
            }
            handle.abort();
        }
        removed.len()
    }

    /// Names of the tasks currently scheduled for `plugin`
    pub fn active(&self, plugin: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .jobs
            .lock()
            .ok()
            .and_then(|jobs| jobs.get(plugin).map(|tasks| tasks.keys().cloned().collect()))
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        if let Ok(jobs) = self.jobs.get_mut() {
            for handle in jobs.values().flat_map(|tasks| tasks.values()) {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests;
