//! Busy polling and backoff against the hub's job queue.
//!
//! A command is only submitted once the queue is idle. After submission the
//! queue is polled on a fixed schedule until it goes idle again; if it never
//! does, the hub worker is restarted and the command is reported as lost.

use serde::Serialize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::config::WaitConfig;
use crate::error::Result;
use crate::hub::JobQueue;
use crate::remote::RemoteExecutor;

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitPolicy {
    pub busy_poll: Duration,
    pub busy_max_polls: u32,
    pub completion_schedule: Vec<Duration>,
    pub restart_cooldown: Duration,
    pub progress_log_every: u32,
}

impl From<&WaitConfig> for WaitPolicy {
    fn from(config: &WaitConfig) -> Self {
        Self {
            busy_poll: Duration::from_secs(config.busy_poll_secs),
            busy_max_polls: config.busy_max_polls,
            completion_schedule: config
                .completion_schedule_secs
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
            restart_cooldown: Duration::from_secs(config.restart_cooldown_secs),
            progress_log_every: config.progress_log_every.max(1),
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::from(&WaitConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitReport {
    pub finished: bool,
    pub polls: u32,
    pub waited_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// Submitted and the queue drained within the schedule.
    Completed { polls: u32, waited_secs: u64 },
    /// The queue never went idle, so the command was not submitted.
    QueueBusy { polls: u32 },
    /// Submitted but still running when the schedule ran out; worker restarted.
    Restarted { waited_secs: u64 },
}

impl CommandOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CommandOutcome::Completed { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            CommandOutcome::Completed { polls, waited_secs } => {
                format!("completed after {} polls ({} minutes)", polls, waited_secs / 60)
            }
            CommandOutcome::QueueBusy { polls } => {
                format!("job queue still busy after {} polls, command not submitted", polls)
            }
            CommandOutcome::Restarted { waited_secs } => format!(
                "still running after {} minutes, hub worker restarted",
                waited_secs / 60
            ),
        }
    }
}

/// Poll until the queue is idle. Returns the number of busy polls, or `None`
/// once `busy_max_polls` is reached.
pub fn wait_until_idle(
    queue: &dyn JobQueue,
    sleeper: &dyn Sleeper,
    policy: &WaitPolicy,
) -> Result<Option<u32>> {
    let mut polls = 0;

    while queue.is_busy()? {
        tracing::info!("job mgr busy");
        polls += 1;
        sleeper.sleep(policy.busy_poll);
        if polls >= policy.busy_max_polls {
            tracing::info!("took too long");
            return Ok(None);
        }
    }

    Ok(Some(polls))
}

/// Sleep through the completion schedule, checking the queue after each step.
pub fn wait_for_completion(
    queue: &dyn JobQueue,
    sleeper: &dyn Sleeper,
    policy: &WaitPolicy,
) -> Result<WaitReport> {
    let every = policy.progress_log_every.max(1);
    let mut polls = 0u32;
    let mut waited = Duration::ZERO;

    for step in &policy.completion_schedule {
        polls += 1;
        sleeper.sleep(*step);
        waited += *step;
        show_progress(waited);

        if polls % every == every - 1 {
            tracing::info!("waiting");
        }

        if !queue.is_busy()? {
            clear_progress();
            if polls > 1 {
                tracing::info!("{} times {} minutes", polls, waited.as_secs() / 60);
            }
            return Ok(WaitReport {
                finished: true,
                polls,
                waited_secs: waited.as_secs(),
            });
        }
    }

    clear_progress();
    tracing::info!("waited too long");
    Ok(WaitReport {
        finished: false,
        polls,
        waited_secs: waited.as_secs(),
    })
}

/// Submit one command once the queue is idle and wait for it to drain.
pub fn run_command(
    executor: &dyn RemoteExecutor,
    queue: &dyn JobQueue,
    sleeper: &dyn Sleeper,
    policy: &WaitPolicy,
    command: &str,
) -> Result<CommandOutcome> {
    tracing::info!("{}", command);

    if wait_until_idle(queue, sleeper, policy)?.is_none() {
        return Ok(CommandOutcome::QueueBusy {
            polls: policy.busy_max_polls,
        });
    }

    executor.submit(command)?;

    let report = wait_for_completion(queue, sleeper, policy)?;
    if !report.finished {
        tracing::info!("restarting");
        log_status!("hub", "Restarting hub worker after {} minutes", report.waited_secs / 60);
        queue.restart()?;
        sleeper.sleep(policy.restart_cooldown);
        return Ok(CommandOutcome::Restarted {
            waited_secs: report.waited_secs,
        });
    }

    Ok(CommandOutcome::Completed {
        polls: report.polls,
        waited_secs: report.waited_secs,
    })
}

fn show_progress(waited: Duration) {
    if std::io::stderr().is_terminal() {
        eprint!("\r{:.1} minutes", waited.as_secs_f64() / 60.0);
    }
}

fn clear_progress() {
    if std::io::stderr().is_terminal() {
        eprint!("\r\x1b[K");
    }
}
