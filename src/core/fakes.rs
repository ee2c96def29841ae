//! In-memory stand-ins for the hub collaborators, for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::error::{Error, HubRequestFailedDetails, Result};
use crate::hub::{BuildRegistry, JobQueue};
use crate::notify::Notifier;
use crate::releases::{ReleaseMetadata, ReleaseSlot};
use crate::remote::RemoteExecutor;
use crate::wait::Sleeper;

fn hub_down() -> Error {
    Error::hub_request_failed(HubRequestFailedDetails {
        url: "http://hub.test/job_manager".to_string(),
        status: None,
        body: None,
        error: Some("connection refused".to_string()),
    })
}

/// Answers `is_busy` from a script, then with `then` once the script runs out.
pub struct FakeQueue {
    script: RefCell<VecDeque<bool>>,
    then: bool,
    fail: bool,
    checks: Cell<u32>,
    restarts: Cell<u32>,
}

impl FakeQueue {
    pub fn scripted(script: &[bool]) -> Self {
        Self {
            script: RefCell::new(script.iter().copied().collect()),
            then: false,
            fail: false,
            checks: Cell::new(0),
            restarts: Cell::new(0),
        }
    }

    pub fn always_busy() -> Self {
        Self {
            then: true,
            ..Self::scripted(&[])
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::scripted(&[])
        }
    }

    pub fn checks(&self) -> u32 {
        self.checks.get()
    }

    pub fn restarts(&self) -> u32 {
        self.restarts.get()
    }
}

impl JobQueue for FakeQueue {
    fn is_busy(&self) -> Result<bool> {
        self.checks.set(self.checks.get() + 1);
        if self.fail {
            return Err(hub_down());
        }
        Ok(self.script.borrow_mut().pop_front().unwrap_or(self.then))
    }

    fn restart(&self) -> Result<()> {
        self.restarts.set(self.restarts.get() + 1);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeExecutor {
    submitted: RefCell<Vec<String>>,
    /// Submissions whose command contains this text fail.
    pub fail_on: Option<String>,
}

impl FakeExecutor {
    pub fn failing_on(fragment: &str) -> Self {
        Self {
            fail_on: Some(fragment.to_string()),
            ..Self::default()
        }
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.borrow().clone()
    }
}

impl RemoteExecutor for FakeExecutor {
    fn submit(&self, command: &str) -> Result<()> {
        if let Some(fragment) = &self.fail_on {
            if command.contains(fragment.as_str()) {
                return Err(Error::internal_unexpected(format!(
                    "hub rejected {}",
                    fragment
                )));
            }
        }
        self.submitted.borrow_mut().push(command.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    slept: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }

    pub fn slept_secs(&self) -> Vec<u64> {
        self.slept.borrow().iter().map(|d| d.as_secs()).collect()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    pub builds: HashMap<String, String>,
    pub fail: bool,
}

impl BuildRegistry for FakeRegistry {
    fn latest_build(&self, conf_name: &str) -> Result<Option<String>> {
        if self.fail {
            return Err(hub_down());
        }
        Ok(self.builds.get(conf_name).cloned())
    }
}

/// Document counts per release as `(latest, previous)`.
#[derive(Default)]
pub struct FakeReleases {
    pub counts: HashMap<String, (u64, u64)>,
}

impl ReleaseMetadata for FakeReleases {
    fn document_count(&self, release_name: &str, slot: ReleaseSlot) -> Result<u64> {
        let (latest, previous) = self
            .counts
            .get(release_name)
            .copied()
            .ok_or_else(|| Error::release_metadata_missing(release_name, "versions"))?;
        Ok(match slot {
            ReleaseSlot::Latest => latest,
            ReleaseSlot::Previous => previous,
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: RefCell<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, message: &str) -> Result<()> {
        self.messages.borrow_mut().push(message.to_string());
        Ok(())
    }
}
