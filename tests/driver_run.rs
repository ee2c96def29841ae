use std::cell::RefCell;
use std::time::Duration;

use hubrun::config::RunConfig;
use hubrun::driver::Driver;
use hubrun::hub::{BuildRegistry, JobQueue};
use hubrun::notify::Notifier;
use hubrun::releases::{ReleaseMetadata, ReleaseSlot};
use hubrun::remote::RemoteExecutor;
use hubrun::wait::{Sleeper, WaitPolicy};
use hubrun::Result;

struct IdleHub;

impl JobQueue for IdleHub {
    fn is_busy(&self) -> Result<bool> {
        Ok(false)
    }

    fn restart(&self) -> Result<()> {
        Ok(())
    }
}

impl BuildRegistry for IdleHub {
    fn latest_build(&self, conf_name: &str) -> Result<Option<String>> {
        Ok(Some(format!("{}_20240301120000_abcd1234", conf_name)))
    }
}

struct Counts(u64, u64);

impl ReleaseMetadata for Counts {
    fn document_count(&self, _release_name: &str, slot: ReleaseSlot) -> Result<u64> {
        Ok(match slot {
            ReleaseSlot::Latest => self.0,
            ReleaseSlot::Previous => self.1,
        })
    }
}

#[derive(Default)]
struct Recorder {
    lines: RefCell<Vec<String>>,
}

impl RemoteExecutor for Recorder {
    fn submit(&self, command: &str) -> Result<()> {
        self.lines.borrow_mut().push(command.to_string());
        Ok(())
    }
}

impl Notifier for Recorder {
    fn send(&self, message: &str) -> Result<()> {
        self.lines.borrow_mut().push(message.to_string());
        Ok(())
    }
}

struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) {}
}

fn run(plugins: &[&str], counts: Counts) -> (hubrun::driver::RunSummary, Vec<String>, Vec<String>) {
    let config = RunConfig::default();
    let executor = Recorder::default();
    let notifier = Recorder::default();
    let plugins: Vec<String> = plugins.iter().map(|p| p.to_string()).collect();

    let driver = Driver {
        config: &config,
        policy: WaitPolicy::from(&config.wait),
        executor: &executor,
        queue: &IdleHub,
        registry: &IdleHub,
        releases: &counts,
        notifier: &notifier,
        sleeper: &NoSleep,
    };

    let summary = driver.run(&plugins);
    let submitted = executor.lines.into_inner();
    let messages = notifier.lines.into_inner();
    (summary, submitted, messages)
}

#[test]
fn sources_run_back_to_back() {
    let (summary, submitted, messages) = run(&["figshare", "biorxiv"], Counts(10, 8));

    assert_eq!(summary.summary.succeeded, 2);
    assert_eq!(submitted.len(), 12);
    assert_eq!(submitted[0], "dump(src='covid_figshare')");
    assert_eq!(submitted[5], "install('outbreak-figshare')");
    assert_eq!(submitted[6], "dump(src='biorxiv')");
    assert!(submitted[10].contains("previous_build='biorxiv_20240301120000_abcd1234'"));
    assert_eq!(
        messages,
        vec![
            "figshare updated in 0 minutes with 10 documents",
            "biorxiv updated in 0 minutes with 10 documents",
        ]
    );
}

#[test]
fn shrinking_release_is_reported_and_not_installed() {
    let (summary, submitted, messages) = run(&["pdb"], Counts(3, 8));

    assert_eq!(summary.summary.failed, 1);
    assert!(!submitted.iter().any(|c| c.starts_with("install(")));
    assert!(messages[0].starts_with("pdb failed with the following error"));
    assert!(messages[0].contains("New document count (3) less than older document count (8)"));

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["results"][0]["failed_stage"], "publish_snapshot");
    assert_eq!(json["results"][0]["stages"][0]["outcome"], "completed");
}
