//! Sequential build driver.
//!
//! Runs every configured stage for one plugin after another, strictly in
//! order, and reports each plugin's outcome through the notifier. A failure
//! stops the remaining stages of that plugin only.

use serde::Serialize;
use std::time::Instant;

use crate::build_name;
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::hub::{BuildRegistry, JobQueue};
use crate::notify::{self, Notifier};
use crate::releases::{self, ReleaseMetadata, ReleaseSlot};
use crate::remote::RemoteExecutor;
use crate::stages::{self, RenderedStage, Stage, StageVars};
use crate::wait::{self, CommandOutcome, Sleeper, WaitPolicy};

/// Source name used when the run fails before any plugin starts.
pub const BUILDER_SOURCE: &str = "builder";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Just(Vec<String>),
    Not(Vec<String>),
}

pub fn select_plugins(configured: &[String], selection: &Selection) -> Vec<String> {
    match selection {
        Selection::All => configured.to_vec(),
        Selection::Just(only) => only.clone(),
        Selection::Not(excluded) => configured
            .iter()
            .filter(|p| !excluded.contains(p))
            .cloned()
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub call: String,
    pub command: String,
    #[serde(flatten)]
    pub outcome: CommandOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub plugin: String,
    pub release_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_build_name: Option<String>,
    pub stages: Vec<StageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_document_count: Option<u64>,
    pub elapsed_minutes: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

impl SourceReport {
    fn new(plugin: &str, release_name: String) -> Self {
        Self {
            plugin: plugin.to_string(),
            release_name,
            build_name: None,
            previous_build_name: None,
            stages: Vec::new(),
            document_count: None,
            previous_document_count: None,
            elapsed_minutes: 0,
            success: false,
            failed_stage: None,
            error: None,
            message: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunTotals {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub plugins: Vec<String>,
    pub results: Vec<SourceReport>,
    pub summary: RunTotals,
}

/// Commands a plugin would run, without contacting the hub.
#[derive(Debug, Clone, Serialize)]
pub struct SourcePlan {
    pub plugin: String,
    pub source_name: String,
    pub release_name: String,
    pub build_name: String,
    pub stages: Vec<RenderedStage>,
}

pub struct Driver<'a> {
    pub config: &'a RunConfig,
    pub policy: WaitPolicy,
    pub executor: &'a dyn RemoteExecutor,
    pub queue: &'a dyn JobQueue,
    pub registry: &'a dyn BuildRegistry,
    pub releases: &'a dyn ReleaseMetadata,
    pub notifier: &'a dyn Notifier,
    pub sleeper: &'a dyn Sleeper,
}

impl<'a> Driver<'a> {
    pub fn run(&self, plugins: &[String]) -> RunSummary {
        tracing::info!("Generating new releases for {}", plugins.join(", "));

        let results: Vec<SourceReport> = plugins.iter().map(|p| self.run_source(p)).collect();
        let succeeded = results.iter().filter(|r| r.success).count();

        RunSummary {
            plugins: plugins.to_vec(),
            summary: RunTotals {
                total: results.len(),
                succeeded,
                failed: results.len() - succeeded,
            },
            results,
        }
    }

    pub fn run_source(&self, plugin: &str) -> SourceReport {
        let started = Instant::now();
        let release_name = release_name(self.config, plugin);
        let mut report = SourceReport::new(plugin, release_name);
        let mut current_call: Option<String> = None;

        log_status!("run", "Starting {}", plugin);
        let result = self.execute_source(plugin, &mut report, &mut current_call);
        report.elapsed_minutes = (started.elapsed().as_secs_f64() / 60.0).round() as u64;

        let message = match result {
            Ok(()) => {
                report.success = true;
                notify::success_message(plugin, report.elapsed_minutes, report.document_count)
            }
            Err(err) => {
                let text = notify::stage_error_text(current_call.as_deref(), &err.message);
                tracing::error!("{} failed: {}", plugin, text);
                report.failed_stage = current_call;
                report.error = Some(text.clone());
                notify::failure_message(plugin, &text)
            }
        };

        notify::deliver(self.notifier, &message);
        report.message = message;
        report
    }

    fn execute_source(
        &self,
        plugin: &str,
        report: &mut SourceReport,
        current_call: &mut Option<String>,
    ) -> Result<()> {
        let source_name = stages::source_name(plugin, &self.config.dumpers);
        let build_name = build_name::create(plugin);
        report.build_name = Some(build_name.clone());

        let previous_build_name = self.registry.latest_build(plugin)?;
        report.previous_build_name = previous_build_name.clone();

        let vars = StageVars::new(
            plugin,
            source_name,
            &build_name,
            previous_build_name,
            &report.release_name,
            &self.config.environments,
        );

        for rendered in stages::render_all(&self.config.stages, &vars) {
            let call = rendered.call_name().to_string();
            *current_call = Some(call.clone());
            log_status!("run", "{}: {}", plugin, call);

            let outcome = wait::run_command(
                self.executor,
                self.queue,
                self.sleeper,
                &self.policy,
                &rendered.command,
            )?;
            let completed = outcome.is_completed();
            let described = outcome.describe();

            report.stages.push(StageReport {
                stage: rendered.stage,
                call: call.clone(),
                command: rendered.command.clone(),
                outcome,
            });

            if !completed {
                if self.config.abort_on_stage_failure {
                    return Err(Error::stage_timeout(&call, described));
                }
                tracing::warn!("{} {}: {}, continuing", plugin, call, described);
            }

            if rendered.stage == Stage::Publish {
                // Publishing appends a version; compare it with its predecessor.
                let latest = self
                    .releases
                    .document_count(&report.release_name, ReleaseSlot::Latest)?;
                report.document_count = Some(latest);

                let previous = self
                    .releases
                    .document_count(&report.release_name, ReleaseSlot::Previous)?;
                report.previous_document_count = Some(previous);

                releases::check_regression(latest, previous)?;
            }
        }

        Ok(())
    }
}

pub fn release_name(config: &RunConfig, plugin: &str) -> String {
    format!("{}{}", config.releases.prefix, plugin)
}

pub fn plan_source(config: &RunConfig, plugin: &str) -> SourcePlan {
    let source_name = stages::source_name(plugin, &config.dumpers).to_string();
    let release_name = release_name(config, plugin);
    let build_name = build_name::create(plugin);
    let vars = StageVars::new(
        plugin,
        &source_name,
        &build_name,
        None,
        &release_name,
        &config.environments,
    );

    SourcePlan {
        plugin: plugin.to_string(),
        stages: stages::render_all(&config.stages, &vars),
        source_name,
        release_name,
        build_name,
    }
}

/// Report a failure that happened before any plugin ran.
pub fn notify_setup_failure(notifier: &dyn Notifier, err: &Error) {
    let message = notify::failure_message(BUILDER_SOURCE, &err.message);
    notify::deliver(notifier, &message);
}
