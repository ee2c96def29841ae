use clap::Args;
use serde::Serialize;

use hubrun::config::{self, RunConfig};
use hubrun::driver::{self, Driver, RunSummary, Selection, SourcePlan};
use hubrun::http::HttpClient;
use hubrun::hub::HubClient;
use hubrun::logging;
use hubrun::notify::{LogNotifier, Notifier, WebhookNotifier};
use hubrun::releases::ReleaseClient;
use hubrun::remote::SshExecutor;
use hubrun::ssh::SshClient;
use hubrun::wait::{ThreadSleeper, WaitPolicy};

use super::{CmdResult, GlobalArgs};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Only build these plugins (in the order given)
    #[arg(long, num_args = 1.., value_name = "PLUGIN", conflicts_with = "not")]
    pub just: Vec<String>,

    /// Build every configured plugin except these
    #[arg(long, num_args = 1.., value_name = "PLUGIN")]
    pub not: Vec<String>,

    /// Print the commands each plugin would run without contacting the hub
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    fn selection(&self) -> Selection {
        if !self.just.is_empty() {
            Selection::Just(self.just.clone())
        } else if !self.not.is_empty() {
            Selection::Not(self.not.clone())
        } else {
            Selection::All
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<Vec<SourcePlan>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    run: Option<RunSummary>,
}

pub fn run(args: RunArgs, global: &GlobalArgs) -> CmdResult<RunOutput> {
    let config = config::load(global.config.as_deref())?;
    let plugins = driver::select_plugins(&config.plugins, &args.selection());

    if plugins.is_empty() {
        return Err(empty_selection_error(&config.plugins, &args.not));
    }

    if args.dry_run {
        let plan = plugins
            .iter()
            .map(|p| driver::plan_source(&config, p))
            .collect();
        return Ok((
            RunOutput {
                command: "run.dry_run".to_string(),
                plan: Some(plan),
                run: None,
            },
            0,
        ));
    }

    let _log_guard = logging::init(&config.log_file)?;
    let http = HttpClient::new()?;

    let notifier: Box<dyn Notifier> = match config.webhook_url() {
        Some(url) => Box::new(WebhookNotifier::new(http.clone(), url)),
        None => {
            tracing::warn!("no webhook configured, notifications go to the log only");
            Box::new(LogNotifier)
        }
    };

    let executor = match connect(&config) {
        Ok(executor) => executor,
        Err(err) => {
            tracing::error!("{}", err.message);
            driver::notify_setup_failure(notifier.as_ref(), &err);
            return Err(err);
        }
    };

    let hub = HubClient::new(http.clone(), &config.hub.api_url);
    let releases = ReleaseClient::new(http, &config.releases.base_url);
    let sleeper = ThreadSleeper;

    let builder = Driver {
        config: &config,
        policy: WaitPolicy::from(&config.wait),
        executor: &executor,
        queue: &hub,
        registry: &hub,
        releases: &releases,
        notifier: notifier.as_ref(),
        sleeper: &sleeper,
    };

    let summary = builder.run(&plugins);
    let exit_code = if summary.summary.failed > 0 { 1 } else { 0 };

    Ok((
        RunOutput {
            command: "run".to_string(),
            plan: None,
            run: Some(summary),
        },
        exit_code,
    ))
}

fn empty_selection_error(configured: &[String], excluded: &[String]) -> hubrun::Error {
    if configured.is_empty() {
        return hubrun::Error::config_invalid_value(
            "plugins",
            None,
            "No plugins configured; set plugins in hubrun.json or pass --just",
        );
    }

    hubrun::Error::validation_invalid_argument(
        "not",
        "Every configured plugin was excluded",
        None,
        Some(excluded.to_vec()),
    )
}

fn connect(config: &RunConfig) -> hubrun::Result<SshExecutor> {
    let ssh = config.require_ssh()?;
    let client = SshClient::from_config(ssh)?;
    Ok(SshExecutor::new(client))
}
