use clap::Args;
use serde::Serialize;

use hubrun::config;
use hubrun::http::HttpClient;
use hubrun::hub::{HubClient, JobQueue};
use hubrun::logging;

use super::{CmdResult, GlobalArgs};

#[derive(Args, Debug)]
pub struct RestartArgs {}

#[derive(Debug, Serialize)]
pub struct RestartOutput {
    command: String,
    api_url: String,
    restarted: bool,
}

pub fn run(_args: RestartArgs, global: &GlobalArgs) -> CmdResult<RestartOutput> {
    let config = config::load(global.config.as_deref())?;
    let _log_guard = logging::init(&config.log_file)?;

    let hub = HubClient::new(HttpClient::new()?, &config.hub.api_url);
    tracing::info!("restarting");
    hub.restart()?;

    Ok((
        RestartOutput {
            command: "restart".to_string(),
            api_url: config.hub.api_url,
            restarted: true,
        },
        0,
    ))
}
