use clap::Args;
use serde::Serialize;

use hubrun::config;
use hubrun::http::HttpClient;
use hubrun::hub::{HubClient, JobQueue};

use super::{CmdResult, GlobalArgs};

#[derive(Args, Debug)]
pub struct StatusArgs {}

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    command: String,
    api_url: String,
    busy: bool,
}

pub fn run(_args: StatusArgs, global: &GlobalArgs) -> CmdResult<StatusOutput> {
    let config = config::load(global.config.as_deref())?;
    let hub = HubClient::new(HttpClient::new()?, &config.hub.api_url);
    let busy = hub.is_busy()?;

    Ok((
        StatusOutput {
            command: "status".to_string(),
            api_url: config.hub.api_url,
            busy,
        },
        0,
    ))
}
