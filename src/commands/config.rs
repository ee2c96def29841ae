use clap::{Args, Subcommand};
use serde::Serialize;

use hubrun::config::{self, RunConfig};

use super::{CmdResult, GlobalArgs};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Display the effective configuration (file merged over built-in defaults)
    Show {
        /// Show only built-in defaults (ignore hubrun.json)
        #[arg(long)]
        builtin: bool,
    },
    /// Show the path to hubrun.json
    Path,
}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<RunConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exists: Option<bool>,
}

pub fn run(args: ConfigArgs, global: &GlobalArgs) -> CmdResult<ConfigOutput> {
    match args.command {
        ConfigCommand::Show { builtin } => show(builtin, global),
        ConfigCommand::Path => path(global),
    }
}

fn show(builtin: bool, global: &GlobalArgs) -> CmdResult<ConfigOutput> {
    let config = if builtin {
        RunConfig::default()
    } else {
        config::load(global.config.as_deref())?
    };

    Ok((
        ConfigOutput {
            command: "config.show".to_string(),
            config: Some(config),
            path: None,
            exists: None,
        },
        0,
    ))
}

fn path(global: &GlobalArgs) -> CmdResult<ConfigOutput> {
    let path = match &global.config {
        Some(p) => p.clone(),
        None => config::config_path()?,
    };

    Ok((
        ConfigOutput {
            command: "config.path".to_string(),
            exists: Some(path.exists()),
            path: Some(path.display().to_string()),
            config: None,
        },
        0,
    ))
}
