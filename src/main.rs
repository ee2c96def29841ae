use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{config, restart, run, status};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "hubrun")]
#[command(version = VERSION)]
#[command(about = "Drive data-hub release builds over SSH")]
struct Cli {
    /// Path to hubrun.json (defaults to ~/.config/hubrun/hubrun.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and publish new releases for the configured plugins
    Run(run::RunArgs),
    /// Show whether the hub's job queue is busy
    Status(status::StatusArgs),
    /// Restart the hub worker process
    Restart(restart::RestartArgs),
    /// Inspect hubrun configuration
    Config(config::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs { config: cli.config };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
