use std::path::PathBuf;

pub type CmdResult<T> = hubrun::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    /// Explicit config file; `None` means the default location.
    pub config: Option<PathBuf>,
}

pub mod config;
pub mod restart;
pub mod run;
pub mod status;

macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (hubrun::Result<serde_json::Value>, i32) {
    crate::tty::status("hubrun is working...");

    match command {
        crate::Commands::Run(args) => dispatch!(args, global, run),
        crate::Commands::Status(args) => dispatch!(args, global, status),
        crate::Commands::Restart(args) => dispatch!(args, global, restart),
        crate::Commands::Config(args) => dispatch!(args, global, config),
    }
}
