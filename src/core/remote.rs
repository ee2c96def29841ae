//! Command submission to the hub's console.

use crate::error::{Error, Result, SshConnectFailedDetails};
use crate::ssh::client::{is_transient_ssh_error, SshClient};
use crate::ssh::CommandOutput;

/// Channel that hands a command to the hub. Submission is fire-and-forget:
/// success means the hub accepted the command, not that its job finished.
pub trait RemoteExecutor {
    fn submit(&self, command: &str) -> Result<()>;
}

pub struct SshExecutor {
    client: SshClient,
}

impl SshExecutor {
    pub fn new(client: SshClient) -> Self {
        Self { client }
    }
}

impl RemoteExecutor for SshExecutor {
    fn submit(&self, command: &str) -> Result<()> {
        let output = self.client.execute(command);
        submission_result(&self.client.host, command, output)
    }
}

/// Only connection failures are errors. The console reports job failures
/// through the job queue, so any other non-zero exit is logged and accepted.
fn submission_result(host: &str, command: &str, output: CommandOutput) -> Result<()> {
    if output.success {
        return Ok(());
    }

    if is_transient_ssh_error(&output) {
        return Err(Error::ssh_connect_failed(SshConnectFailedDetails {
            host: host.to_string(),
            command: command.to_string(),
            exit_code: output.exit_code,
            stderr: output.stderr,
        }));
    }

    tracing::warn!(
        "hub console exited {} for {}: {}",
        output.exit_code,
        command,
        output.stderr.trim()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(exit_code: i32, stderr: &str) -> CommandOutput {
        CommandOutput {
            stderr: stderr.to_string(),
            success: exit_code == 0,
            exit_code,
        }
    }

    #[test]
    fn clean_exit_is_accepted() {
        assert!(submission_result("hub", "merge()", output(0, "")).is_ok());
    }

    #[test]
    fn connection_failure_becomes_ssh_error() {
        let err = submission_result(
            "hub.example.org",
            "dump(src='pdb')",
            output(255, "ssh: connect to host hub.example.org port 7022: Connection refused"),
        )
        .unwrap_err();

        assert_eq!(err.code.as_str(), "ssh.connect_failed");
        assert_eq!(err.details["host"], "hub.example.org");
        assert_eq!(err.details["command"], "dump(src='pdb')");
        assert_eq!(err.retryable, Some(true));
    }

    #[test]
    fn console_failure_is_only_logged() {
        let result = submission_result(
            "hub.example.org",
            "dumpp(src='pdb')",
            output(1, "NameError: name 'dumpp' is not defined"),
        );
        assert!(result.is_ok());
    }
}
