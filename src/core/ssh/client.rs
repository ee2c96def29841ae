use crate::config::SshConfig;
use crate::error::{Error, Result};
use std::process::Command;

pub struct SshClient {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl SshClient {
    pub fn from_config(ssh: &SshConfig) -> Result<Self> {
        let identity_file = match &ssh.identity_file {
            Some(path) if !path.is_empty() => {
                let expanded = shellexpand::tilde(path).to_string();
                if !std::path::Path::new(&expanded).exists() {
                    return Err(Error::ssh_identity_file_not_found(
                        ssh.host.clone(),
                        expanded,
                    ));
                }
                Some(expanded)
            }
            _ => None,
        };

        Ok(Self {
            host: ssh.host.clone(),
            user: ssh.user.clone(),
            port: ssh.port,
            identity_file,
        })
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        // Never prompt, and fail fast on stalled connections.
        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
            "-o".to_string(),
            "ServerAliveInterval=15".to_string(),
            "-o".to_string(),
            "ServerAliveCountMax=3".to_string(),
        ]);

        args.push(format!("{}@{}", self.user, self.host));
        args.push(command.to_string());

        args
    }

    pub fn execute(&self, command: &str) -> CommandOutput {
        self.execute_with_retry(command, 3)
    }

    fn execute_with_retry(&self, command: &str, max_attempts: u32) -> CommandOutput {
        let backoff_secs = [0, 2, 5]; // delays before retry 1, 2, 3
        let mut result = self.execute_once(command);

        for attempt in 1..max_attempts {
            // Only retry on transient connection errors, not command failures
            if result.success || !is_transient_ssh_error(&result) {
                return result;
            }

            let delay = backoff_secs.get(attempt as usize).copied().unwrap_or(5);
            log_status!(
                "ssh",
                "Connection failed (attempt {}/{}), retrying in {}s...",
                attempt,
                max_attempts,
                delay
            );
            std::thread::sleep(std::time::Duration::from_secs(delay));
            result = self.execute_once(command);
        }

        result
    }

    fn execute_once(&self, command: &str) -> CommandOutput {
        let args = self.build_ssh_args(command);

        match Command::new("ssh").args(&args).output() {
            Ok(out) => CommandOutput {
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                success: out.status.success(),
                exit_code: out.status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput {
                stderr: format!("SSH error: {}", e),
                success: false,
                exit_code: -1,
            },
        }
    }
}

/// Check if an SSH failure is a connection error rather than a remote command failure.
pub fn is_transient_ssh_error(output: &CommandOutput) -> bool {
    let stderr = output.stderr.to_lowercase();
    // SSH exit code 255 = connection error (not a remote command failure)
    let is_connection_exit = output.exit_code == 255;

    let transient_patterns = [
        "connection refused",
        "connection reset",
        "connection timed out",
        "no route to host",
        "network is unreachable",
        "temporary failure in name resolution",
        "could not resolve hostname",
        "broken pipe",
        "ssh_exchange_identification",
        "connection closed by remote host",
    ];

    is_connection_exit || transient_patterns.iter().any(|p| stderr.contains(p))
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

    fn client(port: u16, identity_file: Option<&str>) -> SshClient {
        SshClient {
            host: "hub.example.org".to_string(),
            user: "ops".to_string(),
            port,
            identity_file: identity_file.map(str::to_string),
        }
    }

    #[test]
    fn exit_255_is_transient() {
        assert!(is_transient_ssh_error(&output(255, "")));
    }

    #[test]
    fn refused_connection_is_transient() {
        assert!(is_transient_ssh_error(&output(1, "ssh: connect to host x port 22: Connection refused")));
    }

    #[test]
    fn remote_command_failure_is_not_transient() {
        assert!(!is_transient_ssh_error(&output(1, "NameError: name 'dumpp' is not defined")));
    }

    #[test]
    fn args_end_with_target_and_command() {
        let args = client(22, None).build_ssh_args("dump(src='pdb')");
        let n = args.len();
        assert_eq!(args[n - 2], "ops@hub.example.org");
        assert_eq!(args[n - 1], "dump(src='pdb')");
        assert!(!args.contains(&"-p".to_string()));
        assert!(args.contains(&"BatchMode=yes".to_string()));
    }

    #[test]
    fn args_include_port_and_identity() {
        let args = client(7022, Some("/keys/hub")).build_ssh_args("ls");
        assert_eq!(&args[..4], ["-i", "/keys/hub", "-p", "7022"]);
    }

    #[test]
    fn missing_identity_file_is_rejected() {
        let ssh = SshConfig {
            host: "hub.example.org".to_string(),
            user: "ops".to_string(),
            port: 22,
            identity_file: Some("/definitely/not/here/id_rsa".to_string()),
        };
        let err = SshClient::from_config(&ssh).err().unwrap();
        assert_eq!(err.code.as_str(), "ssh.identity_file_not_found");
    }
}
