//! Run configuration loaded from `hubrun.json`.
//!
//! Every field has a built-in default, so a missing file yields a usable
//! configuration apart from the SSH target. A file that exists but does not
//! parse is an error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths;
use crate::stages::Stage;
use crate::utils::template::{self, TemplateVars};

pub const ENV_WEBHOOK_URL: &str = "HUBRUN_WEBHOOK_URL";

/// Root configuration structure for hubrun.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub releases: ReleasesConfig,

    #[serde(default)]
    pub notify: NotifyConfig,

    #[serde(default = "default_plugins")]
    pub plugins: Vec<String>,

    /// Plugins whose dumper is registered under a different source name.
    #[serde(default = "default_dumpers")]
    pub dumpers: BTreeMap<String, String>,

    #[serde(default)]
    pub environments: EnvironmentsConfig,

    #[serde(default = "default_stages")]
    pub stages: Vec<StageTemplate>,

    #[serde(default)]
    pub wait: WaitConfig,

    /// Stop a source when a stage's command is never submitted or outlives
    /// the completion schedule. Off by default: the next stage still runs.
    #[serde(default)]
    pub abort_on_stage_failure: bool,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            hub: HubConfig::default(),
            releases: ReleasesConfig::default(),
            notify: NotifyConfig::default(),
            plugins: default_plugins(),
            dumpers: default_dumpers(),
            environments: EnvironmentsConfig::default(),
            stages: default_stages(),
            wait: WaitConfig::default(),
            abort_on_stage_failure: false,
            log_file: default_log_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub ssh: SshConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ssh: SshConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            user: String::new(),
            port: default_ssh_port(),
            identity_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasesConfig {
    #[serde(default = "default_releases_base_url")]
    pub base_url: String,

    /// Release name is `prefix + plugin`.
    #[serde(default = "default_release_prefix")]
    pub prefix: String,
}

impl Default for ReleasesConfig {
    fn default() -> Self {
        Self {
            base_url: default_releases_base_url(),
            prefix: default_release_prefix(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentsConfig {
    #[serde(default = "default_indexer_env")]
    pub indexer: String,
    #[serde(default = "default_snapshot_env")]
    pub snapshot: String,
    #[serde(default = "default_publisher_env")]
    pub publisher: String,
}

impl Default for EnvironmentsConfig {
    fn default() -> Self {
        Self {
            indexer: default_indexer_env(),
            snapshot: default_snapshot_env(),
            publisher: default_publisher_env(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTemplate {
    pub stage: Stage,
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Seconds between polls while the queue is busy before submitting.
    #[serde(default = "default_busy_poll_secs")]
    pub busy_poll_secs: u64,

    /// Busy polls before a command is given up without being submitted.
    #[serde(default = "default_busy_max_polls")]
    pub busy_max_polls: u32,

    /// Sleep before each completion check, in order.
    #[serde(default = "default_completion_schedule_secs")]
    pub completion_schedule_secs: Vec<u64>,

    /// Pause after forcing a worker restart.
    #[serde(default = "default_restart_cooldown_secs")]
    pub restart_cooldown_secs: u64,

    #[serde(default = "default_progress_log_every")]
    pub progress_log_every: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            busy_poll_secs: default_busy_poll_secs(),
            busy_max_polls: default_busy_max_polls(),
            completion_schedule_secs: default_completion_schedule_secs(),
            restart_cooldown_secs: default_restart_cooldown_secs(),
            progress_log_every: default_progress_log_every(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_api_url() -> String {
    "http://localhost:19180".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_releases_base_url() -> String {
    "https://biothings-releases.s3.amazonaws.com".to_string()
}

fn default_release_prefix() -> String {
    "outbreak-".to_string()
}

fn default_plugins() -> Vec<String> {
    [
        "protocolsio",
        "pdb",
        "covid_imperial_college",
        "figshare",
        "clinical_trials",
        "dataverse",
        "biorxiv",
        "litcovid",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_dumpers() -> BTreeMap<String, String> {
    [
        ("figshare", "covid_figshare"),
        ("pdb", "covid_pdb_datasets"),
        ("clinical_trials", "covid_who_clinical_trials"),
        ("dataverse", "dataverses"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_indexer_env() -> String {
    "su07".to_string()
}

fn default_snapshot_env() -> String {
    "s3_outbreak_from_su07".to_string()
}

fn default_publisher_env() -> String {
    "s3_outbreak".to_string()
}

fn default_stages() -> Vec<StageTemplate> {
    Stage::ALL
        .iter()
        .map(|stage| StageTemplate {
            stage: *stage,
            template: stage.default_template().to_string(),
        })
        .collect()
}

fn default_busy_poll_secs() -> u64 {
    60
}

fn default_busy_max_polls() -> u32 {
    10
}

/// 30s, then every minute for five minutes, then every five minutes for three hours.
fn default_completion_schedule_secs() -> Vec<u64> {
    let mut schedule = vec![30];
    schedule.extend(std::iter::repeat(60).take(5));
    schedule.extend(std::iter::repeat(300).take(36));
    schedule
}

fn default_restart_cooldown_secs() -> u64 {
    90
}

fn default_progress_log_every() -> u32 {
    3
}

fn default_log_file() -> PathBuf {
    PathBuf::from("hubrun_log.log")
}

// =============================================================================
// Loading
// =============================================================================

impl RunConfig {
    /// Webhook URL from the environment, falling back to the config file.
    pub fn webhook_url(&self) -> Option<String> {
        self.webhook_url_with(std::env::var(ENV_WEBHOOK_URL).ok())
    }

    fn webhook_url_with(&self, from_env: Option<String>) -> Option<String> {
        from_env
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.notify.webhook_url.clone())
    }

    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(Error::config_invalid_value(
                "stages",
                None,
                "At least one stage must be configured",
            ));
        }

        for entry in &self.stages {
            for name in template::unresolved(&entry.template) {
                if !TemplateVars::ALL.contains(&name.as_str()) {
                    return Err(Error::config_invalid_value(
                        "stages",
                        Some(entry.template.clone()),
                        format!("Unknown placeholder '{{{{{}}}}}' in {} template", name, entry.stage.as_str()),
                    ));
                }
            }
        }

        if self.wait.completion_schedule_secs.is_empty() {
            return Err(Error::config_invalid_value(
                "wait.completion_schedule_secs",
                None,
                "Completion schedule cannot be empty",
            ));
        }

        if self.wait.busy_max_polls == 0 {
            return Err(Error::config_invalid_value(
                "wait.busy_max_polls",
                Some("0".to_string()),
                "Must allow at least one busy poll",
            ));
        }

        if self.wait.progress_log_every == 0 {
            return Err(Error::config_invalid_value(
                "wait.progress_log_every",
                Some("0".to_string()),
                "Must be at least 1",
            ));
        }

        if self.hub.api_url.trim().is_empty() {
            return Err(Error::config_missing_key("hub.api_url", None));
        }

        Ok(())
    }

    /// SSH target must be set before anything is sent to the hub.
    pub fn require_ssh(&self) -> Result<&SshConfig> {
        let ssh = &self.hub.ssh;
        let mut missing = Vec::new();
        if ssh.host.trim().is_empty() {
            missing.push("hub.ssh.host");
        }
        if ssh.user.trim().is_empty() {
            missing.push("hub.ssh.user");
        }

        match missing.first() {
            None => Ok(ssh),
            Some(key) => {
                let path = config_path().ok().map(|p| p.display().to_string());
                Err(Error::config_missing_key(*key, path)
                    .with_hint("Set hub.ssh.host and hub.ssh.user in hubrun.json"))
            }
        }
    }
}

/// Default location of hubrun.json.
pub fn config_path() -> Result<PathBuf> {
    paths::hubrun_json()
}

/// Load config from `path`, or the default location when `None`.
/// A missing file yields built-in defaults.
pub fn load(path: Option<&Path>) -> Result<RunConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };

    if !path.exists() {
        return Ok(RunConfig::default());
    }

    load_from_file(&path)
}

fn load_from_file(path: &Path) -> Result<RunConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    let config: RunConfig = serde_json::from_str(&content)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))?;

    config.validate()?;
    Ok(config)
}
