//! Hub REST endpoints: job-queue status, worker restart, build registry.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::http::{self, HttpClient};

const JOB_MANAGER_PATH: &str = "/job_manager";
const RESTART_PATH: &str = "/restart";
const BUILDS_PATH: &str = "/builds";
const RUNNING_JOBS_POINTER: &str = "result.queue.process.running";
const LATEST_BUILD_POINTER: &str = "result.0._id";

/// The hub's job queue, polled to learn when submitted work has finished.
pub trait JobQueue {
    /// True while any job is running.
    fn is_busy(&self) -> Result<bool>;

    /// Force the hub to restart its worker process.
    fn restart(&self) -> Result<()>;
}

/// Lookup of builds previously produced by the hub.
pub trait BuildRegistry {
    /// Id of the most recent build for `conf_name`, if the hub knows one.
    fn latest_build(&self, conf_name: &str) -> Result<Option<String>>;
}

pub struct HubClient {
    http: HttpClient,
    api_url: String,
}

impl HubClient {
    pub fn new(http: HttpClient, api_url: &str) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}

impl JobQueue for HubClient {
    fn is_busy(&self) -> Result<bool> {
        let url = self.url(JOB_MANAGER_PATH);
        let payload = self.http.get_json(&url)?;
        running_jobs(&payload).ok_or_else(|| {
            Error::hub_unexpected_response(
                &url,
                format!("'{}' missing from job manager response", RUNNING_JOBS_POINTER),
            )
        })
    }

    fn restart(&self) -> Result<()> {
        self.http.put_empty(&self.url(RESTART_PATH))
    }
}

impl BuildRegistry for HubClient {
    fn latest_build(&self, conf_name: &str) -> Result<Option<String>> {
        let payload = self
            .http
            .get_json_query(&self.url(BUILDS_PATH), &[("conf_name", conf_name)])?;
        Ok(latest_build_id(&payload))
    }
}

/// Whether the job manager payload lists a running job.
/// `None` when the payload does not have the expected shape.
pub fn running_jobs(payload: &Value) -> Option<bool> {
    let running = http::get_json_path(payload, RUNNING_JOBS_POINTER)?;
    Some(match running {
        Value::Array(items) => items.iter().any(http::is_truthy),
        Value::Object(map) => map.keys().any(|k| !k.is_empty()),
        other => http::is_truthy(other),
    })
}

/// First build id in a registry payload. Any shape mismatch means "no build".
pub fn latest_build_id(payload: &Value) -> Option<String> {
    match http::get_json_path(payload, LATEST_BUILD_POINTER)? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        _ => None,
    }
}
