//! Run outcome notifications.

use serde_json::json;

use crate::error::{Error, Result};
use crate::http::HttpClient;

pub const UNKNOWN_STAGE: &str = "?";
pub const UNKNOWN_DOCS: &str = "?";

pub trait Notifier {
    fn send(&self, message: &str) -> Result<()>;
}

/// Posts `{"text": message}` to an incoming-webhook URL (Slack shape).
pub struct WebhookNotifier {
    http: HttpClient,
    url: String,
}

impl WebhookNotifier {
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

impl Notifier for WebhookNotifier {
    fn send(&self, message: &str) -> Result<()> {
        tracing::info!("{}", message);
        self.http
            .post_json(&self.url, &json!({ "text": message }))
            .map_err(|e| Error::notify_failed(format!("webhook post failed: {}", e.message)))
    }
}

/// Writes messages to the run log only.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, message: &str) -> Result<()> {
        tracing::info!("{}", message);
        Ok(())
    }
}

pub fn success_message(source: &str, minutes: u64, docs: Option<u64>) -> String {
    let docs = docs
        .map(|d| d.to_string())
        .unwrap_or_else(|| UNKNOWN_DOCS.to_string());
    format!(
        "{} updated in {} minutes with {} documents",
        source, minutes, docs
    )
}

pub fn failure_message(source: &str, error: &str) -> String {
    format!("{} failed with the following error\n ```{}```", source, error)
}

/// Error text naming the hub call that failed, or `?` before any call was made.
pub fn stage_error_text(stage: Option<&str>, message: &str) -> String {
    format!("`{}` {}", stage.unwrap_or(UNKNOWN_STAGE), message)
}

/// Send, logging rather than propagating a delivery failure.
pub fn deliver(notifier: &dyn Notifier, message: &str) {
    if let Err(err) = notifier.send(message) {
        tracing::warn!("notification not delivered: {}", err);
        log_status!("notify", "Notification not delivered: {}", err);
    }
}
