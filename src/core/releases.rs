//! Published release metadata and the document-count regression check.
//!
//! Each release keeps a chronological `versions.json`. Every version points
//! at a metadata document whose `changes.json.url` leads to a diff summary
//! carrying the new document count under `new._count`.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::http::{self, HttpClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseSlot {
    Latest,
    Previous,
}

impl ReleaseSlot {
    fn versions_pointer(&self) -> &'static str {
        match self {
            ReleaseSlot::Latest => "versions.-1.url",
            ReleaseSlot::Previous => "versions.-2.url",
        }
    }
}

pub trait ReleaseMetadata {
    fn document_count(&self, release_name: &str, slot: ReleaseSlot) -> Result<u64>;
}

pub struct ReleaseClient {
    http: HttpClient,
    base_url: String,
}

impl ReleaseClient {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn versions_url(&self, release_name: &str) -> String {
        format!("{}/{}/versions.json", self.base_url, release_name)
    }
}

impl ReleaseMetadata for ReleaseClient {
    fn document_count(&self, release_name: &str, slot: ReleaseSlot) -> Result<u64> {
        let versions_url = self.versions_url(release_name);
        let versions = self.http.get_json(&versions_url)?;
        let version_url = require_str(&versions, slot.versions_pointer(), &versions_url)?;

        let version = self.http.get_json(&version_url)?;
        let changes_url = require_str(&version, "changes.json.url", &version_url)?;

        let changes = self.http.get_json(&changes_url)?;
        new_document_count(&changes, &changes_url)
    }
}

fn require_str(doc: &Value, pointer: &str, url: &str) -> Result<String> {
    match http::get_json_path(doc, pointer) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(Error::release_metadata_missing(url, pointer)),
    }
}

/// `new._count` from a changes document; accepts a number or numeric string.
pub fn new_document_count(changes: &Value, url: &str) -> Result<u64> {
    let count = http::get_json_path(changes, "new._count")
        .ok_or_else(|| Error::release_metadata_missing(url, "new._count"))?;

    let parsed = match count {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| {
        Error::hub_unexpected_response(url, format!("'new._count' is not a count: {}", count))
    })
}

/// A release must not publish fewer documents than its predecessor.
pub fn check_regression(new_count: u64, previous_count: u64) -> Result<()> {
    if new_count < previous_count {
        return Err(Error::release_document_count_regression(
            new_count,
            previous_count,
        ));
    }
    Ok(())
}
