//! Blocking HTTP client shared by the hub, release and notification clients.

use crate::error::{Error, HubRequestFailedDetails, Result};
use reqwest::blocking::{Client, Response};
use serde_json::Value;
use std::time::Duration;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const REQUEST_TIMEOUT_SECS: u64 = 30;

fn http_error(url: &str, e: reqwest::Error) -> Error {
    Error::hub_request_failed(HubRequestFailedDetails {
        url: url.to_string(),
        status: None,
        body: None,
        error: Some(e.to_string()),
    })
    .with_retryable(e.is_timeout() || e.is_connect())
}

fn status_error(url: &str, status: u16, body: &str) -> Error {
    Error::hub_request_failed(HubRequestFailedDetails {
        url: url.to_string(),
        status: Some(status),
        body: Some(body.chars().take(500).collect()),
        error: None,
    })
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("hubrun/{}", VERSION))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                Error::internal_io(e.to_string(), Some("create HTTP client".to_string()))
            })?;

        Ok(Self { client })
    }

    /// GET and parse the body as JSON.
    pub fn get_json(&self, url: &str) -> Result<Value> {
        let response = self.client.get(url).send().map_err(|e| http_error(url, e))?;
        parse_json_response(url, response)
    }

    /// GET with query parameters and parse the body as JSON.
    pub fn get_json_query(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| http_error(url, e))?;
        parse_json_response(url, response)
    }

    /// PUT with an empty body. The response body is ignored.
    pub fn put_empty(&self, url: &str) -> Result<()> {
        let response = self.client.put(url).send().map_err(|e| http_error(url, e))?;
        ensure_success(url, response)
    }

    /// POST a JSON body. The response body is ignored.
    pub fn post_json(&self, url: &str, body: &Value) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|e| http_error(url, e))?;
        ensure_success(url, response)
    }
}

fn ensure_success(url: &str, response: Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().unwrap_or_default();
    Err(status_error(url, status.as_u16(), &body))
}

fn parse_json_response(url: &str, response: Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().map_err(|e| http_error(url, e))?;

    if !status.is_success() {
        return Err(status_error(url, status.as_u16(), &body));
    }

    serde_json::from_str(&body).map_err(|e| {
        Error::hub_unexpected_response(url, format!("Invalid JSON response: {}", e))
    })
}

/// Gets a value from JSON using a dot-notation path. Numeric segments index
/// arrays; `-1` and `-2` count from the end.
pub fn get_json_path<'a>(json: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = json;

    for part in path.split('.') {
        current = match current {
            Value::Array(items) => {
                let idx: i64 = part.parse().ok()?;
                let idx = if idx < 0 {
                    items.len().checked_sub(idx.unsigned_abs() as usize)?
                } else {
                    idx as usize
                };
                items.get(idx)?
            }
            _ => current.get(part)?,
        };
    }

    Some(current)
}

/// Python-style truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_path_walks_objects_and_arrays() {
        let doc = json!({"result": [{"_id": "first"}, {"_id": "second"}]});
        assert_eq!(get_json_path(&doc, "result.0._id"), Some(&json!("first")));
        assert_eq!(get_json_path(&doc, "result.-1._id"), Some(&json!("second")));
        assert_eq!(get_json_path(&doc, "result.-2._id"), Some(&json!("first")));
        assert_eq!(get_json_path(&doc, "result.-3._id"), None);
        assert_eq!(get_json_path(&doc, "result.5"), None);
        assert_eq!(get_json_path(&doc, "missing.key"), None);
    }

    #[test]
    fn truthiness_matches_python_semantics() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!({"pid": 1})));
        assert!(is_truthy(&json!("merge")));
        assert!(is_truthy(&json!(0.5)));
    }
}
