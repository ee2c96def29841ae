use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationInvalidArgument,

    SshIdentityFileNotFound,
    SshConnectFailed,

    HubRequestFailed,
    HubUnexpectedResponse,

    ReleaseMetadataMissing,
    ReleaseDocumentCountRegression,

    StageTimeout,

    NotifyFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::SshIdentityFileNotFound => "ssh.identity_file_not_found",
            ErrorCode::SshConnectFailed => "ssh.connect_failed",

            ErrorCode::HubRequestFailed => "hub.request_failed",
            ErrorCode::HubUnexpectedResponse => "hub.unexpected_response",

            ErrorCode::ReleaseMetadataMissing => "release.metadata_missing",
            ErrorCode::ReleaseDocumentCountRegression => "release.document_count_regression",

            ErrorCode::StageTimeout => "stage.timeout",

            ErrorCode::NotifyFailed => "notify.failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubRequestFailedDetails {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConnectFailedDetails {
    pub host: String,
    pub command: String,
    pub exit_code: i32,
    pub stderr: String,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let problem = problem.into();
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.clone(),
            id,
            tried,
        });

        Self::new(ErrorCode::ValidationInvalidArgument, problem, details)
    }

    pub fn config_missing_key(key: impl Into<String>, path: Option<String>) -> Self {
        let key = key.into();
        let message = format!("Missing required configuration key '{}'", key);
        Self::new(
            ErrorCode::ConfigMissingKey,
            message,
            to_details(ConfigMissingKeyDetails { key, path }),
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let problem = problem.into();
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.clone(),
        });

        Self::new(ErrorCode::ConfigInvalidValue, problem, details)
    }

    pub fn ssh_identity_file_not_found(
        host: impl Into<String>,
        identity_file: impl Into<String>,
    ) -> Self {
        let details = serde_json::json!({
            "host": host.into(),
            "identityFile": identity_file.into(),
        });

        Self::new(
            ErrorCode::SshIdentityFileNotFound,
            "SSH identity file not found",
            details,
        )
    }

    pub fn ssh_connect_failed(details: SshConnectFailedDetails) -> Self {
        let message = format!("Could not reach hub over SSH ({})", details.host);
        Self::new(ErrorCode::SshConnectFailed, message, to_details(details))
            .with_retryable(true)
    }

    pub fn hub_request_failed(details: HubRequestFailedDetails) -> Self {
        let message = match (&details.status, &details.error) {
            (Some(status), _) => format!("HTTP {} from {}", status, details.url),
            (None, Some(err)) => format!("HTTP request failed: {}", err),
            (None, None) => format!("HTTP request to {} failed", details.url),
        };
        Self::new(ErrorCode::HubRequestFailed, message, to_details(details))
    }

    pub fn hub_unexpected_response(url: impl Into<String>, problem: impl Into<String>) -> Self {
        let problem = problem.into();
        let details = serde_json::json!({
            "url": url.into(),
            "problem": problem,
        });
        Self::new(ErrorCode::HubUnexpectedResponse, problem, details)
    }

    pub fn release_metadata_missing(url: impl Into<String>, field: impl Into<String>) -> Self {
        let url = url.into();
        let field = field.into();
        let message = format!("'{}' missing from {}", field, url);
        Self::new(
            ErrorCode::ReleaseMetadataMissing,
            message,
            serde_json::json!({ "url": url, "field": field }),
        )
    }

    pub fn release_document_count_regression(new_count: u64, previous_count: u64) -> Self {
        Self::new(
            ErrorCode::ReleaseDocumentCountRegression,
            format!(
                "New document count ({}) less than older document count ({})",
                new_count, previous_count
            ),
            serde_json::json!({ "new": new_count, "previous": previous_count }),
        )
    }

    pub fn stage_timeout(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        let stage = stage.into();
        let reason = reason.into();
        Self::new(
            ErrorCode::StageTimeout,
            reason.clone(),
            serde_json::json!({ "stage": stage, "reason": reason }),
        )
    }

    pub fn notify_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotifyFailed, message, Value::Null)
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let error = error.into();
        let details = to_details(InternalIoErrorDetails {
            error: error.clone(),
            context,
        });
        Self::new(ErrorCode::InternalIoError, error, details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let error = error.into();
        let details = serde_json::json!({ "error": error, "context": context });
        Self::new(ErrorCode::InternalJsonError, error, details)
    }

    pub fn internal_unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalUnexpected, message, Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regression_message_names_both_counts() {
        let err = Error::release_document_count_regression(90, 100);
        assert_eq!(
            err.message,
            "New document count (90) less than older document count (100)"
        );
        assert_eq!(err.code.as_str(), "release.document_count_regression");
        assert_eq!(err.details["previous"], 100);
    }

    #[test]
    fn hub_request_failed_prefers_status_in_message() {
        let err = Error::hub_request_failed(HubRequestFailedDetails {
            url: "http://localhost:19180/job_manager".to_string(),
            status: Some(502),
            body: Some("bad gateway".to_string()),
            error: None,
        });
        assert_eq!(err.message, "HTTP 502 from http://localhost:19180/job_manager");
        assert_eq!(err.details["body"], "bad gateway");
    }

    #[test]
    fn hints_accumulate() {
        let err = Error::config_missing_key("hub.ssh.host", None)
            .with_hint("Set hub.ssh.host in hubrun.json")
            .with_hint("Or pass --config");
        assert_eq!(err.hints.len(), 2);
        assert!(err.retryable.is_none());
    }
}
