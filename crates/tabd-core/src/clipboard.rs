use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Clipboard snapshot sent by the browser extension.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClipboardData {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub timestamp: i64,
    pub url: String,
    pub title: String,
}

/// Outcome reported back to the extension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Reply frame sent for every message the host receives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Response {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Unix seconds.
    pub timestamp: i64,
}

impl Response {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
            timestamp: Utc::now().timestamp(),
        }
    }
}

/// Persistence contract for the most recent clipboard snapshot.
pub trait ClipboardRepository: Send + Sync {
    /// Replace the stored snapshot.
    fn save_latest(&self, data: &ClipboardData) -> anyhow::Result<()>;
    /// Latest snapshot, or `None` if nothing has been stored yet.
    fn latest(&self) -> anyhow::Result<Option<ClipboardData>>;
    /// Remove the stored snapshot; returns whether one existed.
    fn clear(&self) -> anyhow::Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_extension_payload() {
        let raw = r#"{"type":"text","text":"hello","timestamp":1,"url":"https://example.com","title":"t"}"#;
        let data: ClipboardData = serde_json::from_str(raw).expect("parse");
        assert_eq!(data.kind, "text");
        assert_eq!(data.text, "hello");
        assert_eq!(data.timestamp, 1);

        // Field order matches what the extension and readers expect.
        let encoded = serde_json::to_string(&data).expect("encode");
        assert_eq!(encoded, raw);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let data: ClipboardData = serde_json::from_str(r#"{"text":"only"}"#).expect("parse");
        assert_eq!(data.text, "only");
        assert_eq!(data.kind, "");
        assert_eq!(data.timestamp, 0);
    }

    #[test]
    fn response_omits_empty_message() {
        let mut response = Response::success("");
        response.timestamp = 42;
        let json = serde_json::to_string(&response).expect("encode");
        assert_eq!(json, r#"{"status":"success","timestamp":42}"#);

        let mut response = Response::error("boom");
        response.timestamp = 7;
        let json = serde_json::to_string(&response).expect("encode");
        assert_eq!(json, r#"{"status":"error","message":"boom","timestamp":7}"#);
    }
}
