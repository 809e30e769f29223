//! Response envelope and error-list records.

use serde::{Deserialize, Serialize};

/// The `{ "payload": ..., "errors": ... }` envelope wrapping API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// Endpoint-specific payload.
    pub payload: Option<T>,
    /// Errors reported by the API, if any.
    #[serde(default)]
    pub errors: Option<ErrorField>,
}

/// A single error entry returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorEntry {
    /// Error code, e.g. `InvalidInput`.
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Additional details.
    #[serde(default)]
    pub details: Option<String>,
}

impl ApiErrorEntry {
    /// Message to surface to callers; falls back to the code.
    #[must_use]
    pub fn describe(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.code.clone())
            .unwrap_or_else(|| "unknown API error".to_string())
    }
}

/// The `errors` field, which the API sends either as a list or as a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ErrorField {
    /// A list of error entries.
    List(Vec<ApiErrorEntry>),
    /// A single error entry.
    Single(ApiErrorEntry),
    /// A bare message.
    Message(String),
}

impl ErrorField {
    /// The first error's message, or `None` when the field is empty.
    #[must_use]
    pub fn first_message(&self) -> Option<String> {
        match self {
            Self::List(entries) => entries.first().map(ApiErrorEntry::describe),
            Self::Single(entry) => Some(entry.describe()),
            Self::Message(message) if message.is_empty() => None,
            Self::Message(message) => Some(message.clone()),
        }
    }
}

/// Error-list view of any response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorList {
    /// Errors reported by the API, if any.
    #[serde(default)]
    pub errors: Option<ErrorField>,
}

impl ErrorList {
    /// The first error's message, if any error is present.
    #[must_use]
    pub fn first_message(&self) -> Option<String> {
        self.errors.as_ref().and_then(ErrorField::first_message)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_error_list_variants() {
        let list: ErrorList = serde_json::from_value(serde_json::json!({
            "errors": [
                {"code": "InvalidInput", "message": "Invalid field"},
                {"code": "Other", "message": "Second"}
            ]
        }))
        .unwrap();
        assert_eq!(list.first_message().as_deref(), Some("Invalid field"));

        let single: ErrorList = serde_json::from_value(serde_json::json!({
            "errors": {"code": "Unauthorized", "message": "Access denied"}
        }))
        .unwrap();
        assert_eq!(single.first_message().as_deref(), Some("Access denied"));

        let empty: ErrorList = serde_json::from_value(serde_json::json!({"errors": []})).unwrap();
        assert_eq!(empty.first_message(), None);

        let absent: ErrorList = serde_json::from_value(serde_json::json!({"payload": {}})).unwrap();
        assert_eq!(absent.first_message(), None);
    }

    #[test]
    fn test_entry_without_message_uses_code() {
        let entry = ApiErrorEntry {
            code: Some("QuotaExceeded".to_string()),
            message: None,
            details: None,
        };
        assert_eq!(entry.describe(), "QuotaExceeded");
        assert_eq!(ApiErrorEntry::default().describe(), "unknown API error");
    }

    #[test]
    fn test_envelope_payload() {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            feed_id: String,
        }

        let envelope: Envelope<Payload> =
            serde_json::from_str(r#"{"payload":{"feedId":"42"}}"#).unwrap();
        assert_eq!(envelope.payload.unwrap().feed_id, "42");
        assert!(envelope.errors.is_none());
    }
}
