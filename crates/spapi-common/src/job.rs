//! Asynchronous job records shared by the feeds and reports APIs.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Processing status of a feed or report.
///
/// `None` is the sentinel a job starts in before the first poll. `Done`,
/// `Cancelled` and `Fatal` are terminal; only `Done` is a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    /// No status observed yet.
    None,
    /// Waiting to be processed.
    InQueue,
    /// Being processed.
    InProgress,
    /// Processing finished and a result document is available.
    Done,
    /// Processing was cancelled.
    Cancelled,
    /// Processing failed.
    Fatal,
}

impl ProcessingStatus {
    /// Whether no further state change will occur.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Fatal)
    }

    /// Whether this is a terminal failure.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Cancelled | Self::Fatal)
    }

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::InQueue => "IN_QUEUE",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::Cancelled => "CANCELLED",
            Self::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(Self::None),
            "IN_QUEUE" => Ok(Self::InQueue),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "DONE" => Ok(Self::Done),
            "CANCELLED" => Ok(Self::Cancelled),
            "FATAL" => Ok(Self::Fatal),
            _ => anyhow::bail!("Unknown processing status: {s}"),
        }
    }
}

/// Common view over feed and report status records.
pub trait JobRecord {
    /// Identifier of the job, when echoed by the server.
    fn job_id(&self) -> Option<&str>;

    /// Raw processing status as sent by the server.
    fn raw_status(&self) -> Option<&str>;

    /// Identifier of the result document; only meaningful once `DONE`.
    fn result_document_id(&self) -> Option<&str>;

    /// Parsed processing status. Absent and unrecognized values yield `None`.
    fn processing_status(&self) -> Option<ProcessingStatus> {
        self.raw_status().and_then(|status| status.parse().ok())
    }
}

/// Status record of a feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRecord {
    /// Feed identifier.
    pub feed_id: Option<String>,
    /// Feed type, e.g. `POST_PRODUCT_DATA`.
    pub feed_type: Option<String>,
    /// Marketplaces the feed applies to.
    #[serde(default)]
    pub marketplace_ids: Vec<String>,
    /// Creation time.
    pub created_time: Option<DateTime<Utc>>,
    /// Processing status.
    pub processing_status: Option<String>,
    /// Processing start time.
    pub processing_start_time: Option<DateTime<Utc>>,
    /// Processing end time.
    pub processing_end_time: Option<DateTime<Utc>>,
    /// Document holding the processing report.
    pub result_feed_document_id: Option<String>,
}

impl JobRecord for FeedRecord {
    fn job_id(&self) -> Option<&str> {
        self.feed_id.as_deref()
    }

    fn raw_status(&self) -> Option<&str> {
        self.processing_status.as_deref()
    }

    fn result_document_id(&self) -> Option<&str> {
        self.result_feed_document_id.as_deref()
    }
}

/// Status record of a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    /// Report identifier.
    pub report_id: Option<String>,
    /// Report type, e.g. `GET_MERCHANT_LISTINGS_ALL_DATA`.
    pub report_type: Option<String>,
    /// Start of the covered data range.
    pub data_start_time: Option<DateTime<Utc>>,
    /// End of the covered data range.
    pub data_end_time: Option<DateTime<Utc>>,
    /// Schedule that created the report, if any.
    pub report_schedule_id: Option<String>,
    /// Marketplaces the report covers.
    #[serde(default)]
    pub marketplace_ids: Vec<String>,
    /// Creation time.
    pub created_time: Option<DateTime<Utc>>,
    /// Processing status.
    pub processing_status: Option<String>,
    /// Processing start time.
    pub processing_start_time: Option<DateTime<Utc>>,
    /// Processing end time.
    pub processing_end_time: Option<DateTime<Utc>>,
    /// Document holding the report content.
    pub report_document_id: Option<String>,
}

impl JobRecord for ReportRecord {
    fn job_id(&self) -> Option<&str> {
        self.report_id.as_deref()
    }

    fn raw_status(&self) -> Option<&str> {
        self.processing_status.as_deref()
    }

    fn result_document_id(&self) -> Option<&str> {
        self.report_document_id.as_deref()
    }
}

/// Payload of a successful create-feed or create-report call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreatedJob {
    /// Identifier of the new job (`feedId` or `reportId`).
    #[serde(default, alias = "feedId", alias = "reportId")]
    pub id: Option<String>,
}

/// Body of the create-feed call.
///
/// # Examples
///
/// ```
/// use spapi_common::CreateFeedSpecification;
///
/// let spec = CreateFeedSpecification::builder()
///     .feed_type("POST_PRODUCT_DATA")
///     .marketplace_ids(vec!["ATVPDKIKX0DER".to_string()])
///     .input_feed_document_id("3d4e42b5-1d6e-44e8-a89c-2abfca0625bb")
///     .build();
///
/// let body = serde_json::to_value(&spec).unwrap();
/// assert_eq!(body["feedType"], "POST_PRODUCT_DATA");
/// assert!(body.get("feedOptions").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedSpecification {
    /// Feed type.
    #[builder(setter(into))]
    pub feed_type: String,
    /// Target marketplaces.
    pub marketplace_ids: Vec<String>,
    /// Document the feed content was uploaded to.
    #[builder(setter(into))]
    pub input_feed_document_id: String,
    /// Feed-type specific options.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_options: Option<HashMap<String, String>>,
}

/// Body of the create-report call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportSpecification {
    /// Report type.
    #[builder(setter(into))]
    pub report_type: String,
    /// Marketplaces to cover.
    pub marketplace_ids: Vec<String>,
    /// Start of the data range.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_start_time: Option<DateTime<Utc>>,
    /// End of the data range.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_end_time: Option<DateTime<Utc>>,
    /// Report-type specific options.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_options: Option<HashMap<String, String>>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            ProcessingStatus::None,
            ProcessingStatus::InQueue,
            ProcessingStatus::InProgress,
            ProcessingStatus::Done,
            ProcessingStatus::Cancelled,
            ProcessingStatus::Fatal,
        ] {
            assert_eq!(status.as_str().parse::<ProcessingStatus>().unwrap(), status);
        }
        assert!("done".parse::<ProcessingStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ProcessingStatus::Done.is_terminal());
        assert!(!ProcessingStatus::Done.is_failure());
        assert!(ProcessingStatus::Cancelled.is_failure());
        assert!(ProcessingStatus::Fatal.is_failure());
        assert!(!ProcessingStatus::InProgress.is_terminal());
        assert!(!ProcessingStatus::None.is_terminal());
    }

    #[test]
    fn test_feed_record() {
        let record: FeedRecord = serde_json::from_value(serde_json::json!({
            "feedId": "23492394",
            "feedType": "POST_PRODUCT_DATA",
            "marketplaceIds": ["ATVPDKIKX0DER"],
            "createdTime": "2020-12-11T13:16:47.107Z",
            "processingStatus": "DONE",
            "processingStartTime": "2020-12-11T13:16:47.107Z",
            "processingEndTime": "2020-12-11T13:16:47.107Z",
            "resultFeedDocumentId": "0356cf79-b8b0-4226-b4b9-0ee058ea5760"
        }))
        .unwrap();

        assert_eq!(record.job_id(), Some("23492394"));
        assert_eq!(record.processing_status(), Some(ProcessingStatus::Done));
        assert_eq!(
            record.result_document_id(),
            Some("0356cf79-b8b0-4226-b4b9-0ee058ea5760")
        );
    }

    #[test]
    fn test_report_record_with_unknown_status() {
        let record: ReportRecord = serde_json::from_value(serde_json::json!({
            "reportId": "ID323",
            "reportType": "GET_MERCHANT_LISTINGS_ALL_DATA",
            "processingStatus": "EXPLODED"
        }))
        .unwrap();

        assert_eq!(record.raw_status(), Some("EXPLODED"));
        assert_eq!(record.processing_status(), None);
        assert_eq!(record.result_document_id(), None);
    }

    #[test]
    fn test_created_job_aliases() {
        let feed: CreatedJob = serde_json::from_str(r#"{"feedId":"F1"}"#).unwrap();
        let report: CreatedJob = serde_json::from_str(r#"{"reportId":"R1"}"#).unwrap();
        let empty: CreatedJob = serde_json::from_str("{}").unwrap();

        assert_eq!(feed.id.as_deref(), Some("F1"));
        assert_eq!(report.id.as_deref(), Some("R1"));
        assert_eq!(empty.id, None);
    }

    #[test]
    fn test_report_specification_skips_empty_options() {
        let spec = CreateReportSpecification::builder()
            .report_type("GET_FLAT_FILE_OPEN_LISTINGS_DATA")
            .marketplace_ids(vec!["A1PA6795UKMFR9".to_string()])
            .build();

        let body = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "reportType": "GET_FLAT_FILE_OPEN_LISTINGS_DATA",
                "marketplaceIds": ["A1PA6795UKMFR9"]
            })
        );
    }
}
