use std::collections::HashMap;
use std::fmt;

use log::info;
use serde_json::Value;

use spapi_client::{ClientError, ReportDocument, SellingPartnerClient};
use spapi_common::{
    CreateFeedSpecification, CreateReportSpecification, JobRecord, ReportRecord,
};

use crate::error::WorkflowError;

/// Type alias for progress callback functions
pub type ProgressCallback = Box<dyn Fn(&WorkflowStep) + Send + Sync>;

/// A step of a feed or report workflow, reported before it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowStep {
    CreatingFeedDocument,
    UploadingFeedData { document_id: String, bytes: usize },
    CreatingFeed { document_id: String },
    WaitingForFeed { feed_id: String },
    FetchingProcessingReport { document_id: String },
    RequestingReport { report_type: String },
    WaitingForReport { report_id: String },
    DownloadingReport { document_id: String },
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreatingFeedDocument => write!(f, "Creating feed document"),
            Self::UploadingFeedData { document_id, bytes } => {
                write!(f, "Uploading {bytes} bytes to feed document {document_id}")
            }
            Self::CreatingFeed { document_id } => {
                write!(f, "Creating feed for document {document_id}")
            }
            Self::WaitingForFeed { feed_id } => write!(f, "Waiting for feed {feed_id}"),
            Self::FetchingProcessingReport { document_id } => {
                write!(f, "Fetching processing report {document_id}")
            }
            Self::RequestingReport { report_type } => write!(f, "Requesting {report_type} report"),
            Self::WaitingForReport { report_id } => write!(f, "Waiting for report {report_id}"),
            Self::DownloadingReport { document_id } => {
                write!(f, "Downloading report document {document_id}")
            }
        }
    }
}

/// What to submit as a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSubmission {
    pub feed_type: String,
    pub marketplace_ids: Vec<String>,
    pub content_type: String,
    pub content: Vec<u8>,
    pub feed_options: Option<HashMap<String, String>>,
}

impl FeedSubmission {
    /// An XML feed with default content type and no options.
    #[must_use]
    pub fn xml(
        feed_type: impl Into<String>,
        marketplace_ids: Vec<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            feed_type: feed_type.into(),
            marketplace_ids,
            content_type: spapi_common::XML_CONTENT_TYPE.to_string(),
            content: content.into(),
            feed_options: None,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    #[must_use]
    pub fn with_feed_options(mut self, feed_options: HashMap<String, String>) -> Self {
        self.feed_options = Some(feed_options);
        self
    }
}

/// Result of a completed feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedOutcome {
    pub feed_id: String,
    pub input_document_id: String,
    pub result_document_id: String,
    /// The processing report as a value tree.
    pub processing_report: Value,
}

/// Result of a completed report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    pub report_id: String,
    pub record: ReportRecord,
    pub document: ReportDocument,
}

/// Runs feeds and reports end to end.
///
/// Steps run strictly in order and the first failure aborts the rest, so a
/// failed upload never creates a feed.
pub struct Workflow {
    pub client: SellingPartnerClient,
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("client", &self.client)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl Workflow {
    #[must_use]
    pub const fn new(client: SellingPartnerClient) -> Self {
        Self {
            client,
            progress_callback: None,
        }
    }

    #[must_use]
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&WorkflowStep) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    fn report(&self, step: WorkflowStep) {
        info!("{step}");
        if let Some(callback) = &self.progress_callback {
            callback(&step);
        }
    }

    /// Uploads a feed, waits for it and returns its checked processing report.
    ///
    /// # Errors
    ///
    /// Returns the first error of any step, including
    /// [`spapi_client::ClientError::ProcessingReportError`] when the report
    /// carries a failed result.
    pub async fn submit_feed(
        &self,
        submission: &FeedSubmission,
    ) -> Result<FeedOutcome, WorkflowError> {
        let feeds = self.client.feeds();

        self.report(WorkflowStep::CreatingFeedDocument);
        let input_document = feeds
            .create_feed_document(&submission.content_type)
            .await?;
        let input_document_id = input_document
            .document_id
            .clone()
            .ok_or(WorkflowError::MissingDocumentId("feed"))?;

        self.report(WorkflowStep::UploadingFeedData {
            document_id: input_document_id.clone(),
            bytes: submission.content.len(),
        });
        feeds
            .upload_feed_data(
                &input_document,
                &submission.content_type,
                &submission.content,
            )
            .await?;

        self.report(WorkflowStep::CreatingFeed {
            document_id: input_document_id.clone(),
        });
        let spec = CreateFeedSpecification {
            feed_type: submission.feed_type.clone(),
            marketplace_ids: submission.marketplace_ids.clone(),
            input_feed_document_id: input_document_id.clone(),
            feed_options: submission.feed_options.clone(),
        };
        let feed_id = feeds.create_feed(&spec).await?;

        self.report(WorkflowStep::WaitingForFeed {
            feed_id: feed_id.clone(),
        });
        let result_document_id = feeds.confirm_feed_processing(&feed_id).await?;

        self.report(WorkflowStep::FetchingProcessingReport {
            document_id: result_document_id.clone(),
        });
        let locator = feeds.get_feed_document(&result_document_id).await?;
        let processing_report = feeds.download_processing_report(&locator).await?;

        Ok(FeedOutcome {
            feed_id,
            input_document_id,
            result_document_id,
            processing_report,
        })
    }

    /// Requests a report, waits for it and downloads its document.
    ///
    /// # Errors
    ///
    /// Returns the first error of any step.
    pub async fn fetch_report(
        &self,
        spec: &CreateReportSpecification,
    ) -> Result<ReportOutcome, WorkflowError> {
        let reports = self.client.reports();

        self.report(WorkflowStep::RequestingReport {
            report_type: spec.report_type.clone(),
        });
        let report_id = reports.request_report(spec).await?;

        self.report(WorkflowStep::WaitingForReport {
            report_id: report_id.clone(),
        });
        // A DONE record always names its document; the job controller rejects it otherwise.
        let record = reports.confirm_report_processing(&report_id).await?;
        let document_id = record.result_document_id().map(str::to_string).ok_or_else(|| {
            ClientError::ApiError("missing result document id".to_string())
        })?;

        self.report(WorkflowStep::DownloadingReport {
            document_id: document_id.clone(),
        });
        let locator = reports.retrieve_report_document(&document_id).await?;
        let document = reports.download_report(&locator).await?;

        Ok(ReportOutcome {
            report_id,
            record,
            document,
        })
    }
}
