//! Feeds API: upload data for the platform to process.
//!
//! The flow is create document, upload, create feed, wait, then fetch and
//! check the processing report.

use std::sync::Arc;

use serde_json::Value;

use spapi_common::{
    CreateFeedSpecification, DocumentLocator, FeedDocumentSpecification, FeedRecord,
};

use crate::dispatcher::{RequestOptions, SignedDispatcher};
use crate::error::ClientError;
use crate::jobs::{Feeds, JobController, JobKind};
use crate::transfer::DocumentTransfer;
use crate::transport::Method;

/// Feed operations of one client.
#[derive(Debug, Clone)]
pub struct FeedsApi {
    dispatcher: Arc<SignedDispatcher>,
    jobs: JobController<Feeds>,
    transfer: DocumentTransfer,
}

impl FeedsApi {
    /// Creates the API from a dispatcher and a document transfer helper.
    #[must_use]
    pub fn new(dispatcher: Arc<SignedDispatcher>, transfer: DocumentTransfer) -> Self {
        Self {
            jobs: JobController::new(dispatcher.clone()),
            dispatcher,
            transfer,
        }
    }

    /// The underlying job controller.
    #[must_use]
    pub const fn jobs(&self) -> &JobController<Feeds> {
        &self.jobs
    }

    /// Creates a feed document to upload content of `content_type` into.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ApiError`] if the response carries errors.
    pub async fn create_feed_document(
        &self,
        content_type: &str,
    ) -> Result<DocumentLocator, ClientError> {
        let spec = FeedDocumentSpecification::new(content_type);
        let options = RequestOptions::new().with_json(&spec)?;
        let response = self
            .dispatcher
            .send_checked(Method::POST, Feeds::DOCUMENTS_PATH, options)
            .await?;

        response.payload()
    }

    /// Encrypts `content` and uploads it to a feed document.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UploadError`] if the upload fails.
    pub async fn upload_feed_data(
        &self,
        locator: &DocumentLocator,
        content_type: &str,
        content: &[u8],
    ) -> Result<(), ClientError> {
        self.transfer.upload(locator, content_type, content).await
    }

    /// Creates a feed over an uploaded document and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ApiError`] if the response carries errors or no
    /// feed id.
    pub async fn create_feed(&self, spec: &CreateFeedSpecification) -> Result<String, ClientError> {
        self.jobs.submit(spec).await
    }

    /// Reads the current status of a feed.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ApiError`] if the response carries errors.
    pub async fn get_feed(&self, feed_id: &str) -> Result<FeedRecord, ClientError> {
        self.jobs.status(feed_id).await
    }

    /// Waits for a feed to finish and returns its result document id.
    ///
    /// # Errors
    ///
    /// See [`JobController::wait`].
    pub async fn confirm_feed_processing(&self, feed_id: &str) -> Result<String, ClientError> {
        self.jobs.result_document_id(feed_id).await
    }

    /// Fetches the locator of a feed document.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ApiError`] if the response carries errors.
    pub async fn get_feed_document(
        &self,
        feed_document_id: &str,
    ) -> Result<DocumentLocator, ClientError> {
        self.jobs.document(feed_document_id).await
    }

    /// Downloads, decrypts and checks a processing report.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ProcessingReportError`] if the report carries a
    /// failed result.
    pub async fn download_processing_report(
        &self,
        locator: &DocumentLocator,
    ) -> Result<Value, ClientError> {
        self.transfer.download_processing_report(locator).await
    }
}
