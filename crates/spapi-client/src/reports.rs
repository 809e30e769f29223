//! Reports API: have the platform produce data for download.

use std::sync::Arc;

use spapi_common::{CreateReportSpecification, DocumentLocator, ReportRecord};

use crate::dispatcher::SignedDispatcher;
use crate::error::ClientError;
use crate::jobs::{JobController, Reports};
use crate::transfer::{DocumentTransfer, ReportDocument};

/// Report operations of one client.
#[derive(Debug, Clone)]
pub struct ReportsApi {
    jobs: JobController<Reports>,
    transfer: DocumentTransfer,
}

impl ReportsApi {
    /// Creates the API from a dispatcher and a document transfer helper.
    #[must_use]
    pub fn new(dispatcher: Arc<SignedDispatcher>, transfer: DocumentTransfer) -> Self {
        Self {
            jobs: JobController::new(dispatcher),
            transfer,
        }
    }

    /// The underlying job controller.
    #[must_use]
    pub const fn jobs(&self) -> &JobController<Reports> {
        &self.jobs
    }

    /// Requests a report and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ApiError`] if the response carries errors or no
    /// report id.
    pub async fn request_report(
        &self,
        spec: &CreateReportSpecification,
    ) -> Result<String, ClientError> {
        self.jobs.submit(spec).await
    }

    /// Reads the current status of a report.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ApiError`] if the response carries errors.
    pub async fn get_report(&self, report_id: &str) -> Result<ReportRecord, ClientError> {
        self.jobs.status(report_id).await
    }

    /// Waits for a report to finish and returns its final record.
    ///
    /// # Errors
    ///
    /// See [`JobController::wait`].
    pub async fn confirm_report_processing(
        &self,
        report_id: &str,
    ) -> Result<ReportRecord, ClientError> {
        self.jobs.wait(report_id).await
    }

    /// Fetches the locator of a report document.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ApiError`] if the response carries errors.
    pub async fn retrieve_report_document(
        &self,
        report_document_id: &str,
    ) -> Result<DocumentLocator, ClientError> {
        self.jobs.document(report_document_id).await
    }

    /// Downloads and decrypts a report document.
    ///
    /// # Errors
    ///
    /// See [`DocumentTransfer::download`].
    pub async fn download_report(
        &self,
        locator: &DocumentLocator,
    ) -> Result<ReportDocument, ClientError> {
        self.transfer.download_report(locator).await
    }
}
