//! Submit-poll-fetch state machine shared by feeds and reports.
//!
//! A job starts in `NONE` and is only ever advanced by the server. The
//! controller polls at a fixed interval until it observes a terminal status:
//! `DONE` yields the record (which must name a result document), while
//! `CANCELLED`, `FATAL` and absent or unknown statuses fail immediately.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use spapi_common::{
    CreatedJob, DocumentLocator, FeedRecord, JobRecord, ProcessingStatus, ReportRecord,
};

use crate::dispatcher::{JSON_CONTENT_TYPE, RequestOptions, SignedDispatcher};
use crate::error::ClientError;
use crate::transport::Method;

/// A kind of asynchronous job and where its endpoints live.
pub trait JobKind: Send + Sync + 'static {
    /// Status record returned by the status endpoint.
    type Record: JobRecord + DeserializeOwned + Send;

    /// Name used in errors and logs.
    const NAME: &'static str;

    /// Collection path; jobs are created here and read at `{path}/{id}`.
    const JOBS_PATH: &'static str;

    /// Document collection path; documents are read at `{path}/{id}`.
    const DOCUMENTS_PATH: &'static str;
}

/// Feed jobs (`/feeds/2020-09-04`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Feeds;

impl JobKind for Feeds {
    type Record = FeedRecord;

    const NAME: &'static str = "feed";
    const JOBS_PATH: &'static str = "/feeds/2020-09-04/feeds";
    const DOCUMENTS_PATH: &'static str = "/feeds/2020-09-04/documents";
}

/// Report jobs (`/reports/2020-09-04`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Reports;

impl JobKind for Reports {
    type Record = ReportRecord;

    const NAME: &'static str = "report";
    const JOBS_PATH: &'static str = "/reports/2020-09-04/reports";
    const DOCUMENTS_PATH: &'static str = "/reports/2020-09-04/documents";
}

/// Drives jobs of kind `K` through submission, polling and document lookup.
#[derive(Debug)]
pub struct JobController<K: JobKind> {
    dispatcher: Arc<SignedDispatcher>,
    poll_interval: Duration,
    poll_deadline: Option<Duration>,
    kind: PhantomData<fn() -> K>,
}

impl<K: JobKind> Clone for JobController<K> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            poll_interval: self.poll_interval,
            poll_deadline: self.poll_deadline,
            kind: PhantomData,
        }
    }
}

impl<K: JobKind> JobController<K> {
    /// Creates a controller using the dispatcher's poll interval and deadline.
    #[must_use]
    pub fn new(dispatcher: Arc<SignedDispatcher>) -> Self {
        let poll_interval = dispatcher.config().poll_interval;
        let poll_deadline = dispatcher.config().poll_deadline;
        Self {
            dispatcher,
            poll_interval,
            poll_deadline,
            kind: PhantomData,
        }
    }

    /// Overrides the interval between status polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bounds the total time [`JobController::wait`] may take.
    #[must_use]
    pub const fn with_poll_deadline(mut self, deadline: Duration) -> Self {
        self.poll_deadline = Some(deadline);
        self
    }

    /// Creates a job and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ApiError`] if the response carries errors or no
    /// job id.
    pub async fn submit<B: Serialize + ?Sized>(&self, body: &B) -> Result<String, ClientError> {
        let options = RequestOptions::new().with_json(body)?;
        let response = self
            .dispatcher
            .send_checked(Method::POST, K::JOBS_PATH, options)
            .await?;

        let created: CreatedJob = response.payload()?;
        let id = created
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ClientError::ApiError(format!("missing {} id", K::NAME)))?;

        info!("Created {} {id}", K::NAME);
        Ok(id)
    }

    /// Reads the current status record of a job.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ApiError`] if the response carries errors.
    pub async fn status(&self, id: &str) -> Result<K::Record, ClientError> {
        let options = RequestOptions::new().with_header("content-type", JSON_CONTENT_TYPE);
        let response = self
            .dispatcher
            .send_checked(Method::GET, &format!("{}/{id}", K::JOBS_PATH), options)
            .await?;

        response.payload()
    }

    /// Polls until the job reaches a terminal status.
    ///
    /// Waits indefinitely unless a poll deadline is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::JobFailed`] for `CANCELLED`, `FATAL`, absent or
    /// unknown statuses, [`ClientError::ApiError`] with
    /// `missing result document id` when `DONE` names no document, and
    /// [`ClientError::TimeoutError`] when the deadline passes.
    pub async fn wait(&self, id: &str) -> Result<K::Record, ClientError> {
        match self.poll_deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.poll(id))
                .await
                .map_err(|_| {
                    warn!("Gave up waiting for {} {id} after {deadline:?}", K::NAME);
                    ClientError::TimeoutError
                })?,
            None => self.poll(id).await,
        }
    }

    /// Waits for the job and returns its result document id.
    ///
    /// # Errors
    ///
    /// See [`JobController::wait`].
    pub async fn result_document_id(&self, id: &str) -> Result<String, ClientError> {
        let record = self.wait(id).await?;
        record
            .result_document_id()
            .map(str::to_string)
            .ok_or_else(|| ClientError::ApiError("missing result document id".to_string()))
    }

    /// Fetches the locator of a document.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ApiError`] if the response carries errors.
    pub async fn document(&self, document_id: &str) -> Result<DocumentLocator, ClientError> {
        let options = RequestOptions::new().with_header("content-type", JSON_CONTENT_TYPE);
        let response = self
            .dispatcher
            .send_checked(
                Method::GET,
                &format!("{}/{document_id}", K::DOCUMENTS_PATH),
                options,
            )
            .await?;

        response.payload()
    }

    async fn poll(&self, id: &str) -> Result<K::Record, ClientError> {
        let mut polls = 0u32;

        loop {
            if polls > 0 {
                tokio::time::sleep(self.poll_interval).await;
            }
            polls += 1;

            let record = self.status(id).await?;

            match record.processing_status() {
                Some(ProcessingStatus::Done) => {
                    if record.result_document_id().is_none_or(str::is_empty) {
                        return Err(ClientError::ApiError(
                            "missing result document id".to_string(),
                        ));
                    }
                    info!("{} {id} is DONE after {polls} polls", K::NAME);
                    return Ok(record);
                }
                Some(status) if !status.is_terminal() => {
                    debug!("{} {id} is {status} (poll {polls})", K::NAME);
                }
                _ => {
                    let status = record.raw_status().unwrap_or("<missing>").to_string();
                    warn!("{} {id} ended with status {status}", K::NAME);
                    return Err(ClientError::JobFailed {
                        kind: K::NAME,
                        id: id.to_string(),
                        status,
                    });
                }
            }
        }
    }
}
