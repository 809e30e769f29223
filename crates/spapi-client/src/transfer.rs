//! Upload and download of encrypted documents via pre-signed URLs.
//!
//! These are plain HTTP calls: the URL itself carries the authorization, so
//! nothing here is SigV4-signed.

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;

use spapi_common::{CompressionAlgorithm, DocumentLocator};

use crate::body::parse_xml;
use crate::crypto::EnvelopeCodec;
use crate::error::ClientError;
use crate::transport::{HttpRequest, Method, Transport};

/// A decrypted report document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    /// Identifier of the document, when the locator carried one.
    pub document_id: Option<String>,
    /// Decrypted bytes, still compressed when `compression_algorithm` is set.
    pub content: Vec<u8>,
    /// Compression applied by the server before encryption.
    pub compression_algorithm: Option<CompressionAlgorithm>,
}

impl ReportDocument {
    /// Content decoded as lossy UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Whether the content is still compressed.
    #[must_use]
    pub const fn is_compressed(&self) -> bool {
        self.compression_algorithm.is_some()
    }

    /// Consumes the document, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.content
    }
}

/// Checks a feed processing report for a failed result.
///
/// `Message` and `ProcessingReport.Result` may each be a single element or a
/// list of them; the first result whose `ResultCode` is `Error` fails the
/// report with its `ResultDescription`.
///
/// # Errors
///
/// Returns [`ClientError::ProcessingReportError`] as described above.
pub fn check_processing_report(report: &Value) -> Result<(), ClientError> {
    for message in as_list(&report["Message"]) {
        for result in as_list(&message["ProcessingReport"]["Result"]) {
            if result["ResultCode"].as_str() == Some("Error") {
                let description = result["ResultDescription"]
                    .as_str()
                    .unwrap_or("processing report contains an error");
                return Err(ClientError::ProcessingReportError(description.to_string()));
            }
        }
    }
    Ok(())
}

fn as_list(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        Value::Null => &[],
        single => std::slice::from_ref(single),
    }
}

/// Moves encrypted documents to and from blob storage.
#[derive(Clone)]
pub struct DocumentTransfer {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for DocumentTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentTransfer").finish_non_exhaustive()
    }
}

impl DocumentTransfer {
    /// Creates a transfer helper.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Encrypts `content` with the locator's key and PUTs it to its URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UploadError`] for transport failures and non-2xx
    /// responses, and [`ClientError::CryptoError`] for bad key material.
    pub async fn upload(
        &self,
        locator: &DocumentLocator,
        content_type: &str,
        content: &[u8],
    ) -> Result<(), ClientError> {
        let codec = EnvelopeCodec::from_locator(locator)?;
        let encrypted = codec.encrypt(content);

        let request = HttpRequest::new(Method::PUT, &locator.url)
            .with_header("Content-Type", content_type)
            .with_header("Accept", "application/xml")
            .with_body(encrypted);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ClientError::UploadError {
                status: None,
                message: e.to_string(),
            })?;

        if !response.is_success() {
            let message = upload_error_message(&response.body);
            warn!("Document upload failed with HTTP {}: {message}", response.status);
            return Err(ClientError::UploadError {
                status: Some(response.status),
                message,
            });
        }

        info!(
            "Uploaded {} encrypted bytes to document {}",
            content.len(),
            locator.document_id.as_deref().unwrap_or("<unnamed>")
        );
        Ok(())
    }

    /// GETs the locator's URL and decrypts the body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpStatus`] for non-2xx responses and
    /// [`ClientError::CryptoError`] if decryption fails.
    pub async fn download(&self, locator: &DocumentLocator) -> Result<Vec<u8>, ClientError> {
        let codec = EnvelopeCodec::from_locator(locator)?;

        let response = self
            .transport
            .send(HttpRequest::new(Method::GET, &locator.url))
            .await?;

        if !response.is_success() {
            return Err(ClientError::HttpStatus {
                status: response.status,
                body: response.text(),
            });
        }

        debug!("Downloaded {} encrypted bytes", response.body.len());
        codec.decrypt(&response.body)
    }

    /// Downloads a feed processing report and checks its results.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ProcessingReportError`] if the report carries a
    /// failed result, in addition to the errors of [`DocumentTransfer::download`].
    pub async fn download_processing_report(
        &self,
        locator: &DocumentLocator,
    ) -> Result<Value, ClientError> {
        let content = self.download(locator).await?;
        let report = parse_xml(&content)?;
        check_processing_report(&report)?;
        Ok(report)
    }

    /// Downloads a report document without decompressing it.
    ///
    /// # Errors
    ///
    /// See [`DocumentTransfer::download`].
    pub async fn download_report(
        &self,
        locator: &DocumentLocator,
    ) -> Result<ReportDocument, ClientError> {
        let content = self.download(locator).await?;
        Ok(ReportDocument {
            document_id: locator.document_id.clone(),
            content,
            compression_algorithm: locator.compression_algorithm,
        })
    }
}

fn upload_error_message(body: &[u8]) -> String {
    // Blob storage reports failures as `<Error><Code/><Message/></Error>`.
    parse_xml(body)
        .ok()
        .and_then(|error| error["Message"].as_str().map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}
