//! Document locators for encrypted feed and report payloads.

use serde::{Deserialize, Serialize};

/// Content type used for XML feeds and their processing reports.
pub const XML_CONTENT_TYPE: &str = "text/xml; charset=UTF-8";

/// Encryption standard the server is expected to announce.
pub const AES_STANDARD: &str = "AES";

/// Key material for one document.
///
/// Both values are base64-encoded: a 32-byte AES-256 key and a 16-byte CBC
/// initialization vector. The pair is unique per document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionDetails {
    /// Encryption standard, `AES` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard: Option<String>,
    /// Base64-encoded symmetric key.
    pub key: String,
    /// Base64-encoded initialization vector.
    pub initialization_vector: String,
}

/// Compression applied to a document before encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[non_exhaustive]
pub enum CompressionAlgorithm {
    /// Gzip-compressed content.
    Gzip,
}

/// One-time descriptor of an encrypted blob in storage.
///
/// Returned by the feed-document and report-document endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLocator {
    /// Document identifier (`feedDocumentId` or `reportDocumentId`).
    #[serde(
        default,
        alias = "feedDocumentId",
        alias = "reportDocumentId",
        skip_serializing_if = "Option::is_none"
    )]
    pub document_id: Option<String>,
    /// Pre-signed storage URL.
    pub url: String,
    /// Key and IV for this document.
    pub encryption_details: EncryptionDetails,
    /// Compression applied to the content, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_algorithm: Option<CompressionAlgorithm>,
}

/// Body of the create-feed-document call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDocumentSpecification {
    /// Content type the feed will be uploaded with.
    pub content_type: String,
}

impl FeedDocumentSpecification {
    /// Creates a specification for the given content type.
    #[must_use]
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
        }
    }
}

impl Default for FeedDocumentSpecification {
    fn default() -> Self {
        Self::new(XML_CONTENT_TYPE)
    }
}
