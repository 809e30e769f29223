//! # spapi-common
//!
//! Shared types for the Selling Partner API client.
//!
//! This crate holds the data model used across the workspace:
//! - Application credentials, regions and client configuration
//! - The cached OAuth token pair
//! - Feed and report job records and their creation bodies
//! - Document locators with per-document encryption details
//! - The response envelope and error-list records
//!
//! ## Example
//!
//! ```
//! use spapi_common::{Config, CreateReportSpecification, Region};
//!
//! let config = Config::new().with_region(Region::NorthAmerica);
//!
//! let spec = CreateReportSpecification::builder()
//!     .report_type("GET_MERCHANT_LISTINGS_ALL_DATA")
//!     .marketplace_ids(vec!["ATVPDKIKX0DER".to_string()])
//!     .build();
//!
//! assert_eq!(config.base_url(), Some("https://sellingpartnerapi-na.amazon.com"));
//! assert_eq!(spec.report_type, "GET_MERCHANT_LISTINGS_ALL_DATA");
//! ```

/// Credentials, environment and client configuration.
pub mod config;
/// Document locators and encryption details.
pub mod document;
/// Feed and report job records.
pub mod job;
/// Regions and their endpoints.
pub mod region;
/// Response envelope and API error records.
pub mod response;
/// OAuth token pair.
pub mod token;

pub use config::{Config, Credentials, Environment};
pub use document::{
    CompressionAlgorithm, DocumentLocator, EncryptionDetails, FeedDocumentSpecification,
    XML_CONTENT_TYPE,
};
pub use job::{
    CreateFeedSpecification, CreateReportSpecification, CreatedJob, FeedRecord, JobRecord,
    ProcessingStatus, ReportRecord,
};
pub use region::Region;
pub use response::{ApiErrorEntry, Envelope, ErrorField, ErrorList};
pub use token::{TokenPair, TokenResponse};
