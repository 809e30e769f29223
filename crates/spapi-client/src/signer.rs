//! AWS Signature Version 4 signing for Selling Partner API calls.
//!
//! The signer is pure: it builds the canonical request, the string to sign,
//! the derived signing key and the signature from its inputs and a caller
//! supplied timestamp. Nothing is cached between calls.
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n
//! \n
//! SignedHeaders\n
//! HashedPayload
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use log::debug;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use spapi_common::{Credentials, Region};

type HmacSha256 = Hmac<Sha256>;

/// Signing algorithm designation.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service name in the credential scope.
pub const SERVICE: &str = "execute-api";

/// Terminator of the credential scope.
pub const SCOPE_TERMINATOR: &str = "aws4_request";

/// SHA-256 of the empty payload.
pub const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Everything except RFC 3986 unreserved characters is percent-encoded.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Formats a timestamp as `YYYYMMDD'T'HHMMSS'Z'` for the `x-amz-date` header.
#[must_use]
pub fn amz_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Formats the UTC `YYYYMMDD` date used in the credential scope.
#[must_use]
pub fn date_stamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y%m%d").to_string()
}

/// Lower-case hex SHA-256 of `data`.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Serializes query parameters sorted by key (then value), percent-encoding
/// keys and values.
///
/// # Examples
///
/// ```
/// use spapi_client::signer::canonical_query_string;
///
/// let query = vec![
///     ("marketplaceIds".to_string(), "A1,A2".to_string()),
///     ("feedTypes".to_string(), "POST_PRODUCT_DATA".to_string()),
/// ];
/// assert_eq!(
///     canonical_query_string(&query),
///     "feedTypes=POST_PRODUCT_DATA&marketplaceIds=A1%2CA2"
/// );
/// ```
#[must_use]
pub fn canonical_query_string(query: &[(String, String)]) -> String {
    let mut params: Vec<(String, String)> = query
        .iter()
        .map(|(key, value)| (uri_encode(key), uri_encode(value)))
        .collect();

    params.sort_unstable();

    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn uri_encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_ENCODE_SET).to_string()
}

/// Credential scope: `date/region/execute-api/aws4_request`.
#[must_use]
pub fn credential_scope(date: &str, region: &str) -> String {
    format!("{date}/{region}/{SERVICE}/{SCOPE_TERMINATOR}")
}

/// Builds the string to sign from the request timestamp, the credential
/// scope and the canonical request digest.
#[must_use]
pub fn string_to_sign(amz_date: &str, credential_scope: &str, canonical_digest: &str) -> String {
    format!("{ALGORITHM}\n{amz_date}\n{credential_scope}\n{canonical_digest}")
}

/// Derives the signing key with four chained HMAC-SHA256 steps.
#[must_use]
pub fn derive_signing_key(secret: &str, date: &str, region: &str) -> [u8; 32] {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, SERVICE.as_bytes());
    hmac_sha256(&k_service, SCOPE_TERMINATOR.as_bytes())
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(message);
    mac.finalize().into_bytes().into()
}

/// Order-normalized serialization of a request, used as signing input.
///
/// Headers are merged in the order given (later entries override earlier
/// ones with the same lower-cased name) and then sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    method: String,
    path: String,
    query: String,
    headers: BTreeMap<String, String>,
    payload_hash: String,
}

impl CanonicalRequest {
    /// Builds a canonical request.
    ///
    /// `headers` should list base headers first and caller headers after them
    /// so that caller values win.
    #[must_use]
    pub fn new(
        method: &str,
        path: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
        body: &[u8],
    ) -> Self {
        let mut merged = BTreeMap::new();
        for (name, value) in headers {
            merged.insert(name.to_ascii_lowercase(), value.trim().to_string());
        }

        let payload_hash = if body.is_empty() {
            EMPTY_SHA256.to_string()
        } else {
            sha256_hex(body)
        };

        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            query: canonical_query_string(query),
            headers: merged,
            payload_hash,
        }
    }

    /// Canonical query string.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Merged, lower-cased headers in sorted order.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// `;`-joined sorted header names.
    #[must_use]
    pub fn signed_headers(&self) -> String {
        self.headers
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Hex SHA-256 of the request body.
    #[must_use]
    pub fn payload_hash(&self) -> &str {
        &self.payload_hash
    }

    /// The full canonical request string.
    #[must_use]
    pub fn to_canonical_string(&self) -> String {
        let mut canonical_headers = String::with_capacity(self.headers.len() * 48);
        for (name, value) in &self.headers {
            canonical_headers.push_str(name);
            canonical_headers.push(':');
            canonical_headers.push_str(value);
            canonical_headers.push('\n');
        }

        format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            self.method,
            self.path,
            self.query,
            canonical_headers,
            self.signed_headers(),
            self.payload_hash
        )
    }

    /// Lower-case hex SHA-256 of the canonical request string.
    #[must_use]
    pub fn digest(&self) -> String {
        sha256_hex(self.to_canonical_string().as_bytes())
    }
}

/// Result of signing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Lower-case hex signature.
    pub signature: String,
    /// `;`-joined signed header names.
    pub signed_headers: String,
    /// `date/region/execute-api/aws4_request`.
    pub credential_scope: String,
    /// Value of the `Authorization` header.
    pub authorization: String,
}

/// Signs requests with one set of IAM credentials for one region.
#[derive(Clone)]
pub struct RequestSigner {
    access_key_id: String,
    secret_access_key: SecretString,
    region: String,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("region", &self.region)
            .finish()
    }
}

impl RequestSigner {
    /// Creates a signer for an AWS region code such as `us-east-1`.
    #[must_use]
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: SecretString,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key,
            region: region.into(),
        }
    }

    /// Creates a signer from application credentials and a region.
    #[must_use]
    pub fn for_region(credentials: &Credentials, region: Region) -> Self {
        Self::new(
            credentials.access_key_id.clone(),
            credentials.access_key_secret.clone(),
            region.aws_region(),
        )
    }

    /// AWS region code used in the credential scope.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Signs a canonical request at `timestamp`.
    ///
    /// The request's `x-amz-date` header must carry the same timestamp.
    #[must_use]
    pub fn sign(&self, request: &CanonicalRequest, timestamp: DateTime<Utc>) -> Signature {
        let amz_date = amz_date(timestamp);
        let date = date_stamp(timestamp);

        let canonical = request.to_canonical_string();
        debug!("Canonical request:\n{canonical}");

        let scope = credential_scope(&date, &self.region);
        let string_to_sign = string_to_sign(&amz_date, &scope, &sha256_hex(canonical.as_bytes()));
        debug!("String to sign:\n{string_to_sign}");

        let signing_key =
            derive_signing_key(self.secret_access_key.expose_secret(), &date, &self.region);
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));
        let signed_headers = request.signed_headers();

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.access_key_id
        );

        Signature {
            signature,
            signed_headers,
            credential_scope: scope,
            authorization,
        }
    }

    /// Builds and signs a request in one step.
    #[must_use]
    pub fn sign_request(
        &self,
        method: &str,
        path: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
        body: &[u8],
        timestamp: DateTime<Utc>,
    ) -> Signature {
        let request = CanonicalRequest::new(method, path, query, headers, body);
        self.sign(&request, timestamp)
    }
}


#[cfg(test)]
mod property_tests {
    #![allow(clippy::unwrap_used)]

    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;

    fn shuffled_pairs(
        keys: &'static str,
    ) -> impl Strategy<Value = (Vec<(String, String)>, Vec<(String, String)>)> {
        prop::collection::btree_map(keys, "[ -~]{0,16}", 1..6).prop_flat_map(|map| {
            let items: Vec<(String, String)> = map.into_iter().collect();
            (Just(items.clone()), Just(items).prop_shuffle())
        })
    }

    proptest! {
        #[test]
        fn signature_is_independent_of_input_order(
            (query, query_shuffled) in shuffled_pairs("[A-Za-z][A-Za-z0-9]{0,8}"),
            (headers, headers_shuffled) in shuffled_pairs("[a-z][a-z-]{0,10}"),
            body in ".{0,64}",
        ) {
            let signer = RequestSigner::new(
                "AKID",
                SecretString::new("secret".to_string().into_boxed_str()),
                "eu-west-1",
            );
            let timestamp = Utc.with_ymd_and_hms(2022, 6, 1, 12, 0, 0).unwrap();

            let first = signer.sign_request("POST", "/reports/2020-09-04/reports", &query, &headers, body.as_bytes(), timestamp);
            let second = signer.sign_request("POST", "/reports/2020-09-04/reports", &query_shuffled, &headers_shuffled, body.as_bytes(), timestamp);

            prop_assert_eq!(first, second);
        }

        #[test]
        fn signature_is_deterministic(path in "/[a-z0-9/]{0,24}", body in ".{0,32}") {
            let signer = RequestSigner::new(
                "AKID",
                SecretString::new("secret".to_string().into_boxed_str()),
                "us-west-2",
            );
            let timestamp = Utc.with_ymd_and_hms(2022, 6, 1, 12, 0, 0).unwrap();

            let first = signer.sign_request("GET", &path, &[], &[], body.as_bytes(), timestamp);
            let second = signer.sign_request("GET", &path, &[], &[], body.as_bytes(), timestamp);

            prop_assert_eq!(first.signature.len(), 64);
            prop_assert_eq!(first, second);
        }
    }
}
