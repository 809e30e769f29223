use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// The cached OAuth token pair of a client.
///
/// The access token is short-lived and opaque. When a refresh token is
/// present the access token is never trusted on its own: a fresh one is
/// minted from the refresh token before every signed call, since expiry is
/// not tracked locally.
#[derive(Debug, Clone, Default)]
pub struct TokenPair {
    /// Current access token, if any.
    pub access_token: Option<SecretString>,
    /// Long-lived refresh token, if any.
    pub refresh_token: Option<SecretString>,
}

impl TokenPair {
    /// Creates a pair holding only an access token.
    #[must_use]
    pub fn with_access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(secret(token)),
            refresh_token: None,
        }
    }

    /// Creates a pair holding only a refresh token.
    #[must_use]
    pub fn with_refresh_token(token: impl Into<String>) -> Self {
        Self {
            access_token: None,
            refresh_token: Some(secret(token)),
        }
    }

    /// Whether a non-empty access token is present.
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.access_token
            .as_ref()
            .is_some_and(|token| !token.expose_secret().is_empty())
    }

    /// Whether a non-empty refresh token is present.
    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_ref()
            .is_some_and(|token| !token.expose_secret().is_empty())
    }

    /// Applies a token grant, keeping the current refresh token unless the
    /// grant rotated it.
    pub fn apply(&mut self, grant: Self) {
        self.access_token = grant.access_token;
        if grant.refresh_token.is_some() {
            self.refresh_token = grant.refresh_token;
        }
    }
}

fn secret(value: impl Into<String>) -> SecretString {
    SecretString::new(value.into().into_boxed_str())
}

/// Raw body of the identity endpoint's token response.
///
/// Success and failure share one shape: a failed grant carries `error` and
/// `error_description` instead of tokens.
#[derive(Debug, Default, Deserialize)]
pub struct TokenResponse {
    /// Newly issued access token.
    pub access_token: Option<String>,
    /// Refresh token (returned by code exchange, echoed on refresh).
    pub refresh_token: Option<String>,
    /// Token type, normally `bearer`.
    pub token_type: Option<String>,
    /// Access token lifetime in seconds.
    pub expires_in: Option<u64>,
    /// Machine-readable error code.
    pub error: Option<String>,
    /// Human-readable error description.
    pub error_description: Option<String>,
}

impl TokenResponse {
    /// Converts the tokens of a successful response into a [`TokenPair`].
    #[must_use]
    pub fn into_pair(self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.map(secret),
            refresh_token: self.refresh_token.map(secret),
        }
    }
}
