//! OAuth token lifecycle against the Login with Amazon identity endpoint.
//!
//! Access tokens are never tracked for expiry. When a refresh token is
//! configured it is treated as authoritative and a new access token is minted
//! before every signed call.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use spapi_common::{Config, Credentials, TokenPair, TokenResponse};

use crate::error::ClientError;
use crate::transport::{HttpRequest, Method, Transport};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Exchanges grants for access tokens and caches the current token pair.
pub struct TokenManager {
    transport: Arc<dyn Transport>,
    config: Arc<Config>,
    credentials: Arc<Credentials>,
    tokens: RwLock<TokenPair>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("identity_endpoint", &self.config.identity_endpoint)
            .field("client_id", &self.credentials.client_id)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Creates a token manager seeded with `tokens`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        config: Arc<Config>,
        credentials: Arc<Credentials>,
        tokens: TokenPair,
    ) -> Self {
        Self {
            transport,
            config,
            credentials,
            tokens: RwLock::new(tokens),
        }
    }

    /// Snapshot of the cached token pair.
    pub async fn tokens(&self) -> TokenPair {
        self.tokens.read().await.clone()
    }

    /// Replaces the cached token pair.
    pub async fn set_tokens(&self, tokens: TokenPair) {
        *self.tokens.write().await = tokens;
    }

    /// Exchanges an authorization code for a token pair and caches it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::AuthenticationError`] with the endpoint's
    /// `error_description` when the grant is rejected.
    pub async fn exchange_authorization_code(&self, code: &str) -> Result<TokenPair, ClientError> {
        let grant = self
            .request_grant(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
            ])
            .await?;

        info!("Exchanged authorization code for an access token");
        self.tokens.write().await.apply(grant);
        Ok(self.tokens().await)
    }

    /// Exchanges a refresh token for a new token pair.
    ///
    /// This does not touch the cache; see [`TokenManager::refresh_cached`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingRefreshToken`] without any network call
    /// when `refresh_token` is absent or empty.
    pub async fn refresh(
        &self,
        refresh_token: Option<&SecretString>,
    ) -> Result<TokenPair, ClientError> {
        let refresh_token = refresh_token
            .map(ExposeSecret::expose_secret)
            .filter(|token| !token.is_empty())
            .ok_or(ClientError::MissingRefreshToken)?;

        self.request_grant(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
        ])
        .await
    }

    /// Refreshes with the cached refresh token and stores the result.
    ///
    /// A rotated refresh token replaces the cached one.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingRefreshToken`] if none is cached.
    pub async fn refresh_cached(&self) -> Result<(), ClientError> {
        let refresh_token = self.tokens.read().await.refresh_token.clone();
        let grant = self.refresh(refresh_token.as_ref()).await?;

        if grant.refresh_token.is_some() {
            debug!("Identity endpoint rotated the refresh token");
        }
        self.tokens.write().await.apply(grant);
        Ok(())
    }

    /// Resolves the access token for the next signed call.
    ///
    /// Refreshes first whenever a refresh token is cached.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigurationError`] with `missing access token`
    /// if no non-empty access token is available afterwards.
    pub async fn access_token(&self) -> Result<SecretString, ClientError> {
        if self.tokens.read().await.has_refresh_token() {
            self.refresh_cached().await?;
        }

        let tokens = self.tokens.read().await;
        match &tokens.access_token {
            Some(token) if tokens.has_access_token() => Ok(token.clone()),
            _ => Err(ClientError::ConfigurationError(
                "missing access token".to_string(),
            )),
        }
    }

    /// Seller Central consent URL for the OAuth authorization flow.
    ///
    /// `version=beta` is appended outside production.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigurationError`] if no valid Seller Central
    /// URL is configured.
    pub fn authorization_url(&self, state: &str) -> Result<String, ClientError> {
        let seller_central = self.config.seller_central_url.as_deref().ok_or_else(|| {
            ClientError::ConfigurationError("missing seller central url".to_string())
        })?;

        let mut url = url::Url::parse(&format!(
            "{}/apps/authorize/consent",
            seller_central.trim_end_matches('/')
        ))
        .map_err(|e| {
            ClientError::ConfigurationError(format!(
                "Invalid Seller Central URL '{seller_central}': {e}"
            ))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("application_id", &self.credentials.application_id)
                .append_pair("state", state);
            if !self.config.environment.is_production() {
                query.append_pair("version", "beta");
            }
        }

        Ok(url.into())
    }

    async fn request_grant(&self, grant: &[(&str, &str)]) -> Result<TokenPair, ClientError> {
        let client_secret = self.credentials.client_secret.expose_secret();

        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(grant.iter().copied())
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("client_secret", client_secret)
            .finish();

        let basic = STANDARD.encode(format!("{}:{client_secret}", self.credentials.client_id));

        let request = HttpRequest::new(Method::POST, &self.config.identity_endpoint)
            .with_header("Content-Type", FORM_CONTENT_TYPE)
            .with_header("Authorization", format!("Basic {basic}"))
            .with_header("User-Agent", &self.config.user_agent)
            .with_body(body);

        let response = self.transport.send(request).await?;

        let parsed = match serde_json::from_slice::<TokenResponse>(&response.body) {
            Ok(parsed) => parsed,
            Err(e) if response.is_success() => return Err(ClientError::SerializationError(e)),
            Err(_) => {
                warn!("Identity endpoint returned HTTP {}", response.status);
                return Err(ClientError::HttpStatus {
                    status: response.status,
                    body: response.text(),
                });
            }
        };

        if let Some(description) = parsed.error_description {
            return Err(ClientError::AuthenticationError(description));
        }
        if let Some(error) = parsed.error {
            return Err(ClientError::AuthenticationError(error));
        }
        if !response.is_success() {
            return Err(ClientError::HttpStatus {
                status: response.status,
                body: response.text(),
            });
        }

        let pair = parsed.into_pair();
        if !pair.has_access_token() {
            return Err(ClientError::InvalidResponse(
                "identity endpoint returned no access token".to_string(),
            ));
        }

        Ok(pair)
    }
}
