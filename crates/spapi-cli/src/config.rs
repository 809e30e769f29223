//! CLI configuration.
//!
//! Configuration is loaded from `~/.config/spapi/config.toml`, or from the
//! file given with `--config`. Every credential can be overridden through an
//! `AMAZON_SP_*` environment variable.
//!
//! ## Example Configuration
//!
//! ```toml
//! region = "na"
//! environment = "production"
//! seller_central_url = "https://sellercentral.amazon.com"
//! timeout_seconds = 30
//! poll_interval_seconds = 5
//! poll_deadline_seconds = 900
//!
//! [credentials]
//! application_id = "amzn1.sp.solution.example"
//! client_id = "amzn1.application-oa2-client.example"
//! client_secret = "..."
//! access_key_id = "AKIA..."
//! access_key_secret = "..."
//! redirect_uri = "https://example.com/callback"
//! refresh_token = "Atzr|..."
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use spapi::{Config, Credentials, Environment, Region, TokenPair};

/// Configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Region to dispatch calls to
    pub region: Option<Region>,

    /// Deployment environment (default: production)
    #[serde(default)]
    pub environment: Environment,

    /// Seller Central base URL for the consent page
    pub seller_central_url: Option<String>,

    /// Base URL replacing the region's endpoint
    pub endpoint_override: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_seconds: Option<u64>,

    /// Seconds between job status polls (default: 5)
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Upper bound on a job wait in seconds
    pub poll_deadline_seconds: Option<u64>,

    /// Application credentials
    #[serde(default)]
    pub credentials: CredentialsSection,
}

/// `[credentials]` table. Every field may also come from the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsSection {
    pub application_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub refresh_token: Option<String>,
}

const fn default_poll_interval_seconds() -> u64 {
    5
}

impl CliConfig {
    /// Loads configuration from `path`, or from the default location.
    ///
    /// A missing default file yields an empty configuration so that the
    /// environment alone can supply everything. A missing explicit file is an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::config_path()?, false),
        };

        if !path.exists() {
            if explicit {
                bail!("Configuration file not found: {}", path.display());
            }
            log::debug!("No configuration file at {}", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Returns the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("spapi");

        Ok(config_dir.join("config.toml"))
    }

    /// Overrides values with `AMAZON_SP_*` variables found by `lookup`.
    ///
    /// Variables take precedence over the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the region or environment variable does not parse.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = &mut self.credentials;
        for (name, slot) in [
            ("AMAZON_SP_APPLICATION_ID", &mut credentials.application_id),
            ("AMAZON_SP_CLIENT_ID", &mut credentials.client_id),
            ("AMAZON_SP_CLIENT_SECRET", &mut credentials.client_secret),
            ("AMAZON_SP_ACCESS_KEY_ID", &mut credentials.access_key_id),
            ("AMAZON_SP_ACCESS_KEY_SECRET", &mut credentials.access_key_secret),
            ("AMAZON_SP_REDIRECT_URI", &mut credentials.redirect_uri),
            ("AMAZON_SP_REFRESH_TOKEN", &mut credentials.refresh_token),
        ] {
            if let Some(value) = lookup(name) {
                *slot = Some(value);
            }
        }

        if let Some(url) = lookup("AMAZON_SP_SELLER_CENTRAL_URL")
            .or_else(|| lookup("AMAZON_SELLER_CENTRAL_URL"))
        {
            self.seller_central_url = Some(url);
        }
        if let Some(region) = lookup("AMAZON_SP_REGION") {
            self.region = Some(region.parse()?);
        }
        if let Some(environment) = lookup("AMAZON_SP_ENVIRONMENT") {
            self.environment = environment.parse()?;
        }

        Ok(())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No region is configured
    /// - A credential is missing
    /// - The poll interval is zero
    pub fn validate(&self) -> Result<()> {
        if self.region.is_none() {
            bail!("No region configured (set `region` or AMAZON_SP_REGION)");
        }

        let missing: Vec<&str> = [
            ("application_id", &self.credentials.application_id),
            ("client_id", &self.credentials.client_id),
            ("client_secret", &self.credentials.client_secret),
            ("access_key_id", &self.credentials.access_key_id),
            ("access_key_secret", &self.credentials.access_key_secret),
            ("redirect_uri", &self.credentials.redirect_uri),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(str::is_empty))
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            bail!("Missing credentials: {}", missing.join(", "));
        }

        if self.poll_interval_seconds == 0 {
            bail!("poll_interval_seconds must be greater than zero");
        }

        Ok(())
    }

    /// Validates what building the consent URL needs.
    ///
    /// Unlike [`Self::validate`], no region or signing credentials are
    /// required.
    ///
    /// # Errors
    ///
    /// Returns an error if the application id or Seller Central URL is missing.
    pub fn validate_consent(&self) -> Result<()> {
        if self
            .credentials
            .application_id
            .as_deref()
            .is_none_or(str::is_empty)
        {
            bail!("Missing credentials: application_id");
        }

        if self.seller_central_url.as_deref().is_none_or(str::is_empty) {
            bail!("No Seller Central URL configured (set `seller_central_url` or AMAZON_SP_SELLER_CENTRAL_URL)");
        }

        Ok(())
    }

    /// Client configuration.
    #[must_use]
    pub fn client_config(&self) -> Config {
        let mut config = Config::new().with_environment(self.environment);
        config.region = self.region;
        config.seller_central_url.clone_from(&self.seller_central_url);
        config.endpoint_override.clone_from(&self.endpoint_override);
        config.timeout_seconds = self.timeout_seconds;
        config.poll_interval = Duration::from_secs(self.poll_interval_seconds);
        config.poll_deadline = self.poll_deadline_seconds.map(Duration::from_secs);
        config
    }

    /// Application credentials. Call [`Self::validate`] first.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        let section = &self.credentials;

        Credentials::builder()
            .application_id(field(&section.application_id))
            .client_id(field(&section.client_id))
            .client_secret(field(&section.client_secret))
            .access_key_id(field(&section.access_key_id))
            .access_key_secret(field(&section.access_key_secret))
            .redirect_uri(field(&section.redirect_uri))
            .build()
    }

    /// Initial token pair.
    #[must_use]
    pub fn tokens(&self) -> TokenPair {
        self.credentials
            .refresh_token
            .as_deref()
            .map(TokenPair::with_refresh_token)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::HashMap;

    use super::*;

    fn sample_config_toml() -> &'static str {
        r#"
region = "eu"
environment = "sandbox"
seller_central_url = "https://sellercentral-europe.amazon.com"
poll_interval_seconds = 2
poll_deadline_seconds = 600

[credentials]
application_id = "app"
client_id = "client"
client_secret = "secret"
access_key_id = "AKID"
access_key_secret = "aws-secret"
redirect_uri = "https://example.com/cb"
refresh_token = "Atzr|refresh"
        "#
    }

    #[test]
    fn test_parse_config() {
        let config: CliConfig = toml::from_str(sample_config_toml()).unwrap();

        assert_eq!(config.region, Some(Region::Europe));
        assert_eq!(config.environment, Environment::Sandbox);
        assert_eq!(config.poll_interval_seconds, 2);
        assert_eq!(config.credentials.client_id.as_deref(), Some("client"));
        config.validate().unwrap();
    }

    #[test]
    fn test_client_config() {
        let config: CliConfig = toml::from_str(sample_config_toml()).unwrap();
        let client_config = config.client_config();

        assert_eq!(client_config.region, Some(Region::Europe));
        assert_eq!(client_config.poll_interval, Duration::from_secs(2));
        assert_eq!(client_config.poll_deadline, Some(Duration::from_secs(600)));
        assert_eq!(
            client_config.base_url(),
            Some("https://sellingpartnerapi-eu.amazon.com")
        );
        assert!(config.tokens().has_refresh_token());
    }

    #[test]
    fn test_defaults() {
        let config: CliConfig = toml::from_str("region = \"na\"").unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.poll_interval_seconds, 5);
        assert!(config.poll_deadline_seconds.is_none());
        assert!(!config.tokens().has_refresh_token());
    }

    #[test]
    fn test_env_overrides() {
        let mut config: CliConfig = toml::from_str(sample_config_toml()).unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("AMAZON_SP_CLIENT_ID", "env-client"),
            ("AMAZON_SP_REGION", "us-west-2"),
        ]);

        config
            .apply_env(|name| env.get(name).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.credentials.client_id.as_deref(), Some("env-client"));
        assert_eq!(config.region, Some(Region::FarEast));
        assert_eq!(config.credentials.client_secret.as_deref(), Some("secret"));
    }

    #[test]
    fn test_seller_central_url_from_env() {
        let mut config = CliConfig::default();
        config
            .apply_env(|name| {
                (name == "AMAZON_SELLER_CENTRAL_URL")
                    .then(|| "https://sellercentral.amazon.co.jp".to_string())
            })
            .unwrap();

        assert_eq!(
            config.seller_central_url.as_deref(),
            Some("https://sellercentral.amazon.co.jp")
        );
    }

    #[test]
    fn test_env_rejects_unknown_region() {
        let mut config = CliConfig::default();
        let result = config.apply_env(|name| {
            (name == "AMAZON_SP_REGION").then(|| "mars".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_missing_credentials() {
        let config: CliConfig = toml::from_str(
            r#"
region = "na"

[credentials]
client_id = "client"
client_secret = ""
            "#,
        )
        .unwrap();

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("client_secret"));
        assert!(message.contains("access_key_id"));
        assert!(!message.contains("client_id,"));
    }

    #[test]
    fn test_consent_needs_only_application_and_seller_central() {
        let config: CliConfig = toml::from_str(
            r#"
seller_central_url = "https://sellercentral.amazon.com"

[credentials]
application_id = "app"
            "#,
        )
        .unwrap();

        config.validate_consent().unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_consent_requires_seller_central_url() {
        let mut config = CliConfig::default();
        config.credentials.application_id = Some("app".to_string());

        let message = config.validate_consent().unwrap_err().to_string();
        assert!(message.contains("Seller Central URL"));
    }

    #[test]
    fn test_validate_missing_region() {
        let config = CliConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let path = std::env::temp_dir().join("spapi-cli-missing-config.toml");
        assert!(CliConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("spapi-cli-{}.toml", std::process::id()));
        fs::write(&path, sample_config_toml()).unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.region, Some(Region::Europe));
    }
}
