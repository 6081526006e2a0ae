//! # Veracode Detailed Report Client
//!
//! A Rust client for the Veracode detailed report XML API (`detailedreport.do`).
//! It retrieves the report for a build and turns it into structured findings
//! ("flaws") together with their mitigation and annotation history and the
//! application's custom fields.
//!
//! ## Features
//!
//! - 🔐 **HMAC Authentication** - Built-in support for Veracode API credentials
//! - 🔑 **Legacy Basic Authentication** - Username/password for older accounts
//! - 🌍 **Multi-Regional Support** - Commercial, European and Federal XML API hosts
//! - 📄 **Single-Pass Parsing** - One streaming pass over the XML document
//! - 🏷️ **Category Enrichment** - Category names resolved from an explicit lookup table
//!
//! ## Quick Start
//!
//! ```no_run
//! use veracode_detailedreport::{
//!     BuildId, DetailedReportApi, VeracodeClient, VeracodeConfig, VeracodeRegion,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = VeracodeConfig::new("your_api_id", "your_api_key")
//!         .with_region(VeracodeRegion::European);
//!
//!     let client = VeracodeClient::new(config)?;
//!     let api = DetailedReportApi::new(client);
//!
//!     let report = api.get_detailed_report(&BuildId::new("1234567")?).await?;
//!     if let Some(err) = report.error() {
//!         eprintln!("report carried an error: {err}");
//!     }
//!     for flaw in &report.flaws {
//!         println!("{:?} {} ({})", flaw.issue_id, flaw.category_name, flaw.policy_name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Parsing without the network
//!
//! ```
//! use veracode_detailedreport::{CategoryMap, DetailedReportParser};
//!
//! let xml = br#"<detailedreport policy_name="P1">
//!     <flaw issueid="1" categoryid="19"/>
//!     <customfield name="x" value="y"/>
//! </detailedreport>"#;
//!
//! let parser = DetailedReportParser::new(CategoryMap::from_entries([(19, "SQL Injection")]));
//! let report = parser.parse(xml).unwrap();
//! assert_eq!(report.flaws[0].policy_name, "P1");
//! assert_eq!(report.flaws[0].category_name, "SQL Injection");
//! assert!(report.error().is_none());
//! ```

pub mod category;
pub mod client;
pub mod detailed_report;
pub mod validation;

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;

// Re-export common types for convenience
pub use category::{CategoryError, CategoryMap};
pub use client::VeracodeClient;
pub use detailed_report::{
    Annotation, CustomField, DetailedReport, DetailedReportApi, DetailedReportError,
    DetailedReportParser, Flaw, Mitigation, ParseWarning, ReportFetcher, ReportMetadata,
    fetch_and_parse,
};
pub use validation::{BuildId, ValidationError};

/// Custom error type for Veracode API operations.
///
/// This enum represents the transport level errors that can occur when talking
/// to the Veracode XML API.
#[derive(Debug, thiserror::Error)]
pub enum VeracodeError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Authentication error (invalid credentials, signature generation failure, etc.)
    #[error("Authentication error: {0}")]
    Authentication(String),
    /// API returned an unusable response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// Configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// How requests are authenticated against the XML API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMethod {
    /// Veracode HMAC signing with an API ID and key (default)
    #[default]
    Hmac,
    /// Legacy HTTP basic authentication. The API ID and key carry the
    /// username and password.
    Basic,
}

/// API credentials shared through `Arc` so configs can be cloned cheaply.
#[derive(Clone)]
pub struct VeracodeCredentials {
    api_id: Arc<SecretString>,
    api_key: Arc<SecretString>,
}

impl VeracodeCredentials {
    /// Create credentials from an API ID (or username) and API key (or password).
    #[must_use]
    pub fn new(api_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_id: Arc::new(SecretString::from(api_id.into())),
            api_key: Arc::new(SecretString::from(api_key.into())),
        }
    }

    /// Create credentials from already shared secrets
    #[must_use]
    pub fn from_arc(api_id: Arc<SecretString>, api_key: Arc<SecretString>) -> Self {
        Self { api_id, api_key }
    }

    #[must_use]
    pub fn expose_api_id(&self) -> &str {
        self.api_id.expose_secret()
    }

    #[must_use]
    pub fn expose_api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl fmt::Debug for VeracodeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VeracodeCredentials")
            .field("api_id", &"[REDACTED]")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 30;

/// Default request timeout in seconds. Detailed reports for large
/// applications can take minutes to render server side.
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 300;

/// Configuration for the Veracode API client.
///
/// Holds credentials, the XML API endpoint for the selected region and the
/// HTTP settings used by [`VeracodeClient`].
#[derive(Debug, Clone)]
pub struct VeracodeConfig {
    /// API credentials
    pub credentials: VeracodeCredentials,
    /// XML API base URL (analysiscenter.veracode.*)
    pub base_url: String,
    /// Veracode region for your account
    pub region: VeracodeRegion,
    /// Authentication scheme
    pub auth_method: AuthMethod,
    /// Whether to validate TLS certificates (default: true)
    pub validate_certificates: bool,
    /// Connect timeout in seconds
    pub connect_timeout: u64,
    /// Request timeout in seconds
    pub request_timeout: u64,
    /// Optional HTTP(S) proxy URL
    pub proxy_url: Option<String>,
    /// Optional proxy username
    pub proxy_username: Option<Arc<SecretString>>,
    /// Optional proxy password
    pub proxy_password: Option<Arc<SecretString>>,
}

/// Veracode regions for API access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VeracodeRegion {
    /// Commercial region (default) - analysiscenter.veracode.com
    Commercial,
    /// European region - analysiscenter.veracode.eu
    European,
    /// US Federal region - analysiscenter.veracode.us
    Federal,
}

impl VeracodeRegion {
    /// XML API base URL for this region
    #[must_use]
    pub fn xml_base_url(self) -> &'static str {
        match self {
            VeracodeRegion::Commercial => "https://analysiscenter.veracode.com",
            VeracodeRegion::European => "https://analysiscenter.veracode.eu",
            VeracodeRegion::Federal => "https://analysiscenter.veracode.us",
        }
    }
}

impl VeracodeConfig {
    /// Create a new configuration for the Commercial region.
    ///
    /// # Arguments
    ///
    /// * `api_id` - Your Veracode API ID
    /// * `api_key` - Your Veracode API key
    #[must_use]
    pub fn new(api_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::from_credentials(VeracodeCredentials::new(api_id, api_key))
    }

    /// Create a new configuration from existing credentials.
    #[must_use]
    pub fn from_credentials(credentials: VeracodeCredentials) -> Self {
        Self {
            credentials,
            base_url: VeracodeRegion::Commercial.xml_base_url().to_string(),
            region: VeracodeRegion::Commercial,
            auth_method: AuthMethod::Hmac,
            validate_certificates: true, // Default to secure
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            proxy_url: None,
            proxy_username: None,
            proxy_password: None,
        }
    }

    /// Set the region for this configuration.
    ///
    /// This also resets the base URL to the region's XML API host.
    #[must_use]
    pub fn with_region(mut self, region: VeracodeRegion) -> Self {
        self.region = region;
        self.base_url = region.xml_base_url().to_string();
        self
    }

    /// Override the base URL, e.g. for a gateway or a test server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Select the authentication scheme.
    #[must_use]
    pub fn with_auth_method(mut self, auth_method: AuthMethod) -> Self {
        self.auth_method = auth_method;
        self
    }

    /// Set connect and request timeouts in seconds.
    #[must_use]
    pub fn with_timeouts(mut self, connect_timeout: u64, request_timeout: u64) -> Self {
        self.connect_timeout = connect_timeout;
        self.request_timeout = request_timeout;
        self
    }

    /// Route requests through an HTTP(S) proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    /// Basic authentication for the proxy.
    #[must_use]
    pub fn with_proxy_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.proxy_username = Some(Arc::new(SecretString::from(username.into())));
        self.proxy_password = Some(Arc::new(SecretString::from(password.into())));
        self
    }

    /// Disable certificate validation for development environments.
    ///
    /// WARNING: This should only be used in development environments with
    /// self-signed certificates. Never use this in production.
    #[must_use]
    pub fn with_certificate_validation_disabled(mut self) -> Self {
        self.validate_certificates = false;
        self
    }
}
