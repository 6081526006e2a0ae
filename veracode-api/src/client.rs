//! Core Veracode API client implementation.
//!
//! This module contains the HTTP client used to make authenticated requests to
//! the Veracode XML API, including HMAC signing and legacy basic authentication.

use hmac::{Hmac, Mac};
use log::debug;
use reqwest::Client;
use secrecy::ExposeSecret;
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use url::Url;

use crate::{AuthMethod, VeracodeConfig, VeracodeError};

// Type aliases for HMAC
type HmacSha256 = Hmac<Sha256>;

// Constants for authentication error messages to avoid repeated allocations
const INVALID_URL_MSG: &str = "Invalid URL";
const INVALID_API_KEY_MSG: &str = "Invalid API key format - must be hex string";
const INVALID_NONCE_MSG: &str = "Invalid nonce format";
const HMAC_CREATION_FAILED_MSG: &str = "Failed to create HMAC";

const AUTH_SCHEME: &str = "VERACODE-HMAC-SHA-256";
const REQUEST_VERSION: &str = "vcode_request_version_1";

/// Core Veracode API client.
///
/// Wraps a configured `reqwest::Client` and knows how to authenticate each
/// request according to the configured [`AuthMethod`].
#[derive(Clone)]
pub struct VeracodeClient {
    config: VeracodeConfig,
    client: Client,
}

impl VeracodeClient {
    /// Build URL with query parameters - centralized helper
    fn build_url_with_params(&self, endpoint: &str, query_params: &[(&str, &str)]) -> String {
        let estimated_capacity = self
            .config
            .base_url
            .len()
            .saturating_add(endpoint.len())
            .saturating_add(query_params.len().saturating_mul(32));

        let mut url = String::with_capacity(estimated_capacity);
        url.push_str(&self.config.base_url);
        url.push_str(endpoint);

        if !query_params.is_empty() {
            url.push('?');
            for (i, (key, value)) in query_params.iter().enumerate() {
                if i > 0 {
                    url.push('&');
                }
                url.push_str(&urlencoding::encode(key));
                url.push('=');
                url.push_str(&urlencoding::encode(value));
            }
        }

        url
    }

    /// Create a new Veracode API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy URL is invalid or the underlying HTTP
    /// client cannot be constructed.
    pub fn new(config: VeracodeConfig) -> Result<Self, VeracodeError> {
        let mut client_builder = Client::builder();

        if !config.validate_certificates {
            client_builder = client_builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        client_builder = client_builder
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.request_timeout));

        if let Some(proxy_url) = &config.proxy_url {
            let mut proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| VeracodeError::InvalidConfig(format!("Invalid proxy URL: {e}")))?;

            if let (Some(username), Some(password)) =
                (&config.proxy_username, &config.proxy_password)
            {
                proxy = proxy.basic_auth(username.expose_secret(), password.expose_secret());
            }

            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder.build().map_err(VeracodeError::Http)?;
        Ok(Self { config, client })
    }

    /// Get the base URL for API requests.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Get access to the configuration
    #[must_use]
    pub fn config(&self) -> &VeracodeConfig {
        &self.config
    }

    /// Generate HMAC signature for authentication based on official Veracode JavaScript implementation
    fn generate_hmac_signature(
        &self,
        method: &str,
        url: &str,
        timestamp: u64,
        nonce: &str,
    ) -> Result<String, VeracodeError> {
        let url_parsed = Url::parse(url)
            .map_err(|_| VeracodeError::Authentication(INVALID_URL_MSG.to_string()))?;

        let path_and_query = match url_parsed.query() {
            Some(query) => format!("{}?{}", url_parsed.path(), query),
            None => url_parsed.path().to_string(),
        };

        let host = url_parsed.host_str().unwrap_or("");

        // var data = `id=${id}&host=${host}&url=${url}&method=${method}`;
        let data = format!(
            "id={}&host={}&url={}&method={}",
            self.config.credentials.expose_api_id(),
            host,
            path_and_query,
            method
        );

        let timestamp_str = timestamp.to_string();

        let key_bytes = hex::decode(self.config.credentials.expose_api_key())
            .map_err(|_| VeracodeError::Authentication(INVALID_API_KEY_MSG.to_string()))?;

        let nonce_bytes = hex::decode(nonce)
            .map_err(|_| VeracodeError::Authentication(INVALID_NONCE_MSG.to_string()))?;

        // Step 1: HMAC(nonce, key)
        let mut mac1 = HmacSha256::new_from_slice(&key_bytes)
            .map_err(|_| VeracodeError::Authentication(HMAC_CREATION_FAILED_MSG.to_string()))?;
        mac1.update(&nonce_bytes);
        let hashed_nonce = mac1.finalize().into_bytes();

        // Step 2: HMAC(timestamp, hashed_nonce)
        let mut mac2 = HmacSha256::new_from_slice(&hashed_nonce)
            .map_err(|_| VeracodeError::Authentication(HMAC_CREATION_FAILED_MSG.to_string()))?;
        mac2.update(timestamp_str.as_bytes());
        let hashed_timestamp = mac2.finalize().into_bytes();

        // Step 3: HMAC(ver_str, hashed_timestamp)
        let mut mac3 = HmacSha256::new_from_slice(&hashed_timestamp)
            .map_err(|_| VeracodeError::Authentication(HMAC_CREATION_FAILED_MSG.to_string()))?;
        mac3.update(REQUEST_VERSION.as_bytes());
        let hashed_ver_str = mac3.finalize().into_bytes();

        // Step 4: HMAC(data, hashed_ver_str)
        let mut mac4 = HmacSha256::new_from_slice(&hashed_ver_str)
            .map_err(|_| VeracodeError::Authentication(HMAC_CREATION_FAILED_MSG.to_string()))?;
        mac4.update(data.as_bytes());
        let signature = mac4.finalize().into_bytes();

        Ok(hex::encode(signature))
    }

    /// Generate authorization header for HMAC authentication
    ///
    /// # Errors
    ///
    /// Returns an error if the system clock is unusable, the URL cannot be
    /// parsed or the API key is not a hex string.
    pub fn generate_auth_header(&self, method: &str, url: &str) -> Result<String, VeracodeError> {
        #[allow(clippy::cast_possible_truncation)]
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| VeracodeError::Authentication(format!("System time error: {e}")))?
            .as_millis() as u64; // Use milliseconds like JavaScript

        let nonce_bytes: [u8; 16] = rand::random();
        let nonce = hex::encode(nonce_bytes);

        let signature = self.generate_hmac_signature(method, url, timestamp, &nonce)?;

        Ok(format!(
            "{AUTH_SCHEME} id={},ts={},nonce={},sig={}",
            self.config.credentials.expose_api_id(),
            timestamp,
            nonce,
            signature
        ))
    }

    /// Make an authenticated GET request with query parameters.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The API endpoint path (e.g., "/api/5.0/detailedreport.do")
    /// * `query_params` - Query parameters, URL-encoded by this method
    ///
    /// # Errors
    ///
    /// Returns an error if the authorization header cannot be generated or the
    /// request fails at the transport level. HTTP error statuses are returned
    /// as a normal response for the caller to interpret.
    pub async fn get_with_query_params(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<reqwest::Response, VeracodeError> {
        let url = self.build_url_with_params(endpoint, query_params);

        let request = match self.config.auth_method {
            AuthMethod::Hmac => {
                let auth_header = self.generate_auth_header("GET", &url)?;
                self.client.get(&url).header("Authorization", auth_header)
            }
            AuthMethod::Basic => self.client.get(&url).basic_auth(
                self.config.credentials.expose_api_id(),
                Some(self.config.credentials.expose_api_key()),
            ),
        };

        debug!("GET {endpoint} ({:?} auth)", self.config.auth_method);
        let response = request.send().await?;
        debug!("GET {endpoint} -> HTTP {}", response.status().as_u16());
        Ok(response)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef";

    fn test_client() -> VeracodeClient {
        VeracodeClient::new(VeracodeConfig::new("test_id", TEST_KEY)).expect("client")
    }

    #[test]
    fn test_build_url_encodes_params() {
        let client = test_client();
        let url = client.build_url_with_params(
            "/api/5.0/detailedreport.do",
            &[("build_id", "123"), ("note", "a b&c")],
        );

        assert_eq!(
            url,
            "https://analysiscenter.veracode.com/api/5.0/detailedreport.do?build_id=123&note=a%20b%26c"
        );
    }

    #[test]
    fn test_build_url_without_params() {
        let client = test_client();
        let url = client.build_url_with_params("/api/5.0/detailedreport.do", &[]);
        assert_eq!(
            url,
            "https://analysiscenter.veracode.com/api/5.0/detailedreport.do"
        );
    }

    #[test]
    fn test_hmac_signature_is_deterministic() {
        let client = test_client();
        let url = "https://analysiscenter.veracode.com/api/5.0/detailedreport.do?build_id=1";
        let nonce = "00112233445566778899aabbccddeeff";

        let first = client
            .generate_hmac_signature("GET", url, 1_700_000_000_000, nonce)
            .expect("signature");
        let second = client
            .generate_hmac_signature("GET", url, 1_700_000_000_000, nonce)
            .expect("signature");

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hmac_signature_depends_on_method_and_url() {
        let client = test_client();
        let nonce = "00112233445566778899aabbccddeeff";
        let base = "https://analysiscenter.veracode.com/api/5.0/detailedreport.do";

        let get = client
            .generate_hmac_signature("GET", &format!("{base}?build_id=1"), 1, nonce)
            .expect("signature");
        let post = client
            .generate_hmac_signature("POST", &format!("{base}?build_id=1"), 1, nonce)
            .expect("signature");
        let other_build = client
            .generate_hmac_signature("GET", &format!("{base}?build_id=2"), 1, nonce)
            .expect("signature");

        assert_ne!(get, post);
        assert_ne!(get, other_build);
    }

    #[test]
    fn test_auth_header_format() {
        let client = test_client();
        let header = client
            .generate_auth_header(
                "GET",
                "https://analysiscenter.veracode.com/api/5.0/detailedreport.do?build_id=1",
            )
            .expect("header");

        assert!(header.starts_with("VERACODE-HMAC-SHA-256 id=test_id,ts="));
        assert!(header.contains(",nonce="));
        assert!(header.contains(",sig="));
    }

    #[test]
    fn test_non_hex_api_key_is_rejected() {
        let client =
            VeracodeClient::new(VeracodeConfig::new("test_id", "not-hex!")).expect("client");
        let result = client.generate_auth_header(
            "GET",
            "https://analysiscenter.veracode.com/api/5.0/detailedreport.do",
        );

        assert!(matches!(result, Err(VeracodeError::Authentication(msg)) if msg == INVALID_API_KEY_MSG));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let client = test_client();
        let result = client.generate_auth_header("GET", "not a url");
        assert!(matches!(result, Err(VeracodeError::Authentication(msg)) if msg == INVALID_URL_MSG));
    }

    #[test]
    fn test_invalid_proxy_url_is_config_error() {
        let config = VeracodeConfig::new("id", TEST_KEY).with_proxy("://missing-scheme");
        let result = VeracodeClient::new(config);
        assert!(matches!(result, Err(VeracodeError::InvalidConfig(_))));
    }
}
