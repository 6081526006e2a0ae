//! Credential and proxy loading from the environment
use log::{debug, info};
use veracode_detailedreport::{AuthMethod, VeracodeConfig, VeracodeCredentials};

pub const API_ID_VAR: &str = "VERACODE_API_ID";
pub const API_KEY_VAR: &str = "VERACODE_API_KEY";
pub const PROXY_URL_VAR: &str = "VERACODE_PROXY_URL";
pub const PROXY_USERNAME_VAR: &str = "VERACODE_PROXY_USERNAME";
pub const PROXY_PASSWORD_VAR: &str = "VERACODE_PROXY_PASSWORD";

/// Custom error types for credential operations
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Missing required credentials: {missing}")]
    MissingCredentials { missing: String },

    #[error("Environment variable validation failed: {field}: {message}")]
    ValidationError { field: String, message: String },
}

/// Proxy settings read alongside the API credentials
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxySettings")
            .field("url", &self.url)
            .field("username", &self.username.as_ref().map(|_| "[REDACTED]"))
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Validate an HMAC API credential: non-empty and alphanumeric
pub fn validate_api_credential(value: &str, field_name: &str) -> Result<(), CredentialError> {
    if value.is_empty() {
        return Err(CredentialError::ValidationError {
            field: field_name.to_string(),
            message: "cannot be empty".to_string(),
        });
    }

    if !value.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(CredentialError::ValidationError {
            field: field_name.to_string(),
            message: "must contain only alphanumeric characters".to_string(),
        });
    }

    Ok(())
}

/// Load API credentials using `lookup` to read variables.
///
/// HMAC credentials must be alphanumeric. Basic credentials are a username
/// and password and are only required to be present.
pub fn load_credentials<F>(lookup: F, auth: AuthMethod) -> Result<VeracodeCredentials, CredentialError>
where
    F: Fn(&str) -> Option<String>,
{
    let api_id = lookup(API_ID_VAR).filter(|v| !v.is_empty());
    let api_key = lookup(API_KEY_VAR).filter(|v| !v.is_empty());

    let (api_id, api_key) = match (api_id, api_key) {
        (Some(id), Some(key)) => (id, key),
        (id, key) => {
            let missing: Vec<&str> = [(API_ID_VAR, id.is_none()), (API_KEY_VAR, key.is_none())]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
            return Err(CredentialError::MissingCredentials {
                missing: missing.join(", "),
            });
        }
    };

    if auth == AuthMethod::Hmac {
        validate_api_credential(&api_id, API_ID_VAR)?;
        validate_api_credential(&api_key, API_KEY_VAR)?;
    }

    debug!("Loaded Veracode credentials from environment ({auth:?} authentication)");
    Ok(VeracodeCredentials::new(api_id, api_key))
}

/// Load proxy settings using `lookup` to read variables
pub fn load_proxy<F>(lookup: F) -> ProxySettings
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    let settings = ProxySettings {
        url: non_empty(PROXY_URL_VAR),
        username: non_empty(PROXY_USERNAME_VAR),
        password: non_empty(PROXY_PASSWORD_VAR),
    };
    if let Some(url) = &settings.url {
        info!("Using proxy {url}");
    }
    settings
}

/// Apply proxy settings to a client configuration
#[must_use]
pub fn apply_proxy(mut config: VeracodeConfig, proxy: ProxySettings) -> VeracodeConfig {
    if let Some(url) = proxy.url {
        config = config.with_proxy(url);
        if let (Some(username), Some(password)) = (proxy.username, proxy.password) {
            config = config.with_proxy_auth(username, password);
        }
    }
    config
}

/// Read a variable from the process environment
#[must_use]
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_load_hmac_credentials() {
        let lookup = vars(&[(API_ID_VAR, "abc123"), (API_KEY_VAR, "deadbeef")]);
        let creds = load_credentials(lookup, AuthMethod::Hmac).unwrap();
        assert_eq!(creds.expose_api_id(), "abc123");
        assert_eq!(creds.expose_api_key(), "deadbeef");
    }

    #[test]
    fn test_missing_credentials_lists_variables() {
        let err = load_credentials(vars(&[]), AuthMethod::Hmac).unwrap_err();
        assert_eq!(
            err,
            CredentialError::MissingCredentials {
                missing: "VERACODE_API_ID, VERACODE_API_KEY".to_string()
            }
        );

        let err = load_credentials(vars(&[(API_ID_VAR, "abc"), (API_KEY_VAR, "")]), AuthMethod::Hmac)
            .unwrap_err();
        assert_eq!(
            err,
            CredentialError::MissingCredentials {
                missing: "VERACODE_API_KEY".to_string()
            }
        );
    }

    #[test]
    fn test_hmac_rejects_non_alphanumeric() {
        let lookup = vars(&[(API_ID_VAR, "abc-123"), (API_KEY_VAR, "deadbeef")]);
        let err = load_credentials(lookup, AuthMethod::Hmac).unwrap_err();
        assert!(matches!(err, CredentialError::ValidationError { field, .. } if field == API_ID_VAR));
    }

    #[test]
    fn test_basic_accepts_passwords() {
        let lookup = vars(&[(API_ID_VAR, "user@example.com"), (API_KEY_VAR, "p@ss w0rd!")]);
        let creds = load_credentials(lookup, AuthMethod::Basic).unwrap();
        assert_eq!(creds.expose_api_id(), "user@example.com");
    }

    #[test]
    fn test_proxy_settings() {
        let proxy = load_proxy(vars(&[
            (PROXY_URL_VAR, "http://proxy:8080"),
            (PROXY_USERNAME_VAR, "puser"),
            (PROXY_PASSWORD_VAR, "ppass"),
        ]));
        assert_eq!(proxy.url.as_deref(), Some("http://proxy:8080"));

        let debug = format!("{proxy:?}");
        assert!(!debug.contains("ppass"));
        assert!(!debug.contains("puser"));

        let config = apply_proxy(VeracodeConfig::new("a", "b"), proxy);
        assert_eq!(config.proxy_url.as_deref(), Some("http://proxy:8080"));
        assert!(config.proxy_username.is_some());
    }

    #[test]
    fn test_blank_proxy_ignored() {
        let proxy = load_proxy(vars(&[(PROXY_URL_VAR, "  ")]));
        assert_eq!(proxy, ProxySettings::default());

        let config = apply_proxy(VeracodeConfig::new("a", "b"), proxy);
        assert!(config.proxy_url.is_none());
    }
}
