//! Shared utility functions for provider adapters.

use sb_domain::config::ProviderAuthConfig;
use sb_domain::error::{Error, Result};
use std::time::Duration;

/// Connect timeout for provider HTTP clients. No total request timeout is
/// set: streamed answers may legitimately run for minutes.
pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn http_client(provider: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| from_reqwest(provider, e))
}

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Upstream`].
pub(crate) fn from_reqwest(provider: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("{provider}: {e}"))
    } else {
        Error::Upstream {
            provider: provider.to_string(),
            message: e.to_string(),
        }
    }
}

/// Error for a non-2xx provider reply.
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode, body: &str) -> Error {
    Error::Upstream {
        provider: provider.to_string(),
        message: format!("HTTP {} - {}", status.as_u16(), body),
    }
}

/// Resolve the API key from a [`ProviderAuthConfig`].
///
/// Precedence:
/// 1. `key` field (plaintext, warned)
/// 2. `env` field (reads environment variable; missing is an error)
///
/// Returns `Ok(None)` when neither is configured, for local endpoints that
/// take no credentials.
pub fn resolve_api_key(auth: &ProviderAuthConfig) -> Result<Option<String>> {
    if let Some(ref key) = auth.key {
        tracing::warn!(
            "API key loaded from plaintext config field 'key'; prefer 'env' instead"
        );
        return Ok(Some(key.clone()));
    }

    if let Some(ref env_var) = auth.env {
        return std::env::var(env_var).map(Some).map_err(|_| {
            Error::Config(format!(
                "environment variable '{}' not set or not valid UTF-8",
                env_var
            ))
        });
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_key_wins() {
        let auth = ProviderAuthConfig {
            key: Some("sk-test-123".into()),
            env: Some("SB_TEST_SHOULD_NOT_BE_READ".into()),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(&auth).unwrap().as_deref(), Some("sk-test-123"));
    }

    #[test]
    fn env_var_is_read() {
        let var_name = "SB_TEST_RESOLVE_ENV_KEY_4821";
        std::env::set_var(var_name, "env-secret-value");
        let auth = ProviderAuthConfig {
            env: Some(var_name.into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_api_key(&auth).unwrap().as_deref(),
            Some("env-secret-value")
        );
        std::env::remove_var(var_name);
    }

    #[test]
    fn missing_env_var_is_a_config_error() {
        let auth = ProviderAuthConfig {
            env: Some("SB_TEST_NONEXISTENT_VAR_8888".into()),
            ..Default::default()
        };
        let err = resolve_api_key(&auth).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("SB_TEST_NONEXISTENT_VAR_8888"));
    }

    #[test]
    fn no_auth_means_no_key() {
        assert!(resolve_api_key(&ProviderAuthConfig::default())
            .unwrap()
            .is_none());
    }
}
