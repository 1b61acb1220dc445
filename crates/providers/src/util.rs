//! Shared utility functions for provider adapters.

use relay_domain::config::SummarizerConfig;
use relay_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the summarizer API key.
///
/// Precedence:
/// 1. `api_key` field (plaintext, warns)
/// 2. the environment variable named by `api_key_env`
/// 3. Error
pub fn resolve_api_key(cfg: &SummarizerConfig) -> Result<String> {
    if let Some(ref key) = cfg.api_key {
        if !key.is_empty() {
            tracing::warn!(
                "API key loaded from plaintext config field 'api_key'; \
                 prefer 'api_key_env' instead"
            );
            return Ok(key.clone());
        }
    }

    if cfg.api_key_env.is_empty() {
        return Err(Error::Auth(
            "no API key configured: set 'api_key_env' or 'api_key'".into(),
        ));
    }

    match std::env::var(&cfg.api_key_env) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(Error::Auth(format!(
            "environment variable '{}' not set or empty",
            cfg.api_key_env
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_key_wins() {
        let cfg = SummarizerConfig {
            api_key: Some("sk-test-123".into()),
            api_key_env: "RELAY_TEST_SHOULD_NOT_BE_READ".into(),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(&cfg).unwrap(), "sk-test-123");
    }

    #[test]
    fn env_var_is_read() {
        let var_name = "RELAY_TEST_RESOLVE_ENV_KEY_1234";
        std::env::set_var(var_name, "env-secret-value");
        let cfg = SummarizerConfig {
            api_key_env: var_name.into(),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(&cfg).unwrap(), "env-secret-value");
        std::env::remove_var(var_name);
    }

    #[test]
    fn missing_env_var_names_the_variable() {
        let cfg = SummarizerConfig {
            api_key_env: "RELAY_TEST_NONEXISTENT_VAR_8888".into(),
            ..Default::default()
        };
        let err = resolve_api_key(&cfg).unwrap_err();
        assert!(err.to_string().contains("RELAY_TEST_NONEXISTENT_VAR_8888"));
    }

    #[test]
    fn nothing_configured() {
        let cfg = SummarizerConfig {
            api_key_env: String::new(),
            ..Default::default()
        };
        let err = resolve_api_key(&cfg).unwrap_err();
        assert!(err.to_string().contains("no API key configured"));
    }
}
