//! Configuration validation logic.

use url::Url;

use crate::config::loader::Config;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_api_url(&config.fetch.api_url)?;
    validate_credentials(config)?;
    validate_timings(config)?;

    Ok(())
}

/// Validate the remote-source API endpoint.
pub fn validate_api_url(api_url: &str) -> Result<()> {
    if api_url.is_empty() {
        return Err(Error::MissingConfig("fetch.api_url".to_string()));
    }

    let parsed = Url::parse(api_url).map_err(|e| Error::ConfigValidation {
        field: "fetch.api_url".to_string(),
        message: format!("Not a valid URL: {}", e),
    })?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::ConfigValidation {
            field: "fetch.api_url".to_string(),
            message: format!("Unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(())
}

/// Credentials are optional but must come as a pair.
pub fn validate_credentials(config: &Config) -> Result<()> {
    match (&config.fetch.member_id, &config.fetch.pass_hash) {
        (Some(_), None) => Err(Error::ConfigValidation {
            field: "fetch.pass_hash".to_string(),
            message: "member_id is set but pass_hash is missing".to_string(),
        }),
        (None, Some(_)) => Err(Error::ConfigValidation {
            field: "fetch.member_id".to_string(),
            message: "pass_hash is set but member_id is missing".to_string(),
        }),
        _ => Ok(()),
    }
}

/// Zero timeouts make every remote call fail; zero debounce defeats the
/// create-burst collapse.
pub fn validate_timings(config: &Config) -> Result<()> {
    if config.fetch.request_timeout_seconds == 0 {
        return Err(Error::ConfigValidation {
            field: "fetch.request_timeout_seconds".to_string(),
            message: "Must be at least 1".to_string(),
        });
    }

    if config.watch.debounce_seconds == 0 {
        return Err(Error::ConfigValidation {
            field: "watch.debounce_seconds".to_string(),
            message: "Must be at least 1".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_bad_api_url() {
        assert!(validate_api_url("").is_err());
        assert!(validate_api_url("not a url").is_err());
        assert!(validate_api_url("ftp://host/api").is_err());
        assert!(validate_api_url("https://api.e-hentai.org/api.php").is_ok());
    }

    #[test]
    fn test_half_configured_credentials() {
        let mut config = Config::default();
        config.fetch.member_id = Some("123".to_string());
        assert!(validate_config(&config).is_err());

        config.fetch.pass_hash = Some("abc".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_timings_rejected() {
        let mut config = Config::default();
        config.fetch.request_timeout_seconds = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.watch.debounce_seconds = 0;
        assert!(validate_config(&config).is_err());
    }
}
