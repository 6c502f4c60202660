//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables with sensible
//! defaults, so both binaries can run with nothing but a DATABASE_URL.

use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL for the local store
    pub database_url: String,

    /// Port for the webhook receiver to listen on
    pub port: u16,

    /// Public base URL of this deployment (scheme + host), used to
    /// build the vendor-facing webhook callback URL
    pub base_url: String,

    /// Deployment site token embedded in outbound message ids;
    /// inbound events are matched back via `@<site>`
    pub site: String,

    /// Optional operator-wide `user:pass` override accepted by the
    /// webhook authenticator in addition to per-account credentials
    pub credentials_override: Option<String>,

    /// Base URL of the vendor REST API
    pub vendor_api_base: String,

    /// HTTP request timeout in milliseconds for outbound vendor calls
    pub request_timeout_ms: u64,

    /// Interval between suppression sync passes in seconds;
    /// 0 means run a single pass and exit (external scheduler)
    pub sync_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://gridsync.db".to_string()),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            base_url: env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),

            site: env::var("SITE").unwrap_or_else(|_| "localhost".to_string()),

            credentials_override: env::var("WEBHOOK_CREDENTIALS_OVERRIDE").ok(),

            vendor_api_base: env::var("VENDOR_API_BASE")
                .unwrap_or_else(|_| "https://api.sendgrid.com/v3/".to_string()),

            request_timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),

            sync_interval_secs: env::var("SUPPRESSION_SYNC_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        env::remove_var("PORT");
        env::remove_var("SITE");

        let config = Config::from_env();

        assert_eq!(config.port, 8080);
        assert_eq!(config.site, "localhost");
        assert_eq!(config.vendor_api_base, "https://api.sendgrid.com/v3/");
        assert_eq!(config.sync_interval_secs, 0);
    }

    #[test]
    fn test_override_credential_from_env() {
        env::set_var("WEBHOOK_CREDENTIALS_OVERRIDE", "ops:secret");
        let config = Config::from_env();
        assert_eq!(config.credentials_override.as_deref(), Some("ops:secret"));
        env::remove_var("WEBHOOK_CREDENTIALS_OVERRIDE");
    }
}
