//! Configuration management for Greenroom.
//!
//! Handles loading settings from `config.yaml`, with environment overrides.

use serde::Deserialize;

/// Application configuration settings.
#[derive(Clone, Deserialize)]
pub struct Settings {
    /// Port number the server will listen on.
    pub port: u16,
    /// Default token validity in seconds, used when a join request does not
    /// carry a positive `expirationSeconds` of its own.
    pub token_expires_in: u64,
    /// Signing credentials issued by the video platform.
    #[serde(default)]
    pub credentials: Credentials,
    /// Telemetry settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// The application key / signing secret pair issued by the video platform.
///
/// Both fields default to empty so that a missing credential is a runtime
/// configuration error (requests rejected with 500) rather than a startup
/// parse failure. Neither field is ever logged or returned to a caller.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    /// The application key, embedded in issued tokens as `iss`/`app_key`.
    #[serde(default)]
    pub app_key: String,
    /// The shared secret used to sign tokens. Never leaves the process.
    #[serde(default)]
    pub app_secret: String,
}

impl Credentials {
    /// True when both the key and the secret are present.
    /// No token may be issued otherwise.
    pub fn is_configured(&self) -> bool {
        !self.app_key.is_empty() && !self.app_secret.is_empty()
    }
}

#[derive(Clone, Copy, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LoggingFormat {
    Json,
    Pretty,
}

#[derive(Clone, Copy, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Telemetry and logging settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name reported to the OTLP collector.
    pub service_name: String,
    /// Log level for this crate.
    pub level: LogLevel,
    /// Log level for axum internals.
    pub axum_level: LogLevel,
    /// Log output format.
    pub format: LoggingFormat,
    /// Whether to export spans over OTLP.
    pub otlp_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig {
            service_name: "greenroom".to_string(),
            level: LogLevel::Info,
            axum_level: LogLevel::Info,
            format: LoggingFormat::Pretty,
            otlp_enabled: false,
        }
    }
}

/// Loads configuration from the `config.yaml` file.
///
/// # Panics
/// Panics if the configuration file cannot be found or if it doesn't match the `Settings` structure.
#[tracing::instrument]
pub fn load_config() -> Settings {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name("config"))
        .add_source(
            config::Environment::with_prefix("GREENROOM")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .map_err(|e| {
            tracing::error!("Failed to build configuration: {}", e);
            e
        })
        .unwrap();

    cfg.try_deserialize::<Settings>()
        .map_err(|e| {
            tracing::error!("Failed to deserialize configuration: {}", e);
            e
        })
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_load_config_env_override() {
        // Set environment variables that should override the yaml config
        unsafe {
            env::set_var("GREENROOM_PORT", "9999");
            env::set_var("GREENROOM_CREDENTIALS__APP_KEY", "env-key");
            env::set_var("GREENROOM_CREDENTIALS__APP_SECRET", "env-secret");
        }

        let settings = load_config();

        assert_eq!(settings.port, 9999);
        assert_eq!(settings.credentials.app_key, "env-key");
        assert!(settings.credentials.is_configured());

        // Clean up
        unsafe {
            env::remove_var("GREENROOM_PORT");
            env::remove_var("GREENROOM_CREDENTIALS__APP_KEY");
            env::remove_var("GREENROOM_CREDENTIALS__APP_SECRET");
        }
    }

    #[test]
    fn test_credentials_require_both_fields() {
        let credentials = Credentials {
            app_key: "key".to_string(),
            app_secret: String::new(),
        };
        assert!(!credentials.is_configured());
        assert!(!Credentials::default().is_configured());

        let credentials = Credentials {
            app_key: "key".to_string(),
            app_secret: "secret".to_string(),
        };
        assert!(credentials.is_configured());
    }
}
