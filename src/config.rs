//! Configuration management for the monitor client

use std::path::Path;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Deserializer;
use url::Url;

/// Trait for validating configuration values.
trait Validatable {
    /// Validate the configuration values.
    fn validate(&self, cfg: &Settings) -> Result<(), ConfigError>;
}

/// Top-level configuration for the monitor client
#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    /// Monitor API specific configuration
    pub monitor: MonitorApiConfig,
}

/// Monitor API specific configuration
#[derive(Deserialize, Clone, Debug)]
pub struct MonitorApiConfig {
    /// The base URL of the monitor API, consisting of the scheme and the
    /// host. Endpoint paths are joined onto it per request.
    #[serde(deserialize_with = "url_deserializer")]
    pub endpoint: Url,
    /// The API key sent in the `X-Auth-Apikey` header on every request.
    pub api_key: String,
    /// The token identifier attached when recording transfers: 1 for
    /// USDT transfers, unset otherwise.
    #[serde(default)]
    pub token_id: Option<u16>,
}

impl Validatable for MonitorApiConfig {
    fn validate(&self, _: &Settings) -> Result<(), ConfigError> {
        if !["http", "https"].contains(&self.endpoint.scheme()) {
            return Err(ConfigError::Message(
                "[monitor.endpoint] Invalid URL scheme: must be HTTP or HTTPS".to_string(),
            ));
        }

        if self.api_key.is_empty() {
            return Err(ConfigError::Message(
                "[monitor.api_key] An API key is required".to_string(),
            ));
        }

        Ok(())
    }
}

impl Settings {
    /// Initializing the global config first with the given config file
    /// and then with provided/overwritten environment variables. The
    /// explicit separator with double underscores is needed to correctly
    /// parse the nested config structure.
    ///
    /// The environment variables are prefixed with `MONITOR_CLIENT_` and
    /// the nested fields are separated with double underscores. For
    /// example, the path `monitor.api_key` is parsed as following:
    ///
    /// ```text
    /// MONITOR_CLIENT_MONITOR__API_KEY
    /// ^^^^^^^^^^^^^^ ^^^^^^^  ^^^^^^^
    ///       │      ^    │   ^^   │
    ///       │      │    │   │    └ The `api_key` field of the `monitor` object
    ///       │      │    │   └ separator("__")
    ///       │      │    └ The `monitor` field of the root object (`Settings`)
    ///       │      └ prefix_separator("_")
    ///       └ with_prefix("MONITOR_CLIENT")
    /// ```
    pub fn new(config_path: Option<impl AsRef<Path>>) -> Result<Self, ConfigError> {
        let env = Environment::with_prefix("MONITOR_CLIENT")
            .separator("__")
            .prefix_separator("_");

        let mut cfg_builder = Config::builder();

        if let Some(path) = config_path {
            cfg_builder = cfg_builder.add_source(File::from(path.as_ref()));
        }
        cfg_builder = cfg_builder.add_source(env);

        let cfg = cfg_builder.build()?;

        let settings: Settings = cfg.try_deserialize()?;

        settings.validate()?;

        Ok(settings)
    }

    /// Perform validation on the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.monitor.validate(self)?;

        Ok(())
    }
}

/// A deserializer for the url::Url type. Does not support deserializing
/// a list, only a single URL.
fn url_deserializer<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer)?
        .parse()
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The path for the configuration file that we should use during
    /// testing.
    const DEFAULT_CONFIG_PATH: Option<&str> = Some("./src/config/default");

    /// Clears all monitor client specific environment variables. This is
    /// needed because `cargo test` runs tests in threads, and environment
    /// variables are per-process.
    fn clear_env() {
        for (var, _) in std::env::vars() {
            if var.starts_with("MONITOR_CLIENT_") {
                std::env::remove_var(var);
            }
        }
    }

    fn test_settings() -> Settings {
        Settings {
            monitor: MonitorApiConfig {
                endpoint: Url::parse("https://apiexpert.crystalblockchain.com").unwrap(),
                api_key: "test-api-key".to_string(),
                token_id: None,
            },
        }
    }

    /// This test loads the checked-in default configuration, and then
    /// checks that environment variables override it, both with and
    /// without the config file present. It is one test on purpose, since
    /// tests run concurrently while environment variables are shared
    /// across the whole process.
    #[test]
    fn default_config_toml_loads_with_environment() {
        clear_env();

        let settings = Settings::new(DEFAULT_CONFIG_PATH).unwrap();
        assert_eq!(settings.monitor.endpoint.scheme(), "https");
        assert_eq!(
            settings.monitor.endpoint.host(),
            Some(url::Host::Domain("apiexpert.crystalblockchain.com"))
        );
        assert_eq!(settings.monitor.api_key, "your-api-key");
        assert_eq!(settings.monitor.token_id, None);

        std::env::set_var("MONITOR_CLIENT_MONITOR__ENDPOINT", "http://localhost:8080");
        std::env::set_var("MONITOR_CLIENT_MONITOR__API_KEY", "secret-from-env");
        std::env::set_var("MONITOR_CLIENT_MONITOR__TOKEN_ID", "1");

        let settings = Settings::new(DEFAULT_CONFIG_PATH).unwrap();
        assert_eq!(settings.monitor.endpoint.host(), Some(url::Host::Domain("localhost")));
        assert_eq!(settings.monitor.endpoint.port(), Some(8080));
        assert_eq!(settings.monitor.api_key, "secret-from-env");
        assert_eq!(settings.monitor.token_id, Some(1));

        // The environment alone is enough, no config file is required.
        let settings = Settings::new(None::<&str>).unwrap();
        assert_eq!(settings.monitor.api_key, "secret-from-env");

        clear_env();
    }

    #[test]
    fn endpoints_must_be_http_or_https() {
        let mut settings = test_settings();
        settings.monitor.endpoint = Url::parse("ftp://apiexpert.crystalblockchain.com").unwrap();

        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Message(msg))
                if msg == "[monitor.endpoint] Invalid URL scheme: must be HTTP or HTTPS"
        ));
    }

    #[test]
    fn api_keys_must_not_be_empty() {
        let mut settings = test_settings();
        settings.monitor.api_key = String::new();

        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Message(msg)) if msg == "[monitor.api_key] An API key is required"
        ));
    }
}
