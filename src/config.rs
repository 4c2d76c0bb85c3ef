use std::{env, time::Duration};

use config::ConfigError;
use secrecy::SecretString;
use serde_aux::field_attributes::{
    deserialize_number_from_string, deserialize_option_number_from_string,
};

#[derive(serde::Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    pub backend: BackendConfig,
    pub subscription: SubscriptionConfig,
}

#[derive(serde::Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

impl WebConfig {
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Hosted table the newsletter form writes to.
///
/// `url` and `access_token` are usually injected through
/// `APP_BACKEND__URL` / `APP_BACKEND__ACCESS_TOKEN`. Either one missing
/// leaves the store unconfigured instead of failing startup.
#[derive(serde::Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub access_token: Option<SecretString>,
    pub table: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
    /// Send a `created_at` timestamp with each row.
    #[serde(default)]
    pub write_created_at: bool,
    /// Send `subscribed: true` with each row.
    #[serde(default)]
    pub write_subscribed: bool,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct SubscriptionConfig {
    /// How long a confirmation stays on screen before the form accepts
    /// another address. `None` keeps it until the page is reloaded.
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub revert_after_seconds: Option<u64>,
}

impl SubscriptionConfig {
    pub fn revert_after(&self) -> Option<Duration> {
        self.revert_after_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "`{other}` is not a supported environment. Use either `local` or `production`."
            )),
        }
    }
}

/// Layers `configuration/base.yaml`, `configuration/{APP_ENVIRONMENT}.yaml`
/// and `APP_`-prefixed environment variables, later sources winning.
pub fn get_config() -> Result<Config, ConfigError> {
    let config_dir = env::current_dir()
        .map_err(|e| ConfigError::Foreign(Box::new(e)))?
        .join("configuration");
    let environment: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;

    config::Config::builder()
        .add_source(config::File::from(config_dir.join("base.yaml")))
        .add_source(
            config::File::from(config_dir.join(format!("{}.yaml", environment.as_str())))
                .required(false),
        )
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize::<Config>()
}
