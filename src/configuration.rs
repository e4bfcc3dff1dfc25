use std::time::Duration;

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub scraper: ScraperSettings,
    pub cache: CacheSettings,
    pub persistence: PersistenceSettings,
    pub notification: NotificationSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
    pub auto_migrate: bool,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = match self.require_ssl {
            true => PgSslMode::Require,
            false => PgSslMode::Prefer,
        };

        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(&self.password)
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

#[derive(Deserialize, Clone)]
pub struct ScraperSettings {
    pub search_host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub request_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub batch_size: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub pacing_base_millis: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub pacing_jitter_millis: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub backoff_base_millis: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_consecutive_errors: u32,
}

impl ScraperSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Deserialize, Clone)]
pub struct CacheSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub ttl_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub sweep_interval_secs: u64,
}

#[derive(Deserialize, Clone)]
pub struct PersistenceSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_write_retries: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub retry_backoff_base_millis: u64,
}

#[derive(Deserialize, Clone)]
pub struct NotificationSettings {
    pub discord_webhook: Option<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub embeds_per_message: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub message_delay_millis: u64,
}

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

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT.");
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // E.g. `APP_APPLICATION__PORT=5001` would set `Settings.application.port`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
