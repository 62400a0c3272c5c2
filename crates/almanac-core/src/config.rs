use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::types::ListingConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub site: SiteConfig,
    pub events: EventsConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub serve_origin: Option<String>,
}

impl ServerConfig {
    /// ## Summary
    /// Returns the server address as a string in the format "host:port".
    #[must_use]
    pub fn serve_origin(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// ## Summary
    /// Returns the server origin URL.
    #[must_use]
    pub fn origin(&self) -> String {
        if let Some(origin) = &self.serve_origin {
            origin.clone()
        } else {
            self.serve_origin()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// The site this installation serves. Records are scoped to `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub id: i32,
    /// Owner assigned to records created by requests that carry no user.
    pub default_owner: Option<uuid::Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// IANA timezone name for local calendar days.
    pub timezone: String,
    pub featured_per_page: usize,
    pub per_page: usize,
    pub max_paging_links: usize,
    pub upcoming_limit: usize,
    /// Upper bound on instances produced for one occurrence with an open-ended repeat.
    pub max_instances: usize,
}

impl EventsConfig {
    /// ## Summary
    /// Returns the page sizing used by the event list presentation.
    #[must_use]
    pub fn listing(&self) -> ListingConfig {
        ListingConfig {
            featured_per_page: self.featured_per_page,
            per_page: self.per_page,
            max_paging_links: self.max_paging_links,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    pub timeout_secs: u64,
    /// Path below a remote origin where that site serves uploaded media.
    pub media_prefix: String,
    /// Directory, relative to `media_root`, that receives imported images.
    pub upload_dir: String,
    pub media_root: String,
}

/// Prefix of environment variables read into [`Settings`].
pub const ENV_PREFIX: &str = "ALMANAC";

/// ## Summary
/// Environment source for [`Settings`]: `ALMANAC_<SECTION>__<KEY>`.
///
/// Sections and keys are joined with a double underscore so multi-word keys
/// survive, e.g. `ALMANAC_EVENTS__MAX_INSTANCES` sets `events.max_instances`.
#[must_use]
pub fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}

impl Settings {
    /// ## Summary
    /// Loads configuration from the process environment and `config.toml`.
    /// `config.toml` takes precedence over environment variables.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Self::from_environment(environment())
    }

    /// ## Summary
    /// Builds settings from defaults, `env` and an optional `config.toml`.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn from_environment(env: config::Environment) -> Result<Self> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8698)?
            .set_default("database.max_connections", 4)?
            .set_default("logging.level", "debug")?
            .set_default("site.id", 1)?
            .set_default("events.timezone", "UTC")?
            .set_default("events.featured_per_page", 10)?
            .set_default("events.per_page", 10)?
            .set_default("events.max_paging_links", 10)?
            .set_default("events.upcoming_limit", 5)?
            .set_default("events.max_instances", 1000)?
            .set_default("import.timeout_secs", 30)?
            .set_default("import.media_prefix", "static/media/")?
            .set_default("import.upload_dir", "uploads/events")?
            .set_default("import.media_root", "media")?
            .add_source(env)
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
