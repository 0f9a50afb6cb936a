use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "SHELF_ENV";
const CONFIG_DIR_ENV: &str = "SHELF_CONFIG_DIR";
const ENV_PREFIX: &str = "SHELF";

/// Conventional variables honoured on top of the `SHELF_*` overlay.
const ALIASES: &[(&str, &str)] = &[
    ("REVIEW_SERVICE_URL", "reviews.base_url"),
    ("DATABASE_URL", "database.url"),
    ("PORT", "server.port"),
];

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub reviews: ReviewServiceSettings,
    #[serde(default)]
    pub books: BooksSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay and
    /// process environment variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment: Environment = std::env::var(ENV_VAR_NAME)
            .unwrap_or_else(|_| DEFAULT_ENV.to_string())
            .parse()?;
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        let mut settings = Self::from_sources(&config_dir, &environment)?;
        settings.environment = environment;
        Ok(settings)
    }

    fn from_sources(config_dir: &std::path::Path, environment: &Environment) -> anyhow::Result<Self> {
        let base_path = config_dir.join("base.toml");
        let environment_filename = match environment {
            Environment::Local => "local.toml",
            Environment::Staging => "staging.toml",
            Environment::Production => "production.toml",
        };
        let environment_path = config_dir.join(environment_filename);

        let mut builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );

        for (variable, key) in ALIASES {
            builder = builder
                .set_override_option(*key, std::env::var(variable).ok())
                .with_context(|| format!("failed to apply {variable}"))?;
        }

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        cfg.try_deserialize()
            .with_context(|| "failed to deserialize configuration")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        5000
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }

    /// `host:port` pair for binding the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite connection url, e.g. `sqlite://books.db` or `sqlite::memory:`.
    #[serde(default = "DatabaseSettings::default_url")]
    pub url: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    fn default_url() -> String {
        "sqlite://books.db".to_string()
    }

    fn default_max_connections() -> u32 {
        5
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            max_connections: Self::default_max_connections(),
        }
    }
}

/// Location of the external review service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewServiceSettings {
    #[serde(default = "ReviewServiceSettings::default_base_url")]
    pub base_url: String,
    /// Path appended to `base_url`; `{book_id}` is substituted.
    #[serde(default = "ReviewServiceSettings::default_path_template")]
    pub path_template: String,
    #[serde(default = "ReviewServiceSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ReviewServiceSettings {
    fn default_base_url() -> String {
        "http://localhost:8080".to_string()
    }

    fn default_path_template() -> String {
        "/api/reviews/book/{book_id}".to_string()
    }

    fn default_timeout_ms() -> u64 {
        10000
    }

    /// Full url of the reviews of one book.
    pub fn url_for(&self, book_id: i64) -> String {
        let path = self
            .path_template
            .replace("{book_id}", &book_id.to_string());
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl Default for ReviewServiceSettings {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            path_template: Self::default_path_template(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

/// Catalog policy.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BooksSettings {
    /// Reject books without an isbn.
    #[serde(default)]
    pub require_isbn: bool,
    /// Insert the example books when the catalog is empty at startup.
    #[serde(default)]
    pub seed_examples: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
