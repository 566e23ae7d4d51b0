//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Poll listing configuration.
    #[serde(default)]
    pub polls: PollsConfig,
    /// Session and login configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Template configuration.
    #[serde(default)]
    pub templates: TemplateConfig,
    /// Superuser ensured at startup.
    #[serde(default)]
    pub admin: Option<AdminConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Seconds before a stalled request is abandoned.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Poll listing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PollsConfig {
    /// Questions per index page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

/// Session and login configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Name of the cookie carrying the session token.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    /// Where anonymous users are sent for gated pages.
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

/// Template configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateConfig {
    /// Directory to load `*.html` templates from instead of the built-in set.
    #[serde(default)]
    pub dir: Option<String>,
}

/// Superuser credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Admin username.
    pub username: String,
    /// Admin password.
    pub password: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_min_connections() -> u32 {
    1
}

const fn default_page_size() -> u64 {
    5
}

fn default_session_cookie() -> String {
    "sessionid".to_string()
}

fn default_login_url() -> String {
    "/accounts/login/".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for PollsConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie: default_session_cookie(),
            login_url: default_login_url(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `POLLS_ENV`)
    /// 3. Environment variables with `POLLS_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("POLLS_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("POLLS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize::<Self>()?.validated()
    }

    /// Load configuration from a specific file.
    ///
    /// `POLLS_` environment variables still override the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("POLLS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize::<Self>()?.validated()
    }

    fn validated(self) -> Result<Self, config::ConfigError> {
        if !(1..=100).contains(&self.polls.page_size) {
            return Err(config::ConfigError::Message(format!(
                "polls.page_size must be between 1 and 100, got {}",
                self.polls.page_size
            )));
        }
        if !self.auth.login_url.starts_with('/') {
            return Err(config::ConfigError::Message(
                "auth.login_url must be an absolute path".to_string(),
            ));
        }
        Ok(self)
    }
}
