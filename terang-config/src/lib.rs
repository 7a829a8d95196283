// Configuration for the Terang services
//
// Values come from an optional TOML/JSON file and are then overridden by
// `TERANG_*` environment variables (a `.env` file is honoured too).

pub mod env;
pub mod error;
pub mod loader;

pub use env::{EnvLoader, load_dotenv, load_dotenv_from};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default name of the cookie carrying the backend access token.
pub const DEFAULT_SESSION_COOKIE: &str = "terang-access-token";

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://abc.supabase.co`
    pub url: Option<String>,
    /// Public (anon) API key
    pub anon_key: Option<String>,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            anon_key: Some(anon_key.into()),
        }
    }

    /// True when both the URL and the anon key are present.
    pub fn has_backend(&self) -> bool {
        matches!(
            (&self.url, &self.anon_key),
            (Some(url), Some(key)) if !url.trim().is_empty() && !key.trim().is_empty()
        )
    }

    /// The URL and key, or [`ConfigError::BackendMissing`].
    pub fn require(&self) -> Result<(&str, &str)> {
        match (&self.url, &self.anon_key) {
            (Some(url), Some(key)) if self.has_backend() => Ok((url.as_str(), key.as_str())),
            _ => Err(ConfigError::BackendMissing),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub session_cookie: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerangConfig {
    pub backend: BackendConfig,
    pub server: ServerConfig,
}

impl TerangConfig {
    /// Load `.env`, then the file named by `TERANG_CONFIG_FILE` (or
    /// `terang.toml` when present), then apply environment overrides.
    pub fn load() -> Result<Self> {
        load_dotenv();
        let env = EnvLoader::terang();

        let file = env
            .load_opt("CONFIG_FILE")
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("terang.toml")).filter(|p| p.exists()));

        let config = match file {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.with_env(&env)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = ConfigLoader::auto(path)?.load_into(path)?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Apply overrides from `env` on top of `self`.
    pub fn with_env(mut self, env: &EnvLoader) -> Result<Self> {
        if let Some(url) = env.load_opt("BACKEND_URL") {
            self.backend.url = Some(url);
        }
        if let Some(key) = env.load_opt("BACKEND_ANON_KEY") {
            self.backend.anon_key = Some(key);
        }
        if let Some(host) = env.load_opt("HOST") {
            self.server.host = host;
        }
        if let Some(port) = env.load_parsed::<u16>("PORT")? {
            self.server.port = port;
        }
        if let Some(cookie) = env.load_opt("SESSION_COOKIE") {
            self.server.session_cookie = cookie;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.backend.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::ValidationError(format!(
                    "backend url must start with http:// or https://, got {}",
                    url
                )));
            }
        }
        if self.server.session_cookie.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "session cookie name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
