// Environment variable loading

use crate::{ConfigError, Result};
use std::env;
use std::path::Path;

/// Environment variable loader
///
/// Keys are upper-cased and joined to the prefix with `_`, so
/// `EnvLoader::new(Some("TERANG".into())).load_var("backend_url")` reads
/// `TERANG_BACKEND_URL`.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Loader for the `TERANG_` namespace.
    pub fn terang() -> Self {
        Self::new(Some("TERANG".to_string()))
    }

    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = self.full_key(key);
        env::var(&full_key).map_err(|e| match e {
            env::VarError::NotPresent => ConfigError::KeyNotFound(full_key),
            other => ConfigError::EnvError(other),
        })
    }

    /// Load a variable, treating unset and blank values as absent
    pub fn load_opt(&self, key: &str) -> Option<String> {
        self.load_var(key)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_opt(key).unwrap_or_else(|| default.to_string())
    }

    /// Load and parse a variable, failing on malformed values
    pub fn load_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.load_opt(key) {
            Some(raw) => raw.parse::<T>().map(Some).map_err(|e| {
                ConfigError::ParseError(format!("{}: {}", self.full_key(key), e))
            }),
            None => Ok(None),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Load a `.env` file from the working directory if one exists.
///
/// Variables already present in the process environment win.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to read .env file"),
    }
}

/// Load a specific dotenv-formatted file.
pub fn load_dotenv_from(path: &Path) -> Result<()> {
    dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))
}
