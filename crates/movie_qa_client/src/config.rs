//! Client config load/save for `~/.movie-qa/config.yaml`.
//! Sections: `api.*` (backend location) and `session.*` (token persistence).

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Backend base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Base URL baked in at build time, if `MOVIE_QA_API_BASE_URL` was set.
pub const BUILD_BASE_URL: Option<&str> = option_env!("MOVIE_QA_API_BASE_URL");

/// Env var naming an alternative config file.
pub const CONFIG_ENV: &str = "MOVIE_QA_CONFIG";

/// API section (base_url, timeout_secs).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ApiSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Session section (where the bearer token is kept between runs).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SessionSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub session: SessionSection,
}

impl Config {
    /// Resolve the backend base URL.
    ///
    /// Precedence: explicit override, `api.base_url`, the build-time
    /// `MOVIE_QA_API_BASE_URL`, then [`DEFAULT_BASE_URL`]. Blank values are
    /// skipped and a trailing `/` is dropped.
    pub fn base_url(&self, override_url: Option<&str>) -> String {
        let chosen = [override_url, self.api.base_url.as_deref(), BUILD_BASE_URL]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or(DEFAULT_BASE_URL);
        chosen.trim_end_matches('/').to_string()
    }

    /// Request timeout, if configured. `0` means no timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.api
            .timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }

    /// Token file: explicit override, `session.token_path`, or `~/.movie-qa/token`.
    pub fn token_path(&self, override_path: Option<&Path>) -> Option<PathBuf> {
        override_path
            .map(Path::to_path_buf)
            .or_else(|| self.session.token_path.clone())
            .or_else(default_token_path)
    }
}

/// Returns the default config file path: `~/.movie-qa/config.yaml` (platform-specific).
pub fn default_config_path() -> Option<PathBuf> {
    Some(config_dir()?.join("config.yaml"))
}

/// Returns the default token file path: `~/.movie-qa/token`.
pub fn default_token_path() -> Option<PathBuf> {
    Some(config_dir()?.join(crate::store::TOKEN_KEY))
}

fn config_dir() -> Option<PathBuf> {
    Some(home_dir()?.join(".movie-qa"))
}

#[cfg(unix)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(windows)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE").map(PathBuf::from)
}

#[cfg(not(any(unix, windows)))]
fn home_dir() -> Option<PathBuf> {
    None
}

/// Load config from a YAML file. Path is typically `~/.movie-qa/config.yaml`.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // An empty file is a valid, empty config.
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`load`], but a missing file yields the default config.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    load(path)
}

/// Save config to a YAML file. Creates parent directory if missing.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let contents = serde_yaml::to_string(config).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, contents).map_err(io_err)
}

/// Config load/save error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
