use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::IntakeResult;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub client: ClientConfig,
    /// Directory relative paths are resolved against. Set after loading.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Overridden by the `PORT` environment variable.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Static asset root served under `/`.
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            public_dir: default_public_dir(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3000
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Gap after which the next append starts a fresh log.
    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            stale_after_ms: default_stale_after_ms(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("intake.txt")
}

fn default_stale_after_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntakeConfig {
    /// Reject zero and negative quantities on the server as well.
    #[serde(default)]
    pub require_positive_qtty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Overridden by `INTAKE_SERVER_URL`.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_server_url() -> String {
    "http://127.0.0.1:3000".into()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl AppConfig {
    /// Defaults rooted at the working directory, used when no file is found.
    pub fn fallback() -> Self {
        let mut config = Self {
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            ..Self::default()
        };
        config.apply_env();
        config
    }

    pub fn store_path(&self) -> PathBuf {
        self.resolve(&self.store.path)
    }

    pub fn public_dir(&self) -> PathBuf {
        self.resolve(&self.server.public_dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(e) => tracing::warn!(value = %port, error = %e, "ignoring invalid PORT"),
            }
        }
        if let Ok(url) = std::env::var("INTAKE_SERVER_URL") {
            if !url.trim().is_empty() {
                self.client.server_url = url.trim().to_string();
            }
        }
    }
}

/// Config file locations, in lookup order: next to the executable, the
/// working directory, then the user config directory.
fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(parent) = std::env::current_exe().ok().as_deref().and_then(Path::parent) {
        candidates.push(parent.join(CONFIG_FILE));
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(CONFIG_FILE));
    }
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("intake").join(CONFIG_FILE));
    }
    candidates
}

fn first_existing(candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|candidate| {
        let found = candidate.exists();
        if found {
            tracing::debug!(path = %candidate.display(), "config found");
        }
        found
    })
}

/// Loads the config from an explicit path, or searches the usual locations.
/// `Ok(None)` means no file was found and defaults apply.
pub fn load_config(explicit: Option<&Path>) -> IntakeResult<Option<AppConfig>> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match first_existing(config_candidates()) {
            Some(p) => p,
            None => return Ok(None),
        },
    };
    load_config_from(&path).map(Some)
}

/// Like [`load_config`], but never fails: a missing file is routine, a
/// broken one is reported and replaced by defaults.
pub fn load_or_fallback(explicit: Option<&Path>) -> AppConfig {
    match load_config(explicit) {
        Ok(Some(config)) => config,
        Ok(None) => {
            tracing::info!("no {CONFIG_FILE} found, using defaults");
            AppConfig::fallback()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config; using defaults");
            AppConfig::fallback()
        }
    }
}

pub fn load_config_from(path: &Path) -> IntakeResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let mut config: AppConfig = toml::from_str(&content)?;
    config.base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    config.apply_env();
    tracing::info!(
        path = %path.display(),
        port = config.server.port,
        store = %config.store_path().display(),
        "config loaded"
    );
    Ok(config)
}

pub fn save_config(config: &AppConfig, path: &Path) -> IntakeResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IntakeError;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[store]\nstale_after_ms = 500\n").unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.store.stale_after_ms, 500);
        assert_eq!(config.store.path, PathBuf::from("intake.txt"));
        assert!(!config.intake.require_positive_qtty);
        assert_eq!(config.store_path(), dir.path().join("intake.txt"));
        assert_eq!(config.public_dir(), dir.path().join("public"));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("elsewhere").join("log.txt");
        let config = AppConfig {
            store: StoreConfig {
                path: log.clone(),
                stale_after_ms: 2000,
            },
            base_dir: PathBuf::from("/unused"),
            ..AppConfig::default()
        };
        assert_eq!(config.store_path(), log);
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut config = AppConfig::default();
        config.intake.require_positive_qtty = true;
        config.client.request_timeout_secs = 3;
        save_config(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert!(loaded.intake.require_positive_qtty);
        assert_eq!(loaded.client.request_timeout_secs, 3);
    }

    #[test]
    fn lookup_takes_the_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nowhere").join(CONFIG_FILE);
        let present = dir.path().join(CONFIG_FILE);
        std::fs::write(&present, "").unwrap();

        assert_eq!(first_existing([missing.clone()]), None);
        assert_eq!(first_existing([missing, present.clone()]), Some(present));
    }

    #[test]
    fn broken_explicit_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[store\nstale_after_ms = 1").unwrap();

        assert!(load_config(Some(&path)).is_err());
        let config = load_or_fallback(Some(&path));
        assert_eq!(config.store.stale_after_ms, 2000);
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[store]\nstale_after_ms = 750\n").unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.store.stale_after_ms, 750);
        assert_eq!(load_or_fallback(Some(&path)).store.stale_after_ms, 750);
    }

    #[test]
    fn malformed_file_is_a_toml_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[server\nport = 1").unwrap();
        assert!(matches!(load_config_from(&path), Err(IntakeError::TomlDe(_))));
    }
}
