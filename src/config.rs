//! Runtime settings.
//!
//! Values are resolved with priority: environment > `config.toml` > defaults.
//! The `--document` flag is applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::scheduler::Scheduler;
use crate::sm2::QualityPolicy;
use crate::store::JsonStore;
use crate::store::json::DEFAULT_LOCK_TIMEOUT;
use crate::utils::{get_config_dir, get_data_dir};

pub const CONFIG_PATH_ENV: &str = "KARTEIKASTEN_CONFIG";
pub const DOCUMENT_ENV: &str = "KARTEIKASTEN_DOCUMENT";
pub const QUALITY_POLICY_ENV: &str = "KARTEIKASTEN_QUALITY_POLICY";

const DOCUMENT_FILE_NAME: &str = "memory.json";
const DEFAULT_LEVEL: &str = "A1";

/// Shape of `config.toml`; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    document: Option<PathBuf>,
    quality_policy: Option<QualityPolicy>,
    lock_timeout_ms: Option<u64>,
    level: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub document: PathBuf,
    pub quality_policy: QualityPolicy,
    pub lock_timeout: Duration,
    pub level: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => get_config_dir()?.join("config.toml"),
        };
        let file = read_config_file(&config_path)?;
        let default_document = get_data_dir()?.join(DOCUMENT_FILE_NAME);

        Self::resolve(file, |key| std::env::var(key).ok(), default_document)
    }

    fn resolve(
        file: ConfigFile,
        env: impl Fn(&str) -> Option<String>,
        default_document: PathBuf,
    ) -> Result<Self> {
        let document = match env(DOCUMENT_ENV) {
            Some(path) => {
                tracing::info!("Using document from {DOCUMENT_ENV}: {path}");
                PathBuf::from(path)
            }
            None => file.document.unwrap_or(default_document),
        };

        let quality_policy = match env(QUALITY_POLICY_ENV) {
            Some(raw) => raw
                .parse::<QualityPolicy>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("Invalid {QUALITY_POLICY_ENV}"))?,
            None => file.quality_policy.unwrap_or_default(),
        };

        let lock_timeout = file
            .lock_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_LOCK_TIMEOUT);

        Ok(Config {
            document,
            quality_policy,
            lock_timeout,
            level: file.level.unwrap_or_else(|| DEFAULT_LEVEL.to_string()),
        })
    }

    pub fn with_document(mut self, document: Option<PathBuf>) -> Self {
        if let Some(document) = document {
            self.document = document;
        }
        self
    }

    pub fn store(&self) -> JsonStore {
        JsonStore::new(&self.document).with_lock_timeout(self.lock_timeout)
    }

    pub fn scheduler(&self) -> Scheduler<JsonStore> {
        tracing::debug!(document = %self.document.display(), policy = ?self.quality_policy, "opening scheduler");
        Scheduler::new(self.store()).with_quality_policy(self.quality_policy)
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            tracing::info!("Using config from {}", path.display());
            toml::from_str(&contents)
                .with_context(|| format!("Malformed config file {}", path.display()))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to read config file {}", path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let config =
            Config::resolve(ConfigFile::default(), no_env, PathBuf::from("/data/memory.json"))
                .unwrap();

        assert_eq!(config.document, PathBuf::from("/data/memory.json"));
        assert_eq!(config.quality_policy, QualityPolicy::Clamp);
        assert_eq!(config.lock_timeout, DEFAULT_LOCK_TIMEOUT);
        assert_eq!(config.level, "A1");
    }

    #[test]
    fn file_values_override_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            document = "/tmp/deck.json"
            quality_policy = "reject"
            lock_timeout_ms = 250
            level = "B1"
            "#,
        )
        .unwrap();
        let config = Config::resolve(file, no_env, PathBuf::from("unused")).unwrap();

        assert_eq!(config.document, PathBuf::from("/tmp/deck.json"));
        assert_eq!(config.quality_policy, QualityPolicy::Reject);
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.level, "B1");
    }

    #[test]
    fn env_overrides_file() {
        let file: ConfigFile = toml::from_str(
            r#"
            document = "/tmp/deck.json"
            quality_policy = "reject"
            "#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            (DOCUMENT_ENV, "/env/memory.json"),
            (QUALITY_POLICY_ENV, "Clamp"),
        ]);
        let config = Config::resolve(
            file,
            |key| env.get(key).map(|v| v.to_string()),
            PathBuf::from("unused"),
        )
        .unwrap();

        assert_eq!(config.document, PathBuf::from("/env/memory.json"));
        assert_eq!(config.quality_policy, QualityPolicy::Clamp);
    }

    #[test]
    fn bad_policy_in_env_is_an_error() {
        let err = Config::resolve(
            ConfigFile::default(),
            |key| (key == QUALITY_POLICY_ENV).then(|| "sometimes".to_string()),
            PathBuf::from("unused"),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("sometimes"));
    }

    #[test]
    fn cli_document_wins() {
        let config =
            Config::resolve(ConfigFile::default(), no_env, PathBuf::from("/data/memory.json"))
                .unwrap()
                .with_document(Some(PathBuf::from("cli.json")));
        assert_eq!(config.document, PathBuf::from("cli.json"));
    }

    #[test]
    fn missing_config_file_means_defaults() {
        let dir = TempDir::new().unwrap();
        let file = read_config_file(&dir.path().join("config.toml")).unwrap();
        assert!(file.document.is_none());
        assert!(file.level.is_none());
    }

    #[test]
    fn malformed_config_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "quality_policy = 3\n").unwrap();

        let err = read_config_file(&path).unwrap_err();
        assert!(err.to_string().contains("Malformed config file"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<ConfigFile>("colour = \"blue\"\n").is_err());
    }
}
