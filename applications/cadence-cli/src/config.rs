/// CLI configuration
///
/// Sources, later ones winning:
/// 1. built-in defaults
/// 2. `cadence.toml` in the working directory, or the file given with `--config`
/// 3. `CADENCE_*` environment variables, sections split by a double
///    underscore (`CADENCE_CATALOG__BASE_URL`, `CADENCE_CACHE__MAX_BYTES`)
use crate::error::{CliError, Result};
use cadence_cache::CacheConfig;
use cadence_catalog::CatalogConfig;
use cadence_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CadenceConfig {
    #[serde(default = "default_catalog")]
    pub catalog: CatalogSettings,

    #[serde(default = "default_cache")]
    pub cache: CacheSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_playback")]
    pub playback: PlaybackSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogSettings {
    /// Required for every command that talks to the catalog
    #[serde(default)]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackSettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_radio_low_watermark")]
    pub radio_low_watermark: usize,

    #[serde(default = "default_normalize_loudness")]
    pub normalize_loudness: bool,

    #[serde(default = "default_restart_threshold_ms")]
    pub restart_threshold_ms: u64,
}

impl CadenceConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; the default `cadence.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path));
            }
            None => {
                let default_path = PathBuf::from("cadence.toml");
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (prefixed with CADENCE_)
        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let base_url = &self.catalog.base_url;
        if !base_url.is_empty()
            && !base_url.starts_with("http://")
            && !base_url.starts_with("https://")
        {
            return Err(CliError::Config(format!(
                "Catalog URL must be http(s): {base_url}"
            )));
        }

        if self.catalog.timeout_secs == 0 {
            return Err(CliError::Config(
                "catalog.timeout_secs must be positive".to_string(),
            ));
        }

        if self.cache.max_bytes == 0 {
            return Err(CliError::Config(
                "cache.max_bytes must be positive".to_string(),
            ));
        }

        if !self.storage.database_url.starts_with("sqlite:") {
            return Err(CliError::Config(format!(
                "Only SQLite databases are supported: {}",
                self.storage.database_url
            )));
        }

        Ok(())
    }

    /// Catalog client settings; fails when no URL is configured
    pub fn catalog_config(&self) -> Result<CatalogConfig> {
        if self.catalog.base_url.is_empty() {
            return Err(CliError::Config(
                "Catalog URL is required (set CADENCE_CATALOG__BASE_URL)".to_string(),
            ));
        }
        Ok(CatalogConfig {
            base_url: self.catalog.base_url.clone(),
            timeout_secs: self.catalog.timeout_secs,
            language: self.catalog.language.clone(),
        })
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(&self.cache.dir).with_max_bytes(self.cache.max_bytes)
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            max_retries: self.playback.max_retries,
            radio_low_watermark: self.playback.radio_low_watermark,
            normalize_loudness: self.playback.normalize_loudness,
            restart_threshold_ms: self.playback.restart_threshold_ms,
        }
    }

    /// Filesystem path of the database, for creating its directory
    pub fn database_path(&self) -> Option<PathBuf> {
        let path = self
            .storage
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.storage.database_url.strip_prefix("sqlite:"))?;
        let path = path.split('?').next().unwrap_or(path);
        (!path.is_empty() && path != ":memory:").then(|| PathBuf::from(path))
    }
}

// Default values
fn default_catalog() -> CatalogSettings {
    CatalogSettings {
        base_url: String::new(),
        timeout_secs: default_timeout_secs(),
        language: None,
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cache() -> CacheSettings {
    CacheSettings {
        dir: default_cache_dir(),
        max_bytes: default_max_bytes(),
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./data/cache")
}

fn default_max_bytes() -> u64 {
    512 * 1024 * 1024
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
    }
}

fn default_database_url() -> String {
    "sqlite://./data/cadence.db".to_string()
}

fn default_playback() -> PlaybackSettings {
    PlaybackSettings {
        max_retries: default_max_retries(),
        radio_low_watermark: default_radio_low_watermark(),
        normalize_loudness: default_normalize_loudness(),
        restart_threshold_ms: default_restart_threshold_ms(),
    }
}

fn default_max_retries() -> u32 {
    PlaybackConfig::default().max_retries
}

fn default_radio_low_watermark() -> usize {
    PlaybackConfig::default().radio_low_watermark
}

fn default_normalize_loudness() -> bool {
    PlaybackConfig::default().normalize_loudness
}

fn default_restart_threshold_ms() -> u64 {
    PlaybackConfig::default().restart_threshold_ms
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            cache: default_cache(),
            storage: default_storage(),
            playback: default_playback(),
        }
    }
}
