use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "jikan-sync";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub catalog: CatalogConfig,
  #[serde(default)]
  pub sync: SyncConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub images: ImagePolicy,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout_secs: u64,
  pub user_agent: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "https://api.jikan.moe/v4/".to_string(),
      timeout_secs: 15,
      user_agent: format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
  /// Items per page, both for the remote query and the offline range scan
  pub page_size: usize,
  /// Hard cap on an accumulated list
  pub max_items: usize,
  /// Remote `type` filter ("tv", "movie", ...)
  #[serde(rename = "type")]
  pub kind: String,
  /// Remote ordering filter
  pub filter: String,
}

impl Default for CatalogConfig {
  fn default() -> Self {
    Self {
      page_size: 25,
      max_items: 300,
      kind: "tv".to_string(),
      filter: "bypopularity".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Records older than this are refreshed by a sweep
  pub stale_after_secs: u64,
  /// Remote calls in flight during a sweep
  pub concurrency: usize,
  /// Reachability probe period; 0 disables the probe
  pub probe_interval_secs: u64,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      stale_after_secs: 3600,
      concurrency: 2,
      probe_interval_secs: 30,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
  /// Cache database file (default: $XDG_DATA_HOME/jikan-sync/cache.db)
  pub path: Option<PathBuf>,
}

impl StorageConfig {
  pub fn database_path(&self) -> Result<PathBuf> {
    if let Some(p) = &self.path {
      return Ok(p.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join(APP_NAME).join("cache.db"))
  }
}

/// Which images may be shown at the output boundary.
///
/// Images can be withdrawn for licensing reasons; this is the switch for it.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImagePolicy {
  pub hide_all: bool,
  pub hide_posters: bool,
  pub hide_character_images: bool,
  pub hide_trailer_thumbnails: bool,
}

impl ImagePolicy {
  pub fn show_posters(&self) -> bool {
    !(self.hide_all || self.hide_posters)
  }

  pub fn show_character_images(&self) -> bool {
    !(self.hide_all || self.hide_character_images)
  }

  pub fn show_trailer_thumbnails(&self) -> bool {
    !(self.hide_all || self.hide_trailer_thumbnails)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// Default filter directive; RUST_LOG takes precedence
  pub level: String,
  /// Write logs to a daily-rolling file in this directory instead of stderr
  pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "warn".to_string(),
      directory: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./jikan-sync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/jikan-sync/config.yaml
  ///
  /// Falls back to defaults when no file exists. `JIKAN_SYNC_API_URL`
  /// overrides the API base URL either way.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var("JIKAN_SYNC_API_URL") {
      config.api.base_url = url;
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from(format!("{}.yaml", APP_NAME));
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join(APP_NAME).join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    // An empty file is a valid "all defaults" config
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  fn validate(&self) -> Result<()> {
    if self.catalog.page_size == 0 {
      return Err(eyre!("catalog.page_size must be at least 1"));
    }
    if self.sync.concurrency == 0 {
      return Err(eyre!("sync.concurrency must be at least 1"));
    }
    Ok(())
  }
}
