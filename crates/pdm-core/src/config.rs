use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Retry policy parameters (`[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per job (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1.0,
            max_delay_secs: 30,
        }
    }
}

/// HTTP transfer settings (`[http]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Abort a transfer that stays below 1 byte/s for this long.
    pub low_speed_time_secs: u64,
    /// Hard cap on a single page transfer.
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
    /// Resolver overrides in curl `HOST:PORT:ADDRESS` form.
    pub resolve: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_time_secs: 30,
            timeout_secs: 300,
            user_agent: None,
            resolve: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn low_speed_time(&self) -> Duration {
        Duration::from_secs(self.low_speed_time_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Global configuration loaded from `~/.config/pdm/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdmConfig {
    /// User-chosen storage root, searched before the public root.
    pub custom_storage_root: Option<PathBuf>,
    /// Default public root (defaults to `$XDG_DATA_HOME/pdm/downloads`).
    pub public_root: Option<PathBuf>,
    /// Namespace folder under a root: `<root>/<backup_folder>/<source>/<content>`.
    pub backup_folder: String,
    /// Only this domain and its subdomains ever receive job cookies.
    pub cookie_domain: String,
    /// Jobs allowed to transfer at once; the rest wait as pending.
    pub max_concurrent_jobs: usize,
    /// Event poll tick in milliseconds.
    pub poll_interval_ms: u64,
    /// Per-subscriber event channel capacity.
    pub subscriber_buffer: usize,
    pub http: HttpConfig,
    pub retry: RetryConfig,
}

impl Default for PdmConfig {
    fn default() -> Self {
        Self {
            custom_storage_root: None,
            public_root: None,
            backup_folder: "pdm".to_string(),
            cookie_domain: "crotpedia.com".to_string(),
            max_concurrent_jobs: 4,
            poll_interval_ms: 500,
            subscriber_buffer: 64,
            http: HttpConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl PdmConfig {
    /// Public root, falling back to `$XDG_DATA_HOME/pdm/downloads`, then `./downloads`.
    pub fn resolved_public_root(&self) -> PathBuf {
        if let Some(root) = &self.public_root {
            return root.clone();
        }
        match xdg::BaseDirectories::with_prefix("pdm") {
            Ok(dirs) => dirs.get_data_home().join("downloads"),
            Err(e) => {
                tracing::warn!("no XDG data home ({}), using ./downloads", e);
                PathBuf::from("downloads")
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("pdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<PdmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = PdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: PdmConfig = toml::from_str(&data)?;
    Ok(cfg)
}
