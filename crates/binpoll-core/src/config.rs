use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fetcher::FetchTarget;
use crate::transport::{TransportOptions, DEFAULT_MAX_IDLE_HANDLES};

/// Shared transport settings (`[transport]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Optional whole-transfer timeout in seconds (None = unbounded).
    pub transfer_timeout_secs: Option<u64>,
    /// Verify TLS certificates and host names.
    pub verify_tls: bool,
    /// Idle connection handles kept for reuse.
    pub max_idle_handles: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 3,
            transfer_timeout_secs: None,
            verify_tls: false,
            max_idle_handles: DEFAULT_MAX_IDLE_HANDLES,
        }
    }
}

impl TransportConfig {
    pub fn to_options(&self) -> TransportOptions {
        TransportOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            transfer_timeout: self.transfer_timeout_secs.map(Duration::from_secs),
            verify_tls: self.verify_tls,
            max_idle_handles: self.max_idle_handles,
        }
    }
}

/// One polled artifact (`[[targets]]` entry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// URL to poll.
    pub url: String,
    /// Where each new artifact is installed.
    pub output: PathBuf,
    /// Seconds between checks; missing or 0 = 5 minutes.
    #[serde(default)]
    pub interval_secs: Option<u64>,
    /// Headers compared between checks; missing = ETag, If-Modified-Since,
    /// Last-Modified, Content-Length.
    #[serde(default)]
    pub check_headers: Option<Vec<String>>,
    /// Mark the installed file executable (unix).
    #[serde(default)]
    pub executable: bool,
    /// Fetch when the server sends none of the check headers.
    #[serde(default)]
    pub treat_missing_headers_as_change: bool,
}

impl TargetConfig {
    pub fn to_target(&self) -> FetchTarget {
        FetchTarget {
            url: self.url.clone(),
            interval: Duration::from_secs(self.interval_secs.unwrap_or(0)),
            check_headers: self.check_headers.clone().unwrap_or_default(),
            treat_missing_headers_as_change: self.treat_missing_headers_as_change,
        }
    }
}

/// Global configuration loaded from `~/.config/binpoll/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinpollConfig {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("binpoll")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BinpollConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BinpollConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<BinpollConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: BinpollConfig = toml::from_str(&data)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(cfg)
}
