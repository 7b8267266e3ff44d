use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Exit status reported for a child killed by SIGKILL (128 + 9).
pub const SIGKILL_EXIT_CODE: i32 = 137;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of downloader launches in the primary (parallel) pass.
    pub max_attempts: u32,
    /// Maximum number of launches in the serial verification pass.
    pub verify_max_attempts: u32,
    /// Base delay in seconds for exponential backoff between launches.
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
    /// Child exit codes treated as a crash worth relaunching.
    #[serde(default = "default_fatal_exit_codes")]
    pub fatal_exit_codes: Vec<i32>,
}

fn default_fatal_exit_codes() -> Vec<i32> {
    vec![SIGKILL_EXIT_CODE]
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            verify_max_attempts: 2,
            base_delay_secs: 30.0,
            max_delay_secs: 300,
            fatal_exit_codes: default_fatal_exit_codes(),
        }
    }
}

/// Global configuration loaded from `~/.config/ssara-dl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsaraConfig {
    /// External federated query tool (program name or path).
    pub downloader: String,
    /// Seconds between directory size samples while the downloader runs.
    pub poll_interval_secs: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Rotate the log file at startup once it grows past this many bytes.
    #[serde(default)]
    pub log_max_bytes: Option<u64>,
    /// Number of rotated log files to keep.
    #[serde(default)]
    pub log_backups: Option<u32>,
}

impl Default for SsaraConfig {
    fn default() -> Self {
        Self {
            downloader: "ssara_federated_query.py".to_string(),
            poll_interval_secs: 600,
            retry: None,
            log_max_bytes: None,
            log_backups: None,
        }
    }
}

impl SsaraConfig {
    /// Retry section, falling back to defaults when the file omits it.
    pub fn retry_or_default(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ssara-dl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// A loaded config plus where it came from. Loading happens before logging is
/// installed, so the caller reports `created` once the subscriber is up.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: SsaraConfig,
    pub path: PathBuf,
    /// Defaults were written to `path` on this load.
    pub created: bool,
}

/// Load configuration from the XDG config dir, creating a default file if none exists.
pub fn load_or_init() -> Result<LoadedConfig> {
    let path = config_path()?;
    load_or_init_at(&path)
}

/// Load configuration from `path`, writing defaults there first if it does not exist.
pub fn load_or_init_at(path: &Path) -> Result<LoadedConfig> {
    if !path.exists() {
        let default_cfg = SsaraConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config dir {}", parent.display()))?;
        }
        fs::write(path, toml).with_context(|| format!("write config {}", path.display()))?;
        return Ok(LoadedConfig {
            config: default_cfg,
            path: path.to_path_buf(),
            created: true,
        });
    }

    let data =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: SsaraConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(LoadedConfig {
        config: cfg,
        path: path.to_path_buf(),
        created: false,
    })
}
