//! `config.toml` under the user's config directory
//! (`$XDG_CONFIG_HOME` or `~/.config` on Unix, `%APPDATA%` on Windows).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use mediadrop_uploader::{TransmitterConfig, UploadLimits};
use serde::{Deserialize, Serialize};

use crate::Cli;

const MIB: u64 = 1024 * 1024;

/// Uploader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the upload server.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Anti-forgery token sent with every chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,

    /// Largest single file accepted, in GiB.
    #[serde(default = "default_max_file_size_gib")]
    pub max_file_size_gib: u64,

    /// Largest batch accepted, in GiB.
    #[serde(default = "default_max_total_size_gib")]
    pub max_total_size_gib: u64,

    #[serde(default = "default_chunk_size_mib")]
    pub chunk_size_mib: u64,

    /// Per-chunk request timeout in seconds.
    #[serde(default = "default_chunk_timeout_secs")]
    pub chunk_timeout_secs: u64,

    /// Destination used when `--directory` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_directory: Option<String>,
}

fn default_server_url() -> String {
    "http://localhost:5005".into()
}

fn default_max_file_size_gib() -> u64 {
    5
}

fn default_max_total_size_gib() -> u64 {
    20
}

fn default_chunk_size_mib() -> u64 {
    32
}

fn default_chunk_timeout_secs() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            csrf_token: None,
            max_file_size_gib: default_max_file_size_gib(),
            max_total_size_gib: default_max_total_size_gib(),
            chunk_size_mib: default_chunk_size_mib(),
            chunk_timeout_secs: default_chunk_timeout_secs(),
            default_directory: None,
        }
    }
}

impl Config {
    /// Reads `path` (or the platform default). A missing file is created
    /// with default values.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.map_or_else(config_path, Path::to_path_buf);

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let config = toml::from_str(&content)
                    .with_context(|| format!("invalid config file {}", path.display()))?;
                tracing::debug!(path = %path.display(), "configuration loaded");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Config::default();
                config.save_to(&path)?;
                Ok(config)
            }
            Err(e) => Err(e).with_context(|| format!("cannot read {}", path.display())),
        }
    }

    /// Writes the configuration as TOML, readable by the owner only.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            options.mode(0o600);
            // `mode` only applies to new files.
            if path.exists() {
                std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
            }
        }

        let mut file = options.open(path)?;
        file.write_all(toml::to_string_pretty(self)?.as_bytes())?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Command-line values take precedence over the file.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(server) = &cli.server {
            self.server_url = server.clone();
        }
        if let Some(token) = &cli.csrf_token {
            self.csrf_token = Some(token.clone());
        }
        if let Some(mib) = cli.chunk_size_mib {
            self.chunk_size_mib = mib;
        }
        if let Some(directory) = &cli.directory {
            self.default_directory = Some(directory.clone());
        }
    }

    pub fn limits(&self) -> UploadLimits {
        UploadLimits::from_gib(self.max_file_size_gib, self.max_total_size_gib)
    }

    pub fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_mib.saturating_mul(MIB)
    }

    pub fn transmitter_config(&self) -> TransmitterConfig {
        TransmitterConfig {
            server_url: self.server_url.clone(),
            csrf_token: self.csrf_token.clone(),
            timeout: Duration::from_secs(self.chunk_timeout_secs),
        }
    }
}

fn config_path() -> PathBuf {
    config_root().join("mediadrop").join("config.toml")
}

#[cfg(windows)]
fn config_root() -> PathBuf {
    std::env::var_os("APPDATA")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Users\Default\AppData\Roaming"))
}

#[cfg(not(windows))]
fn config_root() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".config"))
        .unwrap_or_else(std::env::temp_dir)
}
