//! Uploader configuration.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/chunkup/config.toml`
//! - Windows: `%APPDATA%/chunkup/config.toml`

use std::path::{Path, PathBuf};

use anyhow::Context;
use chunkup_rest::MetadataMode;
use serde::{Deserialize, Serialize};

/// Uploader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Site root, e.g. `https://contoso.example/sites/team`.
    #[serde(default)]
    pub site_url: String,

    /// Server-relative URL of the destination folder.
    #[serde(default)]
    pub folder: String,

    /// Bearer token sent with every request.
    #[serde(default)]
    pub access_token: String,

    /// Chunk size in bytes (0 = default).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Replace existing files.
    #[serde(default = "default_true")]
    pub overwrite: bool,

    /// Response metadata verbosity.
    #[serde(default)]
    pub metadata: MetadataMode,
}

fn default_chunk_size() -> usize {
    chunkup_transfer::DEFAULT_CHUNK_SIZE
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_url: String::new(),
            folder: String::new(),
            access_token: String::new(),
            chunk_size: default_chunk_size(),
            overwrite: true,
            metadata: MetadataMode::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path` (or the platform default), falling
    /// back to defaults when the file does not exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path(),
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Checks that everything needed to reach the store is set.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.site_url.is_empty() {
            anyhow::bail!("site_url is not configured");
        }
        if self.folder.is_empty() {
            anyhow::bail!("folder is not configured");
        }
        if self.access_token.is_empty() {
            anyhow::bail!("access_token is not configured");
        }
        Ok(())
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("chunkup").join("config.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("chunkup")
            .join("config.toml")
    }
}
