//! Configuration loading for the sync engine
//!
//! Settings live as JSON files under the tgsync config directory
//! (~/.config/tgsync/). Telegram API credentials resolve in priority
//! order: compile-time embedded values, then the credentials file, then
//! runtime environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Credentials filename in the tgsync config directory
const CREDENTIALS_FILE: &str = "telegram-credentials.json";

/// Storage settings filename in the tgsync config directory
const STORAGE_FILE: &str = "storage.json";

/// The tgsync config directory (~/.config/tgsync/)
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("tgsync"))
        .context("Could not determine config directory")
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// API credentials for the Telegram client
#[derive(Debug, Clone)]
pub struct TelegramCredentials {
    pub api_id: i32,
    pub api_hash: String,
}

#[derive(Deserialize)]
struct CredentialFile {
    api_id: i32,
    api_hash: String,
}

impl TelegramCredentials {
    /// Load credentials using the following priority:
    /// 1. Compile-time embedded credentials (for production builds)
    /// 2. JSON file (~/.config/tgsync/telegram-credentials.json)
    /// 3. Runtime environment variables
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        let path = config_dir()?.join(CREDENTIALS_FILE);
        if path.exists() {
            return Self::from_file(&path);
        }

        Self::from_env()
    }

    /// Load credentials embedded at compile time via environment variables.
    /// Build with: TELEGRAM_API_ID=xxx TELEGRAM_API_HASH=yyy cargo build --release
    pub fn from_compile_time() -> Option<Self> {
        let api_id = option_env!("TELEGRAM_API_ID")?;
        let api_hash = option_env!("TELEGRAM_API_HASH")?;

        let api_id = api_id.parse().ok()?;
        if api_hash.is_empty() {
            return None;
        }

        Some(Self {
            api_id,
            api_hash: api_hash.to_string(),
        })
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: CredentialFile = read_json(path)?;
        Ok(Self {
            api_id: creds.api_id,
            api_hash: creds.api_hash,
        })
    }

    /// Load credentials from runtime environment variables
    pub fn from_env() -> Result<Self> {
        let api_id = std::env::var("TELEGRAM_API_ID")
            .context("TELEGRAM_API_ID not set and no credential file found")?
            .parse()
            .context("TELEGRAM_API_ID is not a number")?;
        let api_hash = std::env::var("TELEGRAM_API_HASH")
            .context("TELEGRAM_API_HASH not set and no credential file found")?;

        Ok(Self { api_id, api_hash })
    }
}

/// Location of synchronized content on disk
///
/// The media fetcher derives its per-user content directories from
/// [`StorageConfig::root`].
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
}

#[derive(Deserialize)]
struct StorageFile {
    root: PathBuf,
}

impl StorageConfig {
    /// Load the storage root from ~/.config/tgsync/storage.json, falling
    /// back to `<config dir>/storage`
    pub fn load() -> Result<Self> {
        let dir = config_dir()?;
        let path = dir.join(STORAGE_FILE);
        if path.exists() {
            let file: StorageFile = read_json(&path)?;
            return Ok(Self { root: file.root });
        }

        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        Ok(Self {
            root: dir.join("storage"),
        })
    }
}
