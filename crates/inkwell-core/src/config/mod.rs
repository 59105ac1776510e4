//! Client configuration: a JSON file overridden by `INKWELL_*` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::{Platform, StorageOptions, DEFAULT_SCOPE};
use crate::sync::HttpEntryApi;
use crate::util::{is_http_url, normalize_text_option};
use crate::view::DEFAULT_PAGE_SIZE;

pub const CONFIG_FILE_NAME: &str = "config.json";

pub const ENV_DATA_DIR: &str = "INKWELL_DATA_DIR";
pub const ENV_PLATFORM: &str = "INKWELL_PLATFORM";
pub const ENV_API_URL: &str = "INKWELL_API_URL";
pub const ENV_API_TOKEN: &str = "INKWELL_API_TOKEN";
pub const ENV_PAGE_SIZE: &str = "INKWELL_PAGE_SIZE";

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InkwellConfig {
    /// Base directory for local state.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Overrides platform detection.
    #[serde(default)]
    pub platform: Option<Platform>,
    /// Keep all local state in memory.
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub page_size: Option<usize>,
    /// Account scope of the browser-scoped store.
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for InkwellConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("InkwellConfig")
            .field("data_dir", &self.data_dir)
            .field("platform", &self.platform)
            .field("ephemeral", &self.ephemeral)
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("page_size", &self.page_size)
            .field("scope", &self.scope)
            .finish()
    }
}

impl InkwellConfig {
    /// Load the config file at `path`; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            Error::Config(format!(
                "Failed to read config at {}: {error}",
                path.display()
            ))
        })?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::Config(format!(
                "Failed to parse config at {}: {error}",
                path.display()
            ))
        })?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut normalized = self.clone();
        normalized.normalize();
        std::fs::write(path, serde_json::to_string_pretty(&normalized)?)?;
        Ok(())
    }

    /// Apply `INKWELL_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides resolved through `lookup`. Blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let read = |name: &str| normalize_text_option(lookup(name));

        if let Some(dir) = read(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(platform) = read(ENV_PLATFORM) {
            self.platform = Some(platform.parse()?);
        }
        if let Some(url) = read(ENV_API_URL) {
            self.api_base_url = Some(url);
        }
        if let Some(token) = read(ENV_API_TOKEN) {
            self.api_token = Some(token);
        }
        if let Some(size) = read(ENV_PAGE_SIZE) {
            let size = size.parse::<usize>().map_err(|_| {
                Error::Config(format!("{ENV_PAGE_SIZE} must be a number, got {size}"))
            })?;
            self.page_size = Some(size);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.api_base_url {
            if !is_http_url(url) {
                return Err(Error::Config(
                    "api_base_url must include http:// or https://".to_string(),
                ));
            }
        }
        if self.page_size == Some(0) {
            return Err(Error::Config(
                "page_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.api_base_url = normalize_text_option(self.api_base_url.take());
        self.api_token = normalize_text_option(self.api_token.take());
        self.scope = normalize_text_option(self.scope.take());
    }

    /// Configured platform, else the compile-target default.
    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::detect)
    }

    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn has_remote(&self) -> bool {
        self.api_base_url.is_some()
    }

    /// Storage location, falling back to `default_data_dir`.
    pub fn storage_options(&self, default_data_dir: &Path) -> StorageOptions {
        StorageOptions {
            data_dir: self
                .data_dir
                .clone()
                .unwrap_or_else(|| default_data_dir.to_path_buf()),
            scope: self
                .scope
                .clone()
                .unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            ephemeral: self.ephemeral,
        }
    }

    /// HTTP client for the configured remote, `None` when no remote is set.
    pub fn remote_api(&self) -> Result<Option<HttpEntryApi>> {
        let Some(base_url) = &self.api_base_url else {
            return Ok(None);
        };
        Ok(Some(HttpEntryApi::new(
            base_url.clone(),
            self.api_token.clone(),
        )?))
    }
}
