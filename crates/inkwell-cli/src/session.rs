//! Wires configuration, storage, and the remote API for one CLI invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use inkwell_core::config::{InkwellConfig, CONFIG_FILE_NAME};
use inkwell_core::storage::BackendSelector;
use inkwell_core::sync::{HttpEntryApi, SyncReconciler};
use inkwell_core::OfflineEntryStore;

use crate::error::CliError;

pub struct Session {
    pub config: InkwellConfig,
    pub store: OfflineEntryStore,
}

impl Session {
    /// Load config file + environment, then open the local store lazily.
    pub fn open(data_dir: Option<PathBuf>) -> Result<Self, CliError> {
        let mut config = match default_config_path() {
            Some(path) => InkwellConfig::load_from_path(&path)?,
            None => InkwellConfig::default(),
        };
        config.apply_env()?;
        if let Some(data_dir) = data_dir {
            config.data_dir = Some(data_dir);
        }

        let default_data_dir = match &config.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        Self::from_config(config, &default_data_dir)
    }

    pub fn from_config(config: InkwellConfig, default_data_dir: &Path) -> Result<Self, CliError> {
        config.validate()?;
        let options = config.storage_options(default_data_dir);
        let selector = BackendSelector::new(config.platform(), options);
        let store = OfflineEntryStore::new(Arc::new(selector));
        Ok(Self { config, store })
    }

    /// Reconciler against the configured remote API.
    pub fn reconciler(&self) -> Result<SyncReconciler<HttpEntryApi>, CliError> {
        let api = self.config.remote_api()?.ok_or(CliError::SyncNotConfigured)?;
        tracing::debug!("Using remote entry API at {}", api.base_url());
        Ok(SyncReconciler::new(self.store.clone(), api))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("inkwell").join(CONFIG_FILE_NAME))
}

pub fn default_data_dir() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("inkwell"))
        .ok_or_else(|| CliError::Config("No data directory available".into()))
}
