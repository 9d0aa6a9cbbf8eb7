//! Configuration module for autoprint-server.
//!
//! Loads the TOML file, applies CLI overrides, and keeps the in-memory copy
//! of the document that operator edits and show lifecycle changes are
//! written back to.

pub mod file;

use async_trait::async_trait;
use autoprint_core::config::{PersistError, PipelineConfig, PipelineSettings, SettingsPersistence};
use autoprint_core::entities::ShowRegistry;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::file::FileConfig;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub pipeline: PipelineConfig,
    pub settings: PipelineSettings,
    pub registry: ShowRegistry,
}

/// Configuration loader and writer.
///
/// Holds the parsed document so rewrites keep every section the operator
/// wrote by hand.
pub struct ConfigLoader {
    config_path: PathBuf,
    document: Mutex<FileConfig>,
}

impl ConfigLoader {
    /// Read, override and validate the configuration file. A missing,
    /// unparseable or invalid file is an error; every section is optional
    /// inside it.
    pub fn load(
        config_path: impl AsRef<Path>,
        listen_override: Option<SocketAddr>,
    ) -> Result<(Self, LoadedConfig), ConfigError> {
        let config_path = config_path.as_ref().to_path_buf();
        let file_config = read_config(&config_path)?;
        let mut loaded = build_loaded_config(file_config.clone());

        // CLI overrides apply to this run only and are never written back.
        if let Some(listen) = listen_override {
            loaded.listen = listen;
        }

        Ok((
            Self {
                config_path,
                document: Mutex::new(file_config),
            },
            loaded,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Re-read the file (used during SIGHUP).
    ///
    /// The `[session]` section is owned by the running server and is kept
    /// from memory; only the rest of the document is taken from disk.
    pub async fn reload(&self) -> Result<PipelineSettings, ConfigError> {
        let mut fresh = read_config(&self.config_path)?;
        let mut document = self.document.lock().await;
        fresh.session = document.session.clone();
        let settings = fresh.pipeline.clone();
        *document = fresh;
        Ok(settings)
    }

    async fn rewrite<F>(&self, edit: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut FileConfig),
    {
        let mut document = self.document.lock().await;
        let mut next = document.clone();
        edit(&mut next);
        let toml_string = toml::to_string_pretty(&next)?;

        // Write atomically: write to temp file, then rename
        let temp_path = self.config_path.with_extension("toml.tmp");
        tokio::fs::write(&temp_path, toml_string).await?;
        tokio::fs::rename(&temp_path, &self.config_path).await?;

        *document = next;
        Ok(())
    }
}

#[async_trait]
impl SettingsPersistence for ConfigLoader {
    async fn persist_pipeline(&self, settings: &PipelineSettings) -> Result<(), PersistError> {
        self.rewrite(|doc| doc.pipeline = settings.clone())
            .await
            .map_err(into_persist_error)
    }

    async fn persist_shows(&self, registry: &ShowRegistry) -> Result<(), PersistError> {
        self.rewrite(|doc| doc.session = registry.clone())
            .await
            .map_err(into_persist_error)
    }
}

fn into_persist_error(e: ConfigError) -> PersistError {
    match e {
        ConfigError::IoError(e) => PersistError::Io(e),
        other => PersistError::Serialize(other.to_string()),
    }
}

fn read_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let config_content = std::fs::read_to_string(path)?;
    let file_config: FileConfig = toml::from_str(&config_content)?;

    validate(&file_config)?;
    Ok(file_config)
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.ledger.max_entries == 0 {
        return Err(ConfigError::ValidationError(
            "ledger.max_entries must be at least 1".to_string(),
        ));
    }
    if config.printer.program.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "printer.program must not be empty".to_string(),
        ));
    }
    if let Some(id) = &config.session.current_show {
        if !config.session.shows.contains_key(id) {
            return Err(ConfigError::ValidationError(format!(
                "session.current_show '{id}' is not a known show"
            )));
        }
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    LoadedConfig {
        listen: file_config.server.listen,
        pipeline: PipelineConfig {
            ledger: file_config.ledger.into(),
            printer: file_config.printer.into(),
            chat: file_config.chat.into(),
            wheel: file_config.wheel.into(),
        },
        settings: file_config.pipeline,
        registry: file_config.session,
    }
}
