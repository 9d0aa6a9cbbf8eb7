//! Configuration types for the AutoPrint pipeline.
//!
//! These are the validated runtime types shared across crates. Loading and
//! parsing the config file is handled by the server crate, which also
//! provides the [`SettingsPersistence`] implementation.

mod config_store;
mod pipeline;
mod settings;
mod sinks;

pub use config_store::{ConfigStore, ConfigWatcher};
pub use pipeline::{PatternList, PipelineSettings};
pub use settings::{NoPersistence, PersistError, SettingsController, SettingsPersistence};
pub use sinks::{ChatConfig, LedgerConfig, PrinterConfig, WheelConfig};

/// Fixed-at-startup configuration of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub ledger: LedgerConfig,
    pub printer: PrinterConfig,
    pub chat: ChatConfig,
    pub wheel: WheelConfig,
}
