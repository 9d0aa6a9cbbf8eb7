//! Runtime configuration of the ledger and the dispatch sinks.
//!
//! These are validated, fixed-at-startup values. The server crate builds
//! them from its TOML file.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Directory holding the `labels-<show>.json` files.
    pub dir: PathBuf,
    /// Retention bound per show; oldest entries are dropped beyond it.
    pub max_entries: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("labels"),
            max_entries: 100,
        }
    }
}

/// Label printer invocation.
#[derive(Debug, Clone)]
pub struct PrinterConfig {
    /// Executable that renders and prints one label. It receives the winner,
    /// the item and the price (empty when absent) after `args`.
    pub program: String,
    pub args: Vec<String>,
    /// Minimum time between two accepted print jobs.
    pub cooldown: Duration,
    pub timeout: Duration,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            program: "print-label".to_string(),
            args: Vec::new(),
            cooldown: Duration::from_millis(1500),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Chat bridge that posts a message into the stream chat. Chat sink is
    /// disabled when unset.
    pub endpoint: Option<Url>,
    /// Message template; `{winner}`, `{item}` and `{price}` are substituted.
    pub template: String,
    pub timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            template: "Congrats {winner} on winning {item}!".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WheelConfig {
    /// Wheel service endpoint. Wheel sink is disabled when unset.
    pub endpoint: Option<Url>,
    /// Case-insensitive title marker identifying wheel items.
    pub marker: String,
    pub timeout: Duration,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            marker: "wheel".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}
