//! TOML file configuration structures.
//!
//! These structs directly map to the `autoprint-config.toml` file format.
//! The `[pipeline]` and `[session]` sections are rewritten by the server
//! whenever an operator changes a setting or the show lifecycle advances.

use autoprint_core::config::{
    ChatConfig, LedgerConfig, PipelineSettings, PrinterConfig, WheelConfig,
};
use autoprint_core::entities::ShowRegistry;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ledger: LedgerSection,
    #[serde(default)]
    pub printer: PrinterSection,
    #[serde(default)]
    pub chat: ChatSection,
    #[serde(default)]
    pub wheel: WheelSection,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub session: ShowRegistry,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "127.0.0.1:3000").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 3000))
}

/// Where show ledgers live and how much each one keeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSection {
    #[serde(default = "default_ledger_dir")]
    pub directory: PathBuf,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            directory: default_ledger_dir(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_ledger_dir() -> PathBuf {
    LedgerConfig::default().dir
}

fn default_max_entries() -> usize {
    LedgerConfig::default().max_entries
}

/// Label printer command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterSection {
    #[serde(default = "default_printer_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "default_printer_timeout")]
    pub timeout_secs: u64,
}

impl Default for PrinterSection {
    fn default() -> Self {
        Self {
            program: default_printer_program(),
            args: Vec::new(),
            cooldown_ms: default_cooldown_ms(),
            timeout_secs: default_printer_timeout(),
        }
    }
}

fn default_printer_program() -> String {
    PrinterConfig::default().program
}

fn default_cooldown_ms() -> u64 {
    1500
}

fn default_printer_timeout() -> u64 {
    10
}

/// Chat bridge. Announcements are disabled without an endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSection {
    #[serde(default)]
    pub endpoint: Option<Url>,
    #[serde(default = "default_chat_template")]
    pub template: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            template: default_chat_template(),
            timeout_secs: default_http_timeout(),
        }
    }
}

fn default_chat_template() -> String {
    ChatConfig::default().template
}

/// Wheel service. Forwarding is disabled without an endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WheelSection {
    #[serde(default)]
    pub endpoint: Option<Url>,
    #[serde(default = "default_wheel_marker")]
    pub marker: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for WheelSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            marker: default_wheel_marker(),
            timeout_secs: default_http_timeout(),
        }
    }
}

fn default_wheel_marker() -> String {
    WheelConfig::default().marker
}

fn default_http_timeout() -> u64 {
    5
}

impl From<LedgerSection> for LedgerConfig {
    fn from(value: LedgerSection) -> Self {
        LedgerConfig {
            dir: value.directory,
            max_entries: value.max_entries,
        }
    }
}

impl From<PrinterSection> for PrinterConfig {
    fn from(value: PrinterSection) -> Self {
        PrinterConfig {
            program: value.program,
            args: value.args,
            cooldown: Duration::from_millis(value.cooldown_ms),
            timeout: Duration::from_secs(value.timeout_secs),
        }
    }
}

impl From<ChatSection> for ChatConfig {
    fn from(value: ChatSection) -> Self {
        ChatConfig {
            endpoint: value.endpoint,
            template: value.template,
            timeout: Duration::from_secs(value.timeout_secs),
        }
    }
}

impl From<WheelSection> for WheelConfig {
    fn from(value: WheelSection) -> Self {
        WheelConfig {
            endpoint: value.endpoint,
            marker: value.marker,
            timeout: Duration::from_secs(value.timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoprint_core::entities::{ShowId, ShowRecord};

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "0.0.0.0:3000"

[ledger]
directory = "/var/lib/autoprint"
max_entries = 250

[printer]
program = "/usr/local/bin/print-label"
args = ["--printer", "DYMO"]
cooldown_ms = 2000

[chat]
endpoint = "http://127.0.0.1:7000/chat"

[wheel]
endpoint = "http://127.0.0.1:7100/spin"
marker = "spin"

[pipeline]
print_giveaways = false
exclusions = ["shipping"]
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.ledger.max_entries, 250);
        assert_eq!(config.printer.args, vec!["--printer", "DYMO"]);
        assert_eq!(config.printer.timeout_secs, 10);
        assert_eq!(config.wheel.marker, "spin");
        assert!(config.chat.endpoint.is_some());
        assert!(!config.pipeline.print_giveaways);
        assert!(config.pipeline.printing_enabled);
        assert_eq!(config.pipeline.exclusions.as_slice(), ["shipping"]);
        assert!(config.session.current_show.is_none());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen, default_listen_addr());
        assert_eq!(config.ledger.directory, PathBuf::from("labels"));
        assert_eq!(config.printer.cooldown_ms, 1500);
        assert!(config.chat.endpoint.is_none());
        assert_eq!(config.pipeline, PipelineSettings::default());
    }

    #[test]
    fn test_session_section_survives_rewrite() {
        let mut config = FileConfig::default();
        let id = ShowId::from_name("Friday Show").unwrap();
        config
            .session
            .shows
            .insert(id.clone(), ShowRecord::new(&id, "Friday Show"));
        config.session.current_show = Some(id.clone());

        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: FileConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.session.current_show, Some(id.clone()));
        assert_eq!(parsed.session.shows[&id].name, "Friday Show");
        assert!(parsed.session.shows[&id].ended_at.is_none());
    }
}
