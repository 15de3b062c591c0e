//! Configuration schema and defaults for the inspector panel.
//!
//! Defines the TOML-serializable configuration structure with all sections:
//! `[server]`, `[monitor]`, `[panel]`, `[history]`, `[web]`, and
//! `[logging]`.
//!
//! Every field has a sensible built-in default. Users only need to set the
//! values they want to override.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level inspector configuration.
///
/// Maps directly to the `~/.inspector/config.toml` and `.inspector.toml`
/// file schemas. All sections and fields are optional; missing values fall
/// back to built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    pub server: ServerConfig,
    pub monitor: MonitorConfig,
    pub panel: PanelConfig,
    pub history: HistoryConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [server]
// ---------------------------------------------------------------------------

/// Where the analysis server lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Hostname the panel is "served from". Loopback names resolve to
    /// `127.0.0.1`; anything else is used as-is with [`port`](Self::port).
    pub host: String,
    /// Fixed analysis-server port.
    pub port: u16,
    /// Explicit base URL. When set, `host` and `port` are ignored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Liveness endpoint, `/` or `/status` depending on the deployment.
    pub health_path: String,
    /// Timeout for upload and analyze requests (milliseconds).
    pub timeout_ms: u64,
    /// Timeout for a single liveness probe (milliseconds).
    pub probe_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5000,
            base_url: None,
            health_path: "/".to_string(),
            timeout_ms: 120_000,
            probe_timeout_ms: 5_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [monitor]
// ---------------------------------------------------------------------------

/// Connectivity monitor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between liveness probes.
    pub interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { interval_secs: 10 }
    }
}

// ---------------------------------------------------------------------------
// [panel]
// ---------------------------------------------------------------------------

/// Report panel behavior and feature toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Show flash notifications.
    pub flash_messages: bool,
    /// Mirror rendered reports into the local history.
    pub persistence: bool,
    /// Default flash lifetime (milliseconds).
    pub flash_duration_ms: u64,
    /// Lifetime of upload/analyze error flashes (milliseconds).
    pub error_flash_duration_ms: u64,
    /// Delay before the follow-up analyze request (milliseconds).
    pub analyze_delay_ms: u64,
    /// Expand a freshly created report card.
    pub auto_expand: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            flash_messages: true,
            persistence: true,
            flash_duration_ms: 2_000,
            error_flash_duration_ms: 5_000,
            analyze_delay_ms: 1_000,
            auto_expand: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [history]
// ---------------------------------------------------------------------------

/// Report history storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of stored reports; the oldest is evicted first.
    pub capacity: usize,
    /// Storage key the record list lives under.
    pub key: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            key: "contractReports".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [web] / [logging]
// ---------------------------------------------------------------------------

/// Local panel viewer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub addr: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9750".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write the activity log (`~/.inspector/activity.jsonl`).
    pub enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ---------------------------------------------------------------------------
// Annotated default file
// ---------------------------------------------------------------------------

impl InspectorConfig {
    /// The annotated TOML written by `inspector config init`.
    pub fn default_toml() -> &'static str {
        DEFAULT_CONFIG_TOML
    }
}

const DEFAULT_CONFIG_TOML: &str = r#"# inspector configuration
#
# Precedence (lowest to highest): built-in defaults, this file,
# ./.inspector.toml, INSPECTOR_* environment variables.

[server]
# Hostname the panel is served from. localhost / 127.0.0.1 resolve to the
# loopback server; any other name is contacted directly on `port`.
host = "localhost"
port = 5000
# base_url = "http://10.0.0.5:5050"
# Liveness endpoint: "/" or "/status".
health_path = "/"
timeout_ms = 120000
probe_timeout_ms = 5000

[monitor]
interval_secs = 10

[panel]
flash_messages = true
persistence = true
flash_duration_ms = 2000
error_flash_duration_ms = 5000
analyze_delay_ms = 1000
auto_expand = true

[history]
capacity = 5
key = "contractReports"

[web]
addr = "127.0.0.1:9750"

[logging]
enabled = true
"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
