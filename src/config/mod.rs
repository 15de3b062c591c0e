/// Configuration system for the inspector panel.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults** — hardcoded in [`schema::InspectorConfig::default()`]
/// 2. **User global config** — `~/.inspector/config.toml`
/// 3. **Project local config** — `.inspector.toml` in the current working directory
/// 4. **Environment variables** — `INSPECTOR_*` overrides (highest precedence)
///
/// File layers are merged key by key: a project file that only sets
/// `server.port` keeps every other value from the layers below it.
///
/// # Usage
///
/// ```rust,ignore
/// use inspector_panel::config;
///
/// let cfg = config::load();
/// let base = inspector_panel::client::base_url_for(&cfg.server);
/// ```
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::InspectorConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars. Malformed files are skipped so a broken config never blocks the
/// panel from starting.
pub fn load() -> InspectorConfig {
    let mut merged = toml::Value::try_from(InspectorConfig::default())
        .unwrap_or_else(|_| toml::Value::Table(toml::map::Map::new()));

    for path in [global_config_path(), project_config_path()] {
        if let Some(layer) = load_toml_value(path) {
            merge_toml(&mut merged, layer);
        }
    }

    let mut config: InspectorConfig = merged.try_into().unwrap_or_default();
    apply_env_overrides(&mut config);
    config
}

/// Read a TOML file into a raw value tree. `None` if missing or malformed.
fn load_toml_value(path: Option<PathBuf>) -> Option<toml::Value> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    let value: toml::Value = toml::from_str(&content).ok()?;
    // Reject files whose shape does not fit the schema at all.
    value.clone().try_into::<InspectorConfig>().ok()?;
    Some(value)
}

/// Recursively merge `overlay` into `base`. Tables merge per key; every
/// other value in the overlay replaces the base value.
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Directory holding config, history and the activity log.
///
/// `INSPECTOR_HOME` relocates it; otherwise `~/.inspector`.
pub fn data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("INSPECTOR_HOME")
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::home_dir().map(|home| home.join(".inspector"))
}

/// Path to the user global config: `~/.inspector/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("config.toml"))
}

/// Path to the project local config: `.inspector.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".inspector.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `INSPECTOR_HOST` — page hostname used for base URL resolution
/// - `INSPECTOR_PORT` — analysis server port
/// - `INSPECTOR_BASE_URL` — explicit server base URL
/// - `INSPECTOR_HEALTH_PATH` — liveness endpoint path
/// - `INSPECTOR_FLASH` — flash notifications on/off
/// - `INSPECTOR_PERSIST` — history persistence on/off
/// - `INSPECTOR_MONITOR_INTERVAL_SECS` — probe interval
/// - `INSPECTOR_ANALYZE_DELAY_MS` — follow-up analyze delay
/// - `INSPECTOR_LOG` — activity log on/off
fn apply_env_overrides(config: &mut InspectorConfig) {
    if let Ok(val) = std::env::var("INSPECTOR_HOST")
        && !val.is_empty()
    {
        config.server.host = val;
    }
    if let Ok(val) = std::env::var("INSPECTOR_PORT")
        && let Ok(port) = val.parse::<u16>()
    {
        config.server.port = port;
    }
    if let Ok(val) = std::env::var("INSPECTOR_BASE_URL")
        && !val.is_empty()
    {
        config.server.base_url = Some(val);
    }
    if let Ok(val) = std::env::var("INSPECTOR_HEALTH_PATH")
        && !val.is_empty()
    {
        config.server.health_path = val;
    }

    if let Ok(val) = std::env::var("INSPECTOR_FLASH") {
        config.panel.flash_messages = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("INSPECTOR_PERSIST") {
        config.panel.persistence = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("INSPECTOR_MONITOR_INTERVAL_SECS")
        && let Ok(secs) = val.parse::<u64>()
        && secs > 0
    {
        config.monitor.interval_secs = secs;
    }
    if let Ok(val) = std::env::var("INSPECTOR_ANALYZE_DELAY_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.panel.analyze_delay_ms = ms;
    }
    if let Ok(val) = std::env::var("INSPECTOR_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.inspector/config.toml`.
///
/// Creates the data directory if needed. Returns an error if the file
/// already exists (use `force = true` to overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    fs::write(&path, InspectorConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Supports dotted keys like `server.port`. When the file does not exist yet
/// the serialized defaults are used as the starting point.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&InspectorConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    // Refuse to write something the schema would not load back.
    root.clone()
        .try_into::<InspectorConfig>()
        .with_context(|| format!("invalid value '{value}' for '{key}'"))?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
///
/// The leaf must already exist unless its section has room for optional
/// keys; new leaves are stored as strings.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    let mut current = root;
    for &part in sections {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let new_value = match table.get(*leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(toml::Value::Array(_)) => toml::Value::Array(
            raw_value
                .split(',')
                .map(|s| toml::Value::String(s.trim().to_string()))
                .collect(),
        ),
        Some(_) => toml::Value::String(raw_value.to_string()),
        None if sections.is_empty() => {
            anyhow::bail!("config key not found: '{key}'");
        }
        None => toml::Value::String(raw_value.to_string()),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
