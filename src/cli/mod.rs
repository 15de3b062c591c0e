//! CLI command implementations for the contract inspector panel.
//!
//! Provides subcommand handlers for:
//! - `inspector status` / `watch` — connectivity checks against the server
//! - `inspector upload <file>` / `analyze` — run the panel flow
//! - `inspector reports` / `dismiss` / `clear` / `export` — stored reports
//! - `inspector serve` — local panel viewer
//! - `inspector config show|init|set|reset` — configuration management
//! - `inspector log` — recent activity

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::activity::{self, ActivityEntry, Level};
use crate::client::{PdfUpload, ServerClient};
use crate::config::{self, schema::InspectorConfig};
use crate::history::ReportHistory;
use crate::history::store::FileStore;
use crate::monitor::{Connectivity, ConnectivityMonitor, StatusIndicator};
use crate::panel::render;
use crate::panel::{AnalyzeOutcome, MemoryPanel, ReportPanel, SubmitOutcome};
use crate::utils::clock::{Clock, SystemClock};
use crate::web;

type CliPanel = ReportPanel<ServerClient, FileStore, MemoryPanel>;

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            _ => Self::Table,
        }
    }
}

fn open_history(cfg: &InspectorConfig) -> Result<ReportHistory<FileStore>> {
    let store = FileStore::open_default().context("no data directory for the report history")?;
    Ok(ReportHistory::with_settings(
        store,
        &cfg.history.key,
        cfg.history.capacity,
    ))
}

fn build_panel(cfg: &InspectorConfig) -> Result<CliPanel> {
    Ok(ReportPanel::new(
        ServerClient::from_config(&cfg.server),
        open_history(cfg)?,
        MemoryPanel::new(),
        cfg.panel.clone(),
    ))
}

fn print_panel(panel: &CliPanel) {
    print!("{}", render::terminal(panel.host(), panel.container()));
}

/// Sleep until every card exit under way has finished, then settle.
fn finish_transitions(panel: &mut CliPanel) {
    let last_exit = panel
        .card_ids()
        .iter()
        .filter_map(|id| panel.card(id).and_then(|c| c.leaving_at))
        .max();
    if let Some(at) = last_exit
        && let Ok(wait) = (at - SystemClock.now()).to_std()
    {
        thread::sleep(wait);
    }
    panel.settle();
}

// ---------------------------------------------------------------------------
// inspector status | watch
// ---------------------------------------------------------------------------

/// Probe the analysis server once.
pub fn run_status(cfg: &InspectorConfig, format: OutputFormat) -> Result<()> {
    let client = ServerClient::from_config(&cfg.server);
    let url = client.health_url();
    let monitor = ConnectivityMonitor::new(client, monitor_interval(cfg, None));
    monitor.check_now();
    let indicator = monitor.indicator();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "online": indicator.is_online(),
                "state": indicator.state,
                "text": indicator.text,
                "url": url,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            println!("{}", "Analysis Server".bold().cyan());
            println!("{}", "=".repeat(40));
            print_indicator(&indicator, &url);
        }
    }
    Ok(())
}

/// Probe on an interval, printing every state the indicator shows.
pub fn run_watch(cfg: &InspectorConfig, interval: Option<u64>, count: Option<u64>) -> Result<()> {
    let client = ServerClient::from_config(&cfg.server);
    let url = client.health_url();
    let monitor = ConnectivityMonitor::new(client, monitor_interval(cfg, interval));

    println!(
        "{} {} every {}s {}",
        "Watching".bold().cyan(),
        url,
        monitor.interval().as_secs(),
        "(Ctrl+C to stop)".dimmed()
    );
    monitor.run(count, |indicator| print_indicator(indicator, &url));
    Ok(())
}

fn monitor_interval(cfg: &InspectorConfig, override_secs: Option<u64>) -> Duration {
    Duration::from_secs(override_secs.unwrap_or(cfg.monitor.interval_secs).max(1))
}

fn print_indicator(indicator: &StatusIndicator, url: &str) {
    let time = chrono::Local::now().format("%H:%M:%S").to_string();
    let state = match indicator.state {
        Connectivity::Online => "● online".green().bold(),
        Connectivity::Offline => "● offline".red().bold(),
        Connectivity::Unknown => "● unknown".yellow(),
    };
    let detail = if indicator.text.is_empty() {
        url.to_string()
    } else {
        indicator.text.clone()
    };
    println!("  {} {} {}", time.dimmed(), state, detail.dimmed());
}

// ---------------------------------------------------------------------------
// inspector upload | analyze
// ---------------------------------------------------------------------------

/// Upload one file and follow it through to a rendered report.
pub fn run_upload(cfg: &InspectorConfig, file: &Path) -> Result<()> {
    let upload = PdfUpload::from_path(file)?;
    let mut panel = build_panel(cfg)?;
    panel.restore_all();

    println!(
        "{} {} ({})",
        "Uploading".bold().cyan(),
        upload.file_name,
        upload.size_kb()
    );

    match panel.submit(&upload) {
        SubmitOutcome::AnalysisScheduled { due_at } => {
            print_panel(&panel);
            if let Ok(wait) = (due_at - SystemClock.now()).to_std() {
                thread::sleep(wait);
            }
            if let Some(AnalyzeOutcome::Failed(_)) = panel.poll_due() {
                print_panel(&panel);
                anyhow::bail!("analysis failed");
            }
        }
        SubmitOutcome::Rendered { .. } => {}
        SubmitOutcome::Failed(_) => {
            print_panel(&panel);
            anyhow::bail!("upload failed");
        }
    }

    println!();
    print_panel(&panel);
    Ok(())
}

/// Request the analysis of the file the server already holds.
pub fn run_analyze(cfg: &InspectorConfig) -> Result<()> {
    let mut panel = build_panel(cfg)?;
    let outcome = panel.analyze();
    print_panel(&panel);
    match outcome {
        AnalyzeOutcome::Rendered { .. } => Ok(()),
        AnalyzeOutcome::Failed(_) => anyhow::bail!("analysis failed"),
    }
}

// ---------------------------------------------------------------------------
// inspector reports | dismiss | clear | export
// ---------------------------------------------------------------------------

/// Show the stored reports, optionally expanding one.
pub fn run_reports(cfg: &InspectorConfig, expand: Option<&str>, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        let records = open_history(cfg)?.load()?;
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let mut panel = build_panel(cfg)?;
    if panel.restore_all() == 0 {
        println!(
            "{}",
            "No saved reports yet. Run `inspector upload <file>` to create one.".yellow()
        );
        return Ok(());
    }

    if let Some(id) = expand
        && panel.toggle(id).is_none()
    {
        println!("{} no report with id {}", "✗".red().bold(), id.bold());
    }
    print_panel(&panel);
    Ok(())
}

/// Dismiss one stored report.
pub fn run_dismiss(cfg: &InspectorConfig, id: &str) -> Result<()> {
    let mut panel = build_panel(cfg)?;
    panel.restore_all();

    if !panel.dismiss(id, None) {
        println!("{} no report with id {}", "·".dimmed(), id.bold());
        return Ok(());
    }
    finish_transitions(&mut panel);
    println!("{} Removed {}", "✓".green().bold(), id.bold());
    Ok(())
}

/// Remove every stored report.
pub fn run_clear(cfg: &InspectorConfig) -> Result<()> {
    let mut panel = build_panel(cfg)?;
    panel.restore_all();
    panel.clear_all();
    finish_transitions(&mut panel);
    print_panel(&panel);
    Ok(())
}

/// Write a standalone HTML page with every stored report.
pub fn run_export(cfg: &InspectorConfig, out: &Path) -> Result<()> {
    let records = open_history(cfg)?.load()?;
    let client = ServerClient::from_config(&cfg.server);
    let page = web::frontend::render_page(&records, client.base_url(), false);
    fs::write(out, page).with_context(|| format!("failed to write {}", out.display()))?;

    activity::info("cli", format!("exported {} reports to {}", records.len(), out.display()));
    println!(
        "{} Exported {} reports to {}",
        "✓".green().bold(),
        records.len(),
        out.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// inspector serve
// ---------------------------------------------------------------------------

pub fn run_serve(cfg: &InspectorConfig, addr: Option<&str>) -> Result<()> {
    let addr = addr.unwrap_or(&cfg.web.addr);
    web::serve(addr, cfg)
}

// ---------------------------------------------------------------------------
// inspector config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective Inspector Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    if global_exists {
        println!("  {} {}", "✓".green(), "~/.inspector/config.toml".dimmed());
    } else {
        println!(
            "  {} {}",
            "·".dimmed(),
            "~/.inspector/config.toml (not found)".dimmed()
        );
    }
    if project_exists {
        println!("  {} {}", "✓".green(), ".inspector.toml".dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), ".inspector.toml (not found)".dimmed());
    }
    println!(
        "  {} {}",
        "·".dimmed(),
        "INSPECTOR_* environment variables".dimmed()
    );

    Ok(())
}

/// Initialize a default config file at `~/.inspector/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!(
        "  {}",
        "Edit the file to point the panel at your analysis server.".dimmed()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// inspector log
// ---------------------------------------------------------------------------

/// Print the most recent activity log entries.
pub fn run_log(lines: usize, format: OutputFormat) -> Result<()> {
    let entries = activity::read_recent(lines);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", "No activity recorded yet.".yellow());
        return Ok(());
    }
    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}

fn format_entry(entry: &ActivityEntry) -> String {
    let level = match entry.level {
        Level::Info => "info ".normal(),
        Level::Warn => "warn ".yellow(),
        Level::Error => "error".red().bold(),
    };
    let time = chrono::DateTime::parse_from_rfc3339(&entry.timestamp)
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|_| entry.timestamp.clone());
    format!(
        "{} {} {:<8} {}",
        time.dimmed(),
        level,
        truncate(&entry.component, 8),
        entry.message
    )
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
