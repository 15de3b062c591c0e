use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use inspector_panel::{activity, cli, config};

#[derive(Debug, Parser)]
#[command(name = "inspector")]
#[command(about = "Upload contracts for analysis and manage the report panel")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Probe the analysis server once
    Status {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Keep probing the analysis server on an interval
    Watch {
        /// Seconds between probes (default: monitor.interval_secs)
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after this many probes
        #[arg(long)]
        count: Option<u64>,
    },
    /// Upload a contract PDF and render its analysis report
    Upload {
        /// Path to the PDF
        file: PathBuf,
    },
    /// Request the analysis of the file the server already holds
    Analyze,
    /// Show the saved reports
    Reports {
        /// Expand the report with this id
        #[arg(long)]
        expand: Option<String>,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Remove one saved report
    Dismiss {
        /// Report id, e.g. report-1767225600000
        id: String,
    },
    /// Remove every saved report
    Clear,
    /// Write the saved reports to a standalone HTML page
    Export {
        #[arg(long, default_value = "inspector-reports.html")]
        out: PathBuf,
    },
    /// Serve the report panel in the browser
    Serve {
        /// Listen address (default: web.addr)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show recent activity
    Log {
        #[arg(long, default_value = "20")]
        lines: usize,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default config file to ~/.inspector/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set one value, e.g. `server.port 5050`
    Set { key: String, value: String },
    /// Reset the global config file to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();
    let cfg = config::load();
    activity::set_enabled(cfg.logging.enabled);

    match app.command {
        Commands::Status { format } => {
            cli::run_status(&cfg, cli::OutputFormat::from_str_opt(Some(&format)))
        }
        Commands::Watch { interval, count } => cli::run_watch(&cfg, interval, count),
        Commands::Upload { file } => cli::run_upload(&cfg, &file),
        Commands::Analyze => cli::run_analyze(&cfg),
        Commands::Reports { expand, format } => cli::run_reports(
            &cfg,
            expand.as_deref(),
            cli::OutputFormat::from_str_opt(Some(&format)),
        ),
        Commands::Dismiss { id } => cli::run_dismiss(&cfg, &id),
        Commands::Clear => cli::run_clear(&cfg),
        Commands::Export { out } => cli::run_export(&cfg, &out),
        Commands::Serve { addr } => cli::run_serve(&cfg, addr.as_deref()),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
        Commands::Log { lines, format } => {
            cli::run_log(lines, cli::OutputFormat::from_str_opt(Some(&format)))
        }
    }
}
