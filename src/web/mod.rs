//! Local panel viewer.
//!
//! A lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - The report panel page: stored reports as collapsible cards, the
//!   connectivity indicator and a clear-all button
//! - JSON endpoints for connectivity status and the stored report history
//!
//! Launched via `inspector serve` (default: `http://127.0.0.1:9750`).
//! Uploading happens through the CLI; the page only views and removes
//! reports.

mod api;
pub mod frontend;

use std::io::Cursor;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::activity;
use crate::client::{Probe, ServerClient};
use crate::config::schema::InspectorConfig;
use crate::history::store::FileStore;
use crate::history::{RecordStore, ReportHistory};

pub type HttpResponse = Response<Cursor<Vec<u8>>>;

/// Everything a request handler may touch.
pub struct WebState<S, P> {
    pub history: ReportHistory<S>,
    pub probe: P,
    /// Shown on the page and in `/api/status`.
    pub server_url: String,
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the panel viewer on `addr`.
///
/// Blocks the current thread. Handles requests sequentially (sufficient for
/// a local single-user viewer). Errors are answered per request without
/// stopping the server.
pub fn serve(addr: &str, config: &InspectorConfig) -> Result<()> {
    let store = FileStore::open_default().context("no data directory for the report history")?;
    let client = ServerClient::from_config(&config.server);
    let mut state = WebState {
        history: ReportHistory::with_settings(store, &config.history.key, config.history.capacity),
        server_url: client.base_url().to_string(),
        probe: client,
    };

    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("inspector panel running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");
    activity::info("web", format!("viewer listening on {addr}"));

    // Best-effort
    let url = format!("http://{addr}");
    let _ = open_browser(&url);

    for request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let response = match dispatch(&mut state, &method, &url) {
            Ok(resp) => resp,
            Err(e) => {
                activity::error("web", format!("{method} {url}: {e:#}"));
                error_response(500, &format!("{e:#}"))
            }
        };
        let _ = request.respond(response);

        println!(
            "{} {} {}",
            method,
            url,
            chrono::Local::now().format("%H:%M:%S")
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Route one request.
pub fn dispatch<S, P>(
    state: &mut WebState<S, P>,
    method: &Method,
    url: &str,
) -> Result<HttpResponse>
where
    S: RecordStore,
    P: Probe,
{
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (&Method::Get, "/") | (&Method::Get, "/index.html") => {
            let records = state.history.load()?;
            let page = frontend::render_page(&records, &state.server_url, true);
            Ok(html_response(page))
        }

        (&Method::Get, "/api/status") => api::get_status(&state.probe, &state.server_url),
        (&Method::Get, "/api/reports") => api::get_reports(&state.history),
        (&Method::Post, "/api/reports/clear") => api::post_clear(&mut state.history),
        (&Method::Delete, p) if p.starts_with("/api/reports/") => {
            let Ok(id) = urlencoding::decode(&p["/api/reports/".len()..]) else {
                return Ok(error_response(400, "report id is not valid UTF-8"));
            };
            if id.is_empty() {
                return Ok(not_found());
            }
            api::delete_report(&mut state.history, &id)
        }

        _ => Ok(not_found()),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn html_response(html: String) -> HttpResponse {
    Response::from_data(html.into_bytes())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
}

fn not_found() -> HttpResponse {
    error_response(404, "not found")
}

fn error_response(code: u16, message: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(code))
}

pub(crate) fn content_type_json() -> Header {
    header("Content-Type", "application/json; charset=utf-8")
}

fn content_type_html() -> Header {
    header("Content-Type", "text/html; charset=utf-8")
}

/// Build a header from static ASCII parts.
fn header(name: &'static str, value: &'static str) -> Header {
    match Header::from_bytes(name, value) {
        Ok(header) => header,
        Err(()) => unreachable!("static header {name} is valid ASCII"),
    }
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
