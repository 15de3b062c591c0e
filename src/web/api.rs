//! JSON API handlers for the panel viewer.
//!
//! Each handler corresponds to an API endpoint and returns a response with
//! JSON content.

use anyhow::{Context, Result};
use serde::Serialize;
use tiny_http::{Response, StatusCode};

use crate::activity;
use crate::client::Probe;
use crate::history::{RecordStore, ReportHistory, ReportRecord};
use crate::monitor::StatusIndicator;

use super::{HttpResponse, content_type_json};

// ---------------------------------------------------------------------------
// JSON response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct StatusResponse<'a> {
    online: bool,
    state: &'static str,
    text: String,
    base_url: &'a str,
}

#[derive(Serialize)]
struct ReportsResponse {
    capacity: usize,
    reports: Vec<ReportRecord>,
}

#[derive(Serialize)]
struct RemoveResponse {
    success: bool,
    removed: bool,
}

#[derive(Serialize)]
struct ClearResponse {
    success: bool,
    removed: usize,
}

fn json_response<T: Serialize>(data: &T) -> Result<HttpResponse> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/status` — probe the analysis server once.
pub fn get_status<P: Probe>(probe: &P, base_url: &str) -> Result<HttpResponse> {
    let mut indicator = StatusIndicator::default();
    indicator.apply(&probe.probe());

    json_response(&StatusResponse {
        online: indicator.is_online(),
        state: indicator.state.class(),
        text: indicator.text,
        base_url,
    })
}

/// `GET /api/reports` — stored reports, oldest first.
pub fn get_reports<S: RecordStore>(history: &ReportHistory<S>) -> Result<HttpResponse> {
    json_response(&ReportsResponse {
        capacity: history.capacity(),
        reports: history.load()?,
    })
}

/// `DELETE /api/reports/{id}` — remove one stored report.
pub fn delete_report<S: RecordStore>(
    history: &mut ReportHistory<S>,
    id: &str,
) -> Result<HttpResponse> {
    let removed = history.remove(id)?;
    if removed {
        activity::info("web", format!("removed {id}"));
    }
    json_response(&RemoveResponse {
        success: true,
        removed,
    })
}

/// `POST /api/reports/clear` — remove every stored report.
pub fn post_clear<S: RecordStore>(history: &mut ReportHistory<S>) -> Result<HttpResponse> {
    let removed = history.len()?;
    history.clear().context("failed to clear report history")?;
    activity::info("web", format!("cleared {removed} saved reports"));
    json_response(&ClearResponse {
        success: true,
        removed,
    })
}
