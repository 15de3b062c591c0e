//! HTTP client for the contract analysis server.
//!
//! Talks to the server with the synchronous `ureq` client. Provides:
//!
//! - **Liveness probe**: `GET {base}/` (or `/status`), cache-busted.
//! - **Upload**: `POST {base}/upload` with the PDF as a multipart `file` part.
//! - **Analyze**: `GET {base}/analyze?format=html`, cache-busted.
//!
//! The server is an external collaborator; nothing here knows how the
//! analysis is produced. The [`Probe`] and [`AnalysisServer`] traits are the
//! seams the monitor and the panel are written against, so both can be
//! driven by fakes in tests.
pub mod error;
pub mod multipart;
pub mod protocol;

use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;

use crate::config::schema::ServerConfig;

pub use error::ClientError;
pub use protocol::AnalysisReply;

use multipart::MultipartForm;

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Liveness check against the server root.
pub trait Probe {
    /// `Ok` iff the server answered 2xx with a JSON body.
    fn probe(&self) -> Result<(), ClientError>;
}

/// The two analysis endpoints.
pub trait AnalysisServer {
    fn upload(&self, file: &PdfUpload) -> Result<AnalysisReply, ClientError>;
    fn analyze(&self) -> Result<AnalysisReply, ClientError>;
}

// ---------------------------------------------------------------------------
// Upload payload
// ---------------------------------------------------------------------------

/// A file selected for upload, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PdfUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Read a file from disk. The upload keeps only the final path component
    /// as its file name.
    pub fn from_path(path: &Path) -> Result<Self, ClientError> {
        let bytes = fs::read(path).map_err(|source| ClientError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input.pdf".to_string());
        Ok(Self::new(file_name, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Size in kilobytes with two decimals, e.g. `"200.00 KB"`.
    pub fn size_kb(&self) -> String {
        format!("{:.2} KB", self.bytes.len() as f64 / 1024.0)
    }
}

/// MIME type from the file extension.
fn content_type_for(file_name: &str) -> &'static str {
    let is_pdf = Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}

// ---------------------------------------------------------------------------
// URL helpers
// ---------------------------------------------------------------------------

/// Base URL of the analysis server for a page served from `host`.
///
/// Loopback names map to `127.0.0.1` (avoids slow IPv6 `localhost`
/// resolution); any other host is assumed to run the server itself on the
/// same fixed port.
pub fn resolve_base_url(host: &str, port: u16) -> String {
    let host = host.trim();
    if is_loopback(host) {
        format!("http://127.0.0.1:{port}")
    } else {
        format!("http://{host}:{port}")
    }
}

fn is_loopback(host: &str) -> bool {
    matches!(
        host.to_ascii_lowercase().as_str(),
        "" | "localhost" | "127.0.0.1" | "::1" | "[::1]"
    )
}

/// Base URL from config: an explicit `base_url` wins over host/port.
pub fn base_url_for(config: &ServerConfig) -> String {
    match config.base_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
        _ => resolve_base_url(&config.host, config.port),
    }
}

/// Append a `t={millis}` query parameter so no cache can answer for the server.
pub fn cache_busted(url: &str, millis: i64) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}t={millis}")
}

/// Join a base URL and an endpoint path with exactly one slash.
fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Synchronous analysis-server client.
///
/// Holds no connection state; cheap to clone and safe to share across the
/// monitor's probe threads.
#[derive(Debug, Clone)]
pub struct ServerClient {
    base_url: String,
    health_path: String,
    timeout: Duration,
    probe_timeout: Duration,
}

impl ServerClient {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            base_url: base_url_for(config),
            health_path: config.health_path.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health_url(&self) -> String {
        join(&self.base_url, &self.health_path)
    }

    pub fn upload_url(&self) -> String {
        join(&self.base_url, "upload")
    }

    pub fn analyze_url(&self) -> String {
        join(&self.base_url, "analyze?format=html")
    }

    fn read_reply(response: ureq::Response) -> Result<AnalysisReply, ClientError> {
        let text = read_body(response.into_reader())?;
        protocol::parse_reply(&text)
    }
}

/// Read a whole response body. Unlike `Response::into_string` there is no
/// size cap, so large reports are not mistaken for a dead connection.
fn read_body(mut reader: impl Read) -> Result<String, ClientError> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| ClientError::Transport(format!("failed to read response body: {e}")))?;
    Ok(text)
}

impl Probe for ServerClient {
    fn probe(&self) -> Result<(), ClientError> {
        let url = cache_busted(&self.health_url(), Utc::now().timestamp_millis());
        let response = ureq::get(&url).timeout(self.probe_timeout).call()?;
        response
            .into_json::<serde_json::Value>()
            .map_err(|e| ClientError::MalformedBody(e.to_string()))?;
        Ok(())
    }
}

impl AnalysisServer for ServerClient {
    fn upload(&self, file: &PdfUpload) -> Result<AnalysisReply, ClientError> {
        let mut form = MultipartForm::new();
        form.add_file("file", &file.file_name, &file.content_type, &file.bytes);
        let content_type = form.content_type();

        let response = ureq::post(&self.upload_url())
            .timeout(self.timeout)
            .set("Content-Type", &content_type)
            .send_bytes(&form.finish())?;

        Self::read_reply(response)
    }

    fn analyze(&self) -> Result<AnalysisReply, ClientError> {
        let url = cache_busted(&self.analyze_url(), Utc::now().timestamp_millis());
        let response = ureq::get(&url).timeout(self.timeout).call()?;
        Self::read_reply(response)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_hosts_resolve_to_127() {
        assert_eq!(resolve_base_url("localhost", 5000), "http://127.0.0.1:5000");
        assert_eq!(resolve_base_url("127.0.0.1", 5050), "http://127.0.0.1:5050");
        assert_eq!(resolve_base_url("LOCALHOST", 5000), "http://127.0.0.1:5000");
    }

    #[test]
    fn remote_host_keeps_name_and_port() {
        assert_eq!(
            resolve_base_url("192.168.1.20", 5000),
            "http://192.168.1.20:5000"
        );
        assert_eq!(resolve_base_url("inspector.lan", 5050), "http://inspector.lan:5050");
    }

    #[test]
    fn explicit_base_url_wins() {
        let config = ServerConfig {
            base_url: Some("http://box:8080/".to_string()),
            ..ServerConfig::default()
        };
        assert_eq!(base_url_for(&config), "http://box:8080");
        assert_eq!(base_url_for(&ServerConfig::default()), "http://127.0.0.1:5000");
    }

    #[test]
    fn cache_buster_picks_separator() {
        assert_eq!(cache_busted("http://h/", 42), "http://h/?t=42");
        assert_eq!(
            cache_busted("http://h/analyze?format=html", 42),
            "http://h/analyze?format=html&t=42"
        );
    }

    #[test]
    fn endpoint_urls() {
        let client = ServerClient::from_config(&ServerConfig {
            health_path: "/status".to_string(),
            ..ServerConfig::default()
        });
        assert_eq!(client.health_url(), "http://127.0.0.1:5000/status");
        assert_eq!(client.upload_url(), "http://127.0.0.1:5000/upload");
        assert_eq!(
            client.analyze_url(),
            "http://127.0.0.1:5000/analyze?format=html"
        );

        let root = ServerClient::from_config(&ServerConfig::default());
        assert_eq!(root.health_url(), "http://127.0.0.1:5000/");
    }

    #[test]
    fn upload_metadata() {
        let upload = PdfUpload::new("contract.pdf", vec![0u8; 200 * 1024]);
        assert_eq!(upload.content_type, "application/pdf");
        assert_eq!(upload.size(), 204_800);
        assert_eq!(upload.size_kb(), "200.00 KB");

        let other = PdfUpload::new("notes.txt", vec![1, 2, 3]);
        assert_eq!(other.content_type, "application/octet-stream");
        assert_eq!(other.size_kb(), "0.00 KB");
    }

    #[test]
    fn from_path_reads_file_name_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Contract.PDF");
        fs::write(&path, b"%PDF-1.7").unwrap();

        let upload = PdfUpload::from_path(&path).unwrap();
        assert_eq!(upload.file_name, "Contract.PDF");
        assert_eq!(upload.content_type, "application/pdf");
        assert_eq!(upload.bytes, b"%PDF-1.7");
    }

    #[test]
    fn from_path_missing_file_is_io_error() {
        let err = PdfUpload::from_path(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, ClientError::Io { .. }));
    }

    #[test]
    fn large_bodies_are_read_whole() {
        let html = "x".repeat(11 * 1024 * 1024);
        let body = serde_json::json!({ "success": true, "html": html }).to_string();
        let text = read_body(std::io::Cursor::new(body.into_bytes())).unwrap();
        let reply = protocol::parse_reply(&text).unwrap();
        assert_eq!(reply.html.map(|h| h.len()), Some(11 * 1024 * 1024));
    }

    #[test]
    fn probe_against_closed_port_is_transport_error() {
        let client = ServerClient::from_config(&ServerConfig {
            base_url: Some("http://127.0.0.1:9".to_string()),
            probe_timeout_ms: 500,
            ..ServerConfig::default()
        });
        let err = client.probe().unwrap_err();
        assert!(err.is_transport());
    }
}
