//! Wire types for the analysis server's JSON replies.
use serde::Deserialize;

use super::error::ClientError;

/// Body of `POST /upload` and `GET /analyze` replies.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyBody {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// Informational text some deployments send alongside a pending upload.
    #[serde(default)]
    pub message: Option<String>,
}

/// A successful reply, reduced to what the panel acts on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisReply {
    /// The rendered report. `None` when the server only stored the file.
    pub html: Option<String>,
    pub message: Option<String>,
}

impl AnalysisReply {
    pub fn with_html(html: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            message: None,
        }
    }

    pub fn pending() -> Self {
        Self::default()
    }
}

/// Turn a raw response body into a reply or an application-level error.
pub fn parse_reply(text: &str) -> Result<AnalysisReply, ClientError> {
    let body: ReplyBody = serde_json::from_str(text).map_err(|e| {
        ClientError::MalformedBody(format!("{e} (body starts with {:?})", preview(text, 200)))
    })?;

    if !body.success {
        let reason = body
            .error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "unknown server error".to_string());
        return Err(ClientError::Rejected(reason));
    }

    Ok(AnalysisReply {
        html: body.html.filter(|h| !h.is_empty()),
        message: body.message,
    })
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
