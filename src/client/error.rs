use thiserror::Error;

/// Everything that can go wrong talking to the analysis server.
///
/// None of these escape the user action that triggered them: the panel turns
/// each one into an error notification.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection refused, DNS failure, timeout, broken stream.
    #[error("could not reach the server: {0}")]
    Transport(String),

    #[error("HTTP error: {code} {reason}")]
    Status { code: u16, reason: String },

    /// The body was not the JSON we expected.
    #[error("could not parse the server response: {0}")]
    MalformedBody(String),

    /// The server answered `success: false`.
    #[error("{0}")]
    Rejected(String),

    /// `success: true` without the HTML fragment the caller needed.
    #[error("no HTML content received from the server")]
    MissingHtml,

    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// Whether the server was reachable at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<ureq::Error> for ClientError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => Self::Status {
                code,
                reason: response.status_text().to_string(),
            },
            ureq::Error::Transport(transport) => Self::Transport(transport.to_string()),
        }
    }
}
