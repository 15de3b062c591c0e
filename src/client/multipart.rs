//! Minimal `multipart/form-data` encoder for ureq request bodies.
//!
//! Only what the upload endpoint needs: text fields and in-memory file
//! parts, encoded per RFC 7578 with CRLF line endings.
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        Self::with_boundary(format!("----inspector-{nanos:x}"))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn add_text(&mut self, name: &str, value: &str) -> &mut Self {
        self.open_part();
        self.push_line(&format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quoted(name)
        ));
        self.push_line("");
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn add_file(
        &mut self,
        name: &str,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> &mut Self {
        self.open_part();
        self.push_line(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
            escape_quoted(name),
            escape_quoted(filename)
        ));
        self.push_line(&format!("Content-Type: {content_type}"));
        self.push_line("");
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Close the form and return the encoded body.
    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }

    fn open_part(&mut self) {
        let line = format!("--{}", self.boundary);
        self.push_line(&line);
    }

    fn push_line(&mut self, line: &str) {
        self.body.extend_from_slice(line.as_bytes());
        self.body.extend_from_slice(b"\r\n");
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape a quoted-string parameter the way browsers do for form data.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_single_file_part() {
        let mut form = MultipartForm::with_boundary("XYZ");
        form.add_file("file", "contract.pdf", "application/pdf", b"%PDF-1.4");
        assert_eq!(form.content_type(), "multipart/form-data; boundary=XYZ");

        let body = String::from_utf8(form.finish()).unwrap();
        assert_eq!(
            body,
            "--XYZ\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"contract.pdf\"\r\n\
             Content-Type: application/pdf\r\n\
             \r\n\
             %PDF-1.4\r\n\
             --XYZ--\r\n"
        );
    }

    #[test]
    fn text_and_file_parts_share_boundary() {
        let mut form = MultipartForm::with_boundary("b");
        form.add_text("format", "html")
            .add_file("file", "a.pdf", "application/pdf", b"x");
        let body = String::from_utf8(form.finish()).unwrap();
        assert_eq!(body.matches("--b\r\n").count(), 2);
        assert!(body.ends_with("--b--\r\n"));
    }

    #[test]
    fn filename_quotes_and_newlines_are_escaped() {
        assert_eq!(escape_quoted("a\"b\r\n.pdf"), "a%22b%0D%0A.pdf");
    }

    #[test]
    fn generated_boundaries_have_prefix() {
        assert!(MultipartForm::new().boundary().starts_with("----inspector-"));
    }
}
