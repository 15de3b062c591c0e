//! Rendering panel nodes as HTML (for the viewer and exports) and as plain
//! terminal text (for the CLI).

use std::sync::LazyLock;

use colored::Colorize;
use regex::Regex;

use super::flash::Severity;
use super::host::{NodeKind, PanelHost, ReportCard};

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

/// Escape text for use inside HTML element content or quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Markup of one report card.
///
/// The title is escaped; the report body is server-supplied HTML and is
/// inserted verbatim.
pub fn card_html(card: &ReportCard) -> String {
    let id = escape_html(&card.id);
    let expanded = if card.expanded { " expanded" } else { "" };
    let display = if card.expanded { "block" } else { "none" };
    format!(
        r#"<div class="report-card{expanded}" id="{id}">
  <div class="report-header" data-report="{id}">
    <h3>{title}</h3>
    <div class="report-controls">
      <button class="toggle-btn" title="Expand/collapse">{glyph}</button>
      <button class="close-btn" data-close="{id}" title="Close report">&times;</button>
    </div>
  </div>
  <div class="report-content" style="display: {display}">{body}</div>
</div>"#,
        title = escape_html(&card.title),
        glyph = card.glyph(),
        body = card.html,
    )
}

// ---------------------------------------------------------------------------
// Plain text
// ---------------------------------------------------------------------------

static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|h[1-6]|tr|table|ul|ol|section)>")
        .expect("break regex must compile")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").expect("tag regex must compile"));

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(?:script|style)>")
        .expect("script regex must compile")
});

/// Reduce an HTML fragment to readable text: block ends become line breaks,
/// tags are dropped, common entities decoded, blank runs collapsed.
pub fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, "");
    let with_breaks = BREAK_RE.replace_all(&without_scripts, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    let decoded = decode_entities(&stripped);

    let mut lines: Vec<String> = Vec::new();
    for line in decoded.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() && lines.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&times;", "×")
        .replace("&amp;", "&")
}

/// Render a container for the terminal. Collapsed cards show only their
/// header line.
pub fn terminal<H: PanelHost + ?Sized>(host: &H, container: &str) -> String {
    let mut out = String::new();
    for node in host.nodes(container) {
        match &node.kind {
            NodeKind::Flash(flash) => {
                let line = format!("[{}] {}", flash.severity, flash.message);
                let line = match flash.severity {
                    Severity::Success => line.green(),
                    Severity::Info => line.cyan(),
                    Severity::Error => line.red().bold(),
                };
                out.push_str(&format!("{line}\n"));
            }
            NodeKind::Loading { message } => {
                out.push_str(&format!("{} {}\n", "…".dimmed(), message.dimmed()));
            }
            NodeKind::FileInfo {
                name,
                size,
                content_type,
            } => {
                out.push_str(&format!("  {} {}\n", "Name:".bold(), name));
                out.push_str(&format!("  {} {}\n", "Size:".bold(), size));
                out.push_str(&format!("  {} {}\n", "Type:".bold(), content_type));
            }
            NodeKind::Card(card) => {
                out.push_str(&format!(
                    "{} {}  {}\n",
                    card.glyph(),
                    card.title.bold(),
                    card.id.dimmed()
                ));
                if card.expanded {
                    for line in html_to_text(&card.html).lines() {
                        out.push_str(&format!("    {line}\n"));
                    }
                }
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
