//! Embedded HTML/CSS/JS for the panel page.
//!
//! The whole page is compiled into the binary as a string template. No
//! external assets, no build tools, no CDN dependencies. The same page backs
//! `inspector serve` (live, talks to the JSON API) and `inspector export`
//! (a static snapshot that only toggles cards locally).

use crate::history::ReportRecord;
use crate::panel::ReportCard;
use crate::panel::render::{card_html, escape_html};

/// Render the panel page for `records`, oldest first. Cards start collapsed.
pub fn render_page(records: &[ReportRecord], server_url: &str, live: bool) -> String {
    let cards = if records.is_empty() {
        r#"<p class="empty" id="empty-note">No saved reports.</p>"#.to_string()
    } else {
        records
            .iter()
            .map(|r| card_html(&ReportCard::new(&r.id, &r.title, &r.html)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    PAGE_TEMPLATE
        .replace("{{SERVER_URL}}", &escape_html(server_url))
        .replace("{{LIVE}}", if live { "true" } else { "false" })
        .replace("{{COUNT}}", &records.len().to_string())
        .replace("{{CARDS}}", &cards)
}

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Contract Inspector</title>
<style>
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --green: #3fb950;
  --red: #f85149;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

.app { max-width: 960px; margin: 0 auto; padding: 24px; }

header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-bottom: 24px;
  padding-bottom: 16px;
  border-bottom: 1px solid var(--border);
}
header h1 { font-size: 22px; font-weight: 600; }

.status { display: flex; align-items: center; gap: 8px; color: var(--text-muted); }
.status-dot { width: 10px; height: 10px; border-radius: 50%; background: var(--text-muted); }
.status-dot.online { background: var(--green); }
.status-dot.offline { background: var(--red); }

.toolbar { display: flex; justify-content: space-between; align-items: center; margin-bottom: 16px; }
.toolbar .muted { color: var(--text-muted); }
button {
  background: var(--surface);
  color: var(--text);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 6px 12px;
  cursor: pointer;
}
button:hover { border-color: var(--accent); }

.flash-message {
  padding: 10px 14px;
  margin-bottom: 12px;
  border-radius: var(--radius);
  border: 1px solid var(--border);
  transition: opacity .5s, transform .5s;
}
.flash-message.leaving { opacity: 0; transform: translateX(40px); }
.flash-success { border-color: var(--green); }
.flash-info { border-color: var(--accent); }
.flash-error { border-color: var(--red); }

.report-card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  margin-bottom: 12px;
  transition: opacity .3s, transform .3s;
}
.report-card.leaving { opacity: 0; transform: translateY(-10px); }
.report-header {
  display: flex;
  justify-content: space-between;
  align-items: center;
  padding: 12px 16px;
  cursor: pointer;
}
.report-header h3 { font-size: 15px; font-weight: 600; }
.report-controls button { padding: 2px 8px; margin-left: 4px; }
.report-content { padding: 0 16px 16px; border-top: 1px solid var(--border); }
.empty { color: var(--text-muted); }
</style>
</head>
<body>
<div class="app">
  <header>
    <h1>Contract Inspector</h1>
    <div class="status" title="{{SERVER_URL}}">
      <span class="status-dot" id="status-dot"></span>
      <span id="status-text"></span>
    </div>
  </header>

  <div class="toolbar">
    <span class="muted"><span id="report-count">{{COUNT}}</span> saved reports</span>
    <button id="clear-all">Clear all reports</button>
  </div>

  <div id="panel-container">
{{CARDS}}
  </div>
</div>

<script>
const LIVE = {{LIVE}};
const container = document.getElementById('panel-container');

function flash(severity, message, duration) {
  container.querySelectorAll('.flash-' + severity).forEach(n => n.remove());
  const node = document.createElement('div');
  node.className = 'flash-message flash-' + severity;
  node.textContent = message;
  container.prepend(node);
  setTimeout(() => {
    node.classList.add('leaving');
    setTimeout(() => node.remove(), 500);
  }, duration || 2000);
}

function cards() {
  return Array.from(container.querySelectorAll('.report-card'));
}

function updateCount() {
  document.getElementById('report-count').textContent = cards().length;
}

function toggle(card) {
  const content = card.querySelector('.report-content');
  const button = card.querySelector('.toggle-btn');
  const expanded = card.classList.toggle('expanded');
  content.style.display = expanded ? 'block' : 'none';
  button.textContent = expanded ? '▲' : '▼';
}

function removeAfterFade(card, delay, onRemoved) {
  setTimeout(() => card.classList.add('leaving'), delay);
  setTimeout(() => {
    card.remove();
    updateCount();
    if (onRemoved) onRemoved();
  }, delay + 300);
}

async function api(method, path) {
  if (!LIVE) return null;
  const res = await fetch(path, { method });
  const body = await res.json();
  if (!res.ok) throw new Error(body.error || res.statusText);
  return body;
}

container.addEventListener('click', async (event) => {
  const close = event.target.closest('.close-btn');
  if (close) {
    event.stopPropagation();
    const card = close.closest('.report-card');
    if (card.classList.contains('leaving')) return;
    removeAfterFade(card, 0, async () => {
      try { await api('DELETE', '/api/reports/' + encodeURIComponent(card.id)); }
      catch (e) { flash('error', 'Error removing report: ' + e.message, 5000); }
    });
    return;
  }
  const header = event.target.closest('.report-header');
  if (header) toggle(header.closest('.report-card'));
});

document.getElementById('clear-all').addEventListener('click', async () => {
  const all = cards();
  if (all.length === 0) {
    flash('info', 'No saved reports to clear');
    return;
  }
  try {
    await api('POST', '/api/reports/clear');
  } catch (e) {
    flash('error', 'Error removing reports: ' + e.message, 5000);
    return;
  }
  all.forEach((card, i) => removeAfterFade(card, i * 100));
  flash('success', 'All reports removed');
});

async function refreshStatus() {
  const dot = document.getElementById('status-dot');
  const text = document.getElementById('status-text');
  try {
    const status = await api('GET', '/api/status?t=' + Date.now());
    dot.className = 'status-dot ' + status.state;
    text.textContent = status.text;
  } catch (e) {
    dot.className = 'status-dot offline';
    text.textContent = 'Server disconnected';
  }
}

if (LIVE) {
  refreshStatus();
  setInterval(refreshStatus, 10000);
  if (cards().length > 0) flash('info', 'Loaded ' + cards().length + ' saved reports');
} else {
  document.getElementById('clear-all').style.display = 'none';
  document.querySelectorAll('.close-btn').forEach(b => b.style.display = 'none');
}
</script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::panel::Severity;

    #[test]
    fn empty_history_shows_note() {
        let page = render_page(&[], "http://127.0.0.1:5000", true);
        assert!(page.contains("No saved reports."));
        assert!(page.contains("const LIVE = true;"));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn cards_render_collapsed_in_order() {
        let at = DateTime::from_timestamp(0, 0).unwrap();
        let records = [
            ReportRecord::new("report-1", "first.pdf", "<p>one</p>", at),
            ReportRecord::new("report-2", "second.pdf", "<p>two</p>", at),
        ];
        let page = render_page(&records, "http://h:5000", false);

        let first = page.find(r#"id="report-1""#).unwrap();
        let second = page.find(r#"id="report-2""#).unwrap();
        assert!(first < second);
        assert!(!page.contains("report-card expanded"));
        assert!(page.contains("const LIVE = false;"));
        assert!(page.contains(r#"<span id="report-count">2</span>"#));
    }

    #[test]
    fn every_flash_severity_has_a_style() {
        let page = render_page(&[], "http://127.0.0.1:5000", true);
        for severity in [Severity::Success, Severity::Info, Severity::Error] {
            assert!(page.contains(&format!(".{} {{", severity.class())));
        }
        assert!(!page.contains("flash-warning"));
    }

    #[test]
    fn close_deletes_record_after_fade() {
        let page = render_page(&[], "http://127.0.0.1:5000", true);
        let fade = page.find("removeAfterFade(card, 0, async () => {").unwrap();
        let delete = page.find("api('DELETE'").unwrap();
        assert!(fade < delete);
        assert!(page.contains("if (onRemoved) onRemoved();"));
    }
}
