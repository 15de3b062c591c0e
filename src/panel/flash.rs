//! Flash notifications.
//!
//! At most one flash per severity is visible in a container: showing a new
//! one removes any existing flash of the same severity there first. New
//! flashes go to the front of the container. After its duration a flash
//! fades out for [`FADE_OUT_MS`] and is then removed by [`expire_flashes`].

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::host::{FlashNode, Node, NodeKind, PanelHost};

/// Default flash lifetime.
pub const DEFAULT_DURATION_MS: u64 = 2_000;

/// Length of the fade/slide-out transition.
pub const FADE_OUT_MS: i64 = 500;

static NEXT_FLASH: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Error,
}

impl Severity {
    pub fn class(self) -> &'static str {
        match self {
            Self::Success => "flash-success",
            Self::Info => "flash-info",
            Self::Error => "flash-error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Info => write!(f, "info"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Show `message` in `container`, replacing any same-severity flash there.
///
/// Returns the id of the created node.
pub fn show_flash<H: PanelHost + ?Sized>(
    host: &mut H,
    container: &str,
    severity: Severity,
    message: impl Into<String>,
    duration_ms: u64,
    now: DateTime<Utc>,
) -> String {
    host.retain(container, &mut |node| {
        !matches!(&node.kind, NodeKind::Flash(f) if f.severity == severity)
    });

    let id = format!(
        "flash-{severity}-{}",
        NEXT_FLASH.fetch_add(1, Ordering::Relaxed)
    );
    let duration = Duration::milliseconds(duration_ms.min(u64::from(u32::MAX)) as i64);

    host.insert_front(
        container,
        Node {
            id: id.clone(),
            kind: NodeKind::Flash(FlashNode {
                severity,
                message: message.into(),
                expires_at: now + duration,
                fading_until: None,
            }),
        },
    );
    id
}

/// Advance flash transitions in `container` to `now`.
///
/// Expired flashes start fading; flashes whose fade has finished are
/// removed. Returns the number of removed flashes.
pub fn expire_flashes<H: PanelHost + ?Sized>(
    host: &mut H,
    container: &str,
    now: DateTime<Utc>,
) -> usize {
    let ids: Vec<String> = host
        .nodes(container)
        .iter()
        .filter(|n| n.as_flash().is_some())
        .map(|n| n.id.clone())
        .collect();

    let mut removed = 0;
    for id in ids {
        let Some(node) = host.node_mut(container, &id) else {
            continue;
        };
        let NodeKind::Flash(flash) = &mut node.kind else {
            continue;
        };

        if flash.fading_until.is_none() && now >= flash.expires_at {
            flash.fading_until = Some(flash.expires_at + Duration::milliseconds(FADE_OUT_MS));
        }
        if flash.fading_until.is_some_and(|until| now >= until) {
            host.remove(container, &id);
            removed += 1;
        }
    }
    removed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
