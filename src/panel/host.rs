//! The panel "document": named containers holding ordered nodes.
//!
//! [`PanelHost`] is the only way the manager touches what the user sees.
//! [`MemoryPanel`] is the in-process implementation the CLI renders from and
//! the tests inspect.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::flash::Severity;

/// Id of the main panel container.
pub const MAIN_CONTAINER: &str = "panel-container";

/// Node id of the loading indicator.
pub const LOADING_ID: &str = "loading-indicator";

/// Node id of the raw file-metadata fallback.
pub const FILE_INFO_ID: &str = "contract-info";

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Flash(FlashNode),
    Card(ReportCard),
    /// Spinner with a progress line.
    Loading { message: String },
    /// Raw metadata of a file the server could not process.
    FileInfo {
        name: String,
        size: String,
        content_type: String,
    },
}

impl Node {
    pub fn card(card: ReportCard) -> Self {
        Self {
            id: card.id.clone(),
            kind: NodeKind::Card(card),
        }
    }

    pub fn loading(message: impl Into<String>) -> Self {
        Self {
            id: LOADING_ID.to_string(),
            kind: NodeKind::Loading {
                message: message.into(),
            },
        }
    }

    pub fn file_info(name: &str, size: &str, content_type: &str) -> Self {
        Self {
            id: FILE_INFO_ID.to_string(),
            kind: NodeKind::FileInfo {
                name: name.to_string(),
                size: size.to_string(),
                content_type: content_type.to_string(),
            },
        }
    }

    pub fn as_card(&self) -> Option<&ReportCard> {
        match &self.kind {
            NodeKind::Card(card) => Some(card),
            _ => None,
        }
    }

    pub fn as_card_mut(&mut self) -> Option<&mut ReportCard> {
        match &mut self.kind {
            NodeKind::Card(card) => Some(card),
            _ => None,
        }
    }

    pub fn as_flash(&self) -> Option<&FlashNode> {
        match &self.kind {
            NodeKind::Flash(flash) => Some(flash),
            _ => None,
        }
    }

    /// Loading indicators and file-info notices; cleared on each new upload.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Loading { .. } | NodeKind::FileInfo { .. }
        )
    }
}

/// A short-lived notification.
#[derive(Debug, Clone, PartialEq)]
pub struct FlashNode {
    pub severity: Severity,
    pub message: String,
    /// When the fade-out starts.
    pub expires_at: DateTime<Utc>,
    /// Set once fading; the node is removed at this instant.
    pub fading_until: Option<DateTime<Utc>>,
}

/// A collapsible report card.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportCard {
    /// Same as the report record's id.
    pub id: String,
    pub title: String,
    pub html: String,
    pub expanded: bool,
    /// Set while the card plays its exit transition.
    pub leaving_at: Option<DateTime<Utc>>,
}

impl ReportCard {
    pub fn new(id: impl Into<String>, title: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            html: html.into(),
            expanded: false,
            leaving_at: None,
        }
    }

    /// Direction glyph on the toggle button.
    pub fn glyph(&self) -> char {
        if self.expanded { '▲' } else { '▼' }
    }

    pub fn is_leaving(&self) -> bool {
        self.leaving_at.is_some()
    }
}

// ---------------------------------------------------------------------------
// Host capability
// ---------------------------------------------------------------------------

pub trait PanelHost {
    /// Insert as the first child of `container`.
    fn insert_front(&mut self, container: &str, node: Node);
    fn append(&mut self, container: &str, node: Node);
    /// Remove the first node with `id`.
    fn remove(&mut self, container: &str, id: &str) -> Option<Node>;
    fn node(&self, container: &str, id: &str) -> Option<&Node>;
    fn node_mut(&mut self, container: &str, id: &str) -> Option<&mut Node>;
    /// Children of `container` in document order; empty if it does not exist.
    fn nodes(&self, container: &str) -> &[Node];
    fn retain(&mut self, container: &str, keep: &mut dyn FnMut(&Node) -> bool);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPanel {
    containers: BTreeMap<String, Vec<Node>>,
}

impl MemoryPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report cards in `container`, in document order.
    pub fn cards<'a>(&'a self, container: &str) -> impl Iterator<Item = &'a ReportCard> + 'a {
        self.nodes(container).iter().filter_map(Node::as_card)
    }

    /// Flash messages in `container`, in document order.
    pub fn flashes<'a>(&'a self, container: &str) -> impl Iterator<Item = &'a FlashNode> + 'a {
        self.nodes(container).iter().filter_map(Node::as_flash)
    }
}

impl PanelHost for MemoryPanel {
    fn insert_front(&mut self, container: &str, node: Node) {
        self.containers
            .entry(container.to_string())
            .or_default()
            .insert(0, node);
    }

    fn append(&mut self, container: &str, node: Node) {
        self.containers
            .entry(container.to_string())
            .or_default()
            .push(node);
    }

    fn remove(&mut self, container: &str, id: &str) -> Option<Node> {
        let nodes = self.containers.get_mut(container)?;
        let index = nodes.iter().position(|n| n.id == id)?;
        Some(nodes.remove(index))
    }

    fn node(&self, container: &str, id: &str) -> Option<&Node> {
        self.nodes(container).iter().find(|n| n.id == id)
    }

    fn node_mut(&mut self, container: &str, id: &str) -> Option<&mut Node> {
        self.containers
            .get_mut(container)?
            .iter_mut()
            .find(|n| n.id == id)
    }

    fn nodes(&self, container: &str) -> &[Node] {
        self.containers
            .get(container)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn retain(&mut self, container: &str, keep: &mut dyn FnMut(&Node) -> bool) {
        if let Some(nodes) = self.containers.get_mut(container) {
            nodes.retain(|n| keep(n));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_front_and_append_order() {
        let mut panel = MemoryPanel::new();
        panel.append(MAIN_CONTAINER, Node::card(ReportCard::new("a", "A", "")));
        panel.append(MAIN_CONTAINER, Node::card(ReportCard::new("b", "B", "")));
        panel.insert_front(MAIN_CONTAINER, Node::loading("wait"));

        let ids: Vec<&str> = panel
            .nodes(MAIN_CONTAINER)
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, [LOADING_ID, "a", "b"]);
    }

    #[test]
    fn remove_and_lookup() {
        let mut panel = MemoryPanel::new();
        panel.append(MAIN_CONTAINER, Node::card(ReportCard::new("a", "A", "")));

        assert!(panel.node(MAIN_CONTAINER, "a").is_some());
        assert!(panel.remove(MAIN_CONTAINER, "missing").is_none());
        assert!(panel.remove("other-container", "a").is_none());
        assert!(panel.remove(MAIN_CONTAINER, "a").is_some());
        assert!(panel.nodes(MAIN_CONTAINER).is_empty());
    }

    #[test]
    fn unknown_container_is_empty() {
        let panel = MemoryPanel::new();
        assert!(panel.nodes("nowhere").is_empty());
        assert_eq!(panel.cards("nowhere").count(), 0);
    }

    #[test]
    fn glyph_follows_expanded_state() {
        let mut card = ReportCard::new("a", "A", "");
        assert_eq!(card.glyph(), '▼');
        card.expanded = true;
        assert_eq!(card.glyph(), '▲');
    }

    #[test]
    fn transient_nodes() {
        assert!(Node::loading("x").is_transient());
        assert!(Node::file_info("a.pdf", "1.00 KB", "application/pdf").is_transient());
        assert!(!Node::card(ReportCard::new("a", "A", "")).is_transient());
    }
}
