//! The report panel: flash notifications, report cards, and the manager
//! that ties uploads, analyses and the stored history together.

pub mod flash;
pub mod host;
pub mod manager;
pub mod render;

pub use flash::Severity;
pub use host::{MAIN_CONTAINER, MemoryPanel, Node, NodeKind, PanelHost, ReportCard};
pub use manager::{AnalyzeOutcome, ClickEvent, ClickTarget, Phase, ReportPanel, SubmitOutcome};
