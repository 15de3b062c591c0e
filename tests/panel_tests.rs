//! End-to-end behavior of the report panel against a scripted analysis
//! server and a manual clock.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use chrono::Duration;

use inspector_panel::activity;
use inspector_panel::client::{AnalysisReply, AnalysisServer, ClientError, PdfUpload};
use inspector_panel::config::schema::PanelConfig;
use inspector_panel::history::store::{MemoryStore, RecordStore};
use inspector_panel::history::{DEFAULT_KEY, ReportHistory, ReportRecord};
use inspector_panel::panel::host::LOADING_ID;
use inspector_panel::panel::manager::{ANALYSIS_TITLE, DISMISS_TRANSITION_MS};
use inspector_panel::panel::{
    AnalyzeOutcome, ClickEvent, ClickTarget, MAIN_CONTAINER, MemoryPanel, NodeKind, PanelHost,
    Phase, ReportPanel, Severity, SubmitOutcome,
};
use inspector_panel::utils::clock::{Clock, ManualClock};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Scripted {
    Html(&'static str),
    Pending,
    Down,
    Rejected(&'static str),
}

impl Scripted {
    fn into_result(self) -> Result<AnalysisReply, ClientError> {
        match self {
            Self::Html(html) => Ok(AnalysisReply::with_html(html)),
            Self::Pending => Ok(AnalysisReply::pending()),
            Self::Down => Err(ClientError::Transport("connection refused".to_string())),
            Self::Rejected(reason) => Err(ClientError::Rejected(reason.to_string())),
        }
    }
}

/// Answers from two scripts; an exhausted script keeps answering `Down`.
#[derive(Default)]
struct FakeServer {
    uploads: RefCell<VecDeque<Scripted>>,
    analyses: RefCell<VecDeque<Scripted>>,
    upload_calls: Cell<usize>,
    analyze_calls: Cell<usize>,
}

impl FakeServer {
    fn new(uploads: &[Scripted], analyses: &[Scripted]) -> Self {
        Self {
            uploads: RefCell::new(uploads.iter().cloned().collect()),
            analyses: RefCell::new(analyses.iter().cloned().collect()),
            ..Self::default()
        }
    }
}

impl AnalysisServer for FakeServer {
    fn upload(&self, _file: &PdfUpload) -> Result<AnalysisReply, ClientError> {
        self.upload_calls.set(self.upload_calls.get() + 1);
        let next = self.uploads.borrow_mut().pop_front();
        next.unwrap_or(Scripted::Down).into_result()
    }

    fn analyze(&self) -> Result<AnalysisReply, ClientError> {
        self.analyze_calls.set(self.analyze_calls.get() + 1);
        let next = self.analyses.borrow_mut().pop_front();
        next.unwrap_or(Scripted::Down).into_result()
    }
}

type TestPanel = ReportPanel<FakeServer, MemoryStore, MemoryPanel>;

fn build(
    server: FakeServer,
    history: ReportHistory<MemoryStore>,
    settings: PanelConfig,
) -> (TestPanel, Rc<ManualClock>) {
    activity::set_enabled(false);
    let clock = Rc::new(ManualClock::fixed());
    let panel = ReportPanel::new(server, history, MemoryPanel::new(), settings)
        .with_clock(Rc::clone(&clock));
    (panel, clock)
}

fn panel_with(uploads: &[Scripted], analyses: &[Scripted]) -> (TestPanel, Rc<ManualClock>) {
    build(
        FakeServer::new(uploads, analyses),
        ReportHistory::new(MemoryStore::new()),
        PanelConfig::default(),
    )
}

fn contract() -> PdfUpload {
    PdfUpload::new("contract.pdf", vec![0u8; 2048])
}

fn flashes(panel: &TestPanel, severity: Severity) -> Vec<String> {
    panel
        .host()
        .flashes(MAIN_CONTAINER)
        .filter(|f| f.severity == severity)
        .map(|f| f.message.clone())
        .collect()
}

fn has_loading(panel: &TestPanel) -> bool {
    panel.host().node(MAIN_CONTAINER, LOADING_ID).is_some()
}

fn stored_ids(panel: &TestPanel) -> Vec<String> {
    panel
        .history()
        .load()
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect()
}

fn seeded_history(ids: &[&str]) -> ReportHistory<MemoryStore> {
    let mut history = ReportHistory::new(MemoryStore::new());
    let at = ManualClock::fixed().now();
    for id in ids {
        history
            .push(ReportRecord::new(*id, format!("{id}.pdf"), "<p>saved</p>", at))
            .unwrap();
    }
    history
}

// ---------------------------------------------------------------------------
// Upload and analysis
// ---------------------------------------------------------------------------

#[test]
fn upload_with_html_renders_expanded_card_and_persists() {
    let (mut panel, _clock) = panel_with(&[Scripted::Html("<p>Findings</p>")], &[]);

    let SubmitOutcome::Rendered { id } = panel.submit(&contract()) else {
        panic!("expected a rendered report");
    };

    let card = panel.card(&id).unwrap();
    assert_eq!(card.title, "contract.pdf");
    assert_eq!(card.html, "<p>Findings</p>");
    assert!(card.expanded);
    assert_eq!(card.glyph(), '▲');

    assert_eq!(stored_ids(&panel), [id]);
    assert!(!has_loading(&panel));
    assert_eq!(flashes(&panel, Severity::Success), ["File processed successfully"]);
    assert_eq!(panel.phase(), Phase::AwaitingUpload);
    assert_eq!(panel.server().analyze_calls.get(), 0);
}

#[test]
fn pending_upload_schedules_one_analysis_after_delay() {
    let (mut panel, clock) = panel_with(&[Scripted::Pending], &[Scripted::Html("<h2>Report</h2>")]);
    let start = clock.now();

    let SubmitOutcome::AnalysisScheduled { due_at } = panel.submit(&contract()) else {
        panic!("expected a scheduled analysis");
    };
    assert_eq!(due_at, start + Duration::milliseconds(1000));
    assert_eq!(panel.phase(), Phase::AwaitingAnalysis { due_at });
    assert!(has_loading(&panel));
    assert!(panel.card_ids().is_empty());

    clock.advance_ms(999);
    assert!(panel.poll_due().is_none());
    assert_eq!(panel.server().analyze_calls.get(), 0);

    clock.advance_ms(1);
    let Some(AnalyzeOutcome::Rendered { id }) = panel.poll_due() else {
        panic!("expected the analysis to render");
    };
    assert_eq!(panel.card(&id).unwrap().title, ANALYSIS_TITLE);
    assert!(panel.card(&id).unwrap().expanded);
    assert!(!has_loading(&panel));
    assert_eq!(stored_ids(&panel), [id]);

    assert_eq!(panel.phase(), Phase::AwaitingUpload);
    assert!(panel.poll_due().is_none());
    assert_eq!(panel.server().analyze_calls.get(), 1);
}

#[test]
fn failed_upload_shows_file_info_and_one_error() {
    let (mut panel, _clock) = panel_with(&[Scripted::Down, Scripted::Rejected("bad pdf")], &[]);

    assert!(matches!(panel.submit(&contract()), SubmitOutcome::Failed(_)));
    let outcome = panel.submit(&contract());
    assert!(matches!(outcome, SubmitOutcome::Failed(ClientError::Rejected(_))));

    let errors = flashes(&panel, Severity::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("bad pdf"));

    let infos: Vec<&NodeKind> = panel
        .host()
        .nodes(MAIN_CONTAINER)
        .iter()
        .map(|n| &n.kind)
        .filter(|k| matches!(k, NodeKind::FileInfo { .. }))
        .collect();
    assert_eq!(infos.len(), 1);
    let NodeKind::FileInfo { name, size, .. } = infos[0] else {
        unreachable!()
    };
    assert_eq!(name, "contract.pdf");
    assert_eq!(size, "2.00 KB");

    assert!(!has_loading(&panel));
    assert!(panel.card_ids().is_empty());
    assert!(panel.history().is_empty().unwrap());
}

#[test]
fn failed_analysis_removes_loading_and_reports_error() {
    let (mut panel, clock) = panel_with(&[Scripted::Pending], &[Scripted::Down]);
    panel.submit(&contract());
    clock.advance_ms(1000);

    let outcome = panel.poll_due().unwrap();
    assert!(matches!(outcome, AnalyzeOutcome::Failed(ref e) if e.is_transport()));
    assert!(!has_loading(&panel));
    assert_eq!(flashes(&panel, Severity::Error).len(), 1);
    assert!(panel.card_ids().is_empty());
    assert_eq!(panel.phase(), Phase::AwaitingUpload);
}

#[test]
fn analysis_success_without_html_is_a_failure() {
    let (mut panel, _clock) = panel_with(&[], &[Scripted::Pending]);
    let outcome = panel.analyze();
    assert!(matches!(outcome, AnalyzeOutcome::Failed(ClientError::MissingHtml)));
    assert!(!has_loading(&panel));
    assert!(panel.history().is_empty().unwrap());
}

#[test]
fn new_upload_clears_transient_nodes_only() {
    let (mut panel, _clock) = panel_with(
        &[Scripted::Html("<p>one</p>"), Scripted::Down, Scripted::Html("<p>two</p>")],
        &[],
    );
    panel.submit(&contract());
    panel.submit(&contract());
    panel.submit(&contract());

    let transient = panel
        .host()
        .nodes(MAIN_CONTAINER)
        .iter()
        .filter(|n| n.is_transient())
        .count();
    assert_eq!(transient, 0);
    assert_eq!(panel.card_ids().len(), 2);
}

// ---------------------------------------------------------------------------
// History capacity and ids
// ---------------------------------------------------------------------------

#[test]
fn history_keeps_the_five_newest_reports() {
    let uploads: Vec<Scripted> = (0..6).map(|_| Scripted::Html("<p>r</p>")).collect();
    let (mut panel, _clock) = panel_with(&uploads, &[]);

    let mut ids = Vec::new();
    for _ in 0..6 {
        let SubmitOutcome::Rendered { id } = panel.submit(&contract()) else {
            panic!("expected a rendered report");
        };
        ids.push(id);
    }

    // Same instant for every upload, still distinct ids.
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 6);

    assert_eq!(stored_ids(&panel), &ids[1..]);
    // Rendered cards are not trimmed with the history.
    assert_eq!(panel.card_ids().len(), 6);
}

// ---------------------------------------------------------------------------
// Card interaction
// ---------------------------------------------------------------------------

#[test]
fn header_click_toggles_card() {
    let mut settings = PanelConfig::default();
    settings.auto_expand = false;
    let (mut panel, _clock) = build(
        FakeServer::new(&[Scripted::Html("<p>x</p>")], &[]),
        ReportHistory::new(MemoryStore::new()),
        settings,
    );
    let SubmitOutcome::Rendered { id } = panel.submit(&contract()) else {
        panic!("expected a rendered report");
    };
    assert!(!panel.card(&id).unwrap().expanded);

    panel.handle_click(&id, ClickTarget::Header);
    assert!(panel.card(&id).unwrap().expanded);
    panel.handle_click(&id, ClickTarget::Header);
    assert!(!panel.card(&id).unwrap().expanded);
    assert_eq!(panel.toggle("report-missing"), None);
}

#[test]
fn close_button_dismisses_without_toggling() {
    let (mut panel, clock) = panel_with(&[Scripted::Html("<p>x</p>")], &[]);
    let SubmitOutcome::Rendered { id } = panel.submit(&contract()) else {
        panic!("expected a rendered report");
    };
    assert!(panel.card(&id).unwrap().expanded);

    panel.handle_click(&id, ClickTarget::CloseButton);
    let card = panel.card(&id).unwrap();
    assert!(card.expanded);
    assert!(card.is_leaving());

    clock.advance_ms(DISMISS_TRANSITION_MS - 1);
    assert_eq!(panel.settle(), 0);
    assert!(panel.card(&id).is_some());
    assert_eq!(stored_ids(&panel).len(), 1);

    clock.advance_ms(1);
    assert_eq!(panel.settle(), 1);
    assert!(panel.card(&id).is_none());
    assert!(panel.history().is_empty().unwrap());
}

#[test]
fn dismiss_stops_propagation() {
    let (mut panel, _clock) = panel_with(&[Scripted::Html("<p>x</p>")], &[]);
    let SubmitOutcome::Rendered { id } = panel.submit(&contract()) else {
        panic!("expected a rendered report");
    };

    let mut event = ClickEvent::default();
    assert!(panel.dismiss(&id, Some(&mut event)));
    assert!(event.is_propagation_stopped());
}

#[test]
fn dismissing_unknown_id_is_a_no_op() {
    let (mut panel, clock) = build(
        FakeServer::default(),
        seeded_history(&["report-1"]),
        PanelConfig::default(),
    );
    let before = panel.history().store().get(DEFAULT_KEY).unwrap();

    assert!(!panel.dismiss("report-0", None));
    clock.advance_ms(1000);
    assert_eq!(panel.settle(), 0);
    assert_eq!(panel.history().store().get(DEFAULT_KEY).unwrap(), before);
}

// ---------------------------------------------------------------------------
// Restore and clear
// ---------------------------------------------------------------------------

#[test]
fn restore_renders_saved_reports_collapsed_in_order() {
    let (mut panel, _clock) = build(
        FakeServer::default(),
        seeded_history(&["report-1", "report-2", "report-3"]),
        PanelConfig::default(),
    );
    let before = panel.history().store().get(DEFAULT_KEY).unwrap();

    assert_eq!(panel.restore_all(), 3);
    assert_eq!(panel.card_ids(), ["report-1", "report-2", "report-3"]);
    assert!(panel.card_ids().iter().all(|id| !panel.card(id).unwrap().expanded));
    assert_eq!(flashes(&panel, Severity::Info), ["Loaded 3 saved reports"]);

    // Idempotent and never re-saves.
    assert_eq!(panel.restore_all(), 3);
    assert_eq!(panel.card_ids().len(), 3);
    assert_eq!(panel.history().store().get(DEFAULT_KEY).unwrap(), before);
}

#[test]
fn restore_with_empty_history_is_silent() {
    let (mut panel, _clock) = panel_with(&[], &[]);
    assert_eq!(panel.restore_all(), 0);
    assert!(panel.host().nodes(MAIN_CONTAINER).is_empty());
}

#[test]
fn clear_with_nothing_saved_shows_one_info() {
    let (mut panel, _clock) = panel_with(&[], &[]);
    assert_eq!(panel.clear_all(), 0);
    assert_eq!(panel.clear_all(), 0);
    assert_eq!(flashes(&panel, Severity::Info), ["No saved reports to clear"]);
    assert!(panel.card_ids().is_empty());
}

#[test]
fn clear_all_staggers_card_removal() {
    let (mut panel, clock) = build(
        FakeServer::default(),
        seeded_history(&["report-1", "report-2", "report-3"]),
        PanelConfig::default(),
    );
    panel.restore_all();

    assert_eq!(panel.clear_all(), 3);
    assert!(panel.history().is_empty().unwrap());
    assert_eq!(flashes(&panel, Severity::Success), ["All reports removed"]);

    let start = clock.now();
    let exits: Vec<i64> = panel
        .card_ids()
        .iter()
        .map(|id| {
            let at = panel.card(id).unwrap().leaving_at.unwrap();
            (at - start).num_milliseconds()
        })
        .collect();
    assert_eq!(exits, [300, 400, 500]);

    clock.advance_ms(400);
    assert_eq!(panel.settle(), 2);
    assert_eq!(panel.card_ids(), ["report-3"]);
    clock.advance_ms(100);
    assert_eq!(panel.settle(), 1);
    assert!(panel.card_ids().is_empty());
}

#[test]
fn pending_analysis_survives_clear_all() {
    let (mut panel, clock) = build(
        FakeServer::new(&[Scripted::Pending], &[Scripted::Html("<p>late</p>")]),
        seeded_history(&["report-1"]),
        PanelConfig::default(),
    );
    panel.restore_all();
    panel.submit(&contract());

    panel.clear_all();
    clock.advance_ms(1000);
    panel.settle();
    assert!(panel.history().is_empty().unwrap());

    let Some(AnalyzeOutcome::Rendered { id }) = panel.poll_due() else {
        panic!("the scheduled analysis still runs");
    };
    assert_eq!(panel.card_ids(), [id.clone()]);
    assert_eq!(stored_ids(&panel), [id]);
}

// ---------------------------------------------------------------------------
// Feature toggles and timing
// ---------------------------------------------------------------------------

#[test]
fn disabled_flashes_still_surface_errors() {
    let mut settings = PanelConfig::default();
    settings.flash_messages = false;
    let (mut panel, _clock) = build(
        FakeServer::new(&[Scripted::Html("<p>x</p>"), Scripted::Down], &[]),
        ReportHistory::new(MemoryStore::new()),
        settings,
    );

    panel.submit(&contract());
    assert!(flashes(&panel, Severity::Success).is_empty());
    panel.submit(&contract());
    assert_eq!(flashes(&panel, Severity::Error).len(), 1);
}

#[test]
fn disabled_persistence_never_touches_history() {
    let mut settings = PanelConfig::default();
    settings.persistence = false;
    let (mut panel, clock) = build(
        FakeServer::new(&[Scripted::Html("<p>x</p>")], &[]),
        seeded_history(&["report-1"]),
        settings,
    );

    assert_eq!(panel.restore_all(), 0);
    let SubmitOutcome::Rendered { id } = panel.submit(&contract()) else {
        panic!("expected a rendered report");
    };
    panel.dismiss(&id, None);
    clock.advance_ms(DISMISS_TRANSITION_MS);
    panel.settle();

    assert_eq!(stored_ids(&panel), ["report-1"]);
}

#[test]
fn flashes_expire_through_settle() {
    let (mut panel, clock) = panel_with(&[Scripted::Html("<p>x</p>")], &[]);
    panel.submit(&contract());
    assert_eq!(flashes(&panel, Severity::Success).len(), 1);

    clock.advance_ms(2000);
    panel.settle();
    assert_eq!(flashes(&panel, Severity::Success).len(), 1);

    clock.advance_ms(500);
    panel.settle();
    assert!(flashes(&panel, Severity::Success).is_empty());
}

#[test]
fn next_deadline_tracks_scheduled_analysis() {
    let (mut panel, clock) = panel_with(&[Scripted::Pending], &[]);
    assert_eq!(panel.next_deadline(), None);

    let SubmitOutcome::AnalysisScheduled { due_at } = panel.submit(&contract()) else {
        panic!("expected a scheduled analysis");
    };
    // The success flash expires later than the analysis is due.
    assert_eq!(panel.next_deadline(), Some(due_at));
    assert!(due_at > clock.now());
}

#[test]
fn custom_container_keeps_main_empty() {
    let (panel, _clock) = panel_with(&[Scripted::Html("<p>x</p>")], &[]);
    let mut panel = panel.with_container("sidebar");
    panel.submit(&contract());

    assert!(panel.host().nodes(MAIN_CONTAINER).is_empty());
    assert_eq!(panel.host().cards("sidebar").count(), 1);
}
