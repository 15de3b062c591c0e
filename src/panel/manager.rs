//! Report panel manager.
//!
//! Drives the upload → (optional follow-up analysis) → card lifecycle and
//! mirrors every rendered report into the bounded [`ReportHistory`].
//!
//! The follow-up request is an explicit two-state machine: after an upload
//! the server has stored but not yet analyzed, the panel moves to
//! [`Phase::AwaitingAnalysis`] with a due time, and [`ReportPanel::poll_due`]
//! fires the analyze request once that time has passed. Nothing cancels a
//! pending analysis: clearing or dismissing reports in the meantime does not
//! stop it from rendering a new card when it resolves.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::activity;
use crate::client::{AnalysisServer, ClientError, PdfUpload};
use crate::config::schema::PanelConfig;
use crate::history::{RecordStore, ReportHistory, ReportRecord, generate_report_id};
use crate::utils::clock::{Clock, SystemClock};

use super::flash::{Severity, expire_flashes, show_flash};
use super::host::{LOADING_ID, MAIN_CONTAINER, Node, NodeKind, PanelHost, ReportCard};

/// Exit transition of a dismissed card.
pub const DISMISS_TRANSITION_MS: i64 = 300;

/// Extra delay per card when clearing everything.
pub const CLEAR_STAGGER_MS: i64 = 100;

/// Card title for reports fetched by the follow-up analysis.
pub const ANALYSIS_TITLE: &str = "Contract analysis";

const UPLOADING_TEXT: &str = "Uploading file and analyzing...";
const ANALYZING_TEXT: &str = "Analyzing contract... please wait.";
const CONNECTING_TEXT: &str = "Connecting to the server for analysis...";

// ---------------------------------------------------------------------------
// Outcomes and events
// ---------------------------------------------------------------------------

/// Where the upload/analysis sequence stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Idle; the next step is a user upload.
    AwaitingUpload,
    /// The server stored the file; analyze once `due_at` has passed.
    AwaitingAnalysis { due_at: DateTime<Utc> },
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// The upload reply carried the report; a card was rendered.
    Rendered { id: String },
    /// The server stored the file; a follow-up analysis is due at `due_at`.
    AnalysisScheduled { due_at: DateTime<Utc> },
    Failed(ClientError),
}

#[derive(Debug)]
pub enum AnalyzeOutcome {
    Rendered { id: String },
    Failed(ClientError),
}

/// A click travelling up from a card control to the card header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClickEvent {
    propagation_stopped: bool,
}

impl ClickEvent {
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Clickable parts of a report card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// The header (and the toggle glyph inside it).
    Header,
    /// The `×` button inside the header.
    CloseButton,
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

pub struct ReportPanel<A, S, H> {
    server: A,
    history: ReportHistory<S>,
    host: H,
    settings: PanelConfig,
    clock: Box<dyn Clock>,
    phase: Phase,
    container: String,
}

impl<A, S, H> ReportPanel<A, S, H>
where
    A: AnalysisServer,
    S: RecordStore,
    H: PanelHost,
{
    pub fn new(server: A, history: ReportHistory<S>, host: H, settings: PanelConfig) -> Self {
        Self {
            server,
            history,
            host,
            settings,
            clock: Box::new(SystemClock),
            phase: Phase::AwaitingUpload,
            container: MAIN_CONTAINER.to_string(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Render into a container other than the main panel.
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn history(&self) -> &ReportHistory<S> {
        &self.history
    }

    pub fn server(&self) -> &A {
        &self.server
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn card(&self, id: &str) -> Option<&ReportCard> {
        self.host.node(&self.container, id).and_then(Node::as_card)
    }

    pub fn card_ids(&self) -> Vec<String> {
        self.host
            .nodes(&self.container)
            .iter()
            .filter_map(Node::as_card)
            .map(|c| c.id.clone())
            .collect()
    }

    // -- submit / analyze --

    /// Upload one file and react to the server's reply.
    pub fn submit(&mut self, upload: &PdfUpload) -> SubmitOutcome {
        self.clear_transient();
        self.host
            .append(&self.container, Node::loading(UPLOADING_TEXT));
        activity::info(
            "panel",
            format!("uploading {} ({})", upload.file_name, upload.size_kb()),
        );

        match self.server.upload(upload) {
            Ok(reply) => {
                self.clear_transient();
                match reply.html {
                    Some(html) => {
                        self.notify(Severity::Success, "File processed successfully");
                        let id = self.present_report(&upload.file_name, html);
                        SubmitOutcome::Rendered { id }
                    }
                    None => {
                        let notice = reply
                            .message
                            .unwrap_or_else(|| "File saved, analysis pending".to_string());
                        self.notify(Severity::Success, notice);
                        self.host
                            .append(&self.container, Node::loading(ANALYZING_TEXT));

                        let delay = millis(self.settings.analyze_delay_ms);
                        let due_at = self.clock.now() + delay;
                        self.phase = Phase::AwaitingAnalysis { due_at };
                        activity::info("panel", "upload stored; analysis scheduled");
                        SubmitOutcome::AnalysisScheduled { due_at }
                    }
                }
            }
            Err(err) => {
                self.clear_transient();
                self.host.append(
                    &self.container,
                    Node::file_info(&upload.file_name, &upload.size_kb(), &upload.content_type),
                );
                self.alert(format!(
                    "Error processing the file: {err}. Check the server connection or try again."
                ));
                activity::error("panel", format!("upload of {} failed: {err}", upload.file_name));
                SubmitOutcome::Failed(err)
            }
        }
    }

    /// Fire the scheduled follow-up analysis if it is due.
    pub fn poll_due(&mut self) -> Option<AnalyzeOutcome> {
        match self.phase {
            Phase::AwaitingAnalysis { due_at } if self.clock.now() >= due_at => {
                Some(self.analyze())
            }
            _ => None,
        }
    }

    /// Request the HTML analysis of the last upload.
    ///
    /// The loading indicator is gone afterwards whatever the result.
    pub fn analyze(&mut self) -> AnalyzeOutcome {
        self.phase = Phase::AwaitingUpload;
        if let Some(node) = self.host.node_mut(&self.container, LOADING_ID)
            && let NodeKind::Loading { message } = &mut node.kind
        {
            *message = CONNECTING_TEXT.to_string();
        }

        let result = self
            .server
            .analyze()
            .and_then(|reply| reply.html.ok_or(ClientError::MissingHtml));
        self.host.remove(&self.container, LOADING_ID);

        match result {
            Ok(html) => {
                let id = self.present_report(ANALYSIS_TITLE, html);
                AnalyzeOutcome::Rendered { id }
            }
            Err(err) => {
                self.alert(format!("Error analyzing the contract: {err}."));
                activity::error("panel", format!("analysis failed: {err}"));
                AnalyzeOutcome::Failed(err)
            }
        }
    }

    // -- card interaction --

    /// Flip a card between expanded and collapsed. Returns the new state, or
    /// `None` if no such card is rendered.
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        let card = self
            .host
            .node_mut(&self.container, id)
            .and_then(Node::as_card_mut)?;
        card.expanded = !card.expanded;
        Some(card.expanded)
    }

    /// Start a card's exit transition.
    ///
    /// The click is stopped so it never reaches the header. The card and its
    /// stored record go away in [`settle`](Self::settle) once the transition
    /// window has passed. Unknown ids are ignored; returns whether a card was
    /// found.
    pub fn dismiss(&mut self, id: &str, event: Option<&mut ClickEvent>) -> bool {
        if let Some(event) = event {
            event.stop_propagation();
        }

        let leaving_at = self.clock.now() + Duration::milliseconds(DISMISS_TRANSITION_MS);
        match self
            .host
            .node_mut(&self.container, id)
            .and_then(Node::as_card_mut)
        {
            Some(card) => {
                if card.leaving_at.is_none() {
                    card.leaving_at = Some(leaving_at);
                }
                true
            }
            None => false,
        }
    }

    /// Deliver a click on part of a card, with bubbling to the header.
    pub fn handle_click(&mut self, id: &str, target: ClickTarget) {
        let mut event = ClickEvent::default();
        if target == ClickTarget::CloseButton {
            self.dismiss(id, Some(&mut event));
        }
        if !event.is_propagation_stopped() {
            self.toggle(id);
        }
    }

    // -- restore / clear --

    /// Render every stored report, oldest first, without re-saving any.
    ///
    /// Reports that are already rendered are skipped, so calling this twice
    /// does not duplicate cards. Returns the number of stored reports.
    pub fn restore_all(&mut self) -> usize {
        if !self.settings.persistence {
            return 0;
        }

        let records = match self.history.load() {
            Ok(records) => records,
            Err(e) => {
                activity::error("history", format!("could not load saved reports: {e:#}"));
                return 0;
            }
        };

        for record in &records {
            if self.host.node(&self.container, &record.id).is_none() {
                let card = ReportCard::new(&record.id, &record.title, &record.html);
                self.host.append(&self.container, Node::card(card));
            }
        }

        if !records.is_empty() {
            self.notify(
                Severity::Info,
                format!("Loaded {} saved reports", records.len()),
            );
        }
        records.len()
    }

    /// Delete the stored history and fade out every rendered card.
    ///
    /// Returns the number of reports that were stored.
    pub fn clear_all(&mut self) -> usize {
        let stored = if self.settings.persistence {
            match self.history.len() {
                Ok(n) => n,
                Err(e) => {
                    activity::error("history", format!("could not read saved reports: {e:#}"));
                    self.alert(format!("Error removing reports: {e}"));
                    return 0;
                }
            }
        } else {
            self.card_ids().len()
        };

        if stored == 0 {
            self.notify(Severity::Info, "No saved reports to clear");
            return 0;
        }

        if self.settings.persistence
            && let Err(e) = self.history.clear()
        {
            activity::error("history", format!("could not clear saved reports: {e:#}"));
            self.alert(format!("Error removing reports: {e}"));
            return 0;
        }

        let now = self.clock.now();
        for (index, id) in self.card_ids().iter().enumerate() {
            let delay = CLEAR_STAGGER_MS * index as i64 + DISMISS_TRANSITION_MS;
            if let Some(card) = self
                .host
                .node_mut(&self.container, id)
                .and_then(Node::as_card_mut)
            {
                card.leaving_at = Some(now + Duration::milliseconds(delay));
            }
        }

        self.notify(Severity::Success, "All reports removed");
        activity::info("history", format!("cleared {stored} saved reports"));
        stored
    }

    // -- time --

    /// Finish every transition whose time has come: expire flashes and
    /// remove cards (and their stored records) whose exit has completed.
    /// Returns the number of cards removed.
    pub fn settle(&mut self) -> usize {
        let now = self.clock.now();
        expire_flashes(&mut self.host, &self.container, now);

        let finished: Vec<String> = self
            .host
            .nodes(&self.container)
            .iter()
            .filter_map(Node::as_card)
            .filter(|c| c.leaving_at.is_some_and(|at| now >= at))
            .map(|c| c.id.clone())
            .collect();

        for id in &finished {
            self.host.remove(&self.container, id);
            if self.settings.persistence
                && let Err(e) = self.history.remove(id)
            {
                activity::error("history", format!("could not remove {id}: {e:#}"));
            }
        }
        finished.len()
    }

    /// The next instant at which [`settle`](Self::settle) or
    /// [`poll_due`](Self::poll_due) has work to do.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        let transitions = self.host.nodes(&self.container).iter().filter_map(|n| {
            match &n.kind {
                NodeKind::Card(card) => card.leaving_at,
                NodeKind::Flash(flash) => Some(flash.fading_until.unwrap_or(flash.expires_at)),
                _ => None,
            }
        });
        let analysis = match self.phase {
            Phase::AwaitingAnalysis { due_at } => Some(due_at),
            Phase::AwaitingUpload => None,
        };
        transitions.chain(analysis).min()
    }

    // -- internals --

    /// Create, render, persist and (optionally) expand a new report card.
    fn present_report(&mut self, title: &str, html: String) -> String {
        let now = self.clock.now();

        let mut taken: HashSet<String> = self.card_ids().into_iter().collect();
        if let Ok(records) = self.history.load() {
            taken.extend(records.into_iter().map(|r| r.id));
        }
        let id = generate_report_id(now, |candidate| taken.contains(candidate));

        let card = ReportCard::new(&id, title, &html);
        self.host.append(&self.container, Node::card(card));

        if self.settings.persistence {
            let record = ReportRecord::new(&id, title, html, now);
            match self.history.push(record) {
                Ok(evicted) => {
                    for old in evicted {
                        activity::info("history", format!("evicted {}", old.id));
                    }
                }
                Err(e) => activity::error("history", format!("could not save {id}: {e:#}")),
            }
        }

        if self.settings.auto_expand {
            self.toggle(&id);
        }
        activity::info("panel", format!("rendered {id} ({title})"));
        id
    }

    fn clear_transient(&mut self) {
        self.host
            .retain(&self.container, &mut |node| !node.is_transient());
    }

    /// Informational flash; suppressed when flash messages are turned off.
    fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        if !self.settings.flash_messages {
            return;
        }
        let now = self.clock.now();
        show_flash(
            &mut self.host,
            &self.container,
            severity,
            message,
            self.settings.flash_duration_ms,
            now,
        );
    }

    /// Error flash; always shown.
    fn alert(&mut self, message: impl Into<String>) {
        let now = self.clock.now();
        show_flash(
            &mut self.host,
            &self.container,
            Severity::Error,
            message,
            self.settings.error_flash_duration_ms,
            now,
        );
    }
}

fn millis(ms: u64) -> Duration {
    Duration::milliseconds(ms.min(u64::from(u32::MAX)) as i64)
}
