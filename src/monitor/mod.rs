//! Connectivity monitor.
//!
//! Probes the analysis server on start and then at a fixed interval, and
//! keeps a two-part status indicator (a state class and a status text) in
//! sync with the most recent probe result.
//!
//! Probes are not queued: every tick starts a new probe on its own thread
//! even if the previous one has not returned. Whichever probe *resolves*
//! last decides the indicator, so a slow, stale response can overwrite a
//! newer one. There is no retry or backoff between ticks.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;

use crate::activity;
use crate::client::{ClientError, Probe};

/// Text shown while the server is unreachable.
pub const OFFLINE_TEXT: &str = "Server disconnected";

// ---------------------------------------------------------------------------
// Indicator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// No probe has resolved yet.
    Unknown,
    Online,
    Offline,
}

impl Connectivity {
    /// CSS-style class name for the indicator.
    pub fn class(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.class())
    }
}

/// The two visible pieces of connectivity state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusIndicator {
    pub state: Connectivity,
    /// Empty while online.
    pub text: String,
}

impl Default for StatusIndicator {
    fn default() -> Self {
        Self {
            state: Connectivity::Unknown,
            text: String::new(),
        }
    }
}

impl StatusIndicator {
    /// Overwrite the indicator with a probe result. No history is kept.
    pub fn apply(&mut self, result: &Result<(), ClientError>) {
        match result {
            Ok(()) => {
                self.state = Connectivity::Online;
                self.text.clear();
            }
            Err(_) => {
                self.state = Connectivity::Offline;
                self.text = OFFLINE_TEXT.to_string();
            }
        }
    }

    pub fn is_online(&self) -> bool {
        self.state == Connectivity::Online
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct ConnectivityMonitor<P> {
    probe: Arc<P>,
    indicator: Arc<Mutex<StatusIndicator>>,
    interval: Duration,
}

impl<P> ConnectivityMonitor<P>
where
    P: Probe + Send + Sync + 'static,
{
    pub fn new(probe: P, interval: Duration) -> Self {
        Self {
            probe: Arc::new(probe),
            indicator: Arc::new(Mutex::new(StatusIndicator::default())),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// A copy of the current indicator.
    pub fn indicator(&self) -> StatusIndicator {
        lock(&self.indicator).clone()
    }

    /// Probe on the calling thread and apply the result.
    pub fn check_now(&self) -> Connectivity {
        apply_probe(self.probe.as_ref(), &self.indicator)
    }

    /// Probe on a new thread; the indicator updates when the probe resolves.
    pub fn spawn_check(&self) -> JoinHandle<Connectivity> {
        let probe = Arc::clone(&self.probe);
        let indicator = Arc::clone(&self.indicator);
        thread::spawn(move || apply_probe(probe.as_ref(), &indicator))
    }

    /// Probe immediately and then once per interval.
    ///
    /// `on_tick` sees the indicator just before each new probe is started
    /// (and once more at the end). Runs forever when `max_ticks` is `None`.
    pub fn run<F>(&self, max_ticks: Option<u64>, mut on_tick: F)
    where
        F: FnMut(&StatusIndicator),
    {
        let mut in_flight: Vec<JoinHandle<Connectivity>> = Vec::new();
        let mut tick: u64 = 0;

        loop {
            in_flight.retain(|handle| !handle.is_finished());
            in_flight.push(self.spawn_check());
            tick += 1;

            if max_ticks.is_some_and(|max| tick >= max) {
                break;
            }

            thread::sleep(self.interval);
            on_tick(&self.indicator());
        }

        for handle in in_flight {
            let _ = handle.join();
        }
        on_tick(&self.indicator());
    }
}

fn apply_probe<P: Probe + ?Sized>(
    probe: &P,
    indicator: &Mutex<StatusIndicator>,
) -> Connectivity {
    let result = probe.probe();
    if let Err(ref e) = result {
        activity::warn("monitor", format!("probe failed: {e}"));
    }

    let mut guard = lock(indicator);
    let previous = guard.state;
    guard.apply(&result);
    if previous != guard.state && guard.state == Connectivity::Online {
        activity::info("monitor", "server online");
    }
    guard.state
}

/// Lock the indicator, recovering the data from a poisoned mutex.
fn lock(indicator: &Mutex<StatusIndicator>) -> MutexGuard<'_, StatusIndicator> {
    indicator.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
