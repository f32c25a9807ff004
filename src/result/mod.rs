use crate::core::{Endpoint, SaveError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Outcome of one successful save on one endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub endpoint: Endpoint,
    /// Time from connect to observed completion
    pub elapsed: Duration,
    /// LASTSAVE reads after the trigger, including the one that saw the change
    pub polls: u64,
    pub previous_marker: i64,
    pub current_marker: i64,
}

impl SaveReport {
    /// Completion time reported by the store, if the marker is a unix timestamp.
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.current_marker, 0)
    }
}

/// Per-endpoint counters accumulated over a run
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct EndpointStats {
    pub endpoint: String,
    pub auto_save_disabled: bool,
    pub saves_ok: u64,
    pub saves_failed: u64,
    pub last_save_ms: Option<u64>,
    pub last_save_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Run summary, in endpoint (post-shuffle) order
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub passes_started: u64,
    pub passes_completed: u64,
    pub endpoints: Vec<EndpointStats>,
}

impl RunStats {
    pub fn new(endpoints: &[Endpoint]) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            passes_started: 0,
            passes_completed: 0,
            endpoints: endpoints
                .iter()
                .map(|endpoint| EndpointStats {
                    endpoint: endpoint.to_string(),
                    ..Default::default()
                })
                .collect(),
        }
    }

    pub fn begin_pass(&mut self) {
        self.passes_started += 1;
    }

    pub fn complete_pass(&mut self) {
        self.passes_completed += 1;
    }

    pub fn record_toggle(&mut self, index: usize, outcome: Result<(), &SaveError>) {
        let entry = &mut self.endpoints[index];
        match outcome {
            Ok(()) => entry.auto_save_disabled = true,
            Err(err) => entry.last_error = Some(err.to_string()),
        }
    }

    pub fn record_save(&mut self, index: usize, report: &SaveReport) {
        let entry = &mut self.endpoints[index];
        entry.saves_ok += 1;
        entry.last_save_ms = Some(report.elapsed.as_millis() as u64);
        entry.last_save_at = report.saved_at();
    }

    pub fn record_failure(&mut self, index: usize, err: &SaveError) {
        let entry = &mut self.endpoints[index];
        entry.saves_failed += 1;
        entry.last_error = Some(err.to_string());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn total_saves(&self) -> u64 {
        self.endpoints.iter().map(|e| e.saves_ok).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.endpoints.iter().map(|e| e.saves_failed).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
