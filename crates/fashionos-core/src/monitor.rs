//! # Wizard Monitor
//!
//! In-memory telemetry of wizard activity.
//!
//! Events go into a bounded FIFO log (`MONITOR_CAPACITY` by default); when
//! the log is full the oldest event is dropped. Aggregates are recomputed
//! from whatever the log currently holds, so evicted events no longer count.
//!
//! The log is never persisted. [`WizardMonitor::export_events`] hands out a
//! copy for callers that want to keep it.

use crate::primitives::MONITOR_CAPACITY;
use crate::system::Stage;
use crate::{SessionId, WizardError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// EVENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardEventKind {
    Started,
    StageCompleted,
    Completed,
    Abandoned,
    AiInteraction,
    Error,
}

impl std::fmt::Display for WizardEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WizardEventKind::Started => "started",
            WizardEventKind::StageCompleted => "stage_completed",
            WizardEventKind::Completed => "completed",
            WizardEventKind::Abandoned => "abandoned",
            WizardEventKind::AiInteraction => "ai_interaction",
            WizardEventKind::Error => "error",
        };
        f.write_str(name)
    }
}

/// One telemetry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardEvent {
    pub kind: WizardEventKind,
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl WizardEvent {
    #[must_use]
    pub fn new(kind: WizardEventKind, session_id: SessionId, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            session_id,
            stage: None,
            metadata: serde_json::Map::new(),
            timestamp,
        }
    }

    #[must_use]
    pub fn at_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// External analytics destination. Failures never reach the wizard.
pub trait AnalyticsSink: Send + Sync {
    fn forward(&self, event: &WizardEvent) -> Result<(), WizardError>;
}

// =============================================================================
// METRICS
// =============================================================================

/// Aggregates over the current event log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WizardMetrics {
    pub total_sessions: usize,
    pub completed_sessions: usize,
    pub abandoned_sessions: usize,
    /// Percentage of sessions that completed (0 when there are none).
    pub completion_rate: f64,
    /// Mean started-to-completed time in milliseconds, over sessions whose
    /// both events are still in the log.
    pub average_completion_ms: Option<f64>,
    pub abandonment_by_stage: BTreeMap<Stage, usize>,
    pub ai_interactions: usize,
    pub errors: usize,
    pub events_logged: usize,
}

// =============================================================================
// MONITOR
// =============================================================================

pub struct WizardMonitor {
    capacity: usize,
    events: VecDeque<WizardEvent>,
    sink: Option<Box<dyn AnalyticsSink>>,
}

impl std::fmt::Debug for WizardMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardMonitor")
            .field("capacity", &self.capacity)
            .field("events", &self.events.len())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl Default for WizardMonitor {
    fn default() -> Self {
        Self::new(MONITOR_CAPACITY)
    }
}

impl WizardMonitor {
    /// Create a monitor keeping at most `capacity` events (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity),
            sink: None,
        }
    }

    /// Forward every tracked event to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn AnalyticsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Append an event, evicting the oldest ones beyond capacity.
    pub fn track_event(&mut self, event: WizardEvent) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.forward(&event) {
                tracing::debug!(kind = %event.kind, error = %e, "Analytics sink rejected event");
            }
        }
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Copy of the log, oldest first.
    #[must_use]
    pub fn export_events(&self) -> Vec<WizardEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Recompute all aggregates from the log.
    #[allow(clippy::float_arithmetic)]
    #[must_use]
    pub fn metrics(&self) -> WizardMetrics {
        let mut sessions = BTreeSet::new();
        let mut completed = BTreeSet::new();
        let mut abandoned = BTreeSet::new();
        let mut started_at: BTreeMap<&SessionId, DateTime<Utc>> = BTreeMap::new();
        let mut durations = Vec::new();
        let mut metrics = WizardMetrics {
            events_logged: self.events.len(),
            ..WizardMetrics::default()
        };

        for event in &self.events {
            sessions.insert(&event.session_id);
            match event.kind {
                WizardEventKind::Started => {
                    started_at.entry(&event.session_id).or_insert(event.timestamp);
                }
                WizardEventKind::Completed => {
                    let first = completed.insert(&event.session_id);
                    if let (true, Some(start)) = (first, started_at.get(&event.session_id)) {
                        durations.push((event.timestamp - *start).num_milliseconds().max(0));
                    }
                }
                WizardEventKind::Abandoned => {
                    let first = abandoned.insert(&event.session_id);
                    if let (true, Some(stage)) = (first, event.stage) {
                        *metrics.abandonment_by_stage.entry(stage).or_insert(0) += 1;
                    }
                }
                WizardEventKind::AiInteraction => metrics.ai_interactions += 1,
                WizardEventKind::Error => metrics.errors += 1,
                WizardEventKind::StageCompleted => {}
            }
        }

        metrics.total_sessions = sessions.len();
        metrics.completed_sessions = completed.len();
        metrics.abandoned_sessions = abandoned.len();
        if !sessions.is_empty() {
            metrics.completion_rate = 100.0 * completed.len() as f64 / sessions.len() as f64;
        }
        if !durations.is_empty() {
            let sum: i64 = durations.iter().sum();
            metrics.average_completion_ms = Some(sum as f64 / durations.len() as f64);
        }
        metrics
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_arithmetic)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::{Arc, Mutex};

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_792_000_000 + secs, 0).unwrap()
    }

    fn event(kind: WizardEventKind, id: &str, secs: i64) -> WizardEvent {
        WizardEvent::new(kind, SessionId::new(id), t(secs))
    }

    #[test]
    fn log_keeps_most_recent_hundred() {
        let mut monitor = WizardMonitor::default();
        for i in 0..150 {
            monitor.track_event(event(WizardEventKind::Started, &format!("s-{}", i), i));
        }
        let events = monitor.export_events();
        assert_eq!(events.len(), 100);
        assert_eq!(events[0].session_id.as_str(), "s-50");
        assert_eq!(events[99].session_id.as_str(), "s-149");
    }

    #[test]
    fn completion_rate_over_distinct_sessions() {
        let mut monitor = WizardMonitor::default();
        for id in ["a", "b", "c", "d"] {
            monitor.track_event(event(WizardEventKind::Started, id, 0));
        }
        monitor.track_event(event(WizardEventKind::Completed, "a", 90));
        monitor.track_event(event(WizardEventKind::Abandoned, "b", 30).at_stage(Stage::VenueSetup));

        let m = monitor.metrics();
        assert_eq!(m.total_sessions, 4);
        assert_eq!(m.completed_sessions, 1);
        assert_eq!(m.abandoned_sessions, 1);
        assert!((m.completion_rate - 25.0).abs() < 1e-9);
        assert_eq!(m.abandonment_by_stage.get(&Stage::VenueSetup), Some(&1));
    }

    #[test]
    fn average_completion_duration() {
        let mut monitor = WizardMonitor::default();
        monitor.track_event(event(WizardEventKind::Started, "a", 0));
        monitor.track_event(event(WizardEventKind::Started, "b", 10));
        monitor.track_event(event(WizardEventKind::Completed, "a", 60));
        monitor.track_event(event(WizardEventKind::Completed, "b", 130));
        // completed without a logged start is ignored for duration
        monitor.track_event(event(WizardEventKind::Completed, "c", 200));

        let m = monitor.metrics();
        let expected = Duration::seconds(90).num_milliseconds() as f64;
        assert!((m.average_completion_ms.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn empty_log_has_zero_rate() {
        let m = WizardMonitor::default().metrics();
        assert_eq!(m.total_sessions, 0);
        assert!(m.completion_rate.abs() < f64::EPSILON);
        assert!(m.average_completion_ms.is_none());
    }

    #[test]
    fn counts_ai_and_errors_and_clears() {
        let mut monitor = WizardMonitor::new(10);
        monitor.track_event(event(WizardEventKind::AiInteraction, "a", 0).with("models", 5));
        monitor.track_event(event(WizardEventKind::Error, "a", 1).with("message", "timeout"));
        let m = monitor.metrics();
        assert_eq!(m.ai_interactions, 1);
        assert_eq!(m.errors, 1);

        monitor.clear_events();
        assert!(monitor.is_empty());
        assert_eq!(monitor.metrics().events_logged, 0);
    }

    struct Collecting(Arc<Mutex<Vec<WizardEventKind>>>);

    impl AnalyticsSink for Collecting {
        fn forward(&self, event: &WizardEvent) -> Result<(), WizardError> {
            self.0.lock().unwrap().push(event.kind);
            Err(WizardError::ExternalService("offline".to_string()))
        }
    }

    #[test]
    fn sink_failures_do_not_drop_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut monitor =
            WizardMonitor::default().with_sink(Box::new(Collecting(Arc::clone(&seen))));
        monitor.track_event(event(WizardEventKind::Started, "a", 0));
        assert_eq!(monitor.len(), 1);
        assert_eq!(*seen.lock().unwrap(), vec![WizardEventKind::Started]);
    }

    #[test]
    fn event_serializes_snake_case_kind() {
        let json = serde_json::to_value(event(WizardEventKind::StageCompleted, "a", 0)).unwrap();
        assert_eq!(json["kind"], "stage_completed");
        assert!(json.get("stage").is_none());
    }
}
