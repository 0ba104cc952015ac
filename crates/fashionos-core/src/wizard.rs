//! # Event Wizard
//!
//! The single entry point of the event creation flow. It owns the live
//! sessions and wires them to the repository, the draft store, the
//! autosaver and the monitor.
//!
//! ## Failure policy
//!
//! Validation, stage mismatch, missing sign-in and incomplete sessions are
//! returned to the caller. Remote saves, draft writes and brand lookups are
//! best effort: their failures are logged, tracked as `error` events and
//! reported as warnings, but never stop the organizer.

use crate::draft::{Autosaver, DraftStore, clear_draft, recover};
use crate::forms::StageForm;
use crate::monitor::{WizardEvent, WizardEventKind, WizardMonitor};
use crate::schema::ValidationContext;
use crate::session::WizardSession;
use crate::storage::{Brand, DraftSessionRecord, EventRepository, PublishedEvent};
use crate::system::{Stage, StageProgress};
use crate::{AuthContext, SessionId, WizardError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Source of wall-clock time.
pub type Clock = fn() -> DateTime<Utc>;

/// Result of a successful `advance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceOutcome {
    pub completed: Stage,
    pub progress: StageProgress,
    /// Non-blocking problems, e.g. a failed remote save.
    pub warnings: Vec<String>,
}

/// Result of `resume`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeOutcome {
    pub session_id: SessionId,
    pub stage: Stage,
    pub restored_forms: usize,
    /// Completed stages rebuilt from the server-side draft session.
    pub restored_stages: usize,
}

pub struct EventWizard<R: EventRepository, D: DraftStore> {
    repository: R,
    drafts: D,
    autosaver: Autosaver,
    monitor: WizardMonitor,
    sessions: BTreeMap<SessionId, WizardSession>,
    clock: Clock,
}

impl<R: EventRepository, D: DraftStore> std::fmt::Debug for EventWizard<R, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventWizard")
            .field("sessions", &self.sessions.len())
            .field("pending_autosaves", &self.autosaver.pending_count())
            .field("monitor", &self.monitor)
            .finish_non_exhaustive()
    }
}

impl<R: EventRepository, D: DraftStore> EventWizard<R, D> {
    #[must_use]
    pub fn new(repository: R, drafts: D) -> Self {
        Self {
            repository,
            drafts,
            autosaver: Autosaver::default(),
            monitor: WizardMonitor::default(),
            sessions: BTreeMap::new(),
            clock: Utc::now,
        }
    }

    #[must_use]
    pub fn with_autosave_delay(mut self, delay: Duration) -> Self {
        self.autosaver = Autosaver::new(delay);
        self
    }

    #[must_use]
    pub fn with_monitor(mut self, monitor: WizardMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repository
    }

    #[must_use]
    pub fn drafts(&self) -> &D {
        &self.drafts
    }

    #[must_use]
    pub fn monitor(&self) -> &WizardMonitor {
        &self.monitor
    }

    pub fn monitor_mut(&mut self) -> &mut WizardMonitor {
        &mut self.monitor
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session(&self, id: &SessionId) -> Result<&WizardSession, WizardError> {
        self.sessions
            .get(id)
            .ok_or_else(|| WizardError::SessionNotFound(id.clone()))
    }

    fn session_mut(&mut self, id: &SessionId) -> Result<&mut WizardSession, WizardError> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| WizardError::SessionNotFound(id.clone()))
    }

    /// Error for an id with no live session: published sessions are
    /// reported as such, anything else as not found.
    fn missing_session(&self, id: &SessionId) -> WizardError {
        match self.repository.list_published_events() {
            Ok(events) if events.iter().any(|e| &e.session_id == id) => {
                WizardError::AlreadyPublished(id.clone())
            }
            Ok(_) => WizardError::SessionNotFound(id.clone()),
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Published event lookup failed");
                WizardError::SessionNotFound(id.clone())
            }
        }
    }

    // =========================================================================
    // FLOW
    // =========================================================================

    /// Open a new session at the first stage.
    pub fn start(&mut self, auth: &AuthContext) -> SessionId {
        let now = (self.clock)();
        let id = SessionId::generate();
        let session = WizardSession::new(id.clone(), auth.user_id().map(str::to_string), now);
        self.monitor.track_event(
            WizardEvent::new(WizardEventKind::Started, id.clone(), now).at_stage(Stage::first()),
        );
        tracing::info!(session_id = %id, signed_in = auth.is_signed_in, "Wizard session started");
        self.sessions.insert(id.clone(), session);
        id
    }

    /// Store a raw form and schedule a debounced autosave.
    pub fn edit(&mut self, id: &SessionId, form: StageForm) -> Result<(), WizardError> {
        let now = (self.clock)();
        let session = self.session_mut(id)?;
        session.edit(form, now)?;
        let snapshot = session.to_snapshot(now);
        self.autosaver.schedule(snapshot, Instant::now());
        Ok(())
    }

    /// Validate the current stage and move on.
    pub fn advance(
        &mut self,
        id: &SessionId,
        form: StageForm,
        auth: &AuthContext,
    ) -> Result<AdvanceOutcome, WizardError> {
        let now = (self.clock)();
        let ctx = ValidationContext::at(now);
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| WizardError::SessionNotFound(id.clone()))?;

        let completed = session.advance(form, &ctx, now)?;
        if let Some(user_id) = auth.user_id() {
            session.claim(user_id);
        }
        self.autosaver.schedule(session.to_snapshot(now), Instant::now());
        self.monitor.track_event(
            WizardEvent::new(WizardEventKind::StageCompleted, id.clone(), now)
                .at_stage(completed)
                .with("percent", session.completion_percent()),
        );

        let mut warnings = Vec::new();
        let record = DraftSessionRecord::from_session(session);
        if let Err(e) = self.repository.insert_or_update_draft_session(&record) {
            let err = WizardError::Persistence(e.to_string());
            tracing::warn!(session_id = %id, error = %err, "Remote draft save failed");
            self.monitor.track_event(
                WizardEvent::new(WizardEventKind::Error, id.clone(), now)
                    .at_stage(completed)
                    .with("message", err.to_string()),
            );
            warnings.push(err.to_string());
        }

        tracing::debug!(session_id = %id, stage = %completed, "Stage completed");
        Ok(AdvanceOutcome {
            completed,
            progress: session.progress(),
            warnings,
        })
    }

    /// Step back one stage. `None` at the first stage.
    pub fn retreat(&mut self, id: &SessionId) -> Result<Option<Stage>, WizardError> {
        let now = (self.clock)();
        let session = self.session_mut(id)?;
        let previous = session.retreat(now);
        if previous.is_some() {
            let snapshot = session.to_snapshot(now);
            self.autosaver.schedule(snapshot, Instant::now());
        }
        Ok(previous)
    }

    /// Restore a saved draft.
    ///
    /// A session still in memory is pre-filled from its draft. Otherwise a
    /// new session with the same id is built from the server-side draft
    /// session (validated stages) and the local draft (raw forms).
    pub fn resume(
        &mut self,
        id: &SessionId,
        auth: &AuthContext,
    ) -> Result<ResumeOutcome, WizardError> {
        let now = (self.clock)();
        let draft = recover(&mut self.drafts, id);

        let mut restored_stages = 0;
        if !self.sessions.contains_key(id) {
            let record = match self.repository.get_draft_session(id) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(session_id = %id, error = %e, "Remote draft lookup failed");
                    None
                }
            };
            let missing = self.missing_session(id);
            if matches!(missing, WizardError::AlreadyPublished(_))
                || (draft.is_none() && record.is_none())
            {
                return Err(missing);
            }

            let owner = record
                .as_ref()
                .and_then(|r| r.owner.clone())
                .or_else(|| auth.user_id().map(str::to_string));
            let mut session = WizardSession::new(id.clone(), owner, now);
            if let Some(record) = &record {
                restored_stages = session.restore_progress(
                    &record.completed_stages,
                    &record.payloads,
                    record.current_stage,
                );
            }
            self.sessions.insert(id.clone(), session);
        }

        let session = self.session_mut(id)?;
        let restored_forms = draft.as_ref().map_or(0, |d| session.apply_draft(d));
        tracing::info!(session_id = %id, restored_forms, restored_stages, "Wizard session resumed");
        Ok(ResumeOutcome {
            session_id: id.clone(),
            stage: session.current(),
            restored_forms,
            restored_stages,
        })
    }

    /// Publish a complete session for the signed-in organizer.
    ///
    /// The session leaves memory once its event is stored.
    pub fn publish(
        &mut self,
        id: &SessionId,
        auth: &AuthContext,
    ) -> Result<PublishedEvent, WizardError> {
        let now = (self.clock)();
        let user_id = auth.user_id().ok_or(WizardError::Unauthenticated)?;
        let Some(session) = self.sessions.get(id) else {
            return Err(self.missing_session(id));
        };

        let event = PublishedEvent::from_session(session, user_id, now)?;
        if let Err(e) = self.repository.insert_published_event(&event) {
            tracing::error!(session_id = %id, error = %e, "Publishing failed");
            self.monitor.track_event(
                WizardEvent::new(WizardEventKind::Error, id.clone(), now)
                    .at_stage(Stage::ReviewPublish)
                    .with("message", e.to_string()),
            );
            if matches!(e, WizardError::AlreadyPublished(_)) {
                return Err(e);
            }
            return Err(WizardError::Persistence(e.to_string()));
        }

        self.sessions.remove(id);
        self.autosaver.cancel(id);
        clear_draft(&mut self.drafts, id);
        self.monitor.track_event(
            WizardEvent::new(WizardEventKind::Completed, id.clone(), now)
                .at_stage(Stage::ReviewPublish)
                .with("event_id", event.id.to_string()),
        );
        tracing::info!(session_id = %id, event_id = %event.id, slug = %event.slug, "Event published");
        Ok(event)
    }

    /// Record that the organizer left the wizard.
    ///
    /// The draft is written at once and the session leaves memory; `resume`
    /// rebuilds it later.
    pub fn abandon(&mut self, id: &SessionId) -> Result<Stage, WizardError> {
        let now = (self.clock)();
        let Some(session) = self.sessions.remove(id) else {
            return Err(self.missing_session(id));
        };
        let stage = session.current();
        self.autosaver.save_now(&mut self.drafts, &session.to_snapshot(now));
        self.monitor.track_event(
            WizardEvent::new(WizardEventKind::Abandoned, id.clone(), now).at_stage(stage),
        );
        tracing::info!(session_id = %id, stage = %stage, "Wizard session abandoned");
        Ok(stage)
    }

    /// Brand registered for the domain of `email`, if any.
    pub fn lookup_brand(&mut self, email: &str) -> Option<Brand> {
        let domain = email.trim().rsplit_once('@').map(|(_, d)| d)?;
        if domain.is_empty() {
            return None;
        }
        match self.repository.query_brand_by_email_domain(domain) {
            Ok(brand) => brand,
            Err(e) => {
                tracing::warn!(domain, error = %e, "Brand lookup failed");
                None
            }
        }
    }

    /// Record whether the payment processor is configured for a session.
    pub fn set_payment_configured(
        &mut self,
        id: &SessionId,
        configured: bool,
    ) -> Result<(), WizardError> {
        self.session_mut(id)?.set_payment_configured(configured);
        Ok(())
    }

    /// Write autosaves whose debounce delay has elapsed.
    pub fn flush_autosave(&mut self, now: Instant) -> usize {
        self.autosaver.flush_due(&mut self.drafts, now)
    }

    /// Write every pending autosave (shutdown).
    pub fn flush_all_autosaves(&mut self) -> usize {
        self.autosaver.flush_all(&mut self.drafts)
    }

    #[must_use]
    pub fn pending_autosaves(&self) -> usize {
        self.autosaver.pending_count()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::draft::MemoryDraftStore;
    use crate::formats::{DraftSnapshot, draft_key};
    use crate::forms::{OrganizerForm, StageForms, TicketForm, TicketTierForm};
    use crate::storage::InMemoryRepository;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_792_000_000, 0).unwrap()
    }

    fn wizard() -> EventWizard<InMemoryRepository, MemoryDraftStore> {
        EventWizard::new(InMemoryRepository::new(), MemoryDraftStore::new()).with_clock(fixed_now)
    }

    fn organizer() -> StageForm {
        StageForm::OrganizerSetup(OrganizerForm {
            name: "Maison Rue".to_string(),
            email: "hello@maisonrue.com".to_string(),
            ..OrganizerForm::default()
        })
    }

    /// Repository whose writes fail.
    #[derive(Default)]
    struct OfflineRepository;

    impl EventRepository for OfflineRepository {
        fn insert_or_update_draft_session(
            &mut self,
            _record: &DraftSessionRecord,
        ) -> Result<(), WizardError> {
            Err(WizardError::Io("connection refused".to_string()))
        }
        fn get_draft_session(
            &self,
            _session_id: &SessionId,
        ) -> Result<Option<DraftSessionRecord>, WizardError> {
            Ok(None)
        }
        fn insert_published_event(&mut self, _event: &PublishedEvent) -> Result<(), WizardError> {
            Err(WizardError::Io("connection refused".to_string()))
        }
        fn list_published_events(&self) -> Result<Vec<PublishedEvent>, WizardError> {
            Ok(Vec::new())
        }
        fn query_brand_by_email_domain(&self, _domain: &str) -> Result<Option<Brand>, WizardError> {
            Err(WizardError::Io("connection refused".to_string()))
        }
        fn upsert_brand(&mut self, _brand: &Brand) -> Result<(), WizardError> {
            Err(WizardError::Io("connection refused".to_string()))
        }
    }

    #[test]
    fn start_tracks_started_event() {
        let mut w = wizard();
        let id = w.start(&AuthContext::anonymous());
        assert_eq!(w.session(&id).unwrap().current(), Stage::OrganizerSetup);
        let events = w.monitor().export_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, WizardEventKind::Started);
    }

    #[test]
    fn advance_saves_remote_draft() {
        let mut w = wizard();
        let id = w.start(&AuthContext::anonymous());
        let outcome = w
            .advance(&id, organizer(), &AuthContext::signed_in("user_1"))
            .unwrap();
        assert_eq!(outcome.completed, Stage::OrganizerSetup);
        assert_eq!(outcome.progress.current, Stage::EventSetup);
        assert!(outcome.warnings.is_empty());

        let record = w.repository().get_draft_session(&id).unwrap().unwrap();
        assert_eq!(record.owner.as_deref(), Some("user_1"));
        assert_eq!(record.current_stage, Stage::EventSetup);
    }

    #[test]
    fn remote_save_failure_does_not_block() {
        let mut w =
            EventWizard::new(OfflineRepository, MemoryDraftStore::new()).with_clock(fixed_now);
        let id = w.start(&AuthContext::anonymous());
        let outcome = w.advance(&id, organizer(), &AuthContext::anonymous()).unwrap();
        assert_eq!(outcome.progress.current, Stage::EventSetup);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].starts_with("Persistence error"));
        assert_eq!(w.monitor().metrics().errors, 1);
        assert!(w.lookup_brand("hello@maisonrue.com").is_none());
    }

    #[test]
    fn unknown_session_is_not_found() {
        let mut w = wizard();
        let err = w.retreat(&SessionId::new("nope")).unwrap_err();
        assert!(matches!(err, WizardError::SessionNotFound(_)));
    }

    #[test]
    fn publish_requires_sign_in() {
        let mut w = wizard();
        let id = w.start(&AuthContext::anonymous());
        let err = w.publish(&id, &AuthContext::anonymous()).unwrap_err();
        assert!(matches!(err, WizardError::Unauthenticated));
        let err = w.publish(&id, &AuthContext::signed_in("user_1")).unwrap_err();
        assert!(matches!(err, WizardError::Incomplete(6)));
    }

    #[test]
    fn edit_is_debounced_then_resumable() {
        let mut w = wizard();
        let id = w.start(&AuthContext::anonymous());
        w.edit(&id, organizer()).unwrap();
        assert_eq!(w.pending_autosaves(), 1);
        assert_eq!(w.flush_autosave(Instant::now()), 0);
        assert_eq!(w.flush_all_autosaves(), 1);
        assert!(w.drafts().get(&draft_key(&id)).unwrap().is_some());

        // a fresh wizard over the same drafts restores the form
        let drafts = {
            let mut store = MemoryDraftStore::new();
            let blob = w.drafts().get(&draft_key(&id)).unwrap().unwrap();
            store.set(&draft_key(&id), &blob).unwrap();
            store
        };
        let mut other = EventWizard::new(InMemoryRepository::new(), drafts).with_clock(fixed_now);
        let outcome = other.resume(&id, &AuthContext::anonymous()).unwrap();
        assert_eq!(outcome.restored_forms, 1);
        assert_eq!(
            other.session(&id).unwrap().forms().get(Stage::OrganizerSetup),
            organizer()
        );
    }

    #[test]
    fn resume_without_draft_is_not_found() {
        let mut w = wizard();
        let err = w
            .resume(&SessionId::new("gone"), &AuthContext::anonymous())
            .unwrap_err();
        assert!(matches!(err, WizardError::SessionNotFound(_)));
    }

    #[test]
    fn abandon_tracks_stage_and_keeps_draft() {
        let mut w = wizard();
        let id = w.start(&AuthContext::anonymous());
        w.advance(&id, organizer(), &AuthContext::anonymous()).unwrap();
        assert_eq!(w.session_count(), 1);
        assert_eq!(w.abandon(&id).unwrap(), Stage::EventSetup);
        assert_eq!(w.session_count(), 0);

        let metrics = w.monitor().metrics();
        assert_eq!(metrics.abandoned_sessions, 1);
        assert_eq!(metrics.abandonment_by_stage.get(&Stage::EventSetup), Some(&1));
        assert_eq!(w.pending_autosaves(), 0);
        let blob = w.drafts().get(&draft_key(&id)).unwrap().unwrap();
        let snapshot = crate::formats::DraftSnapshot::from_json(&blob).unwrap();
        assert_ne!(snapshot.forms, StageForms::default());

        // progress comes back from the server-side record
        let outcome = w.resume(&id, &AuthContext::anonymous()).unwrap();
        assert_eq!(outcome.restored_stages, 1);
        assert_eq!(outcome.stage, Stage::EventSetup);
        assert_eq!(w.session_count(), 1);

        assert!(matches!(
            w.abandon(&SessionId::new("nope")),
            Err(WizardError::SessionNotFound(_))
        ));
    }

    #[test]
    fn abandon_writes_only_its_own_draft() {
        let mut w = wizard();
        let left = w.start(&AuthContext::anonymous());
        let stays = w.start(&AuthContext::anonymous());
        w.edit(&left, organizer()).unwrap();
        w.edit(&stays, organizer()).unwrap();
        assert_eq!(w.pending_autosaves(), 2);

        w.abandon(&left).unwrap();
        assert_eq!(w.pending_autosaves(), 1);
        assert!(w.drafts().get(&draft_key(&left)).unwrap().is_some());
        assert!(w.drafts().get(&draft_key(&stays)).unwrap().is_none());
    }

    #[test]
    fn resumed_draft_without_progress_starts_at_first_stage() {
        let id = SessionId::new("late-tab");
        let tickets = StageForm::TicketSetup(TicketForm {
            currency: "eur".to_string(),
            tiers: vec![TicketTierForm {
                name: "General".to_string(),
                price: "45".to_string(),
                quantity: "250".to_string(),
            }],
        });
        let mut forms = StageForms::default();
        forms.set(tickets.clone());
        let snapshot = DraftSnapshot::new(id.clone(), Stage::TicketSetup, forms, fixed_now());
        let mut drafts = MemoryDraftStore::new();
        drafts
            .set(&draft_key(&id), &snapshot.to_json().unwrap())
            .unwrap();

        let mut w = EventWizard::new(InMemoryRepository::new(), drafts).with_clock(fixed_now);
        let outcome = w.resume(&id, &AuthContext::anonymous()).unwrap();
        assert_eq!(outcome.stage, Stage::OrganizerSetup);
        assert_eq!(outcome.restored_stages, 0);

        let session = w.session(&id).unwrap();
        assert_eq!(session.current(), Stage::OrganizerSetup);
        assert!(session.completed().is_empty());
        assert_eq!(session.forms().get(Stage::TicketSetup), tickets);

        let err = w.advance(&id, tickets, &AuthContext::anonymous()).unwrap_err();
        assert!(matches!(err, WizardError::StageMismatch { .. }));
    }
}
