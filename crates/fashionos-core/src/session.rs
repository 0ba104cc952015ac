//! # Wizard Session
//!
//! One organizer's attempt at creating an event.
//!
//! A session owns the stage pointer, the raw form of every stage and the
//! validated payload of every completed stage. All mutation goes through
//! `&mut self`; there is no shared or global wizard state.
//!
//! ## Invariants
//!
//! - A stage is in `completed` only if its payload validated.
//! - The pointer never sits past the first incomplete stage.
//! - A failed `advance` leaves the session exactly as it was.
//! - `retreat` never discards forms or payloads.
//! - A published session accepts no further edits.

use crate::formats::DraftSnapshot;
use crate::forms::{StageForm, StageForms};
use crate::schema::{
    EventInfo, OrganizerInfo, ReviewInfo, SponsorInfo, StagePayload, TicketInfo,
    ValidationContext, VenueInfo, validate_form,
};
use crate::system::{Stage, StageProgress, completion_percent};
use crate::{SessionId, WizardError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// STAGE PAYLOADS
// =============================================================================

/// Validated payloads, one optional slot per stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePayloads {
    pub organizer: Option<OrganizerInfo>,
    pub event: Option<EventInfo>,
    pub venue: Option<VenueInfo>,
    pub tickets: Option<TicketInfo>,
    pub sponsors: Option<SponsorInfo>,
    pub review: Option<ReviewInfo>,
}

impl StagePayloads {
    pub fn set(&mut self, payload: StagePayload) {
        match payload {
            StagePayload::OrganizerSetup(p) => self.organizer = Some(p),
            StagePayload::EventSetup(p) => self.event = Some(p),
            StagePayload::VenueSetup(p) => self.venue = Some(p),
            StagePayload::TicketSetup(p) => self.tickets = Some(p),
            StagePayload::SponsorSetup(p) => self.sponsors = Some(p),
            StagePayload::ReviewPublish(p) => self.review = Some(p),
        }
    }

    #[must_use]
    pub fn get(&self, stage: Stage) -> Option<StagePayload> {
        match stage {
            Stage::OrganizerSetup => self.organizer.clone().map(StagePayload::OrganizerSetup),
            Stage::EventSetup => self.event.clone().map(StagePayload::EventSetup),
            Stage::VenueSetup => self.venue.clone().map(StagePayload::VenueSetup),
            Stage::TicketSetup => self.tickets.clone().map(StagePayload::TicketSetup),
            Stage::SponsorSetup => self.sponsors.clone().map(StagePayload::SponsorSetup),
            Stage::ReviewPublish => self.review.clone().map(StagePayload::ReviewPublish),
        }
    }
}

/// Every payload of a session that is ready to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletePayloads {
    pub organizer: OrganizerInfo,
    pub event: EventInfo,
    pub venue: VenueInfo,
    pub tickets: TicketInfo,
    pub sponsors: SponsorInfo,
    pub review: ReviewInfo,
}

// =============================================================================
// SESSION
// =============================================================================

/// State of one wizard attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSession {
    id: SessionId,
    owner: Option<String>,
    current: Stage,
    forms: StageForms,
    payloads: StagePayloads,
    completed: BTreeSet<Stage>,
    payment_configured: bool,
    published: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WizardSession {
    /// Create a fresh session positioned at the first stage.
    #[must_use]
    pub fn new(id: SessionId, owner: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner,
            current: Stage::first(),
            forms: StageForms::default(),
            payloads: StagePayloads::default(),
            completed: BTreeSet::new(),
            payment_configured: false,
            published: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Attach the signed-in owner if none is recorded yet.
    pub fn claim(&mut self, user_id: &str) {
        if self.owner.is_none() {
            self.owner = Some(user_id.to_string());
        }
    }

    #[must_use]
    pub fn current(&self) -> Stage {
        self.current
    }

    #[must_use]
    pub fn forms(&self) -> &StageForms {
        &self.forms
    }

    #[must_use]
    pub fn payloads(&self) -> &StagePayloads {
        &self.payloads
    }

    #[must_use]
    pub fn completed(&self) -> &BTreeSet<Stage> {
        &self.completed
    }

    #[must_use]
    pub fn is_completed(&self, stage: Stage) -> bool {
        self.completed.contains(&stage)
    }

    #[must_use]
    pub fn is_published(&self) -> bool {
        self.published
    }

    #[must_use]
    pub fn payment_configured(&self) -> bool {
        self.payment_configured
    }

    /// Record whether the payment processor is set up (display only).
    pub fn set_payment_configured(&mut self, configured: bool) {
        self.payment_configured = configured;
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Percentage of completed stages.
    #[must_use]
    pub fn completion_percent(&self) -> f64 {
        completion_percent(self.completed.len())
    }

    #[must_use]
    pub fn progress(&self) -> StageProgress {
        StageProgress::new(self.current, &self.completed)
    }

    /// Whether every stage has a validated payload.
    #[must_use]
    pub fn is_ready_to_publish(&self) -> bool {
        Stage::ALL.iter().all(|s| self.completed.contains(s))
    }

    fn ensure_editable(&self) -> Result<(), WizardError> {
        if self.published {
            return Err(WizardError::AlreadyPublished(self.id.clone()));
        }
        Ok(())
    }

    /// Store a raw form without validating it.
    ///
    /// Any stage slot may be edited; completion is unaffected until the
    /// stage is advanced again.
    pub fn edit(&mut self, form: StageForm, now: DateTime<Utc>) -> Result<(), WizardError> {
        self.ensure_editable()?;
        self.forms.set(form);
        self.updated_at = now;
        Ok(())
    }

    /// Validate `form` for the current stage and move forward.
    ///
    /// Returns the stage that was completed. The terminal stage stays put.
    pub fn advance(
        &mut self,
        form: StageForm,
        ctx: &ValidationContext,
        now: DateTime<Utc>,
    ) -> Result<Stage, WizardError> {
        self.ensure_editable()?;
        if form.stage() != self.current {
            return Err(WizardError::StageMismatch {
                expected: self.current.key().to_string(),
                got: form.stage().key().to_string(),
            });
        }

        let payload = validate_form(&form, ctx).map_err(WizardError::Validation)?;

        let done = self.current;
        self.forms.set(form);
        self.payloads.set(payload);
        self.completed.insert(done);
        if let Some(next) = done.next() {
            self.current = next;
        }
        self.updated_at = now;
        Ok(done)
    }

    /// Step back one stage, keeping all data. `None` at the first stage.
    pub fn retreat(&mut self, now: DateTime<Utc>) -> Option<Stage> {
        let previous = self.current.previous()?;
        self.current = previous;
        self.updated_at = now;
        Some(previous)
    }

    /// All payloads, or the number of stages still missing.
    pub fn complete_payloads(&self) -> Result<CompletePayloads, WizardError> {
        let missing = Stage::ALL
            .iter()
            .filter(|s| !self.completed.contains(*s))
            .count();
        let p = &self.payloads;
        match (
            &p.organizer,
            &p.event,
            &p.venue,
            &p.tickets,
            &p.sponsors,
            &p.review,
        ) {
            (Some(o), Some(e), Some(v), Some(t), Some(s), Some(r)) if missing == 0 => {
                Ok(CompletePayloads {
                    organizer: o.clone(),
                    event: e.clone(),
                    venue: v.clone(),
                    tickets: t.clone(),
                    sponsors: s.clone(),
                    review: r.clone(),
                })
            }
            _ => Err(WizardError::Incomplete(missing.max(1))),
        }
    }

    /// Mark the session published. Further edits are refused.
    pub fn mark_published(&mut self, now: DateTime<Utc>) -> Result<(), WizardError> {
        self.ensure_editable()?;
        if !self.is_ready_to_publish() {
            return Err(WizardError::Incomplete(self.progress().remaining()));
        }
        self.published = true;
        self.updated_at = now;
        Ok(())
    }

    // =========================================================================
    // DRAFTS
    // =========================================================================

    /// Snapshot of the raw forms for local autosave.
    #[must_use]
    pub fn to_snapshot(&self, now: DateTime<Utc>) -> DraftSnapshot {
        DraftSnapshot::new(self.id.clone(), self.current, self.forms.clone(), now)
    }

    /// First stage that is not completed yet, or the terminal stage.
    #[must_use]
    pub fn frontier(&self) -> Stage {
        Stage::ALL
            .into_iter()
            .find(|s| !self.completed.contains(s))
            .unwrap_or(Stage::ReviewPublish)
    }

    /// Move the pointer to `stage`, but never past the frontier.
    fn point_at(&mut self, stage: Stage) {
        self.current = stage.min(self.frontier());
    }

    /// Restore validated progress saved server-side.
    ///
    /// Stages are taken in order while each is listed as completed and
    /// carries a payload; the first gap ends the restore. Returns the number
    /// of stages restored.
    pub fn restore_progress(
        &mut self,
        completed: &[Stage],
        payloads: &StagePayloads,
        current: Stage,
    ) -> usize {
        if self.published || !self.completed.is_empty() {
            return 0;
        }
        for stage in Stage::ALL {
            let Some(payload) = payloads.get(stage) else {
                break;
            };
            if !completed.contains(&stage) {
                break;
            }
            self.payloads.set(payload);
            self.completed.insert(stage);
        }
        self.point_at(current);
        self.completed.len()
    }

    /// Pre-fill from a recovered draft.
    ///
    /// Only forms still blank in memory are filled; data already entered in
    /// this session wins. The stage pointer follows the draft only as far as
    /// the completed stages reach. Returns the number of forms filled.
    pub fn apply_draft(&mut self, draft: &DraftSnapshot) -> usize {
        if self.published {
            return 0;
        }
        let mut filled = 0;
        for stage in Stage::ALL {
            let form = draft.forms.get(stage);
            if self.forms.is_blank(stage) && !form.is_blank() {
                self.forms.set(form);
                filled += 1;
            }
        }
        self.point_at(draft.stage);
        filled
    }
}

// =============================================================================
// TESTS
// =============================================================================
