//! # Event Repository
//!
//! The relational store behind the wizard: draft sessions, published events
//! and the brand directory used for organizer lookup.
//!
//! ## Storage Backends
//!
//! - `InMemory`: [`InMemoryRepository`] (volatile, used by tests and demos)
//! - `Persistent`: [`RedbRepository`] (redb tables, postcard records)

mod redb_store;

pub use redb_store::{RedbDraftStore, RedbRepository};

use crate::draft::{DraftStore, MemoryDraftStore};
use crate::schema::EventInfo;
use crate::session::{CompletePayloads, StagePayloads, WizardSession};
use crate::system::Stage;
use crate::{SessionId, WizardError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// =============================================================================
// RECORDS
// =============================================================================

/// Server-side copy of an unfinished session.
///
/// Only validated payloads are stored; raw forms stay in the local draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSessionRecord {
    pub session_id: SessionId,
    pub owner: Option<String>,
    pub current_stage: Stage,
    pub completed_stages: Vec<Stage>,
    pub payloads: StagePayloads,
    pub updated_at: DateTime<Utc>,
}

impl DraftSessionRecord {
    #[must_use]
    pub fn from_session(session: &WizardSession) -> Self {
        Self {
            session_id: session.id().clone(),
            owner: session.owner().map(str::to_string),
            current_stage: session.current(),
            completed_stages: session.completed().iter().copied().collect(),
            payloads: session.payloads().clone(),
            updated_at: session.updated_at(),
        }
    }
}

/// A published event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedEvent {
    pub id: Uuid,
    pub slug: String,
    pub session_id: SessionId,
    pub owner: String,
    pub payment_configured: bool,
    pub payloads: CompletePayloads,
    pub published_at: DateTime<Utc>,
}

impl PublishedEvent {
    /// Build the record for a session ready to publish.
    pub fn from_session(
        session: &WizardSession,
        owner: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, WizardError> {
        let payloads = session.complete_payloads()?;
        let id = Uuid::new_v4();
        Ok(Self {
            slug: event_slug(&payloads.event, &id),
            id,
            session_id: session.id().clone(),
            owner: owner.to_string(),
            payment_configured: session.payment_configured(),
            payloads,
            published_at: now,
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.payloads.event.title
    }
}

/// URL slug: lower-cased title words joined by `-`, plus a short id suffix.
fn event_slug(event: &EventInfo, id: &Uuid) -> String {
    let words: Vec<String> = event
        .title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    let suffix: String = id.simple().to_string().chars().take(8).collect();
    if words.is_empty() {
        suffix
    } else {
        format!("{}-{}", words.join("-"), suffix)
    }
}

/// A brand known to the platform, matched by email domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: Uuid,
    pub name: String,
    pub email_domain: String,
}

impl Brand {
    #[must_use]
    pub fn new(name: impl Into<String>, email_domain: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email_domain: normalize_domain(email_domain),
        }
    }
}

/// Lower-cased domain without a leading `@`.
#[must_use]
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_start_matches('@').to_lowercase()
}

// =============================================================================
// REPOSITORY TRAIT
// =============================================================================

/// Relational store operations used by the wizard.
pub trait EventRepository {
    /// Insert a draft session, or replace the stored one with the same id.
    fn insert_or_update_draft_session(
        &mut self,
        record: &DraftSessionRecord,
    ) -> Result<(), WizardError>;

    fn get_draft_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<DraftSessionRecord>, WizardError>;

    /// Store a published event. A session can be published once.
    fn insert_published_event(&mut self, event: &PublishedEvent) -> Result<(), WizardError>;

    /// All published events, oldest first.
    fn list_published_events(&self) -> Result<Vec<PublishedEvent>, WizardError>;

    /// Brand registered for `domain` (case-insensitive).
    fn query_brand_by_email_domain(&self, domain: &str) -> Result<Option<Brand>, WizardError>;

    /// Insert or replace the brand of its email domain.
    fn upsert_brand(&mut self, brand: &Brand) -> Result<(), WizardError>;
}

// =============================================================================
// IN-MEMORY REPOSITORY
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    drafts: BTreeMap<SessionId, DraftSessionRecord>,
    events: Vec<PublishedEvent>,
    brands: BTreeMap<String, Brand>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventRepository for InMemoryRepository {
    fn insert_or_update_draft_session(
        &mut self,
        record: &DraftSessionRecord,
    ) -> Result<(), WizardError> {
        self.drafts.insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    fn get_draft_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<DraftSessionRecord>, WizardError> {
        Ok(self.drafts.get(session_id).cloned())
    }

    fn insert_published_event(&mut self, event: &PublishedEvent) -> Result<(), WizardError> {
        if self.events.iter().any(|e| e.session_id == event.session_id) {
            return Err(WizardError::AlreadyPublished(event.session_id.clone()));
        }
        self.events.push(event.clone());
        Ok(())
    }

    fn list_published_events(&self) -> Result<Vec<PublishedEvent>, WizardError> {
        Ok(self.events.clone())
    }

    fn query_brand_by_email_domain(&self, domain: &str) -> Result<Option<Brand>, WizardError> {
        Ok(self.brands.get(&normalize_domain(domain)).cloned())
    }

    fn upsert_brand(&mut self, brand: &Brand) -> Result<(), WizardError> {
        self.brands
            .insert(normalize_domain(&brand.email_domain), brand.clone());
        Ok(())
    }
}

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// Repository chosen at runtime.
#[derive(Debug)]
pub enum RepositoryBackend {
    InMemory(InMemoryRepository),
    Persistent(RedbRepository),
}

impl Default for RepositoryBackend {
    fn default() -> Self {
        Self::InMemory(InMemoryRepository::new())
    }
}

impl RepositoryBackend {
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }
}

impl EventRepository for RepositoryBackend {
    fn insert_or_update_draft_session(
        &mut self,
        record: &DraftSessionRecord,
    ) -> Result<(), WizardError> {
        match self {
            Self::InMemory(r) => r.insert_or_update_draft_session(record),
            Self::Persistent(r) => r.insert_or_update_draft_session(record),
        }
    }

    fn get_draft_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<DraftSessionRecord>, WizardError> {
        match self {
            Self::InMemory(r) => r.get_draft_session(session_id),
            Self::Persistent(r) => r.get_draft_session(session_id),
        }
    }

    fn insert_published_event(&mut self, event: &PublishedEvent) -> Result<(), WizardError> {
        match self {
            Self::InMemory(r) => r.insert_published_event(event),
            Self::Persistent(r) => r.insert_published_event(event),
        }
    }

    fn list_published_events(&self) -> Result<Vec<PublishedEvent>, WizardError> {
        match self {
            Self::InMemory(r) => r.list_published_events(),
            Self::Persistent(r) => r.list_published_events(),
        }
    }

    fn query_brand_by_email_domain(&self, domain: &str) -> Result<Option<Brand>, WizardError> {
        match self {
            Self::InMemory(r) => r.query_brand_by_email_domain(domain),
            Self::Persistent(r) => r.query_brand_by_email_domain(domain),
        }
    }

    fn upsert_brand(&mut self, brand: &Brand) -> Result<(), WizardError> {
        match self {
            Self::InMemory(r) => r.upsert_brand(brand),
            Self::Persistent(r) => r.upsert_brand(brand),
        }
    }
}

/// Draft store chosen at runtime.
#[derive(Debug)]
pub enum DraftBackend {
    InMemory(MemoryDraftStore),
    Persistent(RedbDraftStore),
}

impl Default for DraftBackend {
    fn default() -> Self {
        Self::InMemory(MemoryDraftStore::new())
    }
}

impl DraftStore for DraftBackend {
    fn get(&self, key: &str) -> Result<Option<String>, WizardError> {
        match self {
            Self::InMemory(s) => s.get(key),
            Self::Persistent(s) => s.get(key),
        }
    }

    fn set(&mut self, key: &str, blob: &str) -> Result<(), WizardError> {
        match self {
            Self::InMemory(s) => s.set(key, blob),
            Self::Persistent(s) => s.set(key, blob),
        }
    }

    fn remove(&mut self, key: &str) -> Result<(), WizardError> {
        match self {
            Self::InMemory(s) => s.remove(key),
            Self::Persistent(s) => s.remove(key),
        }
    }

    fn keys(&self) -> Result<Vec<String>, WizardError> {
        match self {
            Self::InMemory(s) => s.keys(),
            Self::Persistent(s) => s.keys(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
