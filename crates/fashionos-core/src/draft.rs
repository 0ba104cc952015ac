//! # Draft Autosave and Recovery
//!
//! Local, best-effort persistence of in-progress forms.
//!
//! - [`DraftStore`] is a string key to string blob store.
//! - [`Autosaver`] debounces writes: every edit reschedules the session's
//!   snapshot, and only the last one is written once the delay elapsed.
//! - [`recover`] reads a draft back. Anything unreadable is discarded.
//!
//! None of these operations ever fail the caller. Errors are logged and the
//! draft is simply not saved (or not restored).

use crate::formats::{DraftSnapshot, draft_key};
use crate::primitives::AUTOSAVE_DEBOUNCE_MS;
use crate::{SessionId, WizardError};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

// =============================================================================
// DRAFT STORE
// =============================================================================

/// Key/value blob storage for drafts.
pub trait DraftStore {
    /// Read a blob.
    fn get(&self, key: &str) -> Result<Option<String>, WizardError>;

    /// Write a blob, replacing any previous value.
    fn set(&mut self, key: &str, blob: &str) -> Result<(), WizardError>;

    /// Remove a blob. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), WizardError>;

    /// All stored keys, in lexicographic order.
    fn keys(&self) -> Result<Vec<String>, WizardError>;
}

/// Volatile draft store.
#[derive(Debug, Clone, Default)]
pub struct MemoryDraftStore {
    blobs: BTreeMap<String, String>,
}

impl MemoryDraftStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl DraftStore for MemoryDraftStore {
    fn get(&self, key: &str) -> Result<Option<String>, WizardError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn set(&mut self, key: &str, blob: &str) -> Result<(), WizardError> {
        self.blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), WizardError> {
        self.blobs.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, WizardError> {
        Ok(self.blobs.keys().cloned().collect())
    }
}

// =============================================================================
// AUTOSAVER
// =============================================================================

#[derive(Debug, Clone)]
struct PendingSave {
    snapshot: DraftSnapshot,
    due: Instant,
}

/// Debounced draft writer.
#[derive(Debug, Clone)]
pub struct Autosaver {
    delay: Duration,
    pending: BTreeMap<SessionId, PendingSave>,
}

impl Default for Autosaver {
    fn default() -> Self {
        Self::new(Duration::from_millis(AUTOSAVE_DEBOUNCE_MS))
    }
}

impl Autosaver {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Queue a snapshot, replacing any pending one for the same session and
    /// restarting its delay.
    pub fn schedule(&mut self, snapshot: DraftSnapshot, now: Instant) {
        let due = now + self.delay;
        self.pending
            .insert(snapshot.session_id.clone(), PendingSave { snapshot, due });
    }

    /// Drop the pending snapshot of a session. Returns whether one existed.
    pub fn cancel(&mut self, session_id: &SessionId) -> bool {
        self.pending.remove(session_id).is_some()
    }

    #[must_use]
    pub fn is_pending(&self, session_id: &SessionId) -> bool {
        self.pending.contains_key(session_id)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Write every snapshot whose delay has elapsed. Returns how many were
    /// written successfully.
    pub fn flush_due<D: DraftStore>(&mut self, store: &mut D, now: Instant) -> usize {
        let due: Vec<SessionId> = self
            .pending
            .iter()
            .filter(|(_, p)| p.due <= now)
            .map(|(id, _)| id.clone())
            .collect();

        due.into_iter()
            .filter_map(|id| self.pending.remove(&id))
            .filter(|p| write_snapshot(store, &p.snapshot))
            .count()
    }

    /// Write `snapshot` now, replacing anything pending for its session.
    pub fn save_now<D: DraftStore>(&mut self, store: &mut D, snapshot: &DraftSnapshot) -> bool {
        self.pending.remove(&snapshot.session_id);
        write_snapshot(store, snapshot)
    }

    /// Write everything still pending, regardless of delay.
    pub fn flush_all<D: DraftStore>(&mut self, store: &mut D) -> usize {
        std::mem::take(&mut self.pending)
            .into_values()
            .filter(|p| write_snapshot(store, &p.snapshot))
            .count()
    }
}

fn write_snapshot<D: DraftStore>(store: &mut D, snapshot: &DraftSnapshot) -> bool {
    let result = snapshot
        .to_json()
        .and_then(|blob| store.set(&snapshot.key(), &blob));
    match result {
        Ok(()) => {
            tracing::debug!(session_id = %snapshot.session_id, stage = %snapshot.stage, "Draft saved");
            true
        }
        Err(e) => {
            tracing::warn!(session_id = %snapshot.session_id, error = %e, "Draft autosave failed");
            false
        }
    }
}

// =============================================================================
// RECOVERY
// =============================================================================

/// Read back the draft of `session_id`.
///
/// A blob that cannot be decoded, or that belongs to another session, is
/// logged and removed from the store.
pub fn recover<D: DraftStore>(store: &mut D, session_id: &SessionId) -> Option<DraftSnapshot> {
    let key = draft_key(session_id);
    let blob = match store.get(&key) {
        Ok(Some(blob)) => blob,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "Draft read failed");
            return None;
        }
    };

    let parsed = DraftSnapshot::from_json(&blob).and_then(|snapshot| {
        if snapshot.session_id == *session_id {
            Ok(snapshot)
        } else {
            Err(WizardError::Recovery(format!(
                "Draft belongs to session {}",
                snapshot.session_id
            )))
        }
    });

    match parsed {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "Discarding corrupt draft");
            if let Err(e) = store.remove(&key) {
                tracing::warn!(session_id = %session_id, error = %e, "Failed to remove corrupt draft");
            }
            None
        }
    }
}

/// Remove the draft of `session_id`, logging failures.
pub fn clear_draft<D: DraftStore>(store: &mut D, session_id: &SessionId) {
    if let Err(e) = store.remove(&draft_key(session_id)) {
        tracing::warn!(session_id = %session_id, error = %e, "Failed to clear draft");
    }
}

/// Session ids of every stored draft.
pub fn list_drafts<D: DraftStore>(store: &D) -> Result<Vec<SessionId>, WizardError> {
    Ok(store
        .keys()?
        .into_iter()
        .filter_map(|k| {
            k.strip_prefix(crate::primitives::DRAFT_KEY_PREFIX)
                .map(SessionId::new)
        })
        .collect())
}

// =============================================================================
// TESTS
// =============================================================================
