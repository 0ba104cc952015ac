//! # Draft Blob Format
//!
//! JSON encoding of a [`DraftSnapshot`], the unit of local autosave.
//!
//! Format: a single JSON object carrying a `version` field next to the
//! snapshot fields. Blobs are validated before parsing:
//! - Maximum blob size (`MAX_DRAFT_BLOB_SIZE`)
//! - Format version
//! - A non-empty session id matching the storage key

use crate::forms::StageForms;
use crate::primitives::{DRAFT_FORMAT_VERSION, DRAFT_KEY_PREFIX, MAX_DRAFT_BLOB_SIZE};
use crate::system::Stage;
use crate::{SessionId, WizardError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage key of the draft for `session_id`.
#[must_use]
pub fn draft_key(session_id: &SessionId) -> String {
    format!("{}{}", DRAFT_KEY_PREFIX, session_id)
}

/// Locally persisted, unsaved progress of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    #[serde(default = "default_version")]
    pub version: u8,
    pub session_id: SessionId,
    pub stage: Stage,
    pub forms: StageForms,
    pub saved_at: DateTime<Utc>,
}

fn default_version() -> u8 {
    DRAFT_FORMAT_VERSION
}

impl DraftSnapshot {
    #[must_use]
    pub fn new(
        session_id: SessionId,
        stage: Stage,
        forms: StageForms,
        saved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            version: DRAFT_FORMAT_VERSION,
            session_id,
            stage,
            forms,
            saved_at,
        }
    }

    /// Storage key of this snapshot.
    #[must_use]
    pub fn key(&self) -> String {
        draft_key(&self.session_id)
    }

    /// Encode to a JSON blob.
    pub fn to_json(&self) -> Result<String, WizardError> {
        serde_json::to_string(self).map_err(|e| WizardError::Serialization(e.to_string()))
    }

    /// Decode a JSON blob.
    ///
    /// Size and version are checked; any failure is a [`WizardError::Recovery`].
    pub fn from_json(blob: &str) -> Result<Self, WizardError> {
        if blob.len() > MAX_DRAFT_BLOB_SIZE {
            return Err(WizardError::Recovery(format!(
                "Draft blob too large: {} bytes (max: {} bytes)",
                blob.len(),
                MAX_DRAFT_BLOB_SIZE
            )));
        }
        let snapshot: Self =
            serde_json::from_str(blob).map_err(|e| WizardError::Recovery(e.to_string()))?;
        if snapshot.version != DRAFT_FORMAT_VERSION {
            return Err(WizardError::Recovery(format!(
                "Unsupported draft version: {} (expected {})",
                snapshot.version, DRAFT_FORMAT_VERSION
            )));
        }
        if snapshot.session_id.as_str().is_empty() {
            return Err(WizardError::Recovery("Draft has no session id".to_string()));
        }
        Ok(snapshot)
    }
}

// =============================================================================
// TESTS
// =============================================================================
