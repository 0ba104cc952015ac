//! # Core Type Definitions
//!
//! This module contains the shared types of the FashionOS wizard engine:
//! - Session identifiers (`SessionId`)
//! - Field-level validation errors (`FieldError`)
//! - The caller-supplied authentication context (`AuthContext`)
//! - Error types (`WizardError`)

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// SESSION IDENTIFIER
// =============================================================================

/// Opaque identifier of one wizard attempt.
///
/// Freshly generated ids are UUID v4 strings, but any non-empty token coming
/// back from a client is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random session id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// FIELD ERROR
// =============================================================================

/// A single validation failure attached to a form field.
///
/// `field` uses dotted paths for nested entries, e.g. `tiers.0.price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

// =============================================================================
// AUTH CONTEXT
// =============================================================================

/// Identity of the caller as reported by the external auth provider.
///
/// The engine never authenticates anyone; it only reads these two values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub current_user_id: Option<String>,
    pub is_signed_in: bool,
}

impl AuthContext {
    /// A signed-in user.
    #[must_use]
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            current_user_id: Some(user_id.into()),
            is_signed_in: true,
        }
    }

    /// An anonymous visitor.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The user id, only if the caller is signed in.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        if self.is_signed_in {
            self.current_user_id.as_deref()
        } else {
            None
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the wizard engine.
///
/// Only the first group blocks the caller. Persistence, recovery and external
/// service failures are logged and downgraded by `EventWizard`; they surface
/// here for the storage layer and for callers using it directly.
#[derive(Debug, Error)]
pub enum WizardError {
    /// The submitted form failed its schema.
    #[error("Validation failed: {} field error(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// A form was submitted for a stage other than the current one.
    #[error("Stage mismatch: session is at {expected}, form is for {got}")]
    StageMismatch { expected: String, got: String },

    /// Publishing requires every stage to be complete.
    #[error("Wizard incomplete: {0} stage(s) remaining")]
    Incomplete(usize),

    /// The operation requires a signed-in user.
    #[error("Not signed in")]
    Unauthenticated,

    /// The session was already published.
    #[error("Session already published: {0}")]
    AlreadyPublished(SessionId),

    /// No session with this id is known.
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// A remote save failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A saved draft could not be read back.
    #[error("Draft recovery error: {0}")]
    Recovery(String),

    /// A third-party service (brand lookup, AI gateway) failed.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl WizardError {
    /// Field errors carried by a validation failure, empty otherwise.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation(errors) => errors,
            _ => &[],
        }
    }

    /// Whether the error must stop the user from continuing.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        !matches!(
            self,
            Self::Persistence(_) | Self::Recovery(_) | Self::ExternalService(_)
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_session_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn session_id_serializes_as_plain_string() {
        let id = SessionId::new("abc");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn anonymous_context_has_no_user() {
        let ctx = AuthContext {
            current_user_id: Some("user_1".to_string()),
            is_signed_in: false,
        };
        assert_eq!(ctx.user_id(), None);
        assert_eq!(AuthContext::signed_in("user_1").user_id(), Some("user_1"));
    }

    #[test]
    fn downgraded_errors_are_not_blocking() {
        assert!(!WizardError::Persistence("timeout".into()).is_blocking());
        assert!(!WizardError::Recovery("bad json".into()).is_blocking());
        assert!(WizardError::Validation(vec![]).is_blocking());
        assert!(WizardError::Unauthenticated.is_blocking());
    }

    #[test]
    fn validation_error_exposes_fields() {
        let err = WizardError::Validation(vec![FieldError::new("email", "Invalid email")]);
        assert_eq!(err.field_errors().len(), 1);
        assert_eq!(err.to_string(), "Validation failed: 1 field error(s)");
    }
}
