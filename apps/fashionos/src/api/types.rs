//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use crate::casting::CastingRecommendation;
use fashionos_core::{
    AdvanceOutcome, Brand, FieldError, PublishedEvent, ResumeOutcome, SessionId, Stage,
    StageForm, StageProgress, WizardEvent, WizardMetrics, WizardSession,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    /// Per-field errors of a rejected form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_fields(msg: impl Into<String>, fields: Vec<FieldError>) -> Self {
        Self {
            success: false,
            error: msg.into(),
            fields,
        }
    }
}

// =============================================================================
// SESSION RESPONSES
// =============================================================================

/// A newly opened wizard session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub success: bool,
    pub session_id: SessionId,
    pub stage: Stage,
    pub prompt: String,
}

impl StartResponse {
    pub fn success(session_id: SessionId) -> Self {
        let stage = Stage::first();
        Self {
            success: true,
            session_id,
            stage,
            prompt: stage.prompt().to_string(),
        }
    }
}

/// Full view of a session as the client renders it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
    pub owner: Option<String>,
    pub stage: Stage,
    pub stage_name: String,
    pub prompt: String,
    pub progress: StageProgress,
    /// Raw form of the current stage, for re-rendering.
    pub form: StageForm,
    pub ready_to_publish: bool,
    pub payment_configured: bool,
    pub published: bool,
}

impl SessionResponse {
    pub fn from_session(session: &WizardSession) -> Self {
        let stage = session.current();
        Self {
            session_id: session.id().clone(),
            owner: session.owner().map(str::to_string),
            stage,
            stage_name: stage.name().to_string(),
            prompt: stage.prompt().to_string(),
            progress: session.progress(),
            form: session.forms().get(stage),
            ready_to_publish: session.is_ready_to_publish(),
            payment_configured: session.payment_configured(),
            published: session.is_published(),
        }
    }
}

/// Result of a successful `advance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceResponse {
    pub success: bool,
    pub completed: Stage,
    pub progress: StageProgress,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<AdvanceOutcome> for AdvanceResponse {
    fn from(outcome: AdvanceOutcome) -> Self {
        Self {
            success: true,
            completed: outcome.completed,
            progress: outcome.progress,
            warnings: outcome.warnings,
        }
    }
}

/// Current stage after a retreat or abandon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResponse {
    pub success: bool,
    pub stage: Stage,
    /// False when retreat was called on the first stage.
    pub moved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeResponse {
    pub success: bool,
    pub session_id: SessionId,
    pub stage: Stage,
    pub restored_forms: usize,
    pub restored_stages: usize,
}

impl From<ResumeOutcome> for ResumeResponse {
    fn from(outcome: ResumeOutcome) -> Self {
        Self {
            success: true,
            session_id: outcome.session_id,
            stage: outcome.stage,
            restored_forms: outcome.restored_forms,
            restored_stages: outcome.restored_stages,
        }
    }
}

/// Body of `POST /wizard/sessions/{id}/payment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub configured: bool,
}

// =============================================================================
// PUBLISH RESPONSE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    pub success: bool,
    pub event_id: String,
    pub slug: String,
    pub title: String,
}

impl From<&PublishedEvent> for PublishResponse {
    fn from(event: &PublishedEvent) -> Self {
        Self {
            success: true,
            event_id: event.id.to_string(),
            slug: event.slug.clone(),
            title: event.title().to_string(),
        }
    }
}

/// Summary row of `GET /events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: String,
    pub slug: String,
    pub title: String,
    pub owner: String,
    pub date: String,
    pub published_at: String,
}

impl From<&PublishedEvent> for EventSummary {
    fn from(event: &PublishedEvent) -> Self {
        Self {
            event_id: event.id.to_string(),
            slug: event.slug.clone(),
            title: event.title().to_string(),
            owner: event.owner.clone(),
            date: event.payloads.event.event_date.to_string(),
            published_at: event.published_at.to_rfc3339(),
        }
    }
}

// =============================================================================
// BRAND LOOKUP
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandLookupQuery {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandLookupResponse {
    pub found: bool,
    pub brand: Option<Brand>,
}

// =============================================================================
// MONITOR
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub metrics: WizardMetrics,
    pub pending_autosaves: usize,
    pub active_sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<WizardEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearedResponse {
    pub success: bool,
    pub cleared: usize,
}

// =============================================================================
// CASTING
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastingResponse {
    pub success: bool,
    pub recommendations: Vec<CastingRecommendation>,
    pub error: Option<String>,
}

impl CastingResponse {
    pub fn success(recommendations: Vec<CastingRecommendation>) -> Self {
        Self {
            success: true,
            recommendations,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            recommendations: Vec::new(),
            error: Some(msg.into()),
        }
    }
}
