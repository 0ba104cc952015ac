//! # fashionos-core
//!
//! The event creation wizard engine for FashionOS - THE LOGIC.
//!
//! An organizer walks through six fixed stages (organizer, event, venue,
//! tickets, sponsors, review/publish). Each stage form is validated into a
//! typed payload before the wizard moves on; raw forms are autosaved as
//! local drafts and can be recovered; every step is reported to an
//! in-memory monitor.
//!
//! ## Architectural Constraints
//!
//! The core:
//! - Has NO async, NO network dependencies (pure Rust)
//! - Never reads the clock inside validation; callers pass a context
//! - Mutates sessions only through `&mut WizardSession`
//! - Reaches storage only through the `EventRepository` and `DraftStore` traits

// =============================================================================
// MODULES
// =============================================================================

pub mod draft;
pub mod formats;
pub mod forms;
pub mod monitor;
pub mod primitives;
pub mod schema;
pub mod session;
pub mod storage;
pub mod system;
pub mod types;
pub mod wizard;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{AuthContext, FieldError, SessionId, WizardError};

// =============================================================================
// RE-EXPORTS: Wizard Engine
// =============================================================================

pub use draft::{Autosaver, DraftStore, MemoryDraftStore, clear_draft, list_drafts, recover};
pub use forms::{StageForm, StageForms};
pub use monitor::{AnalyticsSink, WizardEvent, WizardEventKind, WizardMetrics, WizardMonitor};
pub use schema::{StagePayload, StageSchema, ValidationContext, validate_form};
pub use session::{CompletePayloads, StagePayloads, WizardSession};
pub use storage::{
    Brand, DraftBackend, DraftSessionRecord, EventRepository, InMemoryRepository, PublishedEvent,
    RedbDraftStore, RedbRepository, RepositoryBackend,
};
pub use wizard::{AdvanceOutcome, Clock, EventWizard, ResumeOutcome};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{DraftSnapshot, draft_key};

// =============================================================================
// RE-EXPORTS: System (from system module)
// =============================================================================

pub use system::{Stage, StageProgress, completion_percent};
