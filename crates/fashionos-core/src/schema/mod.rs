//! # Stage Schema Validation
//!
//! Turns a raw [`StageForm`] into a typed, normalized [`StagePayload`], or an
//! ordered list of [`FieldError`]s.
//!
//! ## Rules
//!
//! - Strings are trimmed before any length check; lengths count characters.
//! - Errors are reported in field declaration order, one per field.
//! - "Now" is never read from the system clock inside a validator. Callers
//!   pass a [`ValidationContext`] so date checks are reproducible.
//!
//! Per-stage rules live in the `stages` submodule.

mod stages;

pub use stages::*;

use crate::forms::StageForm;
use crate::system::Stage;
use crate::FieldError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// VALIDATION CONTEXT
// =============================================================================

/// Everything a validator may look at besides the form itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationContext {
    /// The current calendar date (UTC).
    pub today: NaiveDate,
}

impl ValidationContext {
    /// Context for a given instant.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            today: now.date_naive(),
        }
    }

    /// Context for the current system time.
    #[must_use]
    pub fn now() -> Self {
        Self::at(Utc::now())
    }
}

// =============================================================================
// SCHEMA TRAIT
// =============================================================================

/// A form that can be validated into a typed payload.
pub trait StageSchema {
    /// The normalized payload produced on success.
    type Payload;

    /// Validate the form. Never mutates anything.
    fn validate(&self, ctx: &ValidationContext) -> Result<Self::Payload, Vec<FieldError>>;
}

// =============================================================================
// STAGE PAYLOAD (tagged union)
// =============================================================================

/// A validated payload for exactly one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "camelCase")]
pub enum StagePayload {
    OrganizerSetup(OrganizerInfo),
    EventSetup(EventInfo),
    VenueSetup(VenueInfo),
    TicketSetup(TicketInfo),
    SponsorSetup(SponsorInfo),
    ReviewPublish(ReviewInfo),
}

impl StagePayload {
    /// The stage this payload belongs to.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            StagePayload::OrganizerSetup(_) => Stage::OrganizerSetup,
            StagePayload::EventSetup(_) => Stage::EventSetup,
            StagePayload::VenueSetup(_) => Stage::VenueSetup,
            StagePayload::TicketSetup(_) => Stage::TicketSetup,
            StagePayload::SponsorSetup(_) => Stage::SponsorSetup,
            StagePayload::ReviewPublish(_) => Stage::ReviewPublish,
        }
    }
}

/// Validate any stage form.
pub fn validate_form(
    form: &StageForm,
    ctx: &ValidationContext,
) -> Result<StagePayload, Vec<FieldError>> {
    match form {
        StageForm::OrganizerSetup(f) => f.validate(ctx).map(StagePayload::OrganizerSetup),
        StageForm::EventSetup(f) => f.validate(ctx).map(StagePayload::EventSetup),
        StageForm::VenueSetup(f) => f.validate(ctx).map(StagePayload::VenueSetup),
        StageForm::TicketSetup(f) => f.validate(ctx).map(StagePayload::TicketSetup),
        StageForm::SponsorSetup(f) => f.validate(ctx).map(StagePayload::SponsorSetup),
        StageForm::ReviewPublish(f) => f.validate(ctx).map(StagePayload::ReviewPublish),
    }
}

// =============================================================================
// ERROR COLLECTOR
// =============================================================================

/// Accumulates field errors while a validator walks its form.
#[derive(Debug, Default)]
pub(crate) struct Errors(Vec<FieldError>);

impl Errors {
    pub(crate) fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    /// Record the error of a field check, keeping the value on success.
    pub(crate) fn check<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(message) => {
                self.push(field, message);
                None
            }
        }
    }

    #[allow(dead_code)]
    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(value)` when no error was recorded.
    pub(crate) fn finish<T>(
        self,
        value: impl FnOnce() -> Option<T>,
    ) -> Result<T, Vec<FieldError>> {
        if !self.0.is_empty() {
            return Err(self.0);
        }
        value().ok_or_else(|| vec![FieldError::new("form", "Form is incomplete")])
    }
}

// =============================================================================
// FIELD CHECKS
// =============================================================================

/// Trimmed string with a character length in `min..=max`.
pub(crate) fn bounded_text(
    raw: &str,
    label: &str,
    min: usize,
    max: usize,
) -> Result<String, String> {
    let value = raw.trim();
    let len = value.chars().count();
    if len == 0 && min > 0 {
        return Err(format!("{} is required", label));
    }
    if len < min {
        return Err(format!("{} must be at least {} characters", label, min));
    }
    if len > max {
        return Err(format!("{} must be at most {} characters", label, max));
    }
    Ok(value.to_string())
}

/// Optional trimmed text; empty input becomes `None`.
pub(crate) fn optional_text(raw: &str, label: &str, max: usize) -> Result<Option<String>, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    bounded_text(value, label, 0, max).map(Some)
}

/// Lower-cased, well-formed email address.
pub(crate) fn email(raw: &str) -> Result<String, String> {
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return Err("Email is required".to_string());
    }
    if value.len() > crate::primitives::EMAIL_MAX || !is_valid_email(&value) {
        return Err("Please enter a valid email address".to_string());
    }
    Ok(value)
}

/// Minimal structural email check: `local@domain.tld`, no whitespace.
pub(crate) fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty()
        && !host.starts_with('.')
        && !host.ends_with('.')
        && !host.contains("..")
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Absolute `http://` or `https://` URL with a host part.
pub(crate) fn web_url(raw: &str, label: &str) -> Result<String, String> {
    let value = raw.trim();
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') && !value.contains(' ') => {
            Ok(value.to_string())
        }
        _ => Err(format!("{} must be a valid http(s) URL", label)),
    }
}

/// Parse a decimal amount into minor units (at most two decimals).
pub(crate) fn minor_units(raw: &str) -> Result<u64, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("Price is required".to_string());
    }
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if whole.is_empty() || !digits_only(whole) || !digits_only(fraction) {
        return Err("Price must be a non-negative amount".to_string());
    }
    if fraction.len() > 2 {
        return Err("Price can have at most 2 decimals".to_string());
    }
    let whole: u64 = whole
        .parse()
        .map_err(|_| "Price is too large".to_string())?;
    let cents: u64 = format!("{:0<2}", fraction)
        .parse()
        .map_err(|_| "Price must be a non-negative amount".to_string())?;
    whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(cents))
        .ok_or_else(|| "Price is too large".to_string())
}

/// Parse a positive integer within bounds.
pub(crate) fn bounded_int(raw: &str, label: &str, min: u32, max: u32) -> Result<u32, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(format!("{} is required", label));
    }
    let n: u32 = value
        .parse()
        .map_err(|_| format!("{} must be a whole number", label))?;
    if n < min || n > max {
        return Err(format!("{} must be between {} and {}", label, min, max));
    }
    Ok(n)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("jo@atelier.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co"));
        assert!(!is_valid_email("bad-email"));
        assert!(!is_valid_email("@atelier.com"));
        assert!(!is_valid_email("jo@atelier"));
        assert!(!is_valid_email("jo@@atelier.com"));
        assert!(!is_valid_email("jo@.com"));
        assert!(!is_valid_email("jo smith@atelier.com"));
    }

    #[test]
    fn minor_units_parsing() {
        assert_eq!(minor_units("0"), Ok(0));
        assert_eq!(minor_units("49.99"), Ok(4999));
        assert_eq!(minor_units("12.5"), Ok(1250));
        assert_eq!(minor_units(" 100 "), Ok(10000));
        assert!(minor_units("-5").is_err());
        assert!(minor_units("1.999").is_err());
        assert!(minor_units("abc").is_err());
        assert!(minor_units(".5").is_err());
    }

    #[test]
    fn bounded_text_counts_characters() {
        assert_eq!(bounded_text("  Zoë  ", "Name", 3, 10), Ok("Zoë".to_string()));
        assert!(bounded_text("Jo", "Name", 3, 10).is_err());
        assert!(bounded_text("", "Name", 3, 10).is_err());
    }

    #[test]
    fn web_url_requires_scheme_and_host() {
        assert!(web_url("https://stream.example.com/live", "URL").is_ok());
        assert!(web_url("stream.example.com", "URL").is_err());
        assert!(web_url("https://", "URL").is_err());
    }
}
