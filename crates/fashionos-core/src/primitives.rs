//! # Wizard Primitives
//!
//! Hardcoded constants for the FashionOS event wizard.
//!
//! These values are compiled into the binary. Anything an operator may want to
//! tune (debounce delay, log capacity) is read from here as the default and can
//! be overridden through the app configuration.

/// Number of stages in the event creation wizard.
pub const TOTAL_STAGES: usize = 6;

/// Maximum number of telemetry events kept by the monitor.
///
/// When the log is full the oldest event is dropped first.
pub const MONITOR_CAPACITY: usize = 100;

/// Default autosave debounce delay in milliseconds.
pub const AUTOSAVE_DEBOUNCE_MS: u64 = 1000;

/// Prefix of the storage key under which a session draft is saved.
pub const DRAFT_KEY_PREFIX: &str = "fashionos:wizard-draft:";

/// Current draft blob format version.
///
/// Increment this when making breaking changes to `DraftSnapshot`.
pub const DRAFT_FORMAT_VERSION: u8 = 1;

/// Maximum size of a single draft blob in bytes (256 KB).
///
/// Blobs larger than this are treated as corrupt and discarded on recovery.
pub const MAX_DRAFT_BLOB_SIZE: usize = 256 * 1024;

// =============================================================================
// FIELD LIMITS
// =============================================================================

/// Organizer name length bounds (characters, after trimming).
pub const ORGANIZER_NAME_MIN: usize = 3;
pub const ORGANIZER_NAME_MAX: usize = 100;

/// Event title length bounds (characters, after trimming).
pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 255;

/// Maximum length of free-text descriptions.
pub const DESCRIPTION_MAX: usize = 5000;

/// Maximum length of an organizer bio.
pub const BIO_MAX: usize = 1000;

/// Venue name length bounds.
pub const VENUE_NAME_MIN: usize = 2;
pub const VENUE_NAME_MAX: usize = 200;

/// Venue capacity bounds.
pub const CAPACITY_MIN: u32 = 1;
pub const CAPACITY_MAX: u32 = 100_000;

/// Ticket tier limits.
pub const MAX_TICKET_TIERS: usize = 20;
pub const TIER_NAME_MIN: usize = 2;
pub const TIER_NAME_MAX: usize = 100;

/// Sponsor limits.
pub const MAX_SPONSORS: usize = 50;
pub const SPONSOR_NAME_MIN: usize = 2;
pub const SPONSOR_NAME_MAX: usize = 120;

/// Maximum length of an email address (RFC 5321 path limit).
pub const EMAIL_MAX: usize = 254;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_stages() {
        assert_eq!(TOTAL_STAGES, 6);
    }

    #[test]
    fn title_bounds_are_ordered() {
        assert!(TITLE_MIN < TITLE_MAX);
        assert_eq!(TITLE_MAX, 255);
    }
}
