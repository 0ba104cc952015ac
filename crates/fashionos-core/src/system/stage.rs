//! # Wizard Stages
//!
//! The event creation wizard walks through six stages in a fixed order:
//!
//! | # | Stage | Collects |
//! |---|-------|----------|
//! | 0 | `organizerSetup` | Organizer contact details |
//! | 1 | `eventSetup` | Title, type, date and times |
//! | 2 | `venueSetup` | Physical and/or virtual location |
//! | 3 | `ticketSetup` | Currency and ticket tiers |
//! | 4 | `sponsorSetup` | Optional sponsors |
//! | 5 | `reviewPublish` | Terms acceptance and visibility |
//!
//! Stage messages and labels are resolved with `match` on the enum, there is
//! no string-keyed lookup table.

use crate::primitives::TOTAL_STAGES;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// STAGE ENUM
// =============================================================================

/// One step of the event creation wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    OrganizerSetup,
    EventSetup,
    VenueSetup,
    TicketSetup,
    SponsorSetup,
    ReviewPublish,
}

impl Stage {
    /// All stages in wizard order.
    pub const ALL: [Stage; TOTAL_STAGES] = [
        Stage::OrganizerSetup,
        Stage::EventSetup,
        Stage::VenueSetup,
        Stage::TicketSetup,
        Stage::SponsorSetup,
        Stage::ReviewPublish,
    ];

    /// The first stage of every session.
    #[must_use]
    pub const fn first() -> Self {
        Stage::OrganizerSetup
    }

    /// Wire identifier, as used in JSON and URLs.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Stage::OrganizerSetup => "organizerSetup",
            Stage::EventSetup => "eventSetup",
            Stage::VenueSetup => "venueSetup",
            Stage::TicketSetup => "ticketSetup",
            Stage::SponsorSetup => "sponsorSetup",
            Stage::ReviewPublish => "reviewPublish",
        }
    }

    /// Human readable stage name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Stage::OrganizerSetup => "Organizer",
            Stage::EventSetup => "Event Details",
            Stage::VenueSetup => "Venue",
            Stage::TicketSetup => "Tickets",
            Stage::SponsorSetup => "Sponsors",
            Stage::ReviewPublish => "Review & Publish",
        }
    }

    /// Hint shown to the organizer while filling this stage.
    #[must_use]
    pub fn prompt(&self) -> &'static str {
        match self {
            Stage::OrganizerSetup => "Tell us who is organizing this event.",
            Stage::EventSetup => "Describe the event and when it takes place.",
            Stage::VenueSetup => "Where will guests attend, in person or online?",
            Stage::TicketSetup => "Set up the ticket tiers you want to sell.",
            Stage::SponsorSetup => "Add sponsors and partners, or skip this step.",
            Stage::ReviewPublish => "Check everything and publish your event.",
        }
    }

    /// Position in the fixed order (0-based).
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Stage::OrganizerSetup => 0,
            Stage::EventSetup => 1,
            Stage::VenueSetup => 2,
            Stage::TicketSetup => 3,
            Stage::SponsorSetup => 4,
            Stage::ReviewPublish => 5,
        }
    }

    /// Get the next stage, if any.
    #[must_use]
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::OrganizerSetup => Some(Stage::EventSetup),
            Stage::EventSetup => Some(Stage::VenueSetup),
            Stage::VenueSetup => Some(Stage::TicketSetup),
            Stage::TicketSetup => Some(Stage::SponsorSetup),
            Stage::SponsorSetup => Some(Stage::ReviewPublish),
            Stage::ReviewPublish => None,
        }
    }

    /// Get the previous stage, if any.
    #[must_use]
    pub fn previous(&self) -> Option<Stage> {
        match self {
            Stage::OrganizerSetup => None,
            Stage::EventSetup => Some(Stage::OrganizerSetup),
            Stage::VenueSetup => Some(Stage::EventSetup),
            Stage::TicketSetup => Some(Stage::VenueSetup),
            Stage::SponsorSetup => Some(Stage::TicketSetup),
            Stage::ReviewPublish => Some(Stage::SponsorSetup),
        }
    }

    /// Check if this stage is terminal (review/publish).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::ReviewPublish)
    }

    /// Parse a wire identifier.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| s.key() == key)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

// =============================================================================
// STAGE PROGRESS
// =============================================================================

/// Completion percentage for a set of completed stages.
///
/// Equals `100 * completed / TOTAL_STAGES`.
#[allow(clippy::float_arithmetic)]
#[must_use]
pub fn completion_percent(completed: usize) -> f64 {
    let completed = completed.min(TOTAL_STAGES);
    100.0 * completed as f64 / TOTAL_STAGES as f64
}

/// Progress snapshot of a wizard session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageProgress {
    pub current: Stage,
    pub next: Option<Stage>,
    pub completed: Vec<Stage>,
    pub percent: f64,
}

impl StageProgress {
    /// Build a snapshot from the current pointer and the completed set.
    #[must_use]
    pub fn new(current: Stage, completed: &BTreeSet<Stage>) -> Self {
        Self {
            current,
            next: current.next(),
            completed: completed.iter().copied().collect(),
            percent: completion_percent(completed.len()),
        }
    }

    /// Remaining stages before publishing is possible.
    #[must_use]
    pub fn remaining(&self) -> usize {
        TOTAL_STAGES.saturating_sub(self.completed.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_ordering() {
        for pair in Stage::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].next(), Some(pair[1]));
            assert_eq!(pair[1].previous(), Some(pair[0]));
        }
    }

    #[test]
    fn index_matches_order() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
    }

    #[test]
    fn only_review_is_terminal() {
        assert!(Stage::ReviewPublish.is_terminal());
        assert!(Stage::ALL[..5].iter().all(|s| !s.is_terminal()));
        assert_eq!(Stage::first().previous(), None);
    }

    #[test]
    fn key_roundtrips_through_serde() {
        for stage in Stage::ALL {
            let json = serde_json::to_string(&stage).expect("serialize");
            assert_eq!(json, format!("\"{}\"", stage.key()));
            assert_eq!(Stage::from_key(stage.key()), Some(stage));
        }
        assert_eq!(Stage::from_key("checkout"), None);
    }

    #[test]
    fn stage_display() {
        assert_eq!(format!("{}", Stage::OrganizerSetup), "organizerSetup");
        assert_eq!(format!("{}", Stage::ReviewPublish), "reviewPublish");
    }

    #[test]
    fn completion_percent_bounds() {
        assert!(completion_percent(0).abs() < f64::EPSILON);
        assert!((completion_percent(3) - 50.0).abs() < 1e-9);
        assert!((completion_percent(6) - 100.0).abs() < 1e-9);
        assert!((completion_percent(9) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn progress_remaining() {
        let mut done = BTreeSet::new();
        done.insert(Stage::OrganizerSetup);
        done.insert(Stage::EventSetup);
        let progress = StageProgress::new(Stage::VenueSetup, &done);
        assert_eq!(progress.remaining(), 4);
        assert_eq!(progress.next, Some(Stage::TicketSetup));
    }
}
