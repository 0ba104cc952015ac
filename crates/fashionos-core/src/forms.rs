//! # Stage Forms
//!
//! Raw, possibly partial input for each wizard stage, exactly as a client
//! submits it. Every field defaults so a half-filled form still parses;
//! turning a form into a typed payload is the job of [`crate::schema`].
//!
//! Numeric inputs (capacity, price, quantity) are kept as strings because
//! browsers send them that way. JSON numbers are accepted too and converted.

use crate::system::Stage;
use serde::{Deserialize, Deserializer, Serialize};

/// Accept a JSON string, number or boolean and keep it as a string.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

// =============================================================================
// PER-STAGE FORMS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerForm {
    pub name: String,
    pub email: String,
    pub organization: String,
    pub phone: String,
    pub website: String,
    pub bio: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventForm {
    pub title: String,
    pub description: String,
    pub event_type: String,
    /// `YYYY-MM-DD`
    pub event_date: String,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`, empty when the event has no announced end.
    pub end_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueForm {
    /// `physical`, `virtual` or `hybrid`.
    pub venue_mode: String,
    pub venue_name: String,
    pub address: String,
    pub city: String,
    #[serde(deserialize_with = "lenient_string")]
    pub capacity: String,
    pub virtual_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketTierForm {
    pub name: String,
    /// Decimal amount in major units, e.g. `"49.99"`.
    #[serde(deserialize_with = "lenient_string")]
    pub price: String,
    #[serde(deserialize_with = "lenient_string")]
    pub quantity: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketForm {
    pub currency: String,
    pub tiers: Vec<TicketTierForm>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SponsorEntryForm {
    pub name: String,
    pub tier: String,
    pub contact_email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SponsorForm {
    pub sponsors: Vec<SponsorEntryForm>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewForm {
    pub terms_accepted: bool,
    pub visibility: String,
}

// =============================================================================
// STAGE FORM (tagged union)
// =============================================================================

/// A form for exactly one stage, tagged by `"stage"` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "camelCase")]
pub enum StageForm {
    OrganizerSetup(OrganizerForm),
    EventSetup(EventForm),
    VenueSetup(VenueForm),
    TicketSetup(TicketForm),
    SponsorSetup(SponsorForm),
    ReviewPublish(ReviewForm),
}

impl StageForm {
    /// The stage this form belongs to.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            StageForm::OrganizerSetup(_) => Stage::OrganizerSetup,
            StageForm::EventSetup(_) => Stage::EventSetup,
            StageForm::VenueSetup(_) => Stage::VenueSetup,
            StageForm::TicketSetup(_) => Stage::TicketSetup,
            StageForm::SponsorSetup(_) => Stage::SponsorSetup,
            StageForm::ReviewPublish(_) => Stage::ReviewPublish,
        }
    }

    /// An empty form for `stage`.
    #[must_use]
    pub fn empty(stage: Stage) -> Self {
        match stage {
            Stage::OrganizerSetup => StageForm::OrganizerSetup(OrganizerForm::default()),
            Stage::EventSetup => StageForm::EventSetup(EventForm::default()),
            Stage::VenueSetup => StageForm::VenueSetup(VenueForm::default()),
            Stage::TicketSetup => StageForm::TicketSetup(TicketForm::default()),
            Stage::SponsorSetup => StageForm::SponsorSetup(SponsorForm::default()),
            Stage::ReviewPublish => StageForm::ReviewPublish(ReviewForm::default()),
        }
    }

    /// Whether nothing has been entered yet.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        *self == StageForm::empty(self.stage())
    }
}

// =============================================================================
// STAGE FORMS (one slot per stage)
// =============================================================================

/// The forms of every stage of one session.
///
/// Retreating never clears a slot, so data entered on a visited stage is
/// still there when the organizer comes back to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageForms {
    pub organizer: OrganizerForm,
    pub event: EventForm,
    pub venue: VenueForm,
    pub tickets: TicketForm,
    pub sponsors: SponsorForm,
    pub review: ReviewForm,
}

impl StageForms {
    /// Get a copy of the form stored for `stage`.
    #[must_use]
    pub fn get(&self, stage: Stage) -> StageForm {
        match stage {
            Stage::OrganizerSetup => StageForm::OrganizerSetup(self.organizer.clone()),
            Stage::EventSetup => StageForm::EventSetup(self.event.clone()),
            Stage::VenueSetup => StageForm::VenueSetup(self.venue.clone()),
            Stage::TicketSetup => StageForm::TicketSetup(self.tickets.clone()),
            Stage::SponsorSetup => StageForm::SponsorSetup(self.sponsors.clone()),
            Stage::ReviewPublish => StageForm::ReviewPublish(self.review.clone()),
        }
    }

    /// Store a form in its stage slot, replacing what was there.
    pub fn set(&mut self, form: StageForm) {
        match form {
            StageForm::OrganizerSetup(f) => self.organizer = f,
            StageForm::EventSetup(f) => self.event = f,
            StageForm::VenueSetup(f) => self.venue = f,
            StageForm::TicketSetup(f) => self.tickets = f,
            StageForm::SponsorSetup(f) => self.sponsors = f,
            StageForm::ReviewPublish(f) => self.review = f,
        }
    }

    /// Whether the slot for `stage` is still empty.
    #[must_use]
    pub fn is_blank(&self, stage: Stage) -> bool {
        self.get(stage).is_blank()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn partial_form_deserializes() {
        let form: StageForm =
            serde_json::from_str(r#"{"stage":"organizerSetup","name":"Jo"}"#).expect("parse");
        match form {
            StageForm::OrganizerSetup(f) => {
                assert_eq!(f.name, "Jo");
                assert!(f.email.is_empty());
            }
            other => panic!("unexpected form: {:?}", other),
        }
    }

    #[test]
    fn numeric_fields_accept_json_numbers() {
        let form: VenueForm =
            serde_json::from_str(r#"{"venue_mode":"physical","capacity":250}"#).expect("parse");
        assert_eq!(form.capacity, "250");

        let tier: TicketTierForm =
            serde_json::from_str(r#"{"name":"VIP","price":49.5,"quantity":"10"}"#).expect("parse");
        assert_eq!(tier.price, "49.5");
        assert_eq!(tier.quantity, "10");
    }

    #[test]
    fn set_then_get_returns_same_form() {
        let mut forms = StageForms::default();
        let form = StageForm::EventSetup(EventForm {
            title: "Spring Runway".to_string(),
            ..EventForm::default()
        });
        forms.set(form.clone());
        assert_eq!(forms.get(Stage::EventSetup), form);
        assert!(!forms.is_blank(Stage::EventSetup));
        assert!(forms.is_blank(Stage::VenueSetup));
    }

    #[test]
    fn form_reports_its_stage() {
        for stage in Stage::ALL {
            let form = StageForm::empty(stage);
            assert_eq!(form.stage(), stage);
            assert!(form.is_blank());
        }
    }
}
