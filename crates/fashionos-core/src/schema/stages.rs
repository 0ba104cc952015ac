//! Per-stage payloads and their validation rules.

use super::{
    Errors, StageSchema, ValidationContext, bounded_int, bounded_text, email, minor_units,
    optional_text, web_url,
};
use crate::FieldError;
use crate::forms::{EventForm, OrganizerForm, ReviewForm, SponsorForm, TicketForm, VenueForm};
use crate::primitives::{
    BIO_MAX, CAPACITY_MAX, CAPACITY_MIN, DESCRIPTION_MAX, MAX_SPONSORS, MAX_TICKET_TIERS,
    ORGANIZER_NAME_MAX, ORGANIZER_NAME_MIN, SPONSOR_NAME_MAX, SPONSOR_NAME_MIN, TIER_NAME_MAX,
    TIER_NAME_MIN, TITLE_MAX, TITLE_MIN, VENUE_NAME_MAX, VENUE_NAME_MIN,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Parse a lower-cased keyword into one of the listed values.
fn keyword<T: Copy>(raw: &str, label: &str, options: &[(&str, T)]) -> Result<T, String> {
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return Err(format!("{} is required", label));
    }
    options
        .iter()
        .find(|(key, _)| *key == value)
        .map(|(_, v)| *v)
        .ok_or_else(|| {
            let names: Vec<&str> = options.iter().map(|(k, _)| *k).collect();
            format!("{} must be one of: {}", label, names.join(", "))
        })
}

// =============================================================================
// ORGANIZER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizerInfo {
    pub name: String,
    pub email: String,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub bio: Option<String>,
}

impl OrganizerInfo {
    /// Domain part of the organizer email, used for brand lookup.
    #[must_use]
    pub fn email_domain(&self) -> Option<&str> {
        self.email.split_once('@').map(|(_, domain)| domain)
    }
}

fn phone(raw: &str) -> Result<Option<String>, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')');
    let digits = value.chars().filter(char::is_ascii_digit).count();
    if !value.chars().all(allowed) || !(7..=20).contains(&value.len()) || digits < 7 {
        return Err("Please enter a valid phone number".to_string());
    }
    Ok(Some(value.to_string()))
}

impl StageSchema for OrganizerForm {
    type Payload = OrganizerInfo;

    fn validate(&self, _ctx: &ValidationContext) -> Result<OrganizerInfo, Vec<FieldError>> {
        let mut errors = Errors::default();
        let name = errors.check(
            "name",
            bounded_text(&self.name, "Name", ORGANIZER_NAME_MIN, ORGANIZER_NAME_MAX),
        );
        let email = errors.check("email", email(&self.email));
        let organization = errors.check(
            "organization",
            optional_text(&self.organization, "Organization", ORGANIZER_NAME_MAX),
        );
        let phone = errors.check("phone", phone(&self.phone));
        let website = errors.check(
            "website",
            if self.website.trim().is_empty() {
                Ok(None)
            } else {
                web_url(&self.website, "Website").map(Some)
            },
        );
        let bio = errors.check("bio", optional_text(&self.bio, "Bio", BIO_MAX));

        errors.finish(|| {
            Some(OrganizerInfo {
                name: name?,
                email: email?,
                organization: organization?,
                phone: phone?,
                website: website?,
                bio: bio?,
            })
        })
    }
}

// =============================================================================
// EVENT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Runway,
    Exhibition,
    Popup,
    Workshop,
    Gala,
    Other,
}

const EVENT_TYPES: &[(&str, EventType)] = &[
    ("runway", EventType::Runway),
    ("exhibition", EventType::Exhibition),
    ("popup", EventType::Popup),
    ("workshop", EventType::Workshop),
    ("gala", EventType::Gala),
    ("other", EventType::Other),
];

impl EventType {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            EventType::Runway => "Runway Show",
            EventType::Exhibition => "Exhibition",
            EventType::Popup => "Pop-up Store",
            EventType::Workshop => "Workshop",
            EventType::Gala => "Gala",
            EventType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    pub title: String,
    pub description: Option<String>,
    pub event_type: EventType,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
}

fn event_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("Event date is required".to_string());
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| "Event date must be formatted YYYY-MM-DD".to_string())?;
    if date < today {
        return Err("Event date must be in the future".to_string());
    }
    Ok(date)
}

fn clock_time(raw: &str, label: &str) -> Result<NaiveTime, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(format!("{} is required", label));
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| format!("{} must be formatted HH:MM", label))
}

impl StageSchema for EventForm {
    type Payload = EventInfo;

    fn validate(&self, ctx: &ValidationContext) -> Result<EventInfo, Vec<FieldError>> {
        let mut errors = Errors::default();
        let title = errors.check("title", bounded_text(&self.title, "Title", TITLE_MIN, TITLE_MAX));
        let description = errors.check(
            "description",
            optional_text(&self.description, "Description", DESCRIPTION_MAX),
        );
        let event_type = errors.check(
            "event_type",
            keyword(&self.event_type, "Event type", EVENT_TYPES),
        );
        let event_date = errors.check("event_date", event_date(&self.event_date, ctx.today));
        let start_time = errors.check("start_time", clock_time(&self.start_time, "Start time"));

        let end_time = if self.end_time.trim().is_empty() {
            Some(None)
        } else {
            let parsed = clock_time(&self.end_time, "End time").and_then(|end| match start_time {
                Some(start) if end <= start => Err("End time must be after start time".to_string()),
                _ => Ok(Some(end)),
            });
            errors.check("end_time", parsed)
        };

        errors.finish(|| {
            Some(EventInfo {
                title: title?,
                description: description?,
                event_type: event_type?,
                event_date: event_date?,
                start_time: start_time?,
                end_time: end_time?,
            })
        })
    }
}

// =============================================================================
// VENUE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueMode {
    Physical,
    Virtual,
    Hybrid,
}

impl VenueMode {
    #[must_use]
    pub fn needs_location(&self) -> bool {
        matches!(self, VenueMode::Physical | VenueMode::Hybrid)
    }

    #[must_use]
    pub fn needs_stream(&self) -> bool {
        matches!(self, VenueMode::Virtual | VenueMode::Hybrid)
    }
}

const VENUE_MODES: &[(&str, VenueMode)] = &[
    ("physical", VenueMode::Physical),
    ("virtual", VenueMode::Virtual),
    ("hybrid", VenueMode::Hybrid),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueInfo {
    pub mode: VenueMode,
    pub venue_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub capacity: u32,
    pub virtual_url: Option<String>,
}

impl StageSchema for VenueForm {
    type Payload = VenueInfo;

    fn validate(&self, _ctx: &ValidationContext) -> Result<VenueInfo, Vec<FieldError>> {
        let mut errors = Errors::default();
        let mode = errors.check("venue_mode", keyword(&self.venue_mode, "Venue type", VENUE_MODES));
        let needs_location = mode.is_none_or(|m| m.needs_location());
        let needs_stream = mode.is_some_and(|m| m.needs_stream());

        let (venue_name, address, city) = if needs_location {
            (
                errors
                    .check(
                        "venue_name",
                        bounded_text(
                            &self.venue_name,
                            "Venue name",
                            VENUE_NAME_MIN,
                            VENUE_NAME_MAX,
                        ),
                    )
                    .map(Some),
                errors
                    .check("address", bounded_text(&self.address, "Address", 1, 300))
                    .map(Some),
                errors
                    .check("city", bounded_text(&self.city, "City", 1, 100))
                    .map(Some),
            )
        } else {
            (
                errors.check(
                    "venue_name",
                    optional_text(&self.venue_name, "Venue name", VENUE_NAME_MAX),
                ),
                Some(None),
                Some(None),
            )
        };

        let capacity = errors.check(
            "capacity",
            bounded_int(&self.capacity, "Capacity", CAPACITY_MIN, CAPACITY_MAX),
        );

        let virtual_url = if needs_stream {
            errors
                .check("virtual_url", web_url(&self.virtual_url, "Stream URL"))
                .map(Some)
        } else {
            Some(None)
        };

        errors.finish(|| {
            Some(VenueInfo {
                mode: mode?,
                venue_name: venue_name?,
                address: address?,
                city: city?,
                capacity: capacity?,
                virtual_url: virtual_url?,
            })
        })
    }
}

// =============================================================================
// TICKETS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketTier {
    pub name: String,
    /// Price in minor currency units (cents).
    pub price_minor: u64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketInfo {
    pub currency: String,
    pub tiers: Vec<TicketTier>,
}

impl TicketInfo {
    /// Total number of tickets across tiers.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.tiers.iter().map(|t| u64::from(t.quantity)).sum()
    }

    /// Whether every tier is free.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.tiers.iter().all(|t| t.price_minor == 0)
    }
}

fn currency(raw: &str) -> Result<String, String> {
    let value = raw.trim().to_uppercase();
    if value.len() == 3 && value.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(value)
    } else {
        Err("Currency must be a 3-letter ISO code".to_string())
    }
}

impl StageSchema for TicketForm {
    type Payload = TicketInfo;

    fn validate(&self, _ctx: &ValidationContext) -> Result<TicketInfo, Vec<FieldError>> {
        let mut errors = Errors::default();
        let currency = errors.check("currency", currency(&self.currency));

        if self.tiers.is_empty() {
            errors.push("tiers", "Add at least one ticket tier");
        } else if self.tiers.len() > MAX_TICKET_TIERS {
            errors.push(
                "tiers",
                format!("At most {} ticket tiers are allowed", MAX_TICKET_TIERS),
            );
        }

        let mut seen = BTreeSet::new();
        let mut tiers = Vec::with_capacity(self.tiers.len());
        for (i, tier) in self.tiers.iter().enumerate() {
            let name = errors.check(
                &format!("tiers.{}.name", i),
                bounded_text(&tier.name, "Tier name", TIER_NAME_MIN, TIER_NAME_MAX).and_then(
                    |name| {
                        if seen.insert(name.to_lowercase()) {
                            Ok(name)
                        } else {
                            Err("Tier names must be unique".to_string())
                        }
                    },
                ),
            );
            let price = errors.check(&format!("tiers.{}.price", i), minor_units(&tier.price));
            let quantity = errors.check(
                &format!("tiers.{}.quantity", i),
                bounded_int(&tier.quantity, "Quantity", 1, CAPACITY_MAX),
            );
            if let (Some(name), Some(price_minor), Some(quantity)) = (name, price, quantity) {
                tiers.push(TicketTier {
                    name,
                    price_minor,
                    quantity,
                });
            }
        }

        errors.finish(|| {
            Some(TicketInfo {
                currency: currency?,
                tiers,
            })
        })
    }
}

// =============================================================================
// SPONSORS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SponsorTier {
    Platinum,
    Gold,
    Silver,
    Bronze,
    Partner,
}

const SPONSOR_TIERS: &[(&str, SponsorTier)] = &[
    ("platinum", SponsorTier::Platinum),
    ("gold", SponsorTier::Gold),
    ("silver", SponsorTier::Silver),
    ("bronze", SponsorTier::Bronze),
    ("partner", SponsorTier::Partner),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sponsor {
    pub name: String,
    pub tier: SponsorTier,
    pub contact_email: Option<String>,
}

/// Sponsors are optional: an empty list is a valid, skipped stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorInfo {
    pub sponsors: Vec<Sponsor>,
}

impl StageSchema for SponsorForm {
    type Payload = SponsorInfo;

    fn validate(&self, _ctx: &ValidationContext) -> Result<SponsorInfo, Vec<FieldError>> {
        let mut errors = Errors::default();
        if self.sponsors.len() > MAX_SPONSORS {
            errors.push(
                "sponsors",
                format!("At most {} sponsors are allowed", MAX_SPONSORS),
            );
        }

        let mut sponsors = Vec::with_capacity(self.sponsors.len());
        for (i, entry) in self.sponsors.iter().enumerate() {
            let name = errors.check(
                &format!("sponsors.{}.name", i),
                bounded_text(&entry.name, "Sponsor name", SPONSOR_NAME_MIN, SPONSOR_NAME_MAX),
            );
            let tier = errors.check(
                &format!("sponsors.{}.tier", i),
                keyword(&entry.tier, "Sponsor tier", SPONSOR_TIERS),
            );
            let contact_email = errors.check(
                &format!("sponsors.{}.contact_email", i),
                if entry.contact_email.trim().is_empty() {
                    Ok(None)
                } else {
                    email(&entry.contact_email).map(Some)
                },
            );
            if let (Some(name), Some(tier), Some(contact_email)) = (name, tier, contact_email) {
                sponsors.push(Sponsor {
                    name,
                    tier,
                    contact_email,
                });
            }
        }

        errors.finish(|| Some(SponsorInfo { sponsors }))
    }
}

// =============================================================================
// REVIEW
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Unlisted,
}

const VISIBILITIES: &[(&str, Visibility)] = &[
    ("public", Visibility::Public),
    ("private", Visibility::Private),
    ("unlisted", Visibility::Unlisted),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewInfo {
    pub terms_accepted: bool,
    pub visibility: Visibility,
}

impl StageSchema for ReviewForm {
    type Payload = ReviewInfo;

    fn validate(&self, _ctx: &ValidationContext) -> Result<ReviewInfo, Vec<FieldError>> {
        let mut errors = Errors::default();
        if !self.terms_accepted {
            errors.push("terms_accepted", "You must accept the terms to publish");
        }
        let visibility = if self.visibility.trim().is_empty() {
            Some(Visibility::default())
        } else {
            errors.check(
                "visibility",
                keyword(&self.visibility, "Visibility", VISIBILITIES),
            )
        };

        errors.finish(|| {
            Some(ReviewInfo {
                terms_accepted: true,
                visibility: visibility?,
            })
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::forms::{SponsorEntryForm, TicketTierForm};

    fn ctx() -> ValidationContext {
        ValidationContext {
            today: NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    fn event_form(date: &str, start: &str, end: &str) -> EventForm {
        EventForm {
            title: "Autumn Runway".to_string(),
            description: String::new(),
            event_type: "runway".to_string(),
            event_date: date.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    #[test]
    fn organizer_short_name_and_bad_email() {
        let form = OrganizerForm {
            name: "Jo".to_string(),
            email: "bad-email".to_string(),
            ..OrganizerForm::default()
        };
        let errors = form.validate(&ctx()).unwrap_err();
        assert_eq!(fields(&errors), vec!["name", "email"]);
        assert!(errors[0].message.contains("at least 3"));
        assert!(errors[1].message.contains("valid email"));
    }

    #[test]
    fn organizer_normalizes_fields() {
        let form = OrganizerForm {
            name: "  Maison Rue  ".to_string(),
            email: "Hello@MaisonRue.COM".to_string(),
            phone: "+33 1 23 45 67 89".to_string(),
            ..OrganizerForm::default()
        };
        let info = form.validate(&ctx()).unwrap();
        assert_eq!(info.name, "Maison Rue");
        assert_eq!(info.email, "hello@maisonrue.com");
        assert_eq!(info.email_domain(), Some("maisonrue.com"));
        assert_eq!(info.organization, None);
        assert!(info.phone.is_some());
    }

    #[test]
    fn event_date_in_past_rejected() {
        let errors = event_form("2026-10-13", "19:00", "").validate(&ctx()).unwrap_err();
        assert_eq!(fields(&errors), vec!["event_date"]);
    }

    #[test]
    fn event_date_today_or_later_accepted() {
        assert!(event_form("2026-10-14", "19:00", "").validate(&ctx()).is_ok());
        assert!(event_form("2027-01-01", "19:00", "").validate(&ctx()).is_ok());
    }

    #[test]
    fn end_time_must_follow_start_time() {
        let errors = event_form("2026-11-01", "19:00", "18:00")
            .validate(&ctx())
            .unwrap_err();
        assert_eq!(fields(&errors), vec!["end_time"]);
        assert!(
            event_form("2026-11-01", "19:00", "19:00")
                .validate(&ctx())
                .is_err()
        );

        let info = event_form("2026-11-01", "19:00", "21:00")
            .validate(&ctx())
            .unwrap();
        assert_eq!(info.end_time, NaiveTime::from_hms_opt(21, 0, 0));
    }

    #[test]
    fn title_length_bounds() {
        let mut form = event_form("2026-11-01", "19:00", "");
        form.title = "AB".to_string();
        assert_eq!(fields(&form.validate(&ctx()).unwrap_err()), vec!["title"]);
        form.title = "ABC".to_string();
        assert!(form.validate(&ctx()).is_ok());
        form.title = "x".repeat(255);
        assert!(form.validate(&ctx()).is_ok());
        form.title = "x".repeat(256);
        assert!(form.validate(&ctx()).is_err());
    }

    #[test]
    fn unknown_event_type_rejected() {
        let mut form = event_form("2026-11-01", "19:00", "");
        form.event_type = "concert".to_string();
        let errors = form.validate(&ctx()).unwrap_err();
        assert_eq!(fields(&errors), vec!["event_type"]);
        assert!(errors[0].message.contains("runway"));
    }

    #[test]
    fn virtual_venue_needs_stream_not_address() {
        let form = VenueForm {
            venue_mode: "virtual".to_string(),
            capacity: "500".to_string(),
            virtual_url: "https://live.example.com/show".to_string(),
            ..VenueForm::default()
        };
        let info = form.validate(&ctx()).unwrap();
        assert_eq!(info.mode, VenueMode::Virtual);
        assert_eq!(info.address, None);

        let form = VenueForm {
            venue_mode: "hybrid".to_string(),
            capacity: "500".to_string(),
            ..VenueForm::default()
        };
        let errors = form.validate(&ctx()).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["venue_name", "address", "city", "virtual_url"]
        );
    }

    #[test]
    fn ticket_tiers_validated_per_entry() {
        let form = TicketForm {
            currency: "eur".to_string(),
            tiers: vec![
                TicketTierForm {
                    name: "General".to_string(),
                    price: "25".to_string(),
                    quantity: "100".to_string(),
                },
                TicketTierForm {
                    name: "general".to_string(),
                    price: "9.999".to_string(),
                    quantity: "0".to_string(),
                },
            ],
        };
        let errors = form.validate(&ctx()).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["tiers.1.name", "tiers.1.price", "tiers.1.quantity"]
        );
    }

    #[test]
    fn ticket_prices_are_normalized() {
        let form = TicketForm {
            currency: "usd".to_string(),
            tiers: vec![TicketTierForm {
                name: "Front Row".to_string(),
                price: "120.00".to_string(),
                quantity: "80".to_string(),
            }],
        };
        let info = form.validate(&ctx()).unwrap();
        assert_eq!(info.currency, "USD");
        assert_eq!(info.tiers[0].price_minor, 12000);
        assert_eq!(info.tiers[0].quantity, 80);
    }

    #[test]
    fn empty_sponsor_list_is_valid() {
        let info = SponsorForm::default().validate(&ctx()).unwrap();
        assert!(info.sponsors.is_empty());

        let form = SponsorForm {
            sponsors: vec![SponsorEntryForm {
                name: "Silk & Co".to_string(),
                tier: "diamond".to_string(),
                contact_email: "nope".to_string(),
            }],
        };
        let errors = form.validate(&ctx()).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["sponsors.0.tier", "sponsors.0.contact_email"]
        );
    }

    #[test]
    fn review_requires_terms() {
        let errors = ReviewForm::default().validate(&ctx()).unwrap_err();
        assert_eq!(fields(&errors), vec!["terms_accepted"]);

        let info = ReviewForm {
            terms_accepted: true,
            visibility: String::new(),
        }
        .validate(&ctx())
        .unwrap();
        assert_eq!(info.visibility, Visibility::Public);
    }
}
