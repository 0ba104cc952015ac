//! # Property-Based Tests
//!
//! Invariants of stage progression, validation and the monitor log.

#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::{DateTime, NaiveDate, Utc};
use fashionos_core::forms::{
    EventForm, OrganizerForm, ReviewForm, SponsorForm, TicketForm, TicketTierForm, VenueForm,
};
use fashionos_core::{
    SessionId, Stage, StageForm, StageSchema, ValidationContext, WizardEvent, WizardEventKind,
    WizardMonitor, WizardSession, completion_percent,
};
use proptest::prelude::*;

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_792_000_000, 0).expect("timestamp")
}

fn ctx() -> ValidationContext {
    ValidationContext {
        today: NaiveDate::from_ymd_opt(2026, 10, 14).expect("date"),
    }
}

fn valid_form(stage: Stage) -> StageForm {
    match stage {
        Stage::OrganizerSetup => StageForm::OrganizerSetup(OrganizerForm {
            name: "Maison Rue".to_string(),
            email: "hello@maisonrue.com".to_string(),
            ..OrganizerForm::default()
        }),
        Stage::EventSetup => StageForm::EventSetup(EventForm {
            title: "Autumn Runway".to_string(),
            event_type: "runway".to_string(),
            event_date: "2026-12-01".to_string(),
            start_time: "19:00".to_string(),
            ..EventForm::default()
        }),
        Stage::VenueSetup => StageForm::VenueSetup(VenueForm {
            venue_mode: "virtual".to_string(),
            capacity: "1000".to_string(),
            virtual_url: "https://live.example.com".to_string(),
            ..VenueForm::default()
        }),
        Stage::TicketSetup => StageForm::TicketSetup(TicketForm {
            currency: "usd".to_string(),
            tiers: vec![TicketTierForm {
                name: "Stream Pass".to_string(),
                price: "0".to_string(),
                quantity: "1000".to_string(),
            }],
        }),
        Stage::SponsorSetup => StageForm::SponsorSetup(SponsorForm::default()),
        Stage::ReviewPublish => StageForm::ReviewPublish(ReviewForm {
            terms_accepted: true,
            visibility: String::new(),
        }),
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Completion never decreases and always equals 100 * completed / 6.
    #[test]
    fn completion_is_monotonic(steps in proptest::collection::vec(any::<bool>(), 0..40)) {
        let mut session = WizardSession::new(SessionId::new("p"), None, now());
        let mut last = session.completion_percent();

        for forward in steps {
            if forward {
                let form = valid_form(session.current());
                session.advance(form, &ctx(), now()).expect("valid form");
            } else {
                session.retreat(now());
            }
            let percent = session.completion_percent();
            prop_assert!(percent >= last);
            prop_assert!((percent - completion_percent(session.completed().len())).abs() < 1e-9);
            last = percent;
        }
    }

    /// Retreating never removes a completed stage.
    #[test]
    fn retreat_keeps_completed(advances in 1usize..6, retreats in 0usize..8) {
        let mut session = WizardSession::new(SessionId::new("p"), None, now());
        for _ in 0..advances {
            let form = valid_form(session.current());
            session.advance(form, &ctx(), now()).expect("valid form");
        }
        let before = session.completed().clone();
        for _ in 0..retreats {
            session.retreat(now());
        }
        prop_assert_eq!(session.completed(), &before);
        prop_assert!(session.current().index() <= advances);
    }

    /// The log holds at most 100 events and keeps the newest ones.
    #[test]
    fn monitor_keeps_newest(n in 0usize..400) {
        let mut monitor = WizardMonitor::default();
        for i in 0..n {
            monitor.track_event(WizardEvent::new(
                WizardEventKind::StageCompleted,
                SessionId::new(format!("s-{}", i)),
                now(),
            ));
        }
        let events = monitor.export_events();
        prop_assert_eq!(events.len(), n.min(100));
        if n > 0 {
            let expected = format!("s-{}", n - 1);
            prop_assert_eq!(events[events.len() - 1].session_id.as_str(), expected.as_str());
        }
    }

    /// Titles are accepted exactly when 3..=255 characters long.
    #[test]
    fn title_length_rule(len in 0usize..300) {
        let form = EventForm {
            title: "a".repeat(len),
            event_type: "gala".to_string(),
            event_date: "2026-12-01".to_string(),
            start_time: "20:00".to_string(),
            ..EventForm::default()
        };
        prop_assert_eq!(form.validate(&ctx()).is_ok(), (3..=255).contains(&len));
    }

    /// Decimal prices map to integer minor units.
    #[test]
    fn prices_become_minor_units(whole in 0u64..100_000, cents in 0u64..100) {
        let form = TicketForm {
            currency: "eur".to_string(),
            tiers: vec![TicketTierForm {
                name: "General".to_string(),
                price: format!("{}.{:02}", whole, cents),
                quantity: "10".to_string(),
            }],
        };
        let info = form.validate(&ctx()).expect("valid tickets");
        prop_assert_eq!(info.tiers[0].price_minor, whole * 100 + cents);
    }
}
