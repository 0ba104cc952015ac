//! # Wizard Flow Tests
//!
//! End-to-end runs of the wizard over both storage backends.

#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::{DateTime, Utc};
use fashionos_core::forms::{
    EventForm, OrganizerForm, ReviewForm, SponsorEntryForm, SponsorForm, TicketForm,
    TicketTierForm, VenueForm,
};
use fashionos_core::{
    AuthContext, Brand, DraftStore, EventRepository, EventWizard, InMemoryRepository,
    MemoryDraftStore, RedbRepository, SessionId, Stage, StageForm, WizardError, WizardEventKind,
    draft_key,
};
use tempfile::tempdir;

fn fixed_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_792_000_000, 0).expect("timestamp")
}

fn forms() -> Vec<StageForm> {
    vec![
        StageForm::OrganizerSetup(OrganizerForm {
            name: "Atelier Nord".to_string(),
            email: "press@ateliernord.com".to_string(),
            website: "https://ateliernord.com".to_string(),
            ..OrganizerForm::default()
        }),
        StageForm::EventSetup(EventForm {
            title: "Nordic Knitwear Showcase".to_string(),
            description: "Winter collection runway".to_string(),
            event_type: "runway".to_string(),
            event_date: "2027-02-14".to_string(),
            start_time: "18:30".to_string(),
            end_time: "21:00".to_string(),
        }),
        StageForm::VenueSetup(VenueForm {
            venue_mode: "hybrid".to_string(),
            venue_name: "Harbour Hall".to_string(),
            address: "Kaivokatu 1".to_string(),
            city: "Helsinki".to_string(),
            capacity: "400".to_string(),
            virtual_url: "https://live.ateliernord.com".to_string(),
        }),
        StageForm::TicketSetup(TicketForm {
            currency: "eur".to_string(),
            tiers: vec![
                TicketTierForm {
                    name: "Front Row".to_string(),
                    price: "150".to_string(),
                    quantity: "40".to_string(),
                },
                TicketTierForm {
                    name: "Standing".to_string(),
                    price: "35.50".to_string(),
                    quantity: "300".to_string(),
                },
            ],
        }),
        StageForm::SponsorSetup(SponsorForm {
            sponsors: vec![SponsorEntryForm {
                name: "Wool Finland".to_string(),
                tier: "gold".to_string(),
                contact_email: String::new(),
            }],
        }),
        StageForm::ReviewPublish(ReviewForm {
            terms_accepted: true,
            visibility: "unlisted".to_string(),
        }),
    ]
}

fn run_to_review<R: EventRepository, D: DraftStore>(
    wizard: &mut EventWizard<R, D>,
    auth: &AuthContext,
) -> SessionId {
    let id = wizard.start(auth);
    for form in forms() {
        let outcome = wizard.advance(&id, form, auth).expect("advance");
        assert!(outcome.warnings.is_empty());
    }
    id
}

#[test]
fn full_flow_publishes_in_memory() {
    let auth = AuthContext::signed_in("user_42");
    let mut wizard = EventWizard::new(InMemoryRepository::new(), MemoryDraftStore::new())
        .with_clock(fixed_now);
    let id = run_to_review(&mut wizard, &auth);

    let session = wizard.session(&id).expect("session");
    assert_eq!(session.current(), Stage::ReviewPublish);
    assert!(session.is_ready_to_publish());

    wizard.edit(&id, forms()[0].clone()).expect("edit");
    wizard.flush_all_autosaves();
    assert!(wizard.drafts().get(&draft_key(&id)).expect("get").is_some());

    let event = wizard.publish(&id, &auth).expect("publish");
    assert_eq!(event.owner, "user_42");
    assert!(event.slug.starts_with("nordic-knitwear-showcase-"));
    assert_eq!(event.payloads.tickets.total_quantity(), 340);

    // the draft is gone after publishing
    assert!(wizard.drafts().get(&draft_key(&id)).expect("get").is_none());
    assert_eq!(
        wizard.repository().list_published_events().expect("list").len(),
        1
    );

    let err = wizard.publish(&id, &auth).unwrap_err();
    assert!(matches!(err, WizardError::AlreadyPublished(_)));

    let metrics = wizard.monitor().metrics();
    assert_eq!(metrics.completed_sessions, 1);
    assert!((metrics.completion_rate - 100.0).abs() < 1e-9);
    assert_eq!(metrics.average_completion_ms, Some(0.0));
}

#[test]
fn full_flow_publishes_with_redb() {
    let temp = tempdir().expect("temp dir");
    let db_path = temp.path().join("fashionos.redb");
    let auth = AuthContext::signed_in("user_7");

    let event_id = {
        let repo = RedbRepository::open(&db_path).expect("open db");
        let drafts = repo.draft_store();
        let mut wizard = EventWizard::new(repo, drafts).with_clock(fixed_now);
        let id = run_to_review(&mut wizard, &auth);
        wizard.publish(&id, &auth).expect("publish").id
    };

    let repo = RedbRepository::open(&db_path).expect("reopen db");
    let events = repo.list_published_events().expect("list");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, event_id);
    assert_eq!(events[0].payloads.sponsors.sponsors.len(), 1);
}

#[test]
fn draft_survives_restart() {
    let temp = tempdir().expect("temp dir");
    let db_path = temp.path().join("fashionos.redb");
    let auth = AuthContext::anonymous();

    let id = {
        let repo = RedbRepository::open(&db_path).expect("open db");
        let drafts = repo.draft_store();
        let mut wizard = EventWizard::new(repo, drafts).with_clock(fixed_now);
        let id = wizard.start(&auth);
        wizard.edit(&id, forms()[0].clone()).expect("edit");
        wizard.flush_all_autosaves();
        id
    };

    let repo = RedbRepository::open(&db_path).expect("reopen db");
    let drafts = repo.draft_store();
    let mut wizard = EventWizard::new(repo, drafts).with_clock(fixed_now);
    let outcome = wizard.resume(&id, &auth).expect("resume");
    assert_eq!(outcome.restored_forms, 1);
    assert_eq!(outcome.stage, Stage::OrganizerSetup);

    let session = wizard.session(&id).expect("session");
    assert_eq!(session.forms().get(Stage::OrganizerSetup), forms()[0]);
}

#[test]
fn validation_failure_is_reported_per_field() {
    let mut wizard = EventWizard::new(InMemoryRepository::new(), MemoryDraftStore::new())
        .with_clock(fixed_now);
    let id = wizard.start(&AuthContext::anonymous());
    let form = StageForm::OrganizerSetup(OrganizerForm {
        name: "Jo".to_string(),
        email: "bad-email".to_string(),
        ..OrganizerForm::default()
    });

    let err = wizard
        .advance(&id, form, &AuthContext::anonymous())
        .unwrap_err();
    let fields: Vec<&str> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["name", "email"]);
    assert_eq!(
        wizard.session(&id).expect("session").current(),
        Stage::OrganizerSetup
    );
    assert!(
        wizard
            .monitor()
            .export_events()
            .iter()
            .all(|e| e.kind != WizardEventKind::StageCompleted)
    );
}

#[test]
fn brand_lookup_by_organizer_email() {
    let mut repo = InMemoryRepository::new();
    repo.upsert_brand(&Brand::new("Atelier Nord", "ateliernord.com"))
        .expect("upsert");
    let mut wizard = EventWizard::new(repo, MemoryDraftStore::new()).with_clock(fixed_now);

    let brand = wizard.lookup_brand("press@AtelierNord.com").expect("brand");
    assert_eq!(brand.name, "Atelier Nord");
    assert!(wizard.lookup_brand("someone@elsewhere.com").is_none());
    assert!(wizard.lookup_brand("not-an-email").is_none());
}
