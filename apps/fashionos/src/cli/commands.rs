//! # CLI Command Implementations

use crate::api::{self, AppState, Wizard};
use crate::casting::{CastingRequest, GatewayClient};
use crate::config::FashionConfig;
use chrono::NaiveDate;
use fashionos_core::{
    Brand, DraftBackend, DraftStore, EventRepository, EventWizard, RedbRepository,
    RepositoryBackend, StageForm, ValidationContext, WizardError, WizardMonitor,
    primitives::DRAFT_KEY_PREFIX, validate_form,
};
use std::path::{Path, PathBuf};

/// Largest form file accepted by `validate` (1 MB).
const MAX_FORM_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// HELPERS
// =============================================================================

/// Canonical path of an existing regular file no larger than `max_size`.
fn checked_input_file(path: &Path, max_size: u64) -> Result<PathBuf, WizardError> {
    let canonical = path.canonicalize().map_err(|e| {
        WizardError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;
    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| WizardError::Io(format!("Cannot read file metadata: {}", e)))?;
    if !metadata.is_file() {
        return Err(WizardError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > max_size {
        return Err(WizardError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(canonical)
}

fn print_json(value: &impl serde::Serialize) -> Result<(), WizardError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| WizardError::Serialization(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

/// Repository and draft store for the configured backend.
pub fn open_storage(
    config: &FashionConfig,
) -> Result<(RepositoryBackend, DraftBackend), WizardError> {
    match config.storage.backend.as_str() {
        "memory" => Ok((RepositoryBackend::default(), DraftBackend::default())),
        _ => {
            let repo = RedbRepository::open(&config.storage.database)?;
            let drafts = repo.draft_store();
            Ok((
                RepositoryBackend::Persistent(repo),
                DraftBackend::Persistent(drafts),
            ))
        }
    }
}

/// A wizard over the configured storage with the configured timings.
pub fn open_wizard(config: &FashionConfig) -> Result<Wizard, WizardError> {
    let (repository, drafts) = open_storage(config)?;
    Ok(EventWizard::new(repository, drafts)
        .with_autosave_delay(config.wizard.autosave_delay())
        .with_monitor(WizardMonitor::new(config.wizard.monitor_capacity)))
}

/// Build a casting request from CLI arguments.
pub fn casting_request(
    title: String,
    event_type: String,
    date: Option<&str>,
    notes: String,
    count: u32,
) -> Result<CastingRequest, WizardError> {
    let event_date = date
        .map(|d| {
            NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").map_err(|e| {
                WizardError::Serialization(format!("Invalid date '{}': {}", d, e))
            })
        })
        .transpose()?;
    Ok(CastingRequest {
        session_id: None,
        event_title: title,
        event_type,
        event_date,
        style_notes: notes,
        model_count: count,
    })
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

pub async fn cmd_server(config: &FashionConfig) -> Result<(), WizardError> {
    let wizard = open_wizard(config)?;
    let gateway = GatewayClient::from_config(&config.gateway)
        .map_err(|e| WizardError::ExternalService(e.to_string()))?;
    if !gateway.is_configured() {
        tracing::warn!("No AI gateway key configured, casting requests will be refused");
    }

    println!("FashionOS Event Wizard Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", config.server.host);
    println!("  Port:     {}", config.server.port);
    println!("  Backend:  {}", config.storage.backend);
    println!("  Database: {}", config.storage.database.display());
    println!("  Autosave: {} ms", config.wizard.autosave_delay_ms);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    api::run_server(
        &addr,
        AppState::new(wizard, gateway),
        config.wizard.flush_interval(),
    )
    .await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

pub fn cmd_status(config: &FashionConfig, json_mode: bool) -> Result<(), WizardError> {
    let (repository, drafts) = open_storage(config)?;
    let published = repository.list_published_events()?.len();
    let saved_drafts = drafts
        .keys()?
        .iter()
        .filter(|k| k.starts_with(DRAFT_KEY_PREFIX))
        .count();

    if json_mode {
        return print_json(&serde_json::json!({
            "backend": config.storage.backend,
            "database": config.storage.database.to_string_lossy(),
            "published_events": published,
            "saved_drafts": saved_drafts,
        }));
    }

    println!("FashionOS Status");
    println!("================");
    println!("Backend:          {}", config.storage.backend);
    println!("Database:         {}", config.storage.database.display());
    println!("Published events: {}", published);
    println!("Saved drafts:     {}", saved_drafts);
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

pub fn cmd_init(config: &FashionConfig, force: bool) -> Result<(), WizardError> {
    if config.storage.backend == "memory" {
        return Err(WizardError::Serialization(
            "The memory backend has nothing to initialize. Use --backend redb.".to_string(),
        ));
    }
    let path = &config.storage.database;
    if path.exists() {
        if !force {
            return Err(WizardError::Io(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(path)
            .map_err(|e| WizardError::Io(format!("Cannot remove old database: {}", e)))?;
    }

    let _repo = RedbRepository::open(path)?;
    println!("Initialized new redb database at {}", path.display());
    Ok(())
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Validate one stage form. Field errors make the command fail.
pub fn cmd_validate(file: &Path, json_mode: bool) -> Result<(), WizardError> {
    let path = checked_input_file(file, MAX_FORM_FILE_SIZE)?;
    let content = std::fs::read_to_string(&path)
        .map_err(|e| WizardError::Io(format!("Cannot read form: {}", e)))?;
    let form: StageForm = serde_json::from_str(&content)
        .map_err(|e| WizardError::Serialization(format!("Invalid form JSON: {}", e)))?;

    match validate_form(&form, &ValidationContext::now()) {
        Ok(payload) => {
            if json_mode {
                print_json(&payload)
            } else {
                println!("{}: valid", form.stage().name());
                Ok(())
            }
        }
        Err(errors) => {
            if json_mode {
                print_json(&errors)?;
            } else {
                println!("{}: {} error(s)", form.stage().name(), errors.len());
                for error in &errors {
                    println!("  {}", error);
                }
            }
            Err(WizardError::Validation(errors))
        }
    }
}

// =============================================================================
// EVENTS COMMAND
// =============================================================================

pub fn cmd_events(config: &FashionConfig, json_mode: bool) -> Result<(), WizardError> {
    let (repository, _) = open_storage(config)?;
    let events = repository.list_published_events()?;

    if json_mode {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("No published events");
        return Ok(());
    }
    for event in &events {
        println!(
            "{}  {}  {}  ({}, by {})",
            event.payloads.event.event_date,
            event.slug,
            event.title(),
            event.payloads.event.event_type.label(),
            event.owner
        );
    }
    Ok(())
}

// =============================================================================
// BRAND COMMANDS
// =============================================================================

pub fn cmd_brand_add(
    config: &FashionConfig,
    name: &str,
    domain: &str,
    json_mode: bool,
) -> Result<(), WizardError> {
    if name.trim().is_empty() || domain.trim().trim_start_matches('@').is_empty() {
        return Err(WizardError::Serialization(
            "Brand name and domain are required".to_string(),
        ));
    }
    let (mut repository, _) = open_storage(config)?;
    let brand = Brand::new(name.trim(), domain);
    repository.upsert_brand(&brand)?;

    if json_mode {
        print_json(&brand)
    } else {
        println!("Registered {} for @{}", brand.name, brand.email_domain);
        Ok(())
    }
}

pub fn cmd_brand_lookup(
    config: &FashionConfig,
    email: &str,
    json_mode: bool,
) -> Result<(), WizardError> {
    let mut wizard = open_wizard(config)?;
    let brand = wizard.lookup_brand(email);

    if json_mode {
        return print_json(&brand);
    }
    match brand {
        Some(brand) => println!("{} ({})", brand.name, brand.email_domain),
        None => println!("No brand registered for {}", email),
    }
    Ok(())
}

// =============================================================================
// CASTING COMMAND
// =============================================================================

pub async fn cmd_casting(
    config: &FashionConfig,
    request: &CastingRequest,
    json_mode: bool,
) -> Result<(), WizardError> {
    let client = GatewayClient::from_config(&config.gateway)
        .map_err(|e| WizardError::ExternalService(e.to_string()))?;
    let recommendations = client.recommend(request).await.map_err(|e| {
        tracing::warn!(error = %e, "Casting request failed");
        WizardError::ExternalService(e.user_message())
    })?;

    if json_mode {
        return print_json(&recommendations);
    }
    for (i, rec) in recommendations.iter().enumerate() {
        println!(
            "{}. {} ({}) score {} [{:?}]",
            i + 1,
            rec.name,
            rec.agency,
            rec.score,
            rec.priority
        );
        if !rec.email.is_empty() {
            println!("   {}", rec.email);
        }
        if !rec.reasoning.is_empty() {
            println!("   {}", rec.reasoning);
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
