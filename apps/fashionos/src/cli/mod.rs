//! # FashionOS CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show storage and wizard status
//! - `init` - Initialize a new database
//! - `validate` - Validate a stage form from a JSON file
//! - `events` - List published events
//! - `brand add|lookup` - Manage the brand directory
//! - `casting` - Ask the AI gateway for model suggestions

mod commands;

use crate::config::FashionConfig;
use clap::{Parser, Subcommand};
use fashionos_core::WizardError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// FashionOS - event creation wizard
///
/// Walks organizers through organizer, event, venue, tickets, sponsors and
/// review before publishing a fashion event.
#[derive(Parser, Debug)]
#[command(name = "fashionos")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a fashionos.toml configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database (overrides storage.database)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" (persistent) or "memory" (overrides storage.backend)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides server.host)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show storage and wizard status
    Status,

    /// Initialize a new empty database
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a stage form JSON file (tagged by "stage")
    Validate {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List published events
    Events,

    /// Manage the brand directory
    Brand {
        #[command(subcommand)]
        action: BrandCommand,
    },

    /// Ask the AI gateway for casting suggestions
    Casting {
        /// Event title
        #[arg(short, long)]
        title: String,

        /// Event type, e.g. runway or gala
        #[arg(short = 't', long, default_value = "")]
        event_type: String,

        /// Event date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        /// Style notes for the casting director
        #[arg(short, long, default_value = "")]
        notes: String,

        /// Number of models to suggest
        #[arg(short = 'n', long, default_value = "5")]
        count: u32,
    },
}

#[derive(Subcommand, Debug)]
pub enum BrandCommand {
    /// Register a brand for an email domain
    Add {
        name: String,
        /// Email domain, e.g. ateliernord.com
        domain: String,
    },

    /// Find the brand of an organizer email
    Lookup { email: String },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve the configuration and run the selected command.
pub async fn execute(cli: Cli) -> Result<(), WizardError> {
    let mut config = FashionConfig::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.storage.database = database;
    }
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }
    config.validate()?;
    if cli.verbose {
        tracing::info!(?config, "Configuration resolved");
    }

    let json_mode = cli.json_mode;
    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::Status) | None => cmd_status(&config, json_mode),
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::Validate { file }) => cmd_validate(&file, json_mode),
        Some(Commands::Events) => cmd_events(&config, json_mode),
        Some(Commands::Brand { action }) => match action {
            BrandCommand::Add { name, domain } => cmd_brand_add(&config, &name, &domain, json_mode),
            BrandCommand::Lookup { email } => cmd_brand_lookup(&config, &email, json_mode),
        },
        Some(Commands::Casting {
            title,
            event_type,
            date,
            notes,
            count,
        }) => {
            let request = casting_request(title, event_type, date.as_deref(), notes, count)?;
            cmd_casting(&config, &request, json_mode).await
        }
    }
}
