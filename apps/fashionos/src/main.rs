//! # FashionOS - Event Wizard Server
//!
//! The main binary for the FashionOS event creation wizard.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   apps/fashionos (THE BINARY)                │
//! │                                                              │
//! │  ┌─────────────┐    ┌─────────────┐    ┌────────────────┐   │
//! │  │   CLI       │    │   HTTP API  │    │ Casting client │   │
//! │  │  (clap)     │    │   (axum)    │    │   (reqwest)    │   │
//! │  └──────┬──────┘    └──────┬──────┘    └───────┬────────┘   │
//! │         └──────────────────┼───────────────────┘            │
//! │                            ▼                                │
//! │                  ┌──────────────────┐                       │
//! │                  │  fashionos-core  │                       │
//! │                  │   (THE LOGIC)    │                       │
//! │                  └──────────────────┘                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! fashionos init
//! fashionos server --port 8080
//! fashionos validate -f event.json
//! fashionos brand add "Atelier Nord" ateliernord.com
//! ```

use clap::Parser;
use fashionos::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // FASHIONOS_LOG_FORMAT=json switches to machine-parseable output
    let log_format = std::env::var("FASHIONOS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fashionos=info,fashionos_core=info,tower_http=debug".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let cli = cli::Cli::parse();

    if !cli.quiet {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  ╔═╗╔═╗╔═╗╦ ╦╦╔═╗╔╗╔╔═╗╔═╗
  ╠╣ ╠═╣╚═╗╠═╣║║ ║║║║║ ║╚═╗
  ╚  ╩ ╩╚═╝╩ ╩╩╚═╝╝╚╝╚═╝╚═╝

  Event Wizard v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
