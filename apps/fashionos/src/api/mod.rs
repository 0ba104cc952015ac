//! # FashionOS HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /wizard/sessions` - Open a wizard session
//! - `GET /wizard/sessions/{id}` - Current stage, form and progress
//! - `PUT /wizard/sessions/{id}/draft` - Store a raw form (autosaved)
//! - `POST /wizard/sessions/{id}/advance` - Validate the current stage and move on
//! - `POST /wizard/sessions/{id}/retreat` - Step back one stage
//! - `POST /wizard/sessions/{id}/resume` - Restore the saved draft
//! - `POST /wizard/sessions/{id}/payment` - Set the payment-configured flag
//! - `POST /wizard/sessions/{id}/publish` - Publish a complete session
//! - `POST /wizard/sessions/{id}/abandon` - Leave the wizard, keeping the draft
//! - `GET /events` - Published events
//! - `GET /brands/lookup?email=` - Brand for an organizer email
//! - `GET /monitor/metrics` - Wizard metrics
//! - `GET /monitor/events` / `DELETE /monitor/events` - Telemetry log
//! - `POST /casting/recommendations` - AI casting suggestions
//!
//! Callers identify the organizer with an `X-User-Id` header; without it the
//! request is anonymous.
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `FASHIONOS_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all
//!   (default: localhost only)
//! - `FASHIONOS_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `FASHIONOS_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{USER_ID_HEADER, get_api_key_from_env};
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    AdvanceResponse, BrandLookupResponse, CastingResponse, ClearedResponse, ErrorResponse,
    EventSummary, EventsResponse, HealthResponse, MetricsResponse, PaymentRequest,
    PublishResponse, ResumeResponse, SessionResponse, StageResponse, StartResponse,
};

use crate::casting::GatewayClient;
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use fashionos_core::{DraftBackend, EventWizard, RepositoryBackend, WizardError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// The wizard as the server runs it.
pub type Wizard = EventWizard<RepositoryBackend, DraftBackend>;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// The wizard engine with every open session.
    pub wizard: Arc<RwLock<Wizard>>,
    pub gateway: Arc<GatewayClient>,
}

impl AppState {
    #[must_use]
    pub fn new(wizard: Wizard, gateway: GatewayClient) -> Self {
        Self {
            wizard: Arc::new(RwLock::new(wizard)),
            gateway: Arc::new(gateway),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

fn cors_headers() -> [HeaderName; 3] {
    [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        HeaderName::from_static(USER_ID_HEADER),
    ]
}

/// Parse a comma-separated origin list, skipping invalid entries.
fn parse_origins(list: &str) -> Vec<HeaderValue> {
    list.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin, error = %e, "CORS: ignoring invalid origin");
                None
            }
        })
        .collect()
}

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers(cors_headers())
}

/// CORS policy from `FASHIONOS_CORS_ORIGINS`: `*` allows every origin, a
/// comma list allows those origins, anything else falls back to localhost.
fn build_cors_layer() -> CorsLayer {
    let Ok(configured) = std::env::var("FASHIONOS_CORS_ORIGINS") else {
        tracing::info!("CORS: FASHIONOS_CORS_ORIGINS not set, allowing localhost only");
        return build_localhost_cors();
    };
    if configured.trim() == "*" {
        tracing::warn!("CORS: allowing ALL origins (FASHIONOS_CORS_ORIGINS=*), not for production");
        return CorsLayer::permissive();
    }

    let origins = parse_origins(&configured);
    if origins.is_empty() {
        tracing::warn!("CORS: no valid origin in FASHIONOS_CORS_ORIGINS, allowing localhost only");
        build_localhost_cors()
    } else {
        tracing::info!(count = origins.len(), "CORS: allowing configured origins");
        restricted_cors(origins)
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:5173",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();
    restricted_cors(origins)
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Rate Limiting (if enabled)
/// 4. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set FASHIONOS_API_KEY environment variable to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/wizard/sessions", post(handlers::start_handler))
        .route("/wizard/sessions/{id}", get(handlers::session_handler))
        .route("/wizard/sessions/{id}/draft", put(handlers::draft_handler))
        .route("/wizard/sessions/{id}/advance", post(handlers::advance_handler))
        .route("/wizard/sessions/{id}/retreat", post(handlers::retreat_handler))
        .route("/wizard/sessions/{id}/resume", post(handlers::resume_handler))
        .route("/wizard/sessions/{id}/payment", post(handlers::payment_handler))
        .route("/wizard/sessions/{id}/publish", post(handlers::publish_handler))
        .route("/wizard/sessions/{id}/abandon", post(handlers::abandon_handler))
        .route("/events", get(handlers::events_handler))
        .route("/brands/lookup", get(handlers::brand_lookup_handler))
        .route("/monitor/metrics", get(handlers::metrics_handler))
        .route(
            "/monitor/events",
            get(handlers::monitor_events_handler).delete(handlers::clear_monitor_handler),
        )
        .route("/casting/recommendations", post(handlers::casting_handler));

    // Authentication runs innermost, after rate limiting
    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// AUTOSAVE
// =============================================================================

/// Periodically write autosaves whose debounce delay has elapsed.
pub fn spawn_autosave_flusher(state: &AppState, every: Duration) -> JoinHandle<()> {
    let wizard = Arc::clone(&state.wizard);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let written = wizard.write().await.flush_autosave(Instant::now());
            if written > 0 {
                tracing::debug!(written, "Autosaved drafts");
            }
        }
    })
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown requested");
}

/// Start the HTTP server. Pending autosaves are written on shutdown.
pub async fn run_server(
    addr: &str,
    state: AppState,
    flush_every: Duration,
) -> Result<(), WizardError> {
    let flusher = spawn_autosave_flusher(&state, flush_every);
    let router = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| WizardError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("FashionOS HTTP server listening on {}", addr);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| WizardError::Io(format!("Server error: {}", e)));

    flusher.abort();
    let written = state.wizard.write().await.flush_all_autosaves();
    tracing::info!(written, "Flushed pending autosaves");
    served
}

// =============================================================================
// TESTS
// =============================================================================
