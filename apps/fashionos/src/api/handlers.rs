//! # API Endpoint Handlers
//!
//! Every handler takes the wizard lock for the shortest possible span.
//! The casting call never holds it across the gateway request.

use super::{
    AppState,
    auth::auth_context,
    types::{
        AdvanceResponse, BrandLookupQuery, BrandLookupResponse, CastingResponse, ClearedResponse,
        ErrorResponse, EventSummary, EventsResponse, HealthResponse, MetricsResponse,
        PaymentRequest, PublishResponse, ResumeResponse, SessionResponse, StageResponse,
        StartResponse,
    },
};
use crate::casting::{CastingRequest, GatewayError, track_casting};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use fashionos_core::{EventRepository, SessionId, StageForm, WizardError};

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<(StatusCode, Json<T>), ApiError>;

/// HTTP status and body for a wizard error.
pub fn error_response(err: WizardError) -> ApiError {
    let status = match &err {
        WizardError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WizardError::StageMismatch { .. }
        | WizardError::Incomplete(_)
        | WizardError::AlreadyPublished(_) => StatusCode::CONFLICT,
        WizardError::Unauthenticated => StatusCode::UNAUTHORIZED,
        WizardError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        WizardError::Persistence(_) | WizardError::ExternalService(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        WizardError::Serialization(_) => StatusCode::BAD_REQUEST,
        WizardError::Recovery(_) | WizardError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    }
    let body = match err {
        WizardError::Validation(fields) => {
            ErrorResponse::with_fields("Validation failed", fields)
        }
        other => ErrorResponse::new(other.to_string()),
    };
    (status, Json(body))
}

fn ok<T>(body: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(body)))
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// SESSION HANDLERS
// =============================================================================

pub async fn start_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<StartResponse> {
    let auth = auth_context(&headers);
    let id = state.wizard.write().await.start(&auth);
    Ok((StatusCode::CREATED, Json(StartResponse::success(id))))
}

pub async fn session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SessionResponse> {
    let wizard = state.wizard.read().await;
    let session = wizard
        .session(&SessionId::new(id))
        .map_err(error_response)?;
    ok(SessionResponse::from_session(session))
}

/// Store a raw form without validating it.
pub async fn draft_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<StageForm>,
) -> ApiResult<SessionResponse> {
    let id = SessionId::new(id);
    let mut wizard = state.wizard.write().await;
    wizard.edit(&id, form).map_err(error_response)?;
    let session = wizard.session(&id).map_err(error_response)?;
    ok(SessionResponse::from_session(session))
}

pub async fn advance_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(form): Json<StageForm>,
) -> ApiResult<AdvanceResponse> {
    let auth = auth_context(&headers);
    let outcome = state
        .wizard
        .write()
        .await
        .advance(&SessionId::new(id), form, &auth)
        .map_err(error_response)?;
    ok(outcome.into())
}

pub async fn retreat_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StageResponse> {
    let id = SessionId::new(id);
    let mut wizard = state.wizard.write().await;
    let moved = wizard.retreat(&id).map_err(error_response)?.is_some();
    let stage = wizard.session(&id).map_err(error_response)?.current();
    ok(StageResponse {
        success: true,
        stage,
        moved,
    })
}

pub async fn resume_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<ResumeResponse> {
    let auth = auth_context(&headers);
    let outcome = state
        .wizard
        .write()
        .await
        .resume(&SessionId::new(id), &auth)
        .map_err(error_response)?;
    ok(outcome.into())
}

pub async fn payment_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PaymentRequest>,
) -> ApiResult<SessionResponse> {
    let id = SessionId::new(id);
    let mut wizard = state.wizard.write().await;
    wizard
        .set_payment_configured(&id, request.configured)
        .map_err(error_response)?;
    let session = wizard.session(&id).map_err(error_response)?;
    ok(SessionResponse::from_session(session))
}

pub async fn publish_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<PublishResponse> {
    let auth = auth_context(&headers);
    let event = state
        .wizard
        .write()
        .await
        .publish(&SessionId::new(id), &auth)
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(PublishResponse::from(&event))))
}

pub async fn abandon_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StageResponse> {
    let stage = state
        .wizard
        .write()
        .await
        .abandon(&SessionId::new(id))
        .map_err(error_response)?;
    ok(StageResponse {
        success: true,
        stage,
        moved: false,
    })
}

// =============================================================================
// EVENTS AND BRANDS
// =============================================================================

pub async fn events_handler(State(state): State<AppState>) -> ApiResult<Vec<EventSummary>> {
    let wizard = state.wizard.read().await;
    let events = wizard
        .repository()
        .list_published_events()
        .map_err(error_response)?;
    ok(events.iter().map(EventSummary::from).collect())
}

/// Lookup failures read as "not found"; they never block the organizer.
pub async fn brand_lookup_handler(
    State(state): State<AppState>,
    Query(query): Query<BrandLookupQuery>,
) -> impl IntoResponse {
    let brand = state.wizard.write().await.lookup_brand(&query.email);
    Json(BrandLookupResponse {
        found: brand.is_some(),
        brand,
    })
}

// =============================================================================
// MONITOR HANDLERS
// =============================================================================

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let wizard = state.wizard.read().await;
    Json(MetricsResponse {
        metrics: wizard.monitor().metrics(),
        pending_autosaves: wizard.pending_autosaves(),
        active_sessions: wizard.session_count(),
    })
}

pub async fn monitor_events_handler(State(state): State<AppState>) -> impl IntoResponse {
    let events = state.wizard.read().await.monitor().export_events();
    Json(EventsResponse { events })
}

pub async fn clear_monitor_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut wizard = state.wizard.write().await;
    let cleared = wizard.monitor().len();
    wizard.monitor_mut().clear_events();
    Json(ClearedResponse {
        success: true,
        cleared,
    })
}

// =============================================================================
// CASTING HANDLER
// =============================================================================

fn gateway_status(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        GatewayError::CreditsExhausted => StatusCode::PAYMENT_REQUIRED,
        GatewayError::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Http { .. }
        | GatewayError::Transport(_)
        | GatewayError::Timeout
        | GatewayError::Parse(_) => StatusCode::BAD_GATEWAY,
    }
}

pub async fn casting_handler(
    State(state): State<AppState>,
    Json(request): Json<CastingRequest>,
) -> impl IntoResponse {
    let result = state.gateway.recommend(&request).await;
    {
        let mut wizard = state.wizard.write().await;
        track_casting(wizard.monitor_mut(), &request, &result, chrono::Utc::now());
    }

    match result {
        Ok(recommendations) => (StatusCode::OK, Json(CastingResponse::success(recommendations))),
        Err(e) => {
            let status = gateway_status(&e);
            if status == StatusCode::BAD_GATEWAY {
                tracing::error!(error = %e, "Casting agent failed");
            }
            (status, Json(CastingResponse::error(e.user_message())))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
