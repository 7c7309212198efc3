//! Vitalink HTTP REST API
//!
//! Axum-based HTTP server for the patient and clinician endpoints plus the
//! WebSocket push channel.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a
//! pure inner function. The inner functions are directly testable without
//! axum dispatch machinery.
//!
//! Endpoints:
//! - GET  /health                                — health check with DB status
//! - GET  /version                               — server version info
//! - POST /api/auth/register                     — create patient account, returns token
//! - POST /api/auth/login                        — verify credentials, returns token
//! - POST /api/patient/pulse-check               — vitals submission pipeline
//! - GET  /api/patient/latest-vitals             — newest reading for the caller
//! - GET  /api/patient/vitals-history            — 30-day trend window
//! - GET  /api/medications                       — caller's medications + adherence
//! - POST /api/medications/log/:id               — append one "taken" event
//! - GET  /api/clinician/constellation-data      — assigned-patient roster
//! - GET  /api/clinician/patient/:id             — patient drill-down
//! - POST /api/clinician/patient/:id/medications — prescribe, notifies the patient
//! - GET  /ws                                    — per-patient notification channel

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use uuid::Uuid;

use vitalink_core::auth::{issue_token, AuthUser};
use vitalink_core::sanitize::RawPulseCheck;
use vitalink_core::scoring::ScoringBackend;
use vitalink_core::VitalinkConfig;

use crate::auth::{require_clinician, Authed};
use crate::subsystems::accounts::{self, AccountError, LoginRequest, RegisterRequest};
use crate::subsystems::clinician;
use crate::subsystems::medications::{self, MedicationError};
use crate::subsystems::notify::{ws_handler, Notification, NotificationHub};
use crate::subsystems::pulse::{self, PulseCheckError};
use crate::subsystems::vitals::{self, PgVitalsStore};

/// Days of readings returned by the trend endpoint.
const HISTORY_WINDOW_DAYS: i32 = 30;

/// Shared state for all HTTP handlers
pub struct HttpState {
    pub pool: PgPool,
    pub config: VitalinkConfig,
    pub scorer: Arc<dyn ScoringBackend>,
    pub hub: Arc<NotificationHub>,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/patient/pulse-check", post(pulse_check_handler))
        .route("/api/patient/latest-vitals", get(latest_vitals_handler))
        .route("/api/patient/vitals-history", get(vitals_history_handler))
        .route("/api/medications", get(medications_handler))
        .route("/api/medications/log/:id", post(log_medication_handler))
        .route(
            "/api/clinician/constellation-data",
            get(constellation_handler),
        )
        .route("/api/clinician/patient/:id", get(clinician_patient_handler))
        .route(
            "/api/clinician/patient/:id/medications",
            post(prescribe_handler),
        )
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<HttpState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Vitalink HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn error_body(msg: impl Into<String>) -> serde_json::Value {
    serde_json::json!({
        "error": msg.into(),
        "status": "error",
    })
}

fn json_or_500(value: Result<serde_json::Value, serde_json::Error>) -> (StatusCode, serde_json::Value) {
    match value {
        Ok(v) => (StatusCode::OK, v),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_body(e.to_string()),
        ),
    }
}

fn account_error_response(e: AccountError) -> (StatusCode, serde_json::Value) {
    match e {
        AccountError::Validation(msg) => (StatusCode::BAD_REQUEST, error_body(msg)),
        AccountError::EmailTaken => (StatusCode::BAD_REQUEST, error_body("User already exists")),
        AccountError::InvalidCredentials => {
            (StatusCode::BAD_REQUEST, error_body("Invalid credentials"))
        }
        AccountError::Database(e) => {
            tracing::error!(error = %e, "Account query failed");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Server error"))
        }
    }
}

fn token_response(
    config: &VitalinkConfig,
    user_id: Uuid,
    role: vitalink_core::auth::Role,
) -> (StatusCode, serde_json::Value) {
    match issue_token(
        &config.auth.secret(),
        user_id,
        role,
        config.auth.token_ttl_hours,
    ) {
        Ok(token) => (StatusCode::OK, serde_json::json!({ "token": token })),
        Err(e) => {
            tracing::error!(error = %e, "Failed to issue token");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Server error"))
        }
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check — queries DB and returns (status_code, json_body).
pub async fn health_inner(pool: &PgPool) -> (StatusCode, serde_json::Value) {
    match vitalink_core::db::health_check(pool).await {
        Ok(pg_ver) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "postgresql": pg_ver,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "vitalink/1",
    })
}

/// Inner register — create a patient account and hand back a token.
pub async fn register_inner(
    pool: &PgPool,
    config: &VitalinkConfig,
    req: RegisterRequest,
) -> (StatusCode, serde_json::Value) {
    match accounts::register(pool, &req).await {
        Ok(user) => token_response(config, user.id, user.role),
        Err(e) => account_error_response(e),
    }
}

/// Inner login — verify credentials and hand back a token.
pub async fn login_inner(
    pool: &PgPool,
    config: &VitalinkConfig,
    req: LoginRequest,
) -> (StatusCode, serde_json::Value) {
    match accounts::login(pool, &req).await {
        Ok(user) => token_response(config, user.id, user.role),
        Err(e) => account_error_response(e),
    }
}

/// Inner pulse check — runs the full submission pipeline.
///
/// Scoring failures come back as 502 (the upstream scorer failed or timed
/// out), storage failures as 500. Nothing is persisted on either path.
pub async fn pulse_check_inner(
    state: &HttpState,
    user: AuthUser,
    raw: RawPulseCheck,
) -> (StatusCode, serde_json::Value) {
    let store = PgVitalsStore::new(state.pool.clone());

    match pulse::submit_pulse_check(user.id, raw, &store, &state.scorer).await {
        Ok(stored) => match serde_json::to_value(&stored) {
            Ok(body) => (StatusCode::CREATED, body),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body(e.to_string()),
            ),
        },
        Err(PulseCheckError::Scoring(e)) => {
            tracing::error!(patient_id = %user.id, error = %e, "Pulse check scoring failed");
            (StatusCode::BAD_GATEWAY, error_body("Scoring service unavailable"))
        }
        Err(PulseCheckError::Storage(e)) => {
            tracing::error!(patient_id = %user.id, error = %e, "Pulse check persistence failed");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Server error"))
        }
    }
}

/// Inner latest vitals — newest reading, or a welcome placeholder for a
/// patient with no readings yet.
pub async fn latest_vitals_inner(pool: &PgPool, user: AuthUser) -> (StatusCode, serde_json::Value) {
    match vitals::latest_reading(pool, user.id).await {
        Ok(Some(reading)) => json_or_500(serde_json::to_value(&reading)),
        Ok(None) => (
            StatusCode::OK,
            serde_json::json!({
                "health_score": 95,
                "insight_text": "Welcome! Submit your first pulse check to generate your Health Aura.",
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load latest vitals");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Server error"))
        }
    }
}

/// Inner vitals history — 30-day trend window, oldest first.
pub async fn vitals_history_inner(
    pool: &PgPool,
    user: AuthUser,
) -> (StatusCode, serde_json::Value) {
    match vitals::history(pool, user.id, HISTORY_WINDOW_DAYS).await {
        Ok(points) => json_or_500(serde_json::to_value(&points)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load vitals history");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Server error"))
        }
    }
}

/// Inner medication list for the calling patient.
pub async fn medications_inner(pool: &PgPool, user: AuthUser) -> (StatusCode, serde_json::Value) {
    match medications::list_for_patient(pool, user.id).await {
        Ok(meds) => json_or_500(serde_json::to_value(&meds)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list medications");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Server error"))
        }
    }
}

/// Inner adherence log append.
pub async fn log_medication_inner(
    pool: &PgPool,
    user: AuthUser,
    medication_id: Uuid,
) -> (StatusCode, serde_json::Value) {
    match medications::log_taken(pool, medication_id, user.id).await {
        Ok(entry) => match serde_json::to_value(&entry) {
            Ok(body) => (StatusCode::CREATED, body),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body(e.to_string()),
            ),
        },
        Err(MedicationError::NotOwned) => (StatusCode::FORBIDDEN, error_body("Forbidden")),
        Err(MedicationError::NotFound) => (StatusCode::NOT_FOUND, error_body("Medication not found")),
        Err(MedicationError::Database(e)) => {
            tracing::error!(error = %e, "Failed to log medication");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Server error"))
        }
    }
}

/// Inner constellation roster — clinician role required.
pub async fn constellation_inner(pool: &PgPool, user: AuthUser) -> (StatusCode, serde_json::Value) {
    if let Err(forbidden) = require_clinician(&user) {
        return forbidden;
    }

    match clinician::constellation(pool, user.id).await {
        Ok(entries) => json_or_500(serde_json::to_value(&entries)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load constellation data");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Server error"))
        }
    }
}

/// Inner patient drill-down — clinician role required.
pub async fn clinician_patient_inner(
    pool: &PgPool,
    user: AuthUser,
    patient_id: Uuid,
) -> (StatusCode, serde_json::Value) {
    if let Err(forbidden) = require_clinician(&user) {
        return forbidden;
    }

    match clinician::patient_detail(pool, patient_id).await {
        Ok(Some(detail)) => json_or_500(serde_json::to_value(&detail)),
        Ok(None) => (StatusCode::NOT_FOUND, error_body("Patient not found")),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load patient detail");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Server error"))
        }
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct PrescribeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
}

/// Inner prescribe — clinician role required. On success the affected
/// patient's channel gets a best-effort notification.
pub async fn prescribe_inner(
    state: &HttpState,
    user: AuthUser,
    patient_id: Uuid,
    req: PrescribeRequest,
) -> (StatusCode, serde_json::Value) {
    if let Err(forbidden) = require_clinician(&user) {
        return forbidden;
    }

    if req.name.trim().is_empty() || req.dosage.trim().is_empty() || req.frequency.trim().is_empty()
    {
        return (
            StatusCode::BAD_REQUEST,
            error_body("Please provide name, dosage, and frequency"),
        );
    }

    match medications::prescribe(
        &state.pool,
        patient_id,
        user.id,
        req.name.trim(),
        req.dosage.trim(),
        req.frequency.trim(),
    )
    .await
    {
        Ok(medication) => {
            let delivered = state.hub.emit(
                patient_id,
                Notification::MedicationAdded {
                    message: format!("Your care team prescribed {}.", medication.name),
                    medication_id: medication.id,
                },
            );
            tracing::info!(
                patient_id = %patient_id,
                medication_id = %medication.id,
                delivered = delivered,
                "Medication prescribed"
            );
            match serde_json::to_value(&medication) {
                Ok(body) => (StatusCode::CREATED, body),
                Err(e) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body(e.to_string()),
                ),
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to prescribe medication");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Server error"))
        }
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.pool).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn register_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    let (status, body) = register_inner(&state.pool, &state.config, req).await;
    (status, Json(body))
}

pub async fn login_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let (status, body) = login_inner(&state.pool, &state.config, req).await;
    (status, Json(body))
}

pub async fn pulse_check_handler(
    State(state): State<Arc<HttpState>>,
    Authed(user): Authed,
    Json(raw): Json<RawPulseCheck>,
) -> impl IntoResponse {
    let (status, body) = pulse_check_inner(&state, user, raw).await;
    (status, Json(body))
}

pub async fn latest_vitals_handler(
    State(state): State<Arc<HttpState>>,
    Authed(user): Authed,
) -> impl IntoResponse {
    let (status, body) = latest_vitals_inner(&state.pool, user).await;
    (status, Json(body))
}

pub async fn vitals_history_handler(
    State(state): State<Arc<HttpState>>,
    Authed(user): Authed,
) -> impl IntoResponse {
    let (status, body) = vitals_history_inner(&state.pool, user).await;
    (status, Json(body))
}

pub async fn medications_handler(
    State(state): State<Arc<HttpState>>,
    Authed(user): Authed,
) -> impl IntoResponse {
    let (status, body) = medications_inner(&state.pool, user).await;
    (status, Json(body))
}

pub async fn log_medication_handler(
    State(state): State<Arc<HttpState>>,
    Authed(user): Authed,
    Path(medication_id): Path<Uuid>,
) -> impl IntoResponse {
    let (status, body) = log_medication_inner(&state.pool, user, medication_id).await;
    (status, Json(body))
}

pub async fn constellation_handler(
    State(state): State<Arc<HttpState>>,
    Authed(user): Authed,
) -> impl IntoResponse {
    let (status, body) = constellation_inner(&state.pool, user).await;
    (status, Json(body))
}

pub async fn clinician_patient_handler(
    State(state): State<Arc<HttpState>>,
    Authed(user): Authed,
    Path(patient_id): Path<Uuid>,
) -> impl IntoResponse {
    let (status, body) = clinician_patient_inner(&state.pool, user, patient_id).await;
    (status, Json(body))
}

pub async fn prescribe_handler(
    State(state): State<Arc<HttpState>>,
    Authed(user): Authed,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<PrescribeRequest>,
) -> impl IntoResponse {
    let (status, body) = prescribe_inner(&state, user, patient_id, req).await;
    (status, Json(body))
}
