use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::{Record, Table};
use crate::errors::AppError;
use crate::models::{DayHours, FaqEntry, Location, PracticeProfile, SessionSummary};
use crate::services::practice;
use crate::state::AppState;

const DEFAULT_CALL_LIMIT: usize = 50;
const MAX_CALL_LIMIT: usize = 500;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// GET /api/admin/status
#[derive(Serialize)]
pub struct StatusResponse {
    environment: String,
    practices: usize,
    recent_calls: usize,
    appointment_requests: usize,
    active_booking_sessions: usize,
    faq_similarity_threshold: f64,
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let store = state.store.as_ref();
    Ok(Json(StatusResponse {
        environment: state.config.environment.clone(),
        practices: store.select(Table::Tenants, &[], None)?.len(),
        recent_calls: store
            .select(Table::Calls, &[], Some(MAX_CALL_LIMIT))?
            .len(),
        appointment_requests: store
            .select(Table::Appointments, &[("status", "requested")], None)?
            .len(),
        active_booking_sessions: state.bookings.active_count(),
        faq_similarity_threshold: state.intents.faq_threshold(),
    }))
}

// GET /api/admin/practices
pub async fn list_practices(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<PracticeProfile>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    Ok(Json(practice::list_practices(state.store.as_ref())?))
}

// POST /api/admin/practices
#[derive(Deserialize)]
pub struct CreatePracticeRequest {
    pub name: String,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub hours: Vec<DayHours>,
    #[serde(default)]
    pub insurances: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub faqs: Vec<FaqEntry>,
    pub location: Option<Location>,
}

pub async fn create_practice(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreatePracticeRequest>,
) -> Result<(StatusCode, Json<PracticeProfile>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("practice name is required".to_string()));
    }

    let profile = PracticeProfile {
        practice_id: String::new(),
        name: name.to_string(),
        phone_number: req
            .phone_number
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
        hours: req.hours,
        insurances: req.insurances,
        services: req.services,
        faqs: req.faqs,
        location: req.location,
    };
    let created = practice::create_practice(state.store.as_ref(), profile)?;
    Ok((StatusCode::CREATED, Json(created)))
}

// GET /api/admin/calls
#[derive(Deserialize)]
pub struct CallsQuery {
    pub limit: Option<usize>,
}

pub async fn list_calls(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<CallsQuery>,
) -> Result<Json<Vec<Record>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_CALL_LIMIT)
        .clamp(1, MAX_CALL_LIMIT);
    Ok(Json(state.store.select(Table::Calls, &[], Some(limit))?))
}

// GET /api/admin/sessions/:id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    state
        .bookings
        .summary(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("booking session {id}")))
}

// POST /api/admin/sessions/:id/end
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if state.bookings.end(&id) {
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound(format!("booking session {id}")))
    }
}
