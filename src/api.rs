//! REST API: axum router, bearer-token extractor and error mapping.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::answers::{AnswerInput, AnswerService};
use crate::auth::{AuthVerifier, bearer_token};
use crate::checkins::CheckInScheduler;
use crate::error::{AnswerError, CheckInError, Error, ReminderError};
use crate::reminders::dedup::DuplicateMatcher;
use crate::reminders::{ReconciliationEngine, Reminder, ReminderGenerator, ReminderService};
use crate::store::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub answers: Arc<AnswerService>,
    pub reminders: Arc<ReminderService>,
    pub reconciler: Arc<ReconciliationEngine>,
    pub checkins: Arc<CheckInScheduler>,
    pub auth: Arc<dyn AuthVerifier>,
}

impl AppState {
    /// Wire every service over one database handle.
    pub fn new(
        db: Arc<dyn Database>,
        generator: Arc<dyn ReminderGenerator>,
        matcher: Arc<dyn DuplicateMatcher>,
        auth: Arc<dyn AuthVerifier>,
    ) -> Self {
        Self {
            answers: Arc::new(AnswerService::new(db.clone())),
            reminders: Arc::new(ReminderService::new(db.clone(), generator.clone())),
            reconciler: Arc::new(ReconciliationEngine::new(db.clone(), generator, matcher)),
            checkins: Arc::new(CheckInScheduler::new(db)),
            auth,
        }
    }
}

/// Build the Axum router with all REST routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/answers", get(list_answers).post(save_answers))
        .route("/api/generate", post(generate))
        .route(
            "/api/reminders",
            get(list_reminders)
                .put(update_reminder)
                .delete(delete_reminder),
        )
        .route("/api/reminders/dashboard", get(dashboard))
        .route("/api/reminders/quick-add", post(quick_add))
        .route(
            "/api/checkins",
            get(list_checkins).put(answer_checkin).delete(dismiss_checkin),
        )
        .route("/api/reset", post(reset))
        .with_state(state)
}

// ── Errors ──────────────────────────────────────────────────────────────

/// Service error rendered as `{"error": "..."}` with a mapped status code.
#[derive(Debug)]
pub struct ApiError(Error);

impl<E: Into<Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::Llm(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Answer(e) => match e {
                AnswerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                AnswerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Reminder(e) => match e {
                ReminderError::NotFound { .. } => StatusCode::NOT_FOUND,
                ReminderError::NoAnswers | ReminderError::InvalidInput(_) => {
                    StatusCode::BAD_REQUEST
                }
                ReminderError::MalformedResponse { .. } | ReminderError::Llm(_) => {
                    StatusCode::BAD_GATEWAY
                }
                ReminderError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::CheckIn(e) => match e {
                CheckInError::NotFound { .. } => StatusCode::NOT_FOUND,
                CheckInError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CheckInError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "Request failed");
        } else {
            debug!(status = status.as_u16(), error = %self.0, "Request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ── Auth ────────────────────────────────────────────────────────────────

/// The authenticated caller's user id.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let user_id = state.auth.verify(token)?;
        Ok(Self(user_id))
    }
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "nudge"
    }))
}

// ── Answers ─────────────────────────────────────────────────────────────

async fn list_answers(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let answers = state.answers.list(&user_id).await?;
    let onboarding_complete = state.answers.onboarding_complete(&user_id).await?;
    Ok(Json(serde_json::json!({
        "answers": answers,
        "onboarding_complete": onboarding_complete,
    })))
}

#[derive(Deserialize)]
struct SaveAnswersRequest {
    answers: Vec<AnswerInput>,
}

async fn save_answers(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<SaveAnswersRequest>,
) -> ApiResult<impl IntoResponse> {
    let saved = state.answers.save(&user_id, &body.answers, Utc::now()).await?;
    Ok(Json(serde_json::json!({ "saved": saved })))
}

// ── Generation ──────────────────────────────────────────────────────────

async fn generate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let report = state.reconciler.regenerate(&user_id, Utc::now()).await?;
    Ok(Json(report))
}

// ── Reminders ───────────────────────────────────────────────────────────

async fn list_reminders(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let reminders = state.reminders.list(&user_id).await?;
    Ok(Json(serde_json::json!({ "reminders": reminders })))
}

async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let dashboard = state
        .reminders
        .dashboard(&user_id, Utc::now().date_naive())
        .await?;
    Ok(Json(dashboard))
}

#[derive(Deserialize)]
struct QuickAddRequest {
    text: String,
}

async fn quick_add(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<QuickAddRequest>,
) -> ApiResult<impl IntoResponse> {
    let reminder = state.reminders.quick_add(&user_id, &body.text, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "reminder": reminder }))))
}

#[derive(Deserialize)]
struct UpdateReminderRequest {
    #[serde(rename = "reminderId", alias = "reminder_id")]
    reminder_id: Uuid,
    #[serde(default)]
    completed: Option<bool>,
    /// Explicit snooze date.
    #[serde(default)]
    snoozed_until: Option<NaiveDate>,
    /// Snooze with the default length.
    #[serde(default)]
    snooze: bool,
}

#[derive(Serialize)]
struct UpdateReminderResponse {
    reminder: Reminder,
    #[serde(skip_serializing_if = "Option::is_none")]
    successor: Option<Reminder>,
}

/// Snooze and/or complete one reminder. Snooze applies first so a request
/// carrying both still ends with the reminder completed.
async fn update_reminder(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<UpdateReminderRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = body.reminder_id;
    if body.completed == Some(false) {
        return Err(ReminderError::InvalidInput(
            "completed reminders cannot be reopened".into(),
        )
        .into());
    }

    let now = Utc::now();
    let wants_snooze = body.snooze || body.snoozed_until.is_some();
    if !wants_snooze && body.completed.is_none() {
        return Err(ReminderError::InvalidInput("nothing to update".into()).into());
    }

    let mut response = None;
    if wants_snooze {
        let reminder = state
            .reminders
            .snooze(&user_id, id, body.snoozed_until, now.date_naive())
            .await?;
        response = Some(UpdateReminderResponse {
            reminder,
            successor: None,
        });
    }

    if body.completed == Some(true) {
        let outcome = state.reminders.complete(&user_id, id, now).await?;
        response = Some(UpdateReminderResponse {
            reminder: outcome.reminder,
            successor: outcome.successor,
        });
    }

    match response {
        Some(response) => Ok(Json(response)),
        None => Err(ReminderError::NotFound { id }.into()),
    }
}

#[derive(Deserialize)]
struct ReminderIdRequest {
    #[serde(rename = "reminderId", alias = "reminder_id")]
    reminder_id: Uuid,
}

async fn delete_reminder(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ReminderIdRequest>,
) -> ApiResult<impl IntoResponse> {
    state.reminders.delete(&user_id, body.reminder_id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// ── Check-ins ───────────────────────────────────────────────────────────

async fn list_checkins(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let checkins = state.checkins.refresh(&user_id, Utc::now()).await?;
    Ok(Json(serde_json::json!({ "checkins": checkins })))
}

#[derive(Deserialize)]
struct AnswerCheckInRequest {
    #[serde(rename = "checkinId", alias = "checkin_id")]
    checkin_id: Uuid,
    value: String,
}

async fn answer_checkin(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<AnswerCheckInRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .checkins
        .answer(&user_id, body.checkin_id, &body.value, Utc::now())
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Deserialize)]
struct CheckInIdRequest {
    #[serde(rename = "checkinId", alias = "checkin_id")]
    checkin_id: Uuid,
}

async fn dismiss_checkin(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CheckInIdRequest>,
) -> ApiResult<impl IntoResponse> {
    state.checkins.dismiss(&user_id, body.checkin_id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// ── Account ─────────────────────────────────────────────────────────────

async fn reset(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<impl IntoResponse> {
    state.answers.reset(&user_id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
