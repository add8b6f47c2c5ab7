use axum::{
    extract::{Extension, Path, State},
    Json,
};
use chrono::Utc;

use crate::{
    error::AppError,
    models::{
        attendance::AttendanceRecordResponse,
        session::SessionStatusResponse,
        token::IssuedTokenResponse,
        user::User,
    },
    repositories::{attendance::AttendanceRepositoryTrait, session::SessionRepositoryTrait},
    services::schedule,
    state::AppState,
    types::SessionId,
};

/// `POST /api/sessions/{id}/token`. Mints the session's single valid
/// attendance token, revoking any predecessor. Owning lecturer only.
pub async fn issue_token(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<IssuedTokenResponse>, AppError> {
    let token = state
        .token_issuer
        .issue(session_id, user.id, Utc::now())
        .await?;

    Ok(Json(IssuedTokenResponse {
        secret: token.secret,
        expires_at: token.expires_at,
    }))
}

/// `GET /api/sessions/{id}/status`. Display only; issuance and scan
/// re-derive the status from the clock themselves.
pub async fn get_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<SessionStatusResponse>, AppError> {
    let session = state
        .session_repo
        .find_by_id(session_id)
        .await?
        .ok_or(AppError::SessionNotFound)?;

    let status = schedule::session_status(&session, Utc::now(), &state.config.time_zone);

    Ok(Json(SessionStatusResponse {
        session_id: session.id,
        status,
        schedule_date: session.schedule_date,
        start_time: session.start_time,
        end_time: session.end_time,
        venue_name: session.venue_name,
    }))
}

/// `GET /api/sessions/{id}/attendance`. The roster for one session, visible
/// to the lecturer who owns it.
pub async fn get_session_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<Vec<AttendanceRecordResponse>>, AppError> {
    let session = state
        .session_repo
        .find_by_id(session_id)
        .await?
        .ok_or(AppError::SessionNotFound)?;

    if !session.is_owned_by(user.id) {
        return Err(AppError::Forbidden(
            "Only the owning lecturer can view this roster".to_string(),
        ));
    }

    let records = state.attendance_repo.list_for_session(session_id).await?;

    Ok(Json(
        records.into_iter().map(AttendanceRecordResponse::from).collect(),
    ))
}
