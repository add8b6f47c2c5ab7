use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attendance::{AttendanceRecordResponse, ScanPayload, ScanResponse},
        user::User,
    },
    repositories::attendance::AttendanceRepositoryTrait,
    services::scan::ScanOutcome,
    state::AppState,
};

/// `POST /api/sessions/scan`. The student-facing submission path. A repeat
/// scan succeeds with `already_recorded = true`; the first record stands.
pub async fn submit_scan(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<ScanPayload>,
) -> Result<Json<ScanResponse>, AppError> {
    payload.validate()?;

    let outcome = state
        .scan_service
        .submit_scan(user.id, &payload, Utc::now())
        .await?;

    let already_recorded = matches!(outcome, ScanOutcome::AlreadyRecorded(_));
    let record = outcome.record();

    Ok(Json(ScanResponse {
        status: record.status,
        location_valid: record.location_valid,
        already_recorded,
    }))
}

/// `GET /api/attendance/me`. The student's own history, newest first.
pub async fn get_my_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<AttendanceRecordResponse>>, AppError> {
    let records = state.attendance_repo.list_for_student(user.id).await?;

    Ok(Json(
        records.into_iter().map(AttendanceRecordResponse::from).collect(),
    ))
}
