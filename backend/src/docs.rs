#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::models::{
    attendance::{AttendanceRecordResponse, AttendanceStatus, ScanPayload, ScanResponse},
    session::{SessionStatus, SessionStatusResponse},
    token::IssuedTokenResponse,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        issue_token_doc,
        session_status_doc,
        session_attendance_doc,
        scan_doc,
        my_attendance_doc
    ),
    components(
        schemas(
            ScanPayload,
            ScanResponse,
            AttendanceStatus,
            AttendanceRecordResponse,
            IssuedTokenResponse,
            SessionStatus,
            SessionStatusResponse
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Sessions", description = "Session status and token issuance"),
        (name = "Attendance", description = "Scan submission and attendance history")
    ),
    security(("BearerAuth" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_string());

        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
    }
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/token",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Fresh attendance token; any predecessor is revoked", body = IssuedTokenResponse),
        (status = 403, description = "Caller is not the owning lecturer"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session is not ongoing")
    ),
    tag = "Sessions"
)]
fn issue_token_doc() {}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/status",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Clock-derived status", body = SessionStatusResponse),
        (status = 404, description = "Session not found")
    ),
    tag = "Sessions"
)]
fn session_status_doc() {}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/attendance",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Roster for the session", body = [AttendanceRecordResponse]),
        (status = 403, description = "Caller is not the owning lecturer"),
        (status = 404, description = "Session not found")
    ),
    tag = "Sessions"
)]
fn session_attendance_doc() {}

#[utoipa::path(
    post,
    path = "/api/sessions/scan",
    request_body = ScanPayload,
    responses(
        (status = 200, description = "Scan accepted or already recorded", body = ScanResponse),
        (status = 400, description = "Invalid or expired token"),
        (status = 403, description = "Student is not enrolled"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session is not ongoing")
    ),
    tag = "Attendance"
)]
fn scan_doc() {}

#[utoipa::path(
    get,
    path = "/api/attendance/me",
    responses(
        (status = 200, description = "Caller's attendance history", body = [AttendanceRecordResponse])
    ),
    tag = "Attendance"
)]
fn my_attendance_doc() {}
