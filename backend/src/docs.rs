#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::models::{
    analysis::{
        FaceExpressionForm, RadarEntry, SentimentLabel, SentimentPoint, SentimentReport,
    },
    ingest::{ReceiveMetadata, ReceivePayload, ReceiveReceipt},
    telemetry::{IngestOutcome, InteractionColumns, InteractionKind, SessionSummary},
    user::{
        ChangePasswordRequest, LoginRequest, LoginResponse, RecoverPasswordRequest,
        RegisterRequest, UserResponse,
    },
    view::{
        ExportKind, ExportQuery, HeatmapPayload, RecordingPayload, RecordingPoint,
        SessionSelector, SitesQuery, TracePoint, VoicePoint,
    },
    PaginationQuery,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        register_doc,
        login_doc,
        recover_password_doc,
        change_pass_doc,
        logout_doc,
        me_doc,
        receive_doc,
        face_expression_doc,
        list_sessions_doc,
        session_sites_doc,
        export_sessions_doc,
        heatmap_doc,
        recording_doc,
        sentiment_doc
    ),
    components(
        schemas(
            // auth
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            RecoverPasswordRequest,
            ChangePasswordRequest,
            UserResponse,
            // capture
            ReceivePayload,
            ReceiveMetadata,
            InteractionColumns,
            InteractionKind,
            ReceiveReceipt,
            IngestOutcome,
            FaceExpressionForm,
            // sessions
            SessionSummary,
            ExportKind,
            // views & analysis
            SessionSelector,
            HeatmapPayload,
            TracePoint,
            VoicePoint,
            RecordingPayload,
            RecordingPoint,
            SentimentReport,
            SentimentPoint,
            SentimentLabel,
            RadarEntry
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Auth", description = "Accounts, login and passwords"),
        (name = "Data", description = "Capture uploads, inference and exports"),
        (name = "View", description = "Heatmap and recording payloads"),
        (name = "Analysis", description = "Voice transcript sentiment")
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
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created; data is the new user id", body = String),
        (status = 400, description = "Invalid username or email"),
        (status = 401, description = "Email or username already taken")
    ),
    tag = "Auth",
    security(())
)]
fn register_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; also sets the access_token cookie", body = LoginResponse),
        (status = 401, description = "Incorrect password"),
        (status = 404, description = "Unknown user")
    ),
    tag = "Auth",
    security(())
)]
fn login_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/recover_password",
    request_body = RecoverPasswordRequest,
    responses(
        (status = 200, description = "New password mailed"),
        (status = 404, description = "No account with that username and email")
    ),
    tag = "Auth",
    security(())
)]
fn recover_password_doc() {}

#[utoipa::path(
    put,
    path = "/api/auth/change_pass",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Confirmation does not match"),
        (status = 401, description = "Current password is incorrect"),
        (status = 404, description = "Unknown user")
    ),
    tag = "Auth",
    security(())
)]
fn change_pass_doc() {}

#[utoipa::path(
    delete,
    path = "/api/auth/logout",
    responses((status = 200, description = "Token revoked and cookie cleared")),
    tag = "Auth"
)]
fn logout_doc() {}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses((status = 200, description = "Current user", body = UserResponse)),
    tag = "Auth"
)]
fn me_doc() {}

#[utoipa::path(
    post,
    path = "/api/data/receive",
    request_body = ReceivePayload,
    responses(
        (status = 200, description = "Batch stored", body = ReceiveReceipt),
        (status = 400, description = "Malformed batch or image"),
        (status = 403, description = "Missing or unknown userID")
    ),
    tag = "Data",
    security(())
)]
fn receive_doc() {}

#[utoipa::path(
    post,
    path = "/api/data/face_expression",
    request_body(content = FaceExpressionForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Emotion label to probability", body = serde_json::Value),
        (status = 400, description = "Invalid image"),
        (status = 503, description = "Inference backend not configured")
    ),
    tag = "Data",
    security(())
)]
fn face_expression_doc() {}

#[utoipa::path(
    get,
    path = "/api/data/sessions",
    params(PaginationQuery),
    responses((status = 200, description = "Caller's sessions, newest first", body = [SessionSummary])),
    tag = "Data"
)]
fn list_sessions_doc() {}

#[utoipa::path(
    get,
    path = "/api/data/sessions/sites",
    params(SitesQuery),
    responses((status = 200, description = "Sites of the selected sessions", body = [String])),
    tag = "Data"
)]
fn session_sites_doc() {}

#[utoipa::path(
    get,
    path = "/api/data/sessions/export",
    params(ExportQuery),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 404, description = "None of the sessions belong to the caller")
    ),
    tag = "Data"
)]
fn export_sessions_doc() {}

#[utoipa::path(
    post,
    path = "/api/view/heatmap",
    request_body = SessionSelector,
    responses(
        (status = 200, body = HeatmapPayload),
        (status = 400, description = "dir missing"),
        (status = 404, description = "Session not found")
    ),
    tag = "View"
)]
fn heatmap_doc() {}

#[utoipa::path(
    post,
    path = "/api/view/recording",
    request_body = SessionSelector,
    responses(
        (status = 200, body = RecordingPayload),
        (status = 400, description = "dir missing"),
        (status = 404, description = "Session not found")
    ),
    tag = "View"
)]
fn recording_doc() {}

#[utoipa::path(
    post,
    path = "/api/analysis/sentiment",
    request_body = SessionSelector,
    responses(
        (status = 200, body = SentimentReport),
        (status = 400, description = "Session has no voice transcripts"),
        (status = 404, description = "Session not found")
    ),
    tag = "Analysis"
)]
fn sentiment_doc() {}
