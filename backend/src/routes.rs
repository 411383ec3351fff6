use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{docs::ApiDoc, handlers, middleware, state::AppState};

/// Builds the full application router with shared layers applied.
pub fn router(state: AppState) -> Router {
    // Public routes (no token)
    let public_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route(
            "/api/auth/recover_password",
            post(handlers::auth::recover_password),
        )
        .route("/api/auth/change_pass", put(handlers::auth::change_pass))
        .route(
            "/api/data/face_expression",
            post(handlers::data::face_expression),
        );

    // Capture uploads carry screenshots, so they get a larger body limit.
    let capture_routes = Router::new()
        .route("/api/data/receive", post(handlers::data::receive))
        .route("/api/data/receiver", post(handlers::data::receive))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes));

    // Token-protected routes
    let user_routes = Router::new()
        .route("/api/auth/logout", delete(handlers::auth::logout))
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/data/sessions", get(handlers::sessions::list_sessions))
        .route(
            "/api/data/sessions/sites",
            get(handlers::sessions::session_sites),
        )
        .route(
            "/api/data/sessions/export",
            get(handlers::sessions::export_sessions),
        )
        .route("/api/view/heatmap", post(handlers::view::heatmap))
        .route("/api/view/recording", post(handlers::view::recording))
        .route(
            "/api/analysis/sentiment",
            post(handlers::analysis::sentiment),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(capture_routes)
        .merge(user_routes)
        .merge(SwaggerUi::new("/api/doc").url("/api/doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(middleware::request_id))
                .layer(axum_middleware::from_fn(middleware::log_error_responses))
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::DELETE,
                            Method::OPTIONS,
                        ])
                        .allow_headers(Any)
                        .max_age(Duration::from_secs(24 * 60 * 60)),
                ),
        )
        .with_state(state)
}
