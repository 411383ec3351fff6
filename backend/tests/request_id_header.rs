use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use tower::ServiceExt;
use uuid::Uuid;
use uxtracking_backend::middleware::{log_error_responses, request_id, RequestId};

fn app() -> Router {
    Router::new()
        .route("/test", get(|| async { "ok" }))
        .route(
            "/echo",
            get(|axum::Extension(id): axum::Extension<RequestId>| async move { id.0 }),
        )
        .route(
            "/fail",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .layer(axum::middleware::from_fn(log_error_responses))
        .layer(axum::middleware::from_fn(request_id))
}

#[tokio::test]
async fn request_id_is_generated_when_absent() {
    let response = app()
        .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let id = response.headers()["x-request-id"].to_str().unwrap();
    assert!(Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn client_request_id_reaches_handlers() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/echo")
                .header("x-request-id", "client-req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "client-req-123");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"client-req-123");
}

#[tokio::test]
async fn failed_requests_keep_their_body_and_id() {
    let response = app()
        .oneshot(Request::builder().uri("/fail").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().contains_key("x-request-id"));
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"boom");
}
