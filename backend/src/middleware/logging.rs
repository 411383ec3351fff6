use std::time::Instant;

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header::CONTENT_LENGTH, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use super::request_id::RequestId;

const MAX_BUFFERED_BODY_BYTES: usize = 64 * 1024;
const MAX_LOGGED_BODY_BYTES: usize = 2048;

/// Logs every 4xx response as a warning and every 5xx as an error, with a
/// preview of the envelope that was sent back. The body is buffered and
/// forwarded unchanged.
pub async fn log_error_responses(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let response = next.run(req).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let latency_ms = start.elapsed().as_millis() as u64;
    let (mut parts, body) = response.into_parts();
    let (body, preview) = match to_bytes(body, MAX_BUFFERED_BODY_BYTES).await {
        Ok(bytes) => {
            let preview = preview(&bytes);
            (Body::from(bytes), preview)
        }
        Err(err) => {
            parts.headers.remove(CONTENT_LENGTH);
            (Body::empty(), format!("<unreadable body: {}>", err))
        }
    };

    log_error_event(status, method.as_str(), &path, &request_id, latency_ms, &preview);
    Response::from_parts(parts, body)
}

fn preview(bytes: &Bytes) -> String {
    if bytes.len() > MAX_LOGGED_BODY_BYTES {
        format!(
            "{}... (truncated, {} bytes total)",
            String::from_utf8_lossy(&bytes[..MAX_LOGGED_BODY_BYTES]),
            bytes.len()
        )
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn log_error_event(
    status: StatusCode,
    method: &str,
    path: &str,
    request_id: &str,
    latency_ms: u64,
    body: &str,
) {
    let status = status.as_u16();
    if status >= 500 {
        tracing::error!(status, method, path, request_id, latency_ms, body, "Request failed");
    } else {
        tracing::warn!(status, method, path, request_id, latency_ms, body, "Request rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn preview_truncates_long_bodies() {
        let long = Bytes::from(vec![b'a'; MAX_LOGGED_BODY_BYTES + 10]);
        let text = preview(&long);
        assert!(text.ends_with(&format!("(truncated, {} bytes total)", MAX_LOGGED_BODY_BYTES + 10)));
        assert_eq!(preview(&Bytes::from_static(b"short")), "short");
    }

    #[tokio::test]
    async fn error_bodies_are_forwarded_intact() {
        let app = Router::new()
            .route("/", get(|| async { (StatusCode::BAD_REQUEST, "nope") }))
            .layer(axum::middleware::from_fn(log_error_responses));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"nope");
    }
}
