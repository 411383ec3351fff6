#![cfg(feature = "test-utils")]
//! End-to-end walk through the public API on in-memory stores.

use axum::http::{header, Method, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uxtracking_backend::{
    routes::router,
    test_support::{body_json, get_request, json_request, test_state},
    utils::data_url::BLANK_PNG_BASE64,
};

fn upload(user_id: &str, site: &str, kinds: &[&str], values: &[Value]) -> Value {
    let n = kinds.len();
    json!({
        "metadata": {
            "userID": user_id,
            "dateTime": "2024-05-01T12:00:00.000Z",
            "site": site,
            "image": format!("data:image/png;base64,{}", BLANK_PNG_BASE64),
            "height": 768
        },
        "data": {
            "type": kinds,
            "time": (0..n).map(|i| i as f64 * 0.5).collect::<Vec<_>>(),
            "class": vec![Value::Null; n],
            "id": vec![Value::Null; n],
            "x": vec![json!(100); n],
            "y": vec![json!(200); n],
            "scroll": vec![json!(0); n],
            "value": values
        }
    })
}

#[tokio::test]
async fn capture_then_inspect_then_export() {
    let (state, _) = test_state();
    let app = router(state);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/auth/register",
            json!({"username": "tester", "password": "s3cret", "email": "tester@example.com"}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let user_id = body_json(response).await["data"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/auth/login",
            json!({"username": "tester", "password": "s3cret"}),
            None,
        ))
        .await
        .unwrap();
    let token = body_json(response).await["data"]["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    for body in [
        upload(&user_id, "shop.com", &["click", "keyboard"], &[Value::Null, json!("Enter")]),
        upload(&user_id, "shop.com", &["voice"], &[json!("muito bom")]),
        upload(&user_id, "news.com", &["mousemove"], &[Value::Null]),
    ] {
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/data/receive", body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get_request("/api/data/sessions", Some(&token)))
        .await
        .unwrap();
    let listing = body_json(response).await;
    assert_eq!(listing["data"]["total"], 1);
    let session = &listing["data"]["items"][0];
    assert_eq!(session["sites"], json!(["shop.com", "news.com"]));
    assert_eq!(session["interaction_counts"]["click"], 1);
    let session_id = session["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/view/heatmap",
            json!({"dir": session_id}),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let heatmap = body_json(response).await;
    assert_eq!(heatmap["data"]["trace"].as_array().unwrap().len(), 2);
    assert_eq!(heatmap["data"]["voice"][0]["text"], "muito bom");

    let uri = format!("/api/data/sessions/export?ids={}&kind=trace", session_id);
    let response = app
        .clone()
        .oneshot(get_request(&uri, Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(csv.lines().count(), 4);

    let response = app
        .clone()
        .oneshot(json_request(Method::DELETE, "/api/auth/logout", json!({}), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/data/sessions", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn envelope_status_mirrors_http_status() {
    let (state, _) = test_state();
    let response = router(state)
        .oneshot(json_request(
            Method::POST,
            "/api/data/receive",
            json!({"metadata": {"userID": "00000000-0000-0000-0000-000000000000"}}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["status"], 403);
    assert_eq!(body["message"], "User not found");
    assert!(body["data"].is_null());
}
