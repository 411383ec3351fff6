use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    Form, Json,
};
use serde_json::Value;

use crate::{
    error::AppError,
    models::{
        analysis::{EmotionScores, FaceExpressionForm},
        envelope::Envelope,
        ingest::{ReceivePayload, ReceiveReceipt},
    },
    services::inference::classify_emotion,
    state::AppState,
    utils::data_url::decode_image,
};

/// `null`, `{}` and `[]` carry no batch.
fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Upload endpoint of the capture tool. Identifies the owner through
/// `metadata.userID` rather than a token.
pub async fn receive(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Envelope<ReceiveReceipt>, AppError> {
    let no_data = || AppError::BadRequest("No JSON data found".to_string());
    let Json(raw) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Unreadable capture batch");
        no_data()
    })?;
    if is_blank(&raw) {
        return Err(no_data());
    }
    let payload: ReceivePayload = serde_json::from_value(raw).map_err(|err| {
        tracing::debug!(error = %err, "Unreadable capture batch");
        no_data()
    })?;
    let receipt = state.ingestor().receive(payload).await?;
    Ok(Envelope::ok("Received", receipt))
}

pub async fn face_expression(
    State(state): State<AppState>,
    form: Result<Form<FaceExpressionForm>, FormRejection>,
) -> Result<Envelope<EmotionScores>, AppError> {
    let Form(form) = form?;
    let image = decode_image(&form.data)
        .map_err(|err| AppError::BadRequest(format!("Invalid image: {}", err)))?;
    let scores = classify_emotion(state.emotions.as_ref(), &image).await?;
    Ok(Envelope::ok("Success", scores))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::routes::router;
    use crate::services::inference::{InferenceError, MockEmotionClassifier};
    use crate::test_support::{body_json, get_request, json_request, seed_user, test_state, token_for};
    use crate::utils::data_url::BLANK_PNG_BASE64;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn batch(user_id: &str, site: &str, kinds: &[&str]) -> Value {
        let n = kinds.len();
        json!({
            "metadata": {
                "userID": user_id,
                "dateTime": "2024-05-01T12:00:00.000Z",
                "site": site,
                "image": format!("data:image/png;base64,{}", BLANK_PNG_BASE64),
                "height": 800
            },
            "data": {
                "type": kinds,
                "time": (0..n).map(|i| i as f64).collect::<Vec<_>>(),
                "class": vec![Value::Null; n],
                "id": vec![Value::Null; n],
                "x": vec![json!(5); n],
                "y": vec![json!(7); n],
                "scroll": vec![json!(0); n],
                "value": vec![Value::Null; n]
            }
        })
    }

    fn face_form(data: &str) -> Request<Body> {
        let encoded = data
            .replace('%', "%25")
            .replace('+', "%2B")
            .replace('/', "%2F")
            .replace('=', "%3D");
        Request::builder()
            .method(Method::POST)
            .uri("/api/data/face_expression")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("data={}", encoded)))
            .unwrap()
    }

    #[tokio::test]
    async fn receive_appends_batches_to_one_session() {
        let (state, _) = test_state();
        let user = seed_user(&state, "alice", "pw").await;
        let token = token_for(&state, &user).await;
        let app = router(state);
        let id = user.id.to_string();

        for (path, site) in [
            ("/api/data/receive", "a.com"),
            ("/api/data/receiver", "b.com"),
            ("/api/data/receive", "a.com"),
        ] {
            let response = app
                .clone()
                .oneshot(json_request(Method::POST, path, batch(&id, site, &["click", "wheel"]), None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_json(response).await["message"], "Received");
        }

        let response = app
            .oneshot(get_request("/api/data/sessions", Some(&token)))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["total"], 1);
        let summary = &json["data"]["items"][0];
        assert_eq!(summary["sites"], json!(["a.com", "b.com"]));
        assert_eq!(summary["total_interactions"], 6);
    }

    #[tokio::test]
    async fn receive_rejects_bad_uploads() {
        let (state, _) = test_state();
        let user = seed_user(&state, "bob", "pw").await;
        let app = router(state);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/data/receive")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("nonsense"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "No JSON data found");

        let mut no_user = batch("", "a.com", &["click"]);
        no_user["metadata"].as_object_mut().unwrap().remove("userID");
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/data/receive", no_user, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["message"], "No user ID provided");

        let unknown_kind = batch(&user.id.to_string(), "a.com", &["teleport"]);
        let response = app
            .oneshot(json_request(Method::POST, "/api/data/receive", unknown_kind, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn receive_treats_empty_bodies_as_missing_data() {
        let (state, _) = test_state();
        let app = router(state);

        for body in [json!({}), json!([]), Value::Null] {
            let response = app
                .clone()
                .oneshot(json_request(Method::POST, "/api/data/receive", body, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = body_json(response).await;
            assert_eq!(body["message"], "No JSON data found");
            assert_eq!(body["status"], 400);
        }
    }

    #[tokio::test]
    async fn face_expression_returns_labelled_probabilities() {
        let (mut state, _) = test_state();
        let mut classifier = MockEmotionClassifier::new();
        classifier
            .expect_logits()
            .withf(|image| image.content_type == "image/png")
            .times(1)
            .returning(|_| Ok(vec![0.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0]));
        state.emotions = Arc::new(classifier);

        let data = format!("data:image/png;base64,{}", BLANK_PNG_BASE64);
        let response = router(state).oneshot(face_form(&data)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Success");
        let scores = json["data"].as_object().unwrap();
        assert_eq!(scores.len(), 8);
        let total: f64 = scores.values().map(|v| v.as_f64().unwrap()).sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(scores["happy"].as_f64().unwrap() > 0.8);
    }

    #[tokio::test]
    async fn face_expression_failures_hide_details() {
        let (mut state, _) = test_state();
        let mut classifier = MockEmotionClassifier::new();
        classifier
            .expect_logits()
            .returning(|_| Err(InferenceError::InvalidResponse("model exploded".into())));
        state.emotions = Arc::new(classifier);
        let app = router(state);

        let response = app.clone().oneshot(face_form("@@not-base64@@")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let data = format!("data:image/png;base64,{}", BLANK_PNG_BASE64);
        let response = app.oneshot(face_form(&data)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(!json.to_string().contains("exploded"));
    }

    #[tokio::test]
    async fn face_expression_without_backend_is_unavailable() {
        let (state, _) = test_state();
        let data = format!("data:image/png;base64,{}", BLANK_PNG_BASE64);
        let response = router(state).oneshot(face_form(&data)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
