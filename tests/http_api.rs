mod support;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use policy_backend::server::router::router;

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_index_and_provider() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = support::app_state(dir.path(), false).await;

    let (status, body) = send(router(state), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["passages"], 2);
    assert_eq!(body["llm_provider"], "stub");
    assert_eq!(body["llm_reachable"], true);
    assert_eq!(body["evaluation_enabled"], true);
}

#[tokio::test]
async fn health_reports_unreachable_provider_as_degraded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = support::app_state(dir.path(), true).await;

    let (status, body) = send(router(state), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["llm_reachable"], false);
}

#[tokio::test]
async fn ask_returns_answer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = support::app_state(dir.path(), false).await;

    let (status, body) = send(
        router(state),
        Method::POST,
        "/ask",
        Some(json!({ "question": "What is the AI policy for primary schools in France?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let answer = body["answer"].as_str().expect("answer string");
    assert!(answer.contains("France"));
}

#[tokio::test]
async fn ask_accepts_history_with_unknown_roles() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = support::app_state(dir.path(), false).await;

    let (status, _) = send(
        router(state),
        Method::POST,
        "/ask",
        Some(json!({
            "question": "What about secondary schools?",
            "history": [
                { "role": "user", "content": "Tell me about Japan" },
                { "role": "system", "content": "ignored" },
                { "role": "assistant" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ask_records_question_as_sent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = support::app_state(dir.path(), false).await;

    let question = "  Can pupils in France use AI?\n";
    let (status, _) = send(
        router(state.clone()),
        Method::POST,
        "/ask",
        Some(json!({ "question": question })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    state.shutdown().await;
    let raw = state.metrics.raw().await.expect("raw");
    assert_eq!(raw["rag"][0].query, question);
}

#[tokio::test]
async fn ask_rejects_blank_question() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = support::app_state(dir.path(), false).await;

    let (status, body) = send(router(state), Method::POST, "/ask", Some(json!({ "question": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.to_string().contains("question"));
}

#[tokio::test]
async fn ask_maps_model_failure_to_bad_gateway() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = support::app_state(dir.path(), true).await;

    let (status, _) = send(
        router(state.clone()),
        Method::POST,
        "/ask",
        Some(json!({ "question": "Is AI allowed?" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    state.shutdown().await;
    let raw = state.metrics.raw().await.expect("raw");
    assert!(raw.values().all(Vec::is_empty));
}

#[tokio::test]
async fn metrics_summary_tracks_answers_and_clears() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = support::app_state(dir.path(), false).await;
    let app = router(state.clone());

    let (status, body) = send(app.clone(), Method::GET, "/metrics/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("message").is_some(), "expected no-data summary, got {}", body);

    let (status, _) = send(
        app.clone(),
        Method::POST,
        "/ask",
        Some(json!({ "question": "Can Japanese students use generative AI?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    state.shutdown().await;

    let (status, body) = send(app.clone(), Method::GET, "/metrics/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rag"]["count"], 1);

    let (_, raw) = send(app.clone(), Method::GET, "/metrics/raw", None).await;
    assert_eq!(raw["rag"][0]["query"], "Can Japanese students use generative AI?");

    let (status, body) = send(app.clone(), Method::DELETE, "/metrics/clear", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Metrics cleared successfully");

    let (_, raw) = send(app, Method::GET, "/metrics/raw", None).await;
    assert!(raw.as_object().map_or(true, |m| m.values().all(|v| v.as_array().map_or(true, Vec::is_empty))));
}

#[tokio::test]
async fn generate_policy_returns_draft_with_metadata() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = support::app_state(dir.path(), false).await;

    let (status, body) = send(
        router(state),
        Method::POST,
        "/generate-policy",
        Some(json!({
            "school": "Lycee Victor Hugo",
            "country": "France",
            "level": "primary",
            "requirements": "Ban AI during exams"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["generated_policy"].as_str().is_some_and(|p| !p.is_empty()));
    assert_eq!(body["metadata"]["school"], "Lycee Victor Hugo");
    assert_eq!(body["metadata"]["requirements"], "Ban AI during exams");
    assert_eq!(body["metadata"]["retrieved_sources"][0]["country"], "France");
}

#[tokio::test]
async fn generate_policy_requires_school_details() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = support::app_state(dir.path(), false).await;

    let (status, _) = send(
        router(state),
        Method::POST,
        "/generate-policy",
        Some(json!({ "school": "", "country": "France", "level": "primary" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
