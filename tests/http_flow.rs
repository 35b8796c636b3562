use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use httpmock::{Method::POST, MockServer};
use medsum::{
    answering::HuggingFaceQaClient,
    api::create_router,
    processing::{PipelineSettings, ProcessingService},
    session::SessionStore,
    summarization::HuggingFaceSummarizationClient,
};
use serde_json::{Value, json};
use tower::ServiceExt;

const QA_MODEL: &str = "qa-model";
const SUMMARY_MODEL: &str = "summary-model";

fn build_app(server: &MockServer) -> Router {
    let qa = HuggingFaceQaClient::new(&server.base_url(), QA_MODEL, Some("token".into()))
        .expect("qa client");
    let summarizer = HuggingFaceSummarizationClient::new(
        &server.base_url(),
        SUMMARY_MODEL,
        Some("token".into()),
    )
    .expect("summarization client");
    let service = ProcessingService::with_clients(
        Arc::new(qa),
        Arc::new(summarizer),
        PipelineSettings::default(),
    );
    create_router(Arc::new(service), SessionStore::new(), 1024 * 1024)
}

async fn call(app: &Router, method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .expect("request"),
        )
        .await
        .expect("router response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

async fn start_session(app: &Router) -> String {
    let (status, body) = call(app, Method::POST, "/sessions", Body::empty()).await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"].as_str().expect("session id").to_string()
}

#[tokio::test]
async fn long_report_is_summarized_and_cached() {
    let server = MockServer::start_async().await;
    let summary_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/models/{SUMMARY_MODEL}"))
                .header("authorization", "Bearer token")
                .json_body_partial(
                    json!({ "parameters": { "max_length": 130, "do_sample": false } }).to_string(),
                );
            then.status(200).json_body(json!([{ "summary_text": "Stable." }]));
        })
        .await;
    let app = build_app(&server);
    let id = start_session(&app).await;

    let report = "Patient stable today. ".repeat(125);
    assert_eq!(report.chars().count(), 2750);
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/sessions/{id}/document?filename=report.txt"),
        Body::from(report.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "extracted");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/sessions/{id}/summary"),
        Body::empty(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], "Stable. Stable. Stable.");
    assert_eq!(body["chunk_count"], 3);
    summary_mock.assert_hits_async(3).await;

    let (status, body) = call(&app, Method::GET, &format!("/sessions/{id}"), Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document"]["summary"], "Stable. Stable. Stable.");
    assert_eq!(body["document"]["extracted_text"], report.as_str());
}

#[tokio::test]
async fn questions_hit_the_model_each_time_but_extraction_runs_once() {
    let server = MockServer::start_async().await;
    let qa_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/models/{QA_MODEL}"))
                .json_body(json!({
                    "inputs": {
                        "question": "How old is the patient?",
                        "context": "name  age\nJohn   45"
                    }
                }));
            then.status(200)
                .json_body(json!({ "answer": "45", "score": 0.93, "start": 17, "end": 19 }));
        })
        .await;
    let app = build_app(&server);
    let id = start_session(&app).await;
    let upload = format!("/sessions/{id}/document?filename=patients.csv");

    let (_, body) = call(&app, Method::POST, &upload, Body::from("name,age\nJohn,45\n")).await;
    assert_eq!(body["status"], "extracted");
    assert_eq!(body["format"], "tabular");
    let (_, body) = call(&app, Method::POST, &upload, Body::from("name,age\nJohn,45\n")).await;
    assert_eq!(body["status"], "already_extracted");

    for _ in 0..2 {
        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/sessions/{id}/questions"),
            Body::from(json!({ "question": "How old is the patient?" }).to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "45");
        assert_eq!(body["found"], true);
    }
    qa_mock.assert_hits_async(2).await;

    let (_, metrics) = call(&app, Method::GET, "/metrics", Body::empty()).await;
    assert_eq!(metrics["documents_extracted"], 1);
    assert_eq!(metrics["questions_answered"], 2);
}

#[tokio::test]
async fn failed_summary_keeps_previous_summary() {
    let server = MockServer::start_async().await;
    let mut ok_mock = server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/models/{SUMMARY_MODEL}"));
            then.status(200).json_body(json!([{ "summary_text": "First." }]));
        })
        .await;
    let app = build_app(&server);
    let id = start_session(&app).await;
    call(
        &app,
        Method::POST,
        &format!("/sessions/{id}/document?filename=notes.data"),
        Body::from("Blood pressure 120 over 80, heart rate 72."),
    )
    .await;
    let summary_uri = format!("/sessions/{id}/summary");
    let (status, _) = call(&app, Method::POST, &summary_uri, Body::empty()).await;
    assert_eq!(status, StatusCode::OK);

    ok_mock.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/models/{SUMMARY_MODEL}"));
            then.status(503).body("model is loading");
        })
        .await;

    let (status, _) = call(&app, Method::POST, &summary_uri, Body::empty()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, body) = call(&app, Method::GET, &format!("/sessions/{id}"), Body::empty()).await;
    assert_eq!(body["document"]["summary"], "First.");
}

#[tokio::test]
async fn empty_answer_renders_sentinel() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/models/{QA_MODEL}"));
            then.status(200).json_body(json!({}));
        })
        .await;
    let app = build_app(&server);
    let id = start_session(&app).await;
    call(
        &app,
        Method::POST,
        &format!("/sessions/{id}/document?filename=a.txt"),
        Body::from("Unrelated context."),
    )
    .await;

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/sessions/{id}/questions"),
        Body::from(json!({ "question": "What is the diagnosis?" }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "No answer found.");
    assert_eq!(body["found"], false);
}
