mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{decision, harness, harness_with, Harness, ALICE, BOB};
use sb_domain::config::Config;
use sb_gateway::api;
use sb_providers::scripted::{Script, ScriptedProvider};

fn app(h: &Harness) -> Router {
    api::router(h.state.clone()).with_state(h.state.clone())
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create_conversation(h: &Harness, token: &str) -> String {
    let (status, body) = call(
        app(h),
        request("POST", "/v1/conversations", Some(token), Some(json!({"title": "t"}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let h = harness(ScriptedProvider::new("scripted"));
    let (status, body) = call(app(&h), request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer_token() {
    let h = harness(ScriptedProvider::new("scripted"));
    let (status, _) = call(app(&h), request("GET", "/v1/agents", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(app(&h), request("GET", "/v1/agents", Some("wrong"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn agents_lists_every_responder_sorted() {
    let h = harness(ScriptedProvider::new("scripted"));
    let (status, body) = call(app(&h), request("GET", "/v1/agents", Some(ALICE), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    let names: Vec<_> = body["agents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["DocumentAnalysis", "FinancialAnalysis", "General"]);
    assert!(body["agents"][0]["category"].is_string());
}

#[tokio::test]
async fn chat_round_trip_returns_reply_and_persists_history() {
    let h = harness(
        ScriptedProvider::new("scripted")
            .with_reply(Script::Text(decision("FinancialAnalysis")))
            .with_stream(Script::Fragments(vec!["Bitcoin ".into(), "is up".into()])),
    );
    let conv = create_conversation(&h, ALICE).await;

    let (status, reply) = call(
        app(&h),
        request(
            "POST",
            &format!("/v1/chat/{conv}"),
            Some(ALICE),
            Some(json!({"content": "How is Bitcoin doing?", "attachments": []})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["content"], "Bitcoin is up");
    assert_eq!(reply["done"], true);

    let (status, history) = call(
        app(&h),
        request("GET", &format!("/v1/conversations/{conv}/messages"), Some(ALICE), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["count"], 2);
    assert_eq!(history["messages"][0]["role"], "user");
    assert_eq!(history["messages"][1]["role"], "assistant");
    assert_eq!(history["messages"][1]["id"], reply["message_id"]);
}

#[tokio::test]
async fn foreign_and_missing_conversations_look_the_same() {
    let h = harness(ScriptedProvider::new("scripted"));
    let conv = create_conversation(&h, ALICE).await;
    let body = Some(json!({"content": "hi"}));

    let foreign = call(
        app(&h),
        request("POST", &format!("/v1/chat/{conv}"), Some(BOB), body.clone()),
    )
    .await;
    let missing = call(
        app(&h),
        request("POST", "/v1/chat/no-such-conversation", Some(BOB), body),
    )
    .await;
    assert_eq!(foreign.0, StatusCode::NOT_FOUND);
    assert_eq!(foreign, missing);
    assert_eq!(foreign.1["error"], api::ACCESS_DENIED);

    let foreign_history = call(
        app(&h),
        request("GET", &format!("/v1/conversations/{conv}/messages"), Some(BOB), None),
    )
    .await;
    assert_eq!(foreign_history, missing);
}

#[tokio::test]
async fn upstream_failure_maps_to_bad_gateway() {
    let h = harness(ScriptedProvider::new("scripted").with_stream(Script::FailAfter(
        vec!["partial".into()],
        "backend died".into(),
    )));
    let conv = create_conversation(&h, ALICE).await;

    let (status, body) = call(
        app(&h),
        request("POST", &format!("/v1/chat/{conv}"), Some(ALICE), Some(json!({"content": "q"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("backend died"));

    // Only the user message was recorded.
    let stored = h.state.conversations.get_for_owner(&conv, "alice").await.unwrap();
    assert_eq!(stored.messages.len(), 1);
}

#[tokio::test]
async fn delete_is_owner_scoped() {
    let h = harness(ScriptedProvider::new("scripted"));
    let conv = create_conversation(&h, ALICE).await;
    let uri = format!("/v1/conversations/{conv}");

    let (status, _) = call(app(&h), request("DELETE", &uri, Some(BOB), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(app(&h), request("DELETE", &uri, Some(ALICE), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(app(&h), request("DELETE", &uri, Some(ALICE), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploads_are_stored_and_size_limited() {
    let mut config = Config::default();
    config.attachments.max_upload_bytes = 16;
    let h = harness_with(ScriptedProvider::new("scripted"), config);

    let upload = |bytes: &'static [u8]| {
        Request::builder()
            .method("POST")
            .uri("/v1/uploads?filename=notes.txt")
            .header("authorization", format!("Bearer {ALICE}"))
            .body(Body::from(bytes))
            .unwrap()
    };

    let (status, stored) = call(app(&h), upload(b"small file")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stored["filename"], "notes.txt");
    assert_eq!(stored["size"], 10);
    assert!(stored["file_id"].as_str().unwrap().ends_with(".txt"));

    let (status, _) = call(app(&h), upload(b"this body is well over sixteen bytes")).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
