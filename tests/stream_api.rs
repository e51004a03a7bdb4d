// tests/stream_api.rs
// Streaming chat endpoint, end to end against a mock upstream.


use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use test_helpers::{test_app, MockBackend};

#[derive(Debug, PartialEq)]
enum SseRecord {
    Event(String),
    Data(Value),
}

/// Flatten an SSE body into its event/data records, ignoring keep-alive
/// comments.
fn parse_sse(body: &str) -> Vec<SseRecord> {
    let mut records = Vec::new();
    for line in body.lines() {
        if let Some(name) = line.strip_prefix("event: ") {
            records.push(SseRecord::Event(name.trim().to_string()));
        } else if let Some(data) = line.strip_prefix("data: ") {
            records.push(SseRecord::Data(
                serde_json::from_str(data).expect("data lines carry JSON"),
            ));
        }
    }
    records
}

async fn post_stream(app: axum::Router, body: Value) -> (StatusCode, String) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat/stream")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_streaming_turn_event_sequence() {
    let fragments = ["The moon ", "landing was staged? ", "Hardly.", " Look it up"];
    let app = test_app(MockBackend::streaming(&fragments)).await;

    let (status, body) = post_stream(app, json!({ "message": "the moon landing was real" })).await;
    assert_eq!(status, StatusCode::OK, "streaming endpoint always answers 200");

    let records = parse_sse(&body);
    assert_eq!(records.first(), Some(&SseRecord::Event("start".into())));
    assert_eq!(records.last(), Some(&SseRecord::Event("end".into())));

    let mut expected_part = 1u64;
    let mut accumulated = String::new();
    let mut final_seen = false;
    for record in &records {
        let SseRecord::Data(data) = record else { continue };
        if data["part"] == json!("final") {
            final_seen = true;
            let messages = data["message"].as_array().unwrap();
            // newest first: the bot reply carries the full accumulation
            assert_eq!(messages[0]["role"], "bot");
            assert_eq!(messages[0]["message"], fragments.concat().as_str());
            assert_eq!(messages[1]["role"], "user");
            assert_eq!(data["conversation_id"], records_conversation_id(&records));
        } else {
            assert!(!final_seen, "no chunk may follow the final record");
            assert_eq!(data["part"].as_u64().unwrap(), expected_part);
            expected_part += 1;
            assert_eq!(data["role"], "bot");
            accumulated.push_str(data["message"].as_str().unwrap());
        }
    }
    assert!(final_seen, "final transcript record missing");
    assert_eq!(accumulated, fragments.concat());
    assert!(expected_part > 2, "expected more than one chunk");
}

fn records_conversation_id(records: &[SseRecord]) -> Value {
    records
        .iter()
        .find_map(|r| match r {
            SseRecord::Data(d) if d["conversation_id"].is_string() => {
                Some(d["conversation_id"].clone())
            }
            _ => None,
        })
        .expect("at least one record names the conversation")
}

#[tokio::test]
async fn test_streaming_unknown_conversation_is_real_404() {
    let app = test_app(MockBackend::streaming(&["irrelevant."])).await;
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat/stream")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "conversation_id": "nonexistent-id", "message": "hi" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    // headers are not committed yet at resolution time, so this one is a
    // transport-level error, not an in-band event
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_upstream_becomes_error_event() {
    let app = test_app(MockBackend::streaming(&[])).await;
    let (status, body) = post_stream(app, json!({ "message": "anything" })).await;

    assert_eq!(status, StatusCode::OK);
    let records = parse_sse(&body);
    assert_eq!(records.first(), Some(&SseRecord::Event("start".into())));
    assert!(records.contains(&SseRecord::Event("error".into())));
    assert!(!records.contains(&SseRecord::Event("end".into())));

    let error = records
        .iter()
        .find_map(|r| match r {
            SseRecord::Data(d) if d["error"].is_string() => Some(d["error"].clone()),
            _ => None,
        })
        .expect("error event carries a description");
    assert!(error.as_str().unwrap().contains("no content"));
}
