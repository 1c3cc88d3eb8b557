//! Integration tests for the `/slack/event` delivery endpoint.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;

use courier_integration_tests::{TestApp, body_json, sign_event, signed_event};

fn rename_event(team_id: &str, name: &str) -> serde_json::Value {
    json!({
        "token": "XXYYZZ",
        "team_id": team_id,
        "type": "event_callback",
        "event": {"type": "team_rename", "name": name, "event_ts": "1.0"}
    })
}

fn revoke_event(team_id: &str, user_id: &str) -> serde_json::Value {
    json!({
        "team_id": team_id,
        "type": "event_callback",
        "event": {
            "type": "tokens_revoked",
            "tokens": {"oauth": [user_id], "bot": []}
        }
    })
}

#[tokio::test]
async fn test_team_rename_updates_stored_name() {
    let app = TestApp::new();
    app.store.seed("Old Name", "T1", "U1", "xoxb-1");

    let response = app.send(signed_event(&rename_event("T1", "New Name"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let record = app.store.get("T1").expect("record still present");
    assert_eq!(record.team_name, "New Name");
}

#[tokio::test]
async fn test_repeated_rename_is_idempotent() {
    let app = TestApp::new();
    app.store.seed("Old Name", "T1", "U1", "xoxb-1");

    for _ in 0..2 {
        let response = app.send(signed_event(&rename_event("T1", "New Name"))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let records = app.store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records.first().expect("one record").team_name, "New Name");
}

#[tokio::test]
async fn test_rename_for_unknown_workspace_is_a_noop() {
    let app = TestApp::new();

    let response = app.send(signed_event(&rename_event("T404", "Name"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.store.records().is_empty());
}

#[tokio::test]
async fn test_tokens_revoked_deletes_matching_record() {
    let app = TestApp::new();
    app.store.seed("Acme", "T1", "U1", "xoxb-1");

    let response = app.send(signed_event(&revoke_event("T1", "U1"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.store.get("T1").is_none(), "credentials are gone");
}

#[tokio::test]
async fn test_tokens_revoked_for_unknown_pair_is_a_noop() {
    let app = TestApp::new();
    app.store.seed("Acme", "T1", "U1", "xoxb-1");

    // Same workspace, different installing user
    let response = app.send(signed_event(&revoke_event("T1", "U999"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.store.get("T1").is_some(), "record is untouched");
}

#[tokio::test]
async fn test_url_verification_echoes_challenge() {
    let app = TestApp::new();

    let response = app
        .send(signed_event(&json!({
            "token": "XXYYZZ",
            "challenge": "3eZbrw1aBm2rZgRNFdxV",
            "type": "url_verification"
        })))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["challenge"], "3eZbrw1aBm2rZgRNFdxV");
}

#[tokio::test]
async fn test_bad_signature_is_rejected_without_mutation() {
    let app = TestApp::new();
    app.store.seed("Old Name", "T1", "U1", "xoxb-1");

    let body = rename_event("T1", "New Name").to_string();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time after epoch")
        .as_secs()
        .to_string();

    let request = Request::builder()
        .method("POST")
        .uri("/slack/event")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Slack-Request-Timestamp", &timestamp)
        .header("X-Slack-Signature", "v0=deadbeef")
        .body(Body::from(body))
        .expect("request builds");

    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let record = app.store.get("T1").expect("record still present");
    assert_eq!(record.team_name, "Old Name", "store is untouched");
}

#[tokio::test]
async fn test_stale_signature_is_rejected() {
    let app = TestApp::new();

    let body = rename_event("T1", "New Name").to_string();
    // Correctly signed, but 10 minutes old
    let stale = (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time after epoch")
        .as_secs()
        - 600)
        .to_string();
    let signature = sign_event(&stale, &body);

    let request = Request::builder()
        .method("POST")
        .uri("/slack/event")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Slack-Request-Timestamp", &stale)
        .header("X-Slack-Signature", signature)
        .body(Body::from(body))
        .expect("request builds");

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_signature_headers_are_rejected() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/slack/event")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(rename_event("T1", "X").to_string()))
        .expect("request builds");

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
