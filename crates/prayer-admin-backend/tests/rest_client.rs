//! HTTP-level tests for the REST client against a mock server

#![allow(clippy::unwrap_used, clippy::missing_panics_doc, clippy::indexing_slicing)]

use prayer_admin_backend::{
    AuthProvider, BackendError, HealthProbe, ModerationBackend, ModerationKind, PrayerTypeStore,
    RestClient, SettingsStore,
};
use prayer_admin_core::{BackendConfig, DeletionRequest, EmailSettings, PrayerTypeUpdate};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

const ANON_KEY: &str = "anon-key";

async fn client_for(server: &MockServer) -> RestClient {
    RestClient::new(&BackendConfig {
        url: server.uri(),
        anon_key: ANON_KEY.to_string(),
        request_timeout: 5,
    })
    .unwrap()
}

fn deletion_row(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "prayer_id": "p1",
        "requested_by": "Ann",
        "reason": "duplicate",
        "created_at": "2024-03-01T12:00:00Z",
        "approval_status": "pending"
    })
}

#[tokio::test]
async fn test_list_pending_sends_filters_and_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/deletion_requests"))
        .and(query_param("approval_status", "eq.pending"))
        .and(query_param("order", "created_at.desc"))
        .and(header("apikey", ANON_KEY))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([deletion_row("r1")])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let rows: Vec<DeletionRequest> =
        prayer_admin_backend::list_pending_as(&client, ModerationKind::PrayerDeletion)
            .await
            .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "r1");
}

#[tokio::test]
async fn test_approve_marks_request_then_deletes_prayer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/deletion_requests"))
        .and(query_param("id", "eq.r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([deletion_row("r1")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/prayers"))
        .and(query_param("id", "eq.p1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/deletion_requests"))
        .and(query_param("id", "eq.r1"))
        .and(query_param("approval_status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "r1" }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client
        .approve(ModerationKind::PrayerDeletion, "r1")
        .await
        .unwrap();

    let order: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| format!("{} {}", request.method, request.url.path()))
        .collect();
    assert_eq!(
        order,
        vec![
            "GET /rest/v1/deletion_requests",
            "PATCH /rest/v1/deletion_requests",
            "DELETE /rest/v1/prayers",
        ]
    );
}

#[tokio::test]
async fn test_approve_decided_concurrently_leaves_prayer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/deletion_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([deletion_row("r1")])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/deletion_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/prayers"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .approve(ModerationKind::PrayerDeletion, "r1")
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::NotFound { .. }));
}

#[tokio::test]
async fn test_approve_already_decided_request_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/deletion_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .approve(ModerationKind::PrayerDeletion, "r1")
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::NotFound { .. }));
}

#[tokio::test]
async fn test_deny_sends_reason() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/update_deletion_requests"))
        .and(query_param("id", "eq.u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "u1" }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client
        .deny(ModerationKind::UpdateDeletion, "u1", "not valid")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["approval_status"], "denied");
    assert_eq!(body["denial_reason"], "not valid");
}

#[tokio::test]
async fn test_deny_rejects_blank_reason_without_request() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    let err = client
        .deny(ModerationKind::PrayerDeletion, "r1", "   ")
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Validation { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_prayer_type_sends_partial_body() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/prayer_types"))
        .and(query_param("id", "eq.t1"))
        .and(body_json(json!({ "display_order": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "t1" }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client
        .update("t1", &PrayerTypeUpdate::display_order(1))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_status_errors_carry_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/prayer_types"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23503",
            "message": "prayer type is still referenced"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.delete("t1").await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Backend returned 409: prayer type is still referenced"
    );
}

#[tokio::test]
async fn test_probe_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/prayers"))
        .and(query_param("limit", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .probe("prayers", 1, Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Timeout { millis: 50 }));
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_sign_in_uses_session_token_afterwards() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "session-token",
            "expires_in": 3600,
            "user": { "email": "admin@example.org" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/admin_settings"))
        .and(header("authorization", "Bearer session-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "notification_emails": ["admin@example.org"],
            "notify_on_new_prayer": true
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let session = client
        .sign_in("admin@example.org", "hunter2")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(session.access_token, "session-token");
    assert!(session.expires_at.is_some());
    assert!(client.is_signed_in());

    let settings = client.email_settings().await.unwrap();
    assert_eq!(
        settings,
        EmailSettings {
            notification_emails: vec!["admin@example.org".to_string()],
            notify_on_new_prayer: true,
        }
    );
}

#[tokio::test]
async fn test_sign_in_rejected_credentials_return_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let session = client.sign_in("admin@example.org", "wrong").await.unwrap();

    assert!(session.is_none());
    assert!(!client.is_signed_in());
}
