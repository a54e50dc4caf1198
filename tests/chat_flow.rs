//! Controllers driven through the real HTTP client.


use std::sync::Arc;

use fixtures::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gemini_chat::models::Role;
use gemini_chat::services::chat::OFFLINE_CHAT_TITLE;
use gemini_chat::services::exchange::EXCHANGE_ERROR_TEXT;
use gemini_chat::services::{
    AuthService, ChatController, CreateOutcome, CredentialStore, Database, SendOutcome,
};

async fn mount_sessions(server: &MockServer, sessions: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sessions))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_persists_credentials_and_authorizes_requests() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("chat.db");

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(auth_response("tok-9"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions"))
        .and(header("authorization", "Bearer tok-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    {
        let db = Database::open(&db_path).await.unwrap();
        let credentials = CredentialStore::init(db).await.unwrap();
        let auth = AuthService::new(Arc::new(client(&server, credentials.clone())), credentials);
        let user = auth.login("ada", "secret").await.unwrap();
        assert_eq!(user.username, "ada");
    }

    // A fresh process picks the account up from disk.
    let db = Database::open(&db_path).await.unwrap();
    let credentials = CredentialStore::init(db).await.unwrap();
    assert_eq!(credentials.current_user().unwrap().id, "u1");

    let chat = ChatController::new(Arc::new(client(&server, credentials)), Some("u1".to_string()));
    assert!(chat.reload_sessions().await);
}

#[tokio::test]
async fn test_logout_clears_persisted_credentials() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("chat.db");

    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(auth_response("tok-1"))
        .mount(&server)
        .await;

    let db = Database::open(&db_path).await.unwrap();
    let credentials = CredentialStore::init(db.clone()).await.unwrap();
    let auth = AuthService::new(Arc::new(client(&server, credentials.clone())), credentials);
    auth.register("ada", "secret").await.unwrap();
    auth.logout().await;

    let reloaded = CredentialStore::init(db).await.unwrap();
    assert!(reloaded.current_user().is_none());
    assert!(!reloaded.is_authenticated());
}

#[tokio::test]
async fn test_load_selects_first_session_and_fetches_its_messages() {
    let server = MockServer::start().await;
    mount_sessions(&server, json!([session_json("s1", "First"), session_json("s2", "Second")])).await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/s1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            message_json("m1", "user", "hi"),
            message_json("m2", "assistant", "hello"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let chat = ChatController::new(Arc::new(client(&server, CredentialStore::ephemeral())), None);
    chat.load().await;

    let state = chat.snapshot();
    assert_eq!(state.active_session_id.as_deref(), Some("s1"));
    assert_eq!(state.active_session().unwrap().messages.len(), 2);
    assert!(state.session("s2").unwrap().messages.is_empty());
}

#[tokio::test]
async fn test_create_failure_falls_back_to_offline_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/sessions"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "down" })))
        .mount(&server)
        .await;

    let chat = ChatController::new(Arc::new(client(&server, CredentialStore::ephemeral())), None);
    let outcome = chat.create_session().await;
    assert!(matches!(outcome, CreateOutcome::Offline(_)));

    let state = chat.snapshot();
    let active = state.active_session().unwrap();
    assert_eq!(active.title, OFFLINE_CHAT_TITLE);
    assert!(active.is_offline());
}

#[tokio::test]
async fn test_send_round_trip_and_failure() {
    let server = MockServer::start().await;
    mount_sessions(&server, json!([session_json("s1", "Greetings")])).await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/s1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat/sessions/s1/messages"))
        .respond_with(exchange_response("Hello **friend**"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat/sessions/s1/messages"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let chat = ChatController::new(Arc::new(client(&server, CredentialStore::ephemeral())), None);
    chat.load().await;

    assert_eq!(chat.send_message("hello").await, SendOutcome::Completed);
    assert_eq!(chat.send_message("again").await, SendOutcome::Failed);

    let state = chat.snapshot();
    let messages = &state.active_session().unwrap().messages;
    let summary: Vec<(Role, &str)> = messages.iter().map(|m| (m.role, m.content.as_str())).collect();
    assert_eq!(
        summary,
        vec![
            (Role::User, "hello"),
            (Role::Assistant, "Hello **friend**"),
            (Role::User, "again"),
            (Role::Assistant, EXCHANGE_ERROR_TEXT),
        ]
    );
    assert!(!state.busy);
}

#[tokio::test]
async fn test_export_then_import_replays_user_messages() {
    let source = MockServer::start().await;
    mount_sessions(&source, json!([session_json("s1", "Rust")])).await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/s1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            message_json("m1", "user", "what is a trait?"),
            message_json("m2", "assistant", "a set of methods"),
        ])))
        .mount(&source)
        .await;

    let exporter = ChatController::new(Arc::new(client(&source, CredentialStore::ephemeral())), None);
    let json = exporter.export_history().await.unwrap();
    let document: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(document["userId"], "guest");
    assert_eq!(document["sessions"][0]["messages"].as_array().unwrap().len(), 2);

    let target = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/sessions"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "session": session_json("n1", "Rust") })),
        )
        .expect(1)
        .mount(&target)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat/sessions/n1/messages"))
        .respond_with(exchange_response("regenerated"))
        .expect(1)
        .mount(&target)
        .await;
    mount_sessions(&target, json!([session_json("n1", "Rust")])).await;

    let importer = ChatController::new(Arc::new(client(&target, CredentialStore::ephemeral())), None);
    assert!(importer.import_history(&json).await);
    assert_eq!(importer.snapshot().sessions[0].id, "n1");
}

#[tokio::test]
async fn test_import_rejects_non_array_sessions_without_requests() {
    let server = MockServer::start().await;
    let chat = ChatController::new(Arc::new(client(&server, CredentialStore::ephemeral())), None);

    assert!(!chat.import_history(r#"{"sessions": "not-an-array"}"#).await);
    assert!(server.received_requests().await.unwrap().is_empty());
}
