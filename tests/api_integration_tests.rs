//! API Integration Tests
//!
//! Tests the HTTP API endpoints with a real in-memory database and the
//! in-process realtime hub. Every test builds its own provider, so nothing is
//! shared between tests.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::IntoResponse,
};
use di::Ref;
use futures_util::StreamExt;
use serde_json::{Value, json};
use site_chat_api::api::ApiError;
use site_chat_api::app::{Realtime, build_app, build_provider};
use site_chat_api::config::Config;
use site_chat_api::core::error::ServiceError;
use site_chat_api::infrastructure::database::DatabaseConnection;
use site_chat_api::infrastructure::hub::LocalHub;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::time::Duration;
use tokio::time::timeout;
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "correct horse";

fn test_config() -> Config {
    Config::from_lookup(|key| {
        match key {
            "DATABASE_URL" => Some("sqlite::memory:"),
            "SESSION_SECRET" => Some("test secret"),
            "ADMIN_EMAIL" => Some(ADMIN_EMAIL),
            "ADMIN_PASSWORD" => Some(ADMIN_PASSWORD),
            "REALTIME_DRIVER" => Some("local"),
            _ => None,
        }
        .map(str::to_owned)
    })
    .unwrap()
}

async fn test_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

/// Create test app backed by a fresh database, returning the hub it publishes on
async fn create_test_app(local_events: bool) -> (Router, Ref<LocalHub>) {
    create_test_app_on(test_pool().await, local_events).await
}

async fn create_test_app_on(pool: SqlitePool, local_events: bool) -> (Router, Ref<LocalHub>) {
    let database = DatabaseConnection::from_pool(pool).await.unwrap();

    let hub = Ref::new(LocalHub::new());
    let realtime = Realtime::Local(hub.clone());
    let config = test_config();

    let provider = build_provider(config.clone(), database, &realtime).unwrap();
    let app = build_app(&config, provider, local_events).unwrap();

    (app, hub)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn delete(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn chat_message(id: &str, session_id: &str, text: &str, role: &str) -> Value {
    json!({
        "id": id,
        "sessionId": session_id,
        "text": text,
        "role": role,
        "timezone": "Europe/Helsinki"
    })
}

/// Logs in and returns the `Cookie` header value for admin requests
async fn admin_cookie(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/admin/login",
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Secure"));

    set_cookie.split(';').next().unwrap().to_owned()
}

#[tokio::test]
async fn test_post_message_and_read_history() {
    let (app, _hub) = create_test_app(true).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/chat/messages",
            chat_message("m1", "s1", "hello", "bot"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["status"], "saved");
    assert_eq!(json["message"]["id"], "m1");
    assert_eq!(json["message"]["sessionId"], "s1");
    assert_eq!(json["message"]["role"], "bot");
    assert!(json["message"]["timestamp"].is_string());

    let response = app
        .oneshot(get("/chat/sessions/s1/messages", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], "hello");
}

#[tokio::test]
async fn test_duplicate_post_is_acknowledged_unchanged() {
    let (app, _hub) = create_test_app(true).await;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/chat/messages",
            chat_message("m1", "s1", "hello", "bot"),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/chat/messages",
            chat_message("m1", "s1", "different", "user"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "duplicate");
    assert_eq!(json["message"]["text"], "hello");
    assert_eq!(json["message"]["role"], "bot");

    let json = body_json(
        app.oneshot(get("/chat/sessions/s1/messages", None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(json["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_post_message_validation() {
    let (app, _hub) = create_test_app(true).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/chat/messages",
            chat_message("m1", "s1", "", "user"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    // unknown role does not deserialize
    let response = app
        .oneshot(json_request(
            "POST",
            "/chat/messages",
            chat_message("m1", "s1", "hi", "system"),
        ))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_post_publishes_to_everyone_but_the_sender() {
    let (app, hub) = create_test_app(true).await;
    let mut sender = hub.subscribe("chat-s1");
    let mut other_tab = hub.subscribe("chat-s1");

    let mut body = chat_message("m1", "s1", "hello", "user");
    body["socketId"] = json!(sender.connection_id());

    let response = app
        .clone()
        .oneshot(json_request("POST", "/chat/messages", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let delivery = timeout(Duration::from_secs(1), other_tab.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivery.event, "new-message");
    assert_eq!(delivery.payload["id"], "m1");
    assert_eq!(delivery.payload["text"], "hello");

    // a later message without exclusion is the first thing the sender sees
    app.oneshot(json_request(
        "POST",
        "/chat/messages",
        chat_message("m2", "s1", "anyone there?", "user"),
    ))
    .await
    .unwrap();

    let delivery = timeout(Duration::from_secs(1), sender.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivery.payload["id"], "m2");
}

#[tokio::test]
async fn test_events_stream_announces_connection() {
    let (app, hub) = create_test_app(true).await;

    let response = app
        .oneshot(get("/chat/sessions/s1/events", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let mut stream = response.into_body().into_data_stream();
    let chunk = timeout(Duration::from_secs(1), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = String::from_utf8(chunk.to_vec()).unwrap();

    assert!(text.contains("event: connected"));
    assert!(text.contains("socketId"));
    assert_eq!(hub.listener_count("chat-s1"), 1);
}

#[tokio::test]
async fn test_events_route_absent_without_local_hub() {
    let (app, _hub) = create_test_app(false).await;

    let response = app
        .oneshot(get("/chat/sessions/s1/events", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_routes_require_session() {
    let (app, _hub) = create_test_app(true).await;

    for uri in ["/admin/chat/sessions", "/admin/subscribers"] {
        let response = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(get(uri, Some("admin_session=forged.token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_admin_login_rejects_bad_password() {
    let (app, _hub) = create_test_app(true).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/admin/login",
            json!({ "email": ADMIN_EMAIL, "password": "nope" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_admin_session_overview() {
    let (app, _hub) = create_test_app(true).await;
    let cookie = admin_cookie(&app).await;

    let empty = body_json(
        app.clone()
            .oneshot(get("/admin/chat/sessions", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(empty["sessions"].as_array().unwrap().len(), 0);

    for (id, session, text) in [("m1", "s1", "one"), ("m2", "s1", "two"), ("m3", "s2", "three")] {
        app.clone()
            .oneshot(json_request(
                "POST",
                "/chat/messages",
                chat_message(id, session, text, "user"),
            ))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(get("/admin/chat/sessions", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let sessions = json["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["sessionId"], "s2");
    assert_eq!(sessions[0]["messageCount"], 1);
    assert_eq!(sessions[0]["lastMessage"], "three");
    assert_eq!(sessions[1]["sessionId"], "s1");
    assert_eq!(sessions[1]["messageCount"], 2);
    assert_eq!(sessions[1]["lastMessage"], "two");

    let json = body_json(
        app.clone()
            .oneshot(get("/admin/chat/sessions/s1/messages", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(json["messages"].as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(delete("/admin/chat/sessions/s1", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["deleted"], 2);

    let response = app
        .oneshot(delete("/admin/chat/sessions/s1", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_newsletter_signup_and_admin_management() {
    let (app, _hub) = create_test_app(true).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/newsletter/subscribe",
            json!({ "email": " Reader@Example.com " }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["status"], "subscribed");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/newsletter/subscribe",
            json!({ "email": "reader@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "already_subscribed");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/newsletter/subscribe",
            json!({ "email": "not an email" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let cookie = admin_cookie(&app).await;
    let json = body_json(
        app.clone()
            .oneshot(get("/admin/subscribers", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    let subscribers = json["subscribers"].as_array().unwrap();
    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0]["email"], "reader@example.com");

    let id = subscribers[0]["id"].as_str().unwrap().to_owned();
    let response = app
        .clone()
        .oneshot(delete(&format!("/admin/subscribers/{id}"), &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(delete(&format!("/admin/subscribers/{id}"), &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let (app, _hub) = create_test_app(true).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("admin_session=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_unreachable_storage_is_service_unavailable() {
    let pool = test_pool().await;
    let (app, hub) = create_test_app_on(pool.clone(), true).await;
    let mut listener = hub.subscribe("chat-s1");

    pool.close().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/chat/messages",
            chat_message("m1", "s1", "hello", "user"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "storage unavailable" })
    );

    // nothing was saved, so nothing is published
    assert!(
        timeout(Duration::from_millis(100), listener.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_internal_error_hides_detail() {
    let response =
        ApiError::from(ServiceError::Internal("cannot encode claims".to_owned())).into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "internal server error" })
    );
}
