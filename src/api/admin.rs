//! Admin dashboard endpoints
//!
//! Everything except login and logout requires an [`AdminSession`].

use crate::api::admin::schemas::{Deleted, Login, SessionsList, Status, SubscribersList};
use crate::api::chat::schemas::MessagesList;
use crate::api::{AdminSession, ApiError};
use crate::core::auth::{AdminAuthenticator, SESSION_COOKIE};
use crate::core::traits::{ChatService, NewsletterService};
use axum::extract::Path;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/chat/sessions", get(list_sessions))
        .route("/chat/sessions/:session_id", delete(delete_session))
        .route("/chat/sessions/:session_id/messages", get(session_messages))
        .route("/subscribers", get(list_subscribers))
        .route("/subscribers/:id", delete(delete_subscriber))
}

async fn login(
    Inject(authenticator): Inject<AdminAuthenticator>,
    Json(credentials): Json<Login>,
) -> Result<Response, ApiError> {
    let session = authenticator.login(&credentials.email, &credentials.password)?;

    let cookie = session_cookie(
        &session.token,
        session.max_age_secs,
        authenticator.cookie_secure(),
    );

    Ok(with_cookie(Json(Status { status: "ok" }), cookie))
}

async fn logout(Inject(authenticator): Inject<AdminAuthenticator>) -> Response {
    let cookie = session_cookie("", 0, authenticator.cookie_secure());
    with_cookie(Json(Status { status: "ok" }), cookie)
}

async fn list_sessions(
    Inject(chat_service): Inject<dyn ChatService>,
    _admin: AdminSession,
) -> Result<Json<SessionsList>, ApiError> {
    let sessions = chat_service.list_sessions().await?;
    Ok(Json(SessionsList { sessions }))
}

async fn session_messages(
    Inject(chat_service): Inject<dyn ChatService>,
    _admin: AdminSession,
    Path(session_id): Path<String>,
) -> Result<Json<MessagesList>, ApiError> {
    let messages = chat_service.list_messages(&session_id).await?;
    Ok(Json(MessagesList { messages }))
}

async fn delete_session(
    Inject(chat_service): Inject<dyn ChatService>,
    _admin: AdminSession,
    Path(session_id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let deleted = chat_service.delete_session(&session_id).await?;
    Ok(Json(Deleted { deleted }))
}

async fn list_subscribers(
    Inject(newsletter_service): Inject<dyn NewsletterService>,
    _admin: AdminSession,
) -> Result<Json<SubscribersList>, ApiError> {
    let subscribers = newsletter_service.list_subscribers().await?;
    Ok(Json(SubscribersList { subscribers }))
}

async fn delete_subscriber(
    Inject(newsletter_service): Inject<dyn NewsletterService>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    newsletter_service.unsubscribe(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn with_cookie(body: impl IntoResponse, cookie: String) -> Response {
    let mut response = body.into_response();
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().insert(header::SET_COOKIE, value);
            response
        }
        Err(_) => ApiError::BadRequest("session token is not a valid header value".to_owned())
            .into_response(),
    }
}

pub mod schemas {
    use crate::core::model::{NewsletterSubscriber, SessionOverview};
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize)]
    pub struct Login {
        pub email: String,
        pub password: String,
    }

    #[derive(Serialize, Debug)]
    pub struct Status {
        pub status: &'static str,
    }

    #[derive(Serialize, Debug)]
    pub struct SessionsList {
        pub sessions: Vec<SessionOverview>,
    }

    #[derive(Serialize, Debug)]
    pub struct SubscribersList {
        pub subscribers: Vec<NewsletterSubscriber>,
    }

    #[derive(Serialize, Debug)]
    pub struct Deleted {
        pub deleted: u64,
    }
}
