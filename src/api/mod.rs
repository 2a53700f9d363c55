use crate::core::auth::{AdminAuthenticator, SESSION_COOKIE, SessionClaims};
use crate::core::error::ServiceError;
use crate::infrastructure::error::StorageError;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use di_axum::Inject;
use log::error;
use serde_json::json;
use thiserror::Error;

pub mod admin;
pub mod chat;
pub mod newsletter;

/// All public and admin routes.
///
/// `local_events` mounts the SSE subscription endpoint, which only makes sense when
/// messages are fanned out through the in-process hub.
pub fn router(local_events: bool) -> Router {
    Router::new()
        .nest("/chat", chat::router(local_events))
        .nest("/newsletter", newsletter::router())
        .nest("/admin", admin::router())
}

/// Error returned by every handler, rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Service(ServiceError::InvalidInput(m)) => (StatusCode::BAD_REQUEST, m),
            ApiError::Service(ServiceError::NotFound(m)) => (StatusCode::NOT_FOUND, m),
            ApiError::Service(ServiceError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, "unauthorized".to_owned())
            }
            ApiError::Service(ServiceError::Storage(e @ StorageError::Unavailable(_))) => {
                error!("{e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "storage unavailable".to_owned(),
                )
            }
            ApiError::Service(e @ (ServiceError::Storage(_) | ServiceError::Internal(_))) => {
                error!("{e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// A request carrying a valid admin session cookie.
#[derive(Debug)]
pub struct AdminSession(pub SessionClaims);

#[async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, ApiError> {
        let token = cookie_value(parts, SESSION_COOKIE).ok_or(ServiceError::Unauthorized)?;

        let Inject(authenticator) = Inject::<AdminAuthenticator>::from_request_parts(parts, state)
            .await
            .map_err(|_| ServiceError::Unauthorized)?;

        Ok(AdminSession(authenticator.verify(&token)?))
    }
}

/// Reads a cookie from the request's `Cookie` headers.
pub fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_owned())
}
