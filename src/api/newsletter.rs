//! Newsletter signup endpoint

use crate::api::ApiError;
use crate::api::newsletter::schemas::{Subscribe, SubscribeAck};
use crate::core::traits::NewsletterService;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new().route("/subscribe", post(subscribe))
}

async fn subscribe(
    Inject(newsletter_service): Inject<dyn NewsletterService>,
    Json(request): Json<Subscribe>,
) -> Result<(StatusCode, Json<SubscribeAck>), ApiError> {
    if newsletter_service.subscribe(&request.email).await? {
        Ok((StatusCode::CREATED, Json(SubscribeAck { status: "subscribed" })))
    } else {
        Ok((
            StatusCode::OK,
            Json(SubscribeAck {
                status: "already_subscribed",
            }),
        ))
    }
}

pub mod schemas {
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Debug)]
    pub struct Subscribe {
        pub email: String,
    }

    #[derive(Serialize, Debug)]
    pub struct SubscribeAck {
        pub status: &'static str,
    }
}
