//! Chat widget endpoints

use crate::api::ApiError;
use crate::api::chat::schemas::{CreateMessage, MessageAck, MessagesList};
use crate::core::realtime::chat_channel;
use crate::core::traits::ChatService;
use crate::infrastructure::hub::LocalHub;
use async_stream::stream;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;
use futures_util::Stream;
use log::debug;
use serde_json::json;
use std::convert::Infallible;

/// Event announcing the subscriber's own connection id.
const CONNECTED_EVENT: &str = "connected";

pub fn router(local_events: bool) -> Router {
    let router = Router::new()
        .route("/messages", post(post_message))
        .route("/sessions/:session_id/messages", get(session_messages));

    if local_events {
        router.route("/sessions/:session_id/events", get(session_events))
    } else {
        router
    }
}

async fn post_message(
    Inject(chat_service): Inject<dyn ChatService>,
    Json(message): Json<CreateMessage>,
) -> Result<(StatusCode, Json<MessageAck>), ApiError> {
    let posted = chat_service.post_message(message.into()).await?;

    let (status, ack) = if posted.created {
        (StatusCode::CREATED, "saved")
    } else {
        (StatusCode::OK, "duplicate")
    };

    Ok((
        status,
        Json(MessageAck {
            status: ack,
            message: posted.message,
        }),
    ))
}

async fn session_messages(
    Inject(chat_service): Inject<dyn ChatService>,
    Path(session_id): Path<String>,
) -> Result<Json<MessagesList>, ApiError> {
    let messages = chat_service.list_messages(&session_id).await?;
    Ok(Json(MessagesList { messages }))
}

async fn session_events(
    Inject(hub): Inject<LocalHub>,
    Path(session_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = hub.subscribe(&chat_channel(&session_id));

    let stream = stream! {
        yield Ok::<_, Infallible>(Event::default()
            .event(CONNECTED_EVENT)
            .data(json!({ "socketId": subscription.connection_id() }).to_string()));

        while let Some(delivery) = subscription.recv().await {
            yield Ok::<_, Infallible>(Event::default()
                .event(delivery.event)
                .data(delivery.payload.to_string()));
        }

        debug!("subscription {} on {} ended", subscription.connection_id(), subscription.channel());
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub mod schemas {
    use crate::core::model::{ChatMessage, NewMessage, Role};
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateMessage {
        pub id: String,
        pub session_id: String,
        pub text: String,
        pub role: Role,
        #[serde(default)]
        pub timezone: Option<String>,
        #[serde(default)]
        pub socket_id: Option<String>,
    }

    impl From<CreateMessage> for NewMessage {
        fn from(message: CreateMessage) -> Self {
            NewMessage {
                id: message.id,
                session_id: message.session_id,
                text: message.text,
                role: message.role,
                timezone: message.timezone,
                socket_id: message.socket_id.filter(|id| !id.is_empty()),
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct MessageAck {
        pub status: &'static str,
        pub message: ChatMessage,
    }

    #[derive(Serialize, Debug, Default)]
    pub struct MessagesList {
        pub messages: Vec<ChatMessage>,
    }
}
