//! Pusher Channels REST publisher.
//!
//! Events are triggered with `POST /apps/{app_id}/events`, authenticated by
//! an HMAC-SHA256 signature over the method, path and sorted query string.

use crate::config::PusherCredentials;
use crate::infrastructure::error::PublishError;
use crate::infrastructure::traits::Publisher;
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::debug;
use md5::{Digest, Md5};
use serde::Serialize;
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const AUTH_VERSION: &str = "1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct TriggerBody<'a> {
    name: &'a str,
    channels: [&'a str; 1],
    /// Pusher expects the event data as a JSON encoded string.
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    socket_id: Option<&'a str>,
}

pub struct PusherPublisher {
    client: reqwest::Client,
    credentials: PusherCredentials,
    base_url: String,
}

impl PusherPublisher {
    pub fn new(credentials: PusherCredentials) -> Result<Self, PublishError> {
        let base_url = format!("https://api-{}.pusher.com", credentials.cluster);
        Self::with_base_url(credentials, base_url)
    }

    /// Points the publisher at a different host, e.g. a local mock server.
    pub fn with_base_url(
        credentials: PusherCredentials,
        base_url: impl Into<String>,
    ) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(PusherPublisher {
            client,
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    fn events_path(&self) -> String {
        format!("/apps/{}/events", self.credentials.app_id)
    }
}

#[async_trait]
impl Publisher for PusherPublisher {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: &serde_json::Value,
        exclude: Option<&str>,
    ) -> Result<(), PublishError> {
        let body = serde_json::to_vec(&TriggerBody {
            name: event,
            channels: [channel],
            data: serde_json::to_string(payload)?,
            socket_id: exclude,
        })?;

        let path = self.events_path();
        let query = signed_query(
            &self.credentials.key,
            &self.credentials.secret,
            "POST",
            &path,
            &body,
            Utc::now().timestamp(),
        )?;

        let response = self
            .client
            .post(format!("{}{}?{}", self.base_url, path, query))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!("published {event} to {channel}");
        Ok(())
    }
}

/// Builds the authenticated query string for a Pusher REST request.
///
/// Parameters are in lexical order, as the signature covers them verbatim.
pub fn signed_query(
    key: &str,
    secret: &str,
    method: &str,
    path: &str,
    body: &[u8],
    timestamp: i64,
) -> Result<String, PublishError> {
    let body_md5 = hex::encode(Md5::digest(body));
    let query = format!(
        "auth_key={key}&auth_timestamp={timestamp}&auth_version={AUTH_VERSION}&body_md5={body_md5}"
    );
    let string_to_sign = format!("{method}\n{path}\n{query}");

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(string_to_sign.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(format!("{query}&auth_signature={signature}"))
}
