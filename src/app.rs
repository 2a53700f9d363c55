//! Service registration and router assembly, shared by `main` and the tests.

use crate::api;
use crate::config::{Config, RealtimeDriver};
use crate::core::auth::AdminAuthenticator;
use crate::core::services::{DefaultChatService, DefaultNewsletterService};
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::error::PublishError;
use crate::infrastructure::hub::LocalHub;
use crate::infrastructure::pusher::PusherPublisher;
use crate::infrastructure::repositories::{DbMessageRepository, DbSubscriberRepository};
use crate::infrastructure::traits::Publisher;
use anyhow::anyhow;
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use di::{Injectable, Ref, ServiceCollection, ServiceProvider, singleton_factory};
use di_axum::RouterServiceProviderExtensions;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// The realtime transport chat messages are published on.
#[derive(Clone)]
pub enum Realtime {
    /// In-process hub; clients subscribe through `GET /chat/sessions/:id/events`.
    Local(Ref<LocalHub>),
    /// External service; clients subscribe there directly.
    Remote(Ref<dyn Publisher>),
}

impl Realtime {
    pub fn from_driver(driver: &RealtimeDriver) -> Result<Self, PublishError> {
        Ok(match driver {
            RealtimeDriver::Local => Realtime::Local(Ref::new(LocalHub::new())),
            RealtimeDriver::Pusher(credentials) => {
                Realtime::Remote(Ref::new(PusherPublisher::new(credentials.clone())?))
            }
        })
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Realtime::Local(_))
    }

    fn publisher(&self) -> Ref<dyn Publisher> {
        match self {
            Realtime::Local(hub) => hub.clone() as Ref<dyn Publisher>,
            Realtime::Remote(publisher) => publisher.clone(),
        }
    }
}

/// Registers the pool, repositories and services.
///
/// The database pool is created by the caller and shared by every scope.
pub fn build_provider(
    config: Config,
    database: DatabaseConnection,
    realtime: &Realtime,
) -> anyhow::Result<ServiceProvider> {
    let config = Ref::new(config);
    let database = Ref::new(database);
    let publisher = realtime.publisher();

    let mut services = ServiceCollection::new();
    services
        .add(singleton_factory(move |_| config.clone()))
        .add(singleton_factory(move |_| database.clone()))
        .add(singleton_factory(move |_| publisher.clone()))
        .add(DbMessageRepository::scoped())
        .add(DbSubscriberRepository::scoped())
        .add(DefaultChatService::scoped())
        .add(DefaultNewsletterService::scoped())
        .add(AdminAuthenticator::singleton());

    if let Realtime::Local(hub) = realtime {
        let hub = hub.clone();
        services.add(singleton_factory(move |_| hub.clone()));
    }

    services
        .build_provider()
        .map_err(|e| anyhow!("invalid service registrations: {e:?}"))
}

/// Mounts every route with CORS for the configured origins.
pub fn build_app(config: &Config, provider: ServiceProvider, local_events: bool) -> anyhow::Result<Router> {
    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(api::router(local_events)
        .layer(
            CorsLayer::new()
                .allow_credentials(true)
                .allow_headers([header::CONTENT_TYPE])
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_origin(AllowOrigin::list(origins)),
        )
        .with_provider(provider))
}
