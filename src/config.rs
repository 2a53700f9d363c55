//! Server configuration, loaded from environment variables at startup.
//!
//! Required values fail fast with [`ConfigError::Missing`] naming the variable,
//! so the server never starts half-configured.

use std::fmt;
use thiserror::Error;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable `{0}`")]
    Missing(&'static str),

    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Credentials of the hosted Pusher Channels app used for realtime delivery.
#[derive(Clone, PartialEq, Eq)]
pub struct PusherCredentials {
    pub app_id: String,
    pub key: String,
    pub secret: String,
    pub cluster: String,
}

impl fmt::Debug for PusherCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PusherCredentials")
            .field("app_id", &self.app_id)
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("cluster", &self.cluster)
            .finish()
    }
}

/// Where chat messages are fanned out after they are saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeDriver {
    /// Hosted Pusher Channels, clients subscribe there.
    Pusher(PusherCredentials),
    /// In-process hub, clients subscribe through the SSE endpoint.
    Local,
}

#[derive(Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// sqlx SQLite connection string, e.g. `sqlite://site.db`.
    pub database_url: String,

    pub database_max_connections: u32,

    /// Key for signing admin session tokens.
    pub session_secret: String,

    pub session_ttl_hours: i64,

    /// Whether the session cookie carries the `Secure` attribute.
    pub cookie_secure: bool,

    pub admin_email: String,
    pub admin_password: String,

    pub realtime: RealtimeDriver,

    /// Origins allowed by CORS, the public site and the admin dashboard.
    pub allowed_origins: Vec<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("database_url", &self.database_url)
            .field("database_max_connections", &self.database_max_connections)
            .field("session_secret", &"<redacted>")
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("cookie_secure", &self.cookie_secure)
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"<redacted>")
            .field("realtime", &self.realtime)
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}

impl Config {
    /// Build [`Config`] from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let realtime = match get("REALTIME_DRIVER").as_deref().map(str::trim) {
            None | Some("pusher") => RealtimeDriver::Pusher(PusherCredentials {
                app_id: required("PUSHER_APP_ID")?,
                key: required("PUSHER_KEY")?,
                secret: required("PUSHER_SECRET")?,
                cluster: required("PUSHER_CLUSTER")?,
            }),
            Some("local") => RealtimeDriver::Local,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "REALTIME_DRIVER",
                    reason: format!("expected `pusher` or `local`, got `{other}`"),
                });
            }
        };

        let session_ttl_hours = parse(get("SESSION_TTL_HOURS"), "SESSION_TTL_HOURS", 24i64)?;
        if session_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "SESSION_TTL_HOURS",
                reason: "must be positive".to_owned(),
            });
        }

        Ok(Config {
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_owned()),
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse(
                get("DATABASE_MAX_CONNECTIONS"),
                "DATABASE_MAX_CONNECTIONS",
                5u32,
            )?,
            session_secret: required("SESSION_SECRET")?,
            session_ttl_hours,
            cookie_secure: parse_bool(get("COOKIE_SECURE"), "COOKIE_SECURE", true)?,
            admin_email: required("ADMIN_EMAIL")?,
            admin_password: required("ADMIN_PASSWORD")?,
            realtime,
            allowed_origins: get("ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_owned())
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_owned)
                .collect(),
        })
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn parse<T>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}

fn parse_bool(value: Option<String>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::trim) {
        None => Ok(default),
        Some(v) if v == "1" || v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v == "0" || v.eq_ignore_ascii_case("false") => Ok(false),
        Some(v) => Err(ConfigError::Invalid {
            key,
            reason: format!("expected a boolean, got `{v}`"),
        }),
    }
}
