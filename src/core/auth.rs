//! Admin login and signed session tokens.
//!
//! A token is `base64url(claims) "." base64url(hmac_sha256(secret, claims))`,
//! where the claims are the JSON object `{"sub": <email>, "exp": <unix seconds>}`.

use crate::config::Config;
use crate::core::error::ServiceError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use di::{Ref, injectable};
use hmac::{Hmac, Mac};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Name of the cookie carrying the admin session token.
pub const SESSION_COOKIE: &str = "admin_session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: i64,
}

/// An issued session token and how long it stays valid.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub max_age_secs: i64,
}

#[injectable]
pub struct AdminAuthenticator {
    config: Ref<Config>,
}

impl AdminAuthenticator {
    pub fn new(config: Ref<Config>) -> Self {
        AdminAuthenticator { config }
    }

    /// Checks the credentials and issues a session token.
    pub fn login(&self, email: &str, password: &str) -> Result<IssuedSession, ServiceError> {
        let email_ok = email.trim().eq_ignore_ascii_case(self.config.admin_email.trim());
        let password_ok =
            Sha256::digest(password.as_bytes()) == Sha256::digest(self.config.admin_password.as_bytes());

        if !(email_ok && password_ok) {
            warn!("rejected admin login for {}", email.trim());
            return Err(ServiceError::Unauthorized);
        }

        let ttl = Duration::hours(self.config.session_ttl_hours);
        let claims = SessionClaims {
            sub: self.config.admin_email.trim().to_lowercase(),
            exp: (Utc::now() + ttl).timestamp(),
        };

        info!("admin {} logged in", claims.sub);
        Ok(IssuedSession {
            token: self.sign(&claims)?,
            max_age_secs: ttl.num_seconds(),
        })
    }

    /// Validates a token's signature and expiry.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, ServiceError> {
        let (encoded_claims, encoded_signature) =
            token.split_once('.').ok_or(ServiceError::Unauthorized)?;

        let signature = URL_SAFE_NO_PAD
            .decode(encoded_signature)
            .map_err(|_| ServiceError::Unauthorized)?;

        self.mac(encoded_claims)?
            .verify_slice(&signature)
            .map_err(|_| ServiceError::Unauthorized)?;

        let claims: SessionClaims = URL_SAFE_NO_PAD
            .decode(encoded_claims)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .ok_or(ServiceError::Unauthorized)?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(ServiceError::Unauthorized);
        }

        Ok(claims)
    }

    /// Signs arbitrary claims. Exposed so callers can mint tokens with a chosen expiry.
    pub fn sign(&self, claims: &SessionClaims) -> Result<String, ServiceError> {
        let raw = serde_json::to_vec(claims)
            .map_err(|e| ServiceError::Internal(format!("cannot encode claims: {e}")))?;
        let encoded_claims = URL_SAFE_NO_PAD.encode(raw);
        let signature = self.mac(&encoded_claims)?.finalize().into_bytes();

        Ok(format!("{encoded_claims}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    pub fn cookie_secure(&self) -> bool {
        self.config.cookie_secure
    }

    fn mac(&self, encoded_claims: &str) -> Result<HmacSha256, ServiceError> {
        let mut mac = HmacSha256::new_from_slice(self.config.session_secret.as_bytes())
            .map_err(|_| ServiceError::Unauthorized)?;
        mac.update(encoded_claims.as_bytes());
        Ok(mac)
    }
}
