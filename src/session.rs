use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Bearer token plus the expiry instant decoded from its `exp` claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub raw: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ExpClaim {
    exp: i64,
}

impl Token {
    /// Build a token from the raw JWT. A token whose payload cannot be
    /// decoded is treated as already expired, which forces a refresh on the
    /// next authenticated call instead of failing here.
    pub fn from_jwt(raw: impl Into<String>) -> Token {
        let raw = raw.into();
        let expires_at = decode_expiry(&raw).unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap());
        Token { raw, expires_at }
    }

    pub fn is_valid_with_skew(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        now + skew < self.expires_at
    }
}

fn decode_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let payload = raw.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.as_bytes()).ok()?;
    let claims: ExpClaim = serde_json::from_slice(&bytes).ok()?;
    Utc.timestamp_opt(claims.exp, 0).single()
}

/// Seam for the remote refresh call, kept as a trait so the lifecycle logic
/// is testable without a server. The production implementation lives in the
/// API client and posts the current bearer token to `/auth/refresh`.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, current: &Token) -> Result<Token, ApiError>;
}

/// Owns the one credential shared by every authenticated call.
///
/// All refresh activity is serialized through the internal async mutex: a
/// caller parked behind an in-flight refresh re-checks validity once it gets
/// the lock and reuses the fresh token instead of refreshing again. A
/// refreshed token is therefore never clobbered by a staler one.
pub struct SessionManager {
    state: Mutex<Option<Token>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    /// Install a token obtained from login.
    pub async fn install(&self, token: Token) {
        let mut guard = self.state.lock().await;
        *guard = Some(token);
    }

    pub async fn current(&self) -> Option<Token> {
        self.state.lock().await.clone()
    }

    /// Drop the credential. Used on logout and on terminal 401.
    pub async fn clear(&self) {
        let mut guard = self.state.lock().await;
        *guard = None;
    }

    /// Return a token still valid beyond `now + skew`, refreshing at most
    /// once. With no stored token there is nothing to refresh with (the
    /// refresh endpoint is itself authenticated), so the session is over.
    pub async fn ensure_valid<R: TokenRefresher + ?Sized>(
        &self,
        refresher: &R,
        skew: Duration,
    ) -> Result<Token, ApiError> {
        let mut guard = self.state.lock().await;
        let current = match guard.as_ref() {
            Some(token) => token.clone(),
            None => return Err(ApiError::SessionExpired),
        };
        if current.is_valid_with_skew(Utc::now(), skew) {
            return Ok(current);
        }

        debug!(expires_at = %current.expires_at, "token inside skew window, refreshing");
        match refresher.refresh(&current).await {
            Ok(fresh) => {
                *guard = Some(fresh.clone());
                Ok(fresh)
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed, ending session");
                *guard = None;
                Err(ApiError::SessionExpired)
            }
        }
    }

    /// Unconditional refresh used for the single 401 replay. Clears the
    /// token when the refresh itself fails.
    pub async fn force_refresh<R: TokenRefresher + ?Sized>(
        &self,
        refresher: &R,
    ) -> Result<Token, ApiError> {
        let mut guard = self.state.lock().await;
        let current = match guard.as_ref() {
            Some(token) => token.clone(),
            None => return Err(ApiError::SessionExpired),
        };
        match refresher.refresh(&current).await {
            Ok(fresh) => {
                *guard = Some(fresh.clone());
                Ok(fresh)
            }
            Err(err) => {
                warn!(error = %err, "forced refresh failed, ending session");
                *guard = None;
                Err(ApiError::SessionExpired)
            }
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
