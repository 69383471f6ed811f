//! In-memory credential store.
//!
//! Holds the single shared access/refresh token pair with its computed
//! expiry. All reads and writes go through one critical section so a
//! half-written credential can never be observed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::warn;

/// Fallback validity when the access token carries no decodable expiry.
/// Matches the upstream platform's default token lifetime (2.5 h).
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(150 * 60);

/// The paired tokens plus computed expiry. Replaced wholesale on every
/// login/refresh, held in memory only.
#[derive(Clone)]
struct Credential {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

/// Thread-safe holder for the process-wide credential.
pub struct TokenStore {
    guard: chrono::Duration,
    credential: Mutex<Option<Credential>>,
}

impl TokenStore {
    /// Create a store with the given refresh-guard window.
    pub fn new(guard: Duration) -> Self {
        Self {
            guard: chrono::Duration::from_std(guard).unwrap_or(chrono::Duration::seconds(30)),
            credential: Mutex::new(None),
        }
    }

    /// Atomically replace the credential.
    ///
    /// The expiry is taken from the access token's `exp` claim via an
    /// unverified decode (trust-the-issuer, scheduling only). When the
    /// claim cannot be read, a conservative default validity is assumed.
    pub async fn update(&self, access: impl Into<String>, refresh: impl Into<String>) {
        let access = access.into();
        let expires_at = match decode_expiry(&access) {
            Ok(exp) => exp,
            Err(e) => {
                warn!("could not decode 'exp' from access token: {e}");
                Utc::now() + chrono::Duration::seconds(DEFAULT_TOKEN_TTL.as_secs() as i64)
            }
        };

        let mut slot = self.credential.lock().await;
        *slot = Some(Credential {
            access_token: access,
            refresh_token: refresh.into(),
            expires_at,
        });
    }

    /// Return the access token only while it is fresh enough, i.e.
    /// `now + guard < expires_at`. Never blocks on the network.
    pub async fn valid_access(&self) -> Option<String> {
        let slot = self.credential.lock().await;
        let cred = slot.as_ref()?;
        if Utc::now() + self.guard < cred.expires_at {
            Some(cred.access_token.clone())
        } else {
            None
        }
    }

    /// Snapshot of the current refresh token, if any.
    pub async fn refresh_credential(&self) -> Option<String> {
        let slot = self.credential.lock().await;
        slot.as_ref().map(|c| c.refresh_token.clone())
    }

    /// Drop the credential (shutdown / explicit close).
    pub async fn clear(&self) {
        let mut slot = self.credential.lock().await;
        *slot = None;
    }
}

#[derive(Deserialize)]
struct ExpiryClaims {
    exp: i64,
}

/// Extract the `exp` claim without verifying the signature.
///
/// This decode is never used for authorization decisions, only to schedule
/// proactive refreshes.
fn decode_expiry(access: &str) -> Result<DateTime<Utc>, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let data = jsonwebtoken::decode::<ExpiryClaims>(
        access,
        &DecodingKey::from_secret(&[]),
        &validation,
    )?;

    DateTime::from_timestamp(data.claims.exp, 0)
        .ok_or_else(|| jsonwebtoken::errors::ErrorKind::InvalidToken.into())
}
