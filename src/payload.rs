use chrono::{DateTime, Duration, Utc};

use crate::{
    error::TokenError,
    types::{AuthenticatedUser, UserID, Username},
};

/// The identity and timing data carried inside an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub id: UserID,
    pub username: Username,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Payload {
    pub fn new(id: UserID, username: Username, duration: Duration) -> Self {
        Self::new_at(id, username, duration, Utc::now())
    }

    /// Build a payload issued at `now`. Expiry saturates instead of overflowing.
    pub fn new_at(id: UserID, username: Username, duration: Duration, now: DateTime<Utc>) -> Self {
        let expires_at = now
            .checked_add_signed(duration)
            .unwrap_or(if duration < Duration::zero() {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            });

        Self {
            id,
            username,
            issued_at: now,
            expires_at,
        }
    }

    /// Liveness check, run on every verification.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), TokenError> {
        if now > self.expires_at {
            return Err(TokenError::Expired);
        }

        Ok(())
    }
}

impl From<Payload> for AuthenticatedUser {
    fn from(payload: Payload) -> Self {
        AuthenticatedUser {
            id: payload.id,
            username: payload.username,
        }
    }
}
