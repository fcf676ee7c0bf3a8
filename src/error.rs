use warp::{http::StatusCode, reject::Reject};

use crate::{ownership::OwnershipError, types::PostID};

#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    /// Unrecognised structure, bad signature, wrong algorithm family or issuer.
    #[error("invalid token")]
    InvalidToken {
        #[source]
        source: Option<jsonwebtoken::errors::Error>,
    },
    /// Correctly signed, but verified after its expiry instant.
    #[error("token has expired")]
    Expired,
    #[error("failed to sign token")]
    Signing {
        #[source]
        source: jsonwebtoken::errors::Error,
    },
}

#[derive(thiserror::Error, Debug)]
#[error("failed to hash password")]
pub struct HashingFailure {
    #[from]
    source: argon2::Error,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("secret key must be at least {minimum} bytes, got {actual}")]
    SecretKeyTooShort { minimum: usize, actual: usize },
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("authorization header is required")]
    MissingCredentials,
    #[error("invalid authorization header")]
    MalformedHeader,
    #[error("unsupported authorization type: {0}")]
    UnsupportedScheme(String),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("invalid username or password")]
    LoginFailed,
    #[error("an account with that username already exists")]
    UsernameAlreadyTaken,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("post not found")]
    PostNotFound,
    /// Missing and not-owned posts share this variant so callers cannot tell whether a post exists.
    #[error("post not found or you don't have permission to modify it")]
    PostNotModifiable {
        post_id: PostID,
        reason: OwnershipError,
    },
    #[error(transparent)]
    Hashing(#[from] HashingFailure),
    #[error("background task failed: {0}")]
    TaskFailed(String),
    #[error("error during database operation")]
    DatabaseError {
        #[from]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCredentials
            | ApiError::MalformedHeader
            | ApiError::UnsupportedScheme(_)
            | ApiError::Token(TokenError::InvalidToken { .. } | TokenError::Expired)
            | ApiError::LoginFailed => StatusCode::UNAUTHORIZED,
            ApiError::UsernameAlreadyTaken => StatusCode::CONFLICT,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::PostNotFound | ApiError::PostNotModifiable { .. } => StatusCode::NOT_FOUND,
            ApiError::Token(TokenError::Signing { .. })
            | ApiError::Hashing(_)
            | ApiError::TaskFailed(_)
            | ApiError::DatabaseError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Reject for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_and_invalid_tokens_are_both_unauthorized() {
        let expired = ApiError::from(TokenError::Expired);
        let invalid = ApiError::from(TokenError::InvalidToken { source: None });

        assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(expired.to_string(), "token has expired");
        assert_eq!(invalid.to_string(), "invalid token");
    }

    #[test]
    fn ownership_failures_render_identically() {
        let missing = ApiError::PostNotModifiable {
            post_id: PostID(1),
            reason: OwnershipError::NotFound,
        };
        let forbidden = ApiError::PostNotModifiable {
            post_id: PostID(1),
            reason: OwnershipError::Forbidden,
        };

        assert_eq!(missing.status(), forbidden.status());
        assert_eq!(missing.to_string(), forbidden.to_string());
    }
}
