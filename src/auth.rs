use std::{error::Error, sync::Arc};

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::{Mutex, OnceCell};

use crate::{
    error::{ApiError, TokenError},
    password,
    payload::Payload,
    token::{SecretKey, TokenCodec},
    types::{Credential, HashedPassword, User, Username},
};

#[async_trait]
pub trait UserDatabase: Send + Sync + 'static {
    /// Create the specified user and return it. If a user with the given username already exists,
    /// return `None` and leave the existing account untouched.
    async fn create_user_if_not_exists(
        &mut self,
        username: &Username,
        hashed_password: &HashedPassword,
    ) -> Result<Option<User>, Box<dyn Error + Send + Sync>>;

    /// Retrieve the user and hashed password for the specified username.
    async fn find_credential_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Credential>, Box<dyn Error + Send + Sync>>;
}

// Verified against when a login names an unknown user.
const DUMMY_PASSWORD: &str = "plog-unknown-user";

#[derive(Clone)]
pub struct AuthConfig {
    /// The issuer for auth tokens. We will validate that all auth tokens match the given issuer.
    pub auth_token_issuer: String,
    /// The key used to sign auth tokens.
    /// If the key changes, all currently authenticated sessions will be terminated.
    pub auth_token_secret: SecretKey,
    /// How long auth tokens should remain valid for. After this interval, the client will have to re-login.
    pub auth_token_lifetime: Duration,
    pub database_connection: Arc<Mutex<dyn UserDatabase>>,
}

pub(crate) struct AuthInternal {
    codec: TokenCodec,
    token_lifetime: Duration,
    database_connection: Arc<Mutex<dyn UserDatabase>>,
    dummy_hash: OnceCell<HashedPassword>,
}

impl AuthInternal {
    pub async fn hash(&self, password: String) -> Result<HashedPassword, ApiError> {
        let hashed = tokio::task::spawn_blocking(move || password::hash_password(&password))
            .await
            .map_err(|e| ApiError::TaskFailed(e.to_string()))??;

        Ok(hashed)
    }

    pub async fn verify_hash(
        &self,
        password: String,
        hash: HashedPassword,
    ) -> Result<bool, ApiError> {
        tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
            .await
            .map_err(|e| ApiError::TaskFailed(e.to_string()))
    }

    /// Spend the same Argon2 work as a real verification, so a login for an unknown
    /// username takes as long as one with a wrong password.
    pub async fn verify_unknown_user(&self, password: String) -> Result<(), ApiError> {
        let dummy = self.dummy_hash().await?.clone();
        self.verify_hash(password, dummy).await?;

        Ok(())
    }

    async fn dummy_hash(&self) -> Result<&HashedPassword, ApiError> {
        self.dummy_hash
            .get_or_try_init(|| self.hash(DUMMY_PASSWORD.into()))
            .await
    }

    pub fn generate_token(&self, user: &User) -> Result<String, ApiError> {
        let payload = Payload::new(user.id, user.username.clone(), self.token_lifetime);

        Ok(self.codec.issue(&payload)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Payload, TokenError> {
        self.codec.verify(token)
    }

    pub async fn create_user_if_not_exists(
        &self,
        username: &Username,
        hashed_password: &HashedPassword,
    ) -> Result<Option<User>, ApiError> {
        let user = self
            .database_connection
            .lock()
            .await
            .create_user_if_not_exists(username, hashed_password)
            .await?;

        Ok(user)
    }

    pub async fn find_credential(&self, username: &Username) -> Result<Option<Credential>, ApiError> {
        let credential = self
            .database_connection
            .lock()
            .await
            .find_credential_by_username(username)
            .await?;

        Ok(credential)
    }
}

/// Shared, read-only authentication state. Cloning is cheap.
#[derive(Clone)]
pub struct Auth {
    pub(crate) internal: Arc<AuthInternal>,
}

impl Auth {
    pub fn new(config: AuthConfig) -> Self {
        let codec = TokenCodec::new(&config.auth_token_secret, config.auth_token_issuer);

        Self {
            internal: Arc::new(AuthInternal {
                codec,
                token_lifetime: config.auth_token_lifetime,
                database_connection: config.database_connection,
                dummy_hash: OnceCell::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryUserDatabase;

    fn auth() -> Auth {
        Auth::new(AuthConfig {
            auth_token_issuer: "plog-test".into(),
            auth_token_secret: SecretKey::new(String::from("0123456789abcdef0123456789abcdef")).unwrap(),
            auth_token_lifetime: Duration::minutes(15),
            database_connection: Arc::new(Mutex::new(MemoryUserDatabase::new())),
        })
    }

    #[tokio::test]
    async fn unknown_user_runs_a_real_verification() {
        let auth = auth();

        auth.internal
            .verify_unknown_user("whatever".into())
            .await
            .unwrap();

        let first = auth.internal.dummy_hash().await.unwrap().clone();
        assert!(first.0.starts_with("$argon2id$"));
        assert!(!password::verify_password("whatever", &first));

        auth.internal
            .verify_unknown_user("something else".into())
            .await
            .unwrap();

        // computed once and reused
        assert_eq!(auth.internal.dummy_hash().await.unwrap().0, first.0);
    }
}
