use std::fmt;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, TokenError},
    payload::Payload,
    types::{UserID, Username},
};

pub const MIN_SECRET_KEY_SIZE: usize = 32;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// The process-wide HMAC key. Construction is the only place its length is checked.
#[derive(Clone)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.len() < MIN_SECRET_KEY_SIZE {
            return Err(ConfigError::SecretKeyTooShort {
                minimum: MIN_SECRET_KEY_SIZE,
                actual: key.len(),
            });
        }

        Ok(Self(key))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Claims as they appear on the wire. Only [`Payload`] is used outside this module.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: String,
    iss: String,
    iat: i64,
    exp: i64,
    id: i32,
    issued_at: DateTime<Utc>,
    expired_at: DateTime<Utc>,
}

impl WireClaims {
    fn from_payload(payload: &Payload, issuer: &str) -> Self {
        Self {
            sub: payload.username.0.clone(),
            iss: issuer.to_owned(),
            iat: payload.issued_at.timestamp(),
            exp: payload.expires_at.timestamp(),
            id: payload.id.0,
            issued_at: payload.issued_at,
            expired_at: payload.expires_at,
        }
    }

    fn into_payload(self) -> Payload {
        Payload {
            id: UserID(self.id),
            username: Username(self.sub),
            issued_at: self.issued_at,
            expires_at: self.expired_at,
        }
    }
}

/// Issues and verifies signed access tokens.
#[derive(Clone)]
pub struct TokenCodec {
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &SecretKey, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        // Any HMAC variant may be presented; everything else (including "none") is refused.
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.set_issuer(&[&issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        // Expiry is decided by Payload::validate at full precision.
        validation.validate_exp = false;

        Self {
            issuer,
            encoding_key: EncodingKey::from_secret(secret.0.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.0.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, payload: &Payload) -> Result<String, TokenError> {
        let claims = WireClaims::from_payload(payload, &self.issuer);

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|source| TokenError::Signing { source })
    }

    pub fn verify(&self, token: &str) -> Result<Payload, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify the signature first, then liveness against `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Payload, TokenError> {
        let data = decode::<WireClaims>(token, &self.decoding_key, &self.validation).map_err(
            |source| TokenError::InvalidToken {
                source: Some(source),
            },
        )?;

        let payload = data.claims.into_payload();
        payload.validate(now)?;

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use chrono::Duration;
    use proptest::prelude::*;

    use super::*;

    const KEY_A: &str = "an-adequately-long-secret-key-for-tests-A";
    const KEY_B: &str = "an-adequately-long-secret-key-for-tests-B";

    fn codec(key: &str) -> TokenCodec {
        TokenCodec::new(&SecretKey::new(key).unwrap(), "plog")
    }

    fn alice(duration: Duration) -> Payload {
        Payload::new(UserID(1), Username("alice".into()), duration)
    }

    #[test]
    fn short_keys_are_rejected() {
        assert!(matches!(
            SecretKey::new("too short"),
            Err(ConfigError::SecretKeyTooShort {
                minimum: 32,
                actual: 9
            })
        ));
        assert!(SecretKey::new("x".repeat(MIN_SECRET_KEY_SIZE)).is_ok());
    }

    #[test]
    fn secret_key_debug_is_redacted() {
        let key = SecretKey::new(KEY_A).unwrap();
        assert!(!format!("{key:?}").contains(KEY_A));
    }

    #[test]
    fn issue_then_verify_returns_original_payload() {
        let codec = codec(KEY_A);
        let payload = alice(Duration::minutes(5));

        let token = codec.issue(&payload).unwrap();
        assert_eq!(codec.verify(&token).unwrap(), payload);
    }

    #[test]
    fn issuing_is_deterministic() {
        let codec = codec(KEY_A);
        let payload = alice(Duration::minutes(5));

        assert_eq!(codec.issue(&payload).unwrap(), codec.issue(&payload).unwrap());
    }

    #[test]
    fn wrong_key_is_invalid() {
        let token = codec(KEY_A).issue(&alice(Duration::minutes(5))).unwrap();

        assert!(matches!(
            codec(KEY_B).verify(&token),
            Err(TokenError::InvalidToken { .. })
        ));
    }

    #[test]
    fn wrong_issuer_is_invalid() {
        let secret = SecretKey::new(KEY_A).unwrap();
        let token = TokenCodec::new(&secret, "someone-else")
            .issue(&alice(Duration::minutes(5)))
            .unwrap();

        assert!(matches!(
            TokenCodec::new(&secret, "plog").verify(&token),
            Err(TokenError::InvalidToken { .. })
        ));
    }

    #[test]
    fn expired_token_is_expired_not_invalid() {
        let codec = codec(KEY_A);
        let issued = Utc::now() - Duration::minutes(10);
        let payload = Payload::new_at(UserID(1), Username("alice".into()), Duration::minutes(1), issued);
        let token = codec.issue(&payload).unwrap();

        assert!(matches!(codec.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn expiry_has_sub_second_precision() {
        let codec = codec(KEY_A);
        let payload = alice(Duration::milliseconds(1500));
        let token = codec.issue(&payload).unwrap();

        assert!(codec.verify_at(&token, payload.expires_at).is_ok());
        assert!(matches!(
            codec.verify_at(&token, payload.expires_at + Duration::milliseconds(1)),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn expired_token_with_wrong_key_is_invalid() {
        let issued = Utc::now() - Duration::minutes(10);
        let payload = Payload::new_at(UserID(1), Username("alice".into()), Duration::minutes(1), issued);
        let token = codec(KEY_A).issue(&payload).unwrap();

        assert!(matches!(
            codec(KEY_B).verify(&token),
            Err(TokenError::InvalidToken { .. })
        ));
    }

    #[test]
    fn every_single_byte_flip_is_invalid() {
        let codec = codec(KEY_A);
        let token = codec.issue(&alice(Duration::minutes(5))).unwrap();

        for i in 0..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] ^= 0x01;
            let tampered = String::from_utf8(bytes).unwrap();

            assert!(
                matches!(codec.verify(&tampered), Err(TokenError::InvalidToken { .. })),
                "flipping byte {i} was not detected"
            );
        }
    }

    #[test]
    fn algorithm_substitution_is_rejected() {
        let codec = codec(KEY_A);
        let token = codec.issue(&alice(Duration::minutes(5))).unwrap();
        let mut parts = token.split('.');
        let _header = parts.next().unwrap();
        let claims = parts.next().unwrap();
        let signature = parts.next().unwrap();

        let none_header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let unsigned = format!("{none_header}.{claims}.");
        assert!(matches!(
            codec.verify(&unsigned),
            Err(TokenError::InvalidToken { .. })
        ));

        let rsa_header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
        let substituted = format!("{rsa_header}.{claims}.{signature}");
        assert!(matches!(
            codec.verify(&substituted),
            Err(TokenError::InvalidToken { .. })
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        let codec = codec(KEY_A);
        for token in ["", "abc", "a.b.c", "...", "not a token at all"] {
            assert!(matches!(
                codec.verify(token),
                Err(TokenError::InvalidToken { .. })
            ));
        }
    }

    proptest! {
        #[test]
        fn roundtrip_preserves_identity_and_timestamps(
            id in any::<i32>(),
            username in "[a-zA-Z0-9]{0,50}",
            seconds in 1i64..1_000_000,
        ) {
            let codec = codec(KEY_A);
            let payload = Payload::new(UserID(id), Username(username), Duration::seconds(seconds));

            let token = codec.issue(&payload).unwrap();
            prop_assert_eq!(codec.verify(&token).unwrap(), payload);
        }
    }
}
