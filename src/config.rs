//! Command line arguments and environment variables, parsed with clap.

use std::net::SocketAddr;

use chrono::Duration;
use clap::Parser;

use crate::{error::ConfigError, token::SecretKey};

/// plog - blog posts with stateless token authentication
#[derive(Parser, Debug, Clone)]
#[command(name = "plog")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Key used to sign access tokens, at least 32 bytes
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TOKEN_DURATION_SECS", default_value_t = 900)]
    pub access_token_duration_secs: u32,

    /// Issuer written into and required from every access token
    #[arg(long, env = "TOKEN_ISSUER", default_value = "plog")]
    pub token_issuer: String,

    /// Origin of the browser frontend allowed by CORS
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:3000")]
    pub cors_origin: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn secret_key(&self) -> Result<SecretKey, ConfigError> {
        SecretKey::new(self.jwt_secret.clone())
    }

    pub fn token_lifetime(&self) -> Duration {
        Duration::seconds(self.access_token_duration_secs.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["plog", "--jwt-secret", SECRET]).unwrap();

        assert_eq!(args.listen, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(args.token_lifetime(), Duration::minutes(15));
        assert_eq!(args.token_issuer, "plog");
        assert!(args.secret_key().is_ok());
    }

    #[test]
    fn short_secret_is_a_config_error() {
        let args = Args::try_parse_from(["plog", "--jwt-secret", "too-short"]).unwrap();

        assert!(matches!(
            args.secret_key(),
            Err(ConfigError::SecretKeyTooShort { actual: 9, .. })
        ));
    }

    #[test]
    fn custom_lifetime() {
        let args = Args::try_parse_from([
            "plog",
            "--jwt-secret",
            SECRET,
            "--access-token-duration-secs",
            "60",
        ])
        .unwrap();

        assert_eq!(args.token_lifetime(), Duration::seconds(60));
    }
}
