use std::{convert::Infallible, sync::Arc};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use warp::{
    filters::{body::BodyDeserializeError, cors::Builder},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode},
    path,
    reject::InvalidQuery,
    Filter, Rejection, Reply,
};

use crate::{
    auth::{Auth, AuthInternal},
    authorization_header_ext::AuthorizationHeaderExt,
    error::{ApiError, TokenError},
    posts::{self, SharedPostDatabase},
    types::{AuthenticatedUser, PostID, User, Username},
};

const MAX_BODY_BYTES: u64 = 64 * 1024;
const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 50;
const MIN_PASSWORD_LEN: usize = 6;

pub fn build_api_route_filter(
    auth: &Auth,
    posts: &SharedPostDatabase,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let health = path!("api" / "v1" / "health")
        .and(warp::get())
        .map(warp::reply);

    let register = path!("api" / "v1" / "register")
        .and(warp::post())
        .and(json_body())
        .and(with_auth_state(auth.internal.clone()))
        .and_then(user_register);

    let login = path!("api" / "v1" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_auth_state(auth.internal.clone()))
        .and_then(user_login);

    let list_posts = path!("api" / "v1" / "posts")
        .and(warp::get())
        .and(warp::query())
        .and(with_posts(posts.clone()))
        .and_then(posts::list_posts);

    let get_post = path!("api" / "v1" / "posts" / PostID)
        .and(warp::get())
        .and(with_posts(posts.clone()))
        .and_then(posts::get_post);

    let create_post = path!("api" / "v1" / "posts")
        .and(warp::post())
        .and(with_auth(auth))
        .and(json_body())
        .and(with_posts(posts.clone()))
        .and_then(posts::create_post);

    let update_post = path!("api" / "v1" / "posts" / PostID)
        .and(warp::put())
        .and(with_auth(auth))
        .and(json_body())
        .and(with_posts(posts.clone()))
        .and_then(posts::update_post);

    let delete_post = path!("api" / "v1" / "posts" / PostID)
        .and(warp::delete())
        .and(with_auth(auth))
        .and(with_posts(posts.clone()))
        .and_then(posts::delete_post);

    let my_posts = path!("api" / "v1" / "my-posts")
        .and(warp::get())
        .and(with_auth(auth))
        .and(with_posts(posts.clone()))
        .and_then(posts::list_my_posts);

    health
        .or(register)
        .or(login)
        .or(list_posts)
        .or(get_post)
        .or(create_post)
        .or(update_post)
        .or(delete_post)
        .or(my_posts)
}

/// Authentication gate. Extracts the verified identity of the caller, or rejects the request.
pub fn with_auth(
    auth: &Auth,
) -> impl Filter<Extract = (AuthenticatedUser,), Error = Rejection> + Clone {
    // The raw value is taken so that non-ASCII bytes reach the gate instead of warp's 400.
    warp::header::headers_cloned()
        .map(|headers: HeaderMap| headers.get(AUTHORIZATION).cloned())
        .and(with_auth_state(auth.internal.clone()))
        .and_then(user_auth_check)
}

/// Cross-origin policy for a single browser frontend.
pub fn cors(allowed_origin: &str) -> Builder {
    warp::cors()
        .allow_origin(allowed_origin)
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_headers(vec!["Origin", "Content-Length", "Content-Type", "Authorization"])
        .allow_credentials(true)
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(api_error) = err.find::<ApiError>() {
        let status = api_error.status();
        let message = if status.is_server_error() {
            error!(error = %api_error, source = ?std::error::Error::source(api_error), "request failed");
            "an unknown error has occurred".to_string()
        } else {
            api_error.to_string()
        };
        return Ok(error_reply(message, status));
    }

    if let Some(e) = err.find::<BodyDeserializeError>() {
        return Ok(error_reply(
            format!("invalid input: {e}"),
            StatusCode::BAD_REQUEST,
        ));
    }

    if let Some(e) = err.find::<InvalidQuery>() {
        return Ok(error_reply(
            format!("invalid input: {e}"),
            StatusCode::BAD_REQUEST,
        ));
    }

    Err(err)
}

fn error_reply(message: String, status: StatusCode) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&json!({ "error": message })), status)
}

#[derive(Debug, Deserialize)]
pub struct RegisterQuery {
    pub username: String,
    pub password: String,
}

impl RegisterQuery {
    fn validate(&self) -> Result<(), ApiError> {
        let name_len = self.username.chars().count();
        if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&name_len)
            || !self.username.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ApiError::InvalidInput(format!(
                "username must be {MIN_USERNAME_LEN} to {MAX_USERNAME_LEN} letters or digits"
            )));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::InvalidInput(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(())
    }
}

async fn user_register(
    input: RegisterQuery,
    auth: Arc<AuthInternal>,
) -> Result<impl Reply, Rejection> {
    input.validate()?;

    let username = Username(input.username);
    let hashed_password = auth.hash(input.password).await?;

    let user = auth
        .create_user_if_not_exists(&username, &hashed_password)
        .await?
        .ok_or(ApiError::UsernameAlreadyTaken)?;

    info!(user_id = %user.id, "user registered");

    Ok(warp::reply::with_status(
        warp::reply::json(&user),
        StatusCode::CREATED,
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: User,
}

async fn user_login(input: LoginQuery, auth: Arc<AuthInternal>) -> Result<impl Reply, Rejection> {
    if input.username.is_empty() || input.password.is_empty() {
        Err(ApiError::InvalidInput(
            "username and password are required".into(),
        ))?;
    }

    let username = Username(input.username);

    let Some(credential) = auth.find_credential(&username).await? else {
        auth.verify_unknown_user(input.password).await?;
        warn!(reason = "unknown_user", "login failed");
        return Err(ApiError::LoginFailed.into());
    };

    if !auth
        .verify_hash(input.password, credential.hashed_password)
        .await?
    {
        warn!(user_id = %credential.user.id, reason = "wrong_password", "login failed");
        Err(ApiError::LoginFailed)?;
    }

    let access_token = auth.generate_token(&credential.user)?;

    info!(user_id = %credential.user.id, "user logged in");

    Ok(warp::reply::json(&LoginResponse {
        access_token,
        user: credential.user,
    }))
}

// Unwrap the bearer token and validate it
async fn user_auth_check(
    header: Option<HeaderValue>,
    auth: Arc<AuthInternal>,
) -> Result<AuthenticatedUser, Rejection> {
    // An empty or blank header counts as no header at all.
    let header = header
        .filter(|value| value.as_bytes().iter().any(|b| !b.is_ascii_whitespace()))
        .ok_or_else(|| {
            warn!(reason = "missing_credentials", "request rejected");
            ApiError::MissingCredentials
        })?;

    let header = header.to_str().map_err(|_| {
        warn!(reason = "malformed_header", "request rejected");
        ApiError::MalformedHeader
    })?;

    let token = header.bearer_token().map_err(|e| {
        warn!(reason = "malformed_header", error = %e, "request rejected");
        e
    })?;

    let payload = auth.verify_token(token).map_err(|e| {
        let reason = match &e {
            TokenError::Expired => "token_expired",
            _ => "invalid_token",
        };
        warn!(reason, "request rejected");
        ApiError::from(e)
    })?;

    Ok(payload.into())
}

// functor that adds a reference to the internal auth state into the filter chain
fn with_auth_state(
    auth: Arc<AuthInternal>,
) -> impl Filter<Extract = (Arc<AuthInternal>,), Error = Infallible> + Clone {
    warp::any().map(move || auth.clone())
}

fn with_posts(
    posts: SharedPostDatabase,
) -> impl Filter<Extract = (SharedPostDatabase,), Error = Infallible> + Clone {
    warp::any().map(move || posts.clone())
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(username: &str, password: &str) -> RegisterQuery {
        RegisterQuery {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn registration_rules() {
        assert!(register("alice", "secret1").validate().is_ok());
        assert!(register("al", "secret1").validate().is_err());
        assert!(register("alice smith", "secret1").validate().is_err());
        assert!(register(&"a".repeat(51), "secret1").validate().is_err());
        assert!(register("alice", "short").validate().is_err());
    }
}
