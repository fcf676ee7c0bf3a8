use std::{fmt, num::ParseIntError, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[repr(transparent)]
pub struct UserID(pub i32);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[repr(transparent)]
pub struct Username(pub String);

#[derive(Debug, Clone, Deserialize, Serialize)]
#[repr(transparent)]
pub struct HashedPassword(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[repr(transparent)]
pub struct PostID(pub i32);

impl FromStr for PostID {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(PostID)
    }
}

impl fmt::Display for PostID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for UserID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered account, as returned to clients. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: UserID,
    pub username: Username,
    pub created_at: DateTime<Utc>,
}

/// What the auth layer needs from the user store to check a login.
#[derive(Debug, Clone)]
pub struct Credential {
    pub user: User,
    pub hashed_password: HashedPassword,
}

/// The verified identity attached to a single in-flight request by the auth gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: UserID,
    pub username: Username,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Post {
    pub id: PostID,
    /// Creator of the post. Set once at creation and used for ownership checks.
    pub user_id: UserID,
    pub author_username: Username,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_id_parses_from_path_segment() {
        assert_eq!("42".parse::<PostID>().unwrap(), PostID(42));
        assert!("abc".parse::<PostID>().is_err());
    }

    #[test]
    fn newtypes_serialize_as_inner_value() {
        let json = serde_json::to_string(&AuthenticatedUser {
            id: UserID(7),
            username: Username("alice".into()),
        })
        .unwrap();

        assert_eq!(json, r#"{"id":7,"username":"alice"}"#);
    }
}
