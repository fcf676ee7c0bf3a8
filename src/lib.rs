mod auth;
mod authorization_header_ext;
pub mod config;
mod error;
pub mod memory;
pub mod ownership;
pub mod password;
mod payload;
mod posts;
mod routes;
pub mod telemetry;
pub mod token;
mod types;

pub use auth::*;
pub use error::*;
pub use payload::*;
pub use posts::{ListPostsQuery, PostDatabase, PostInput, SharedPostDatabase};
pub use routes::*;
pub use types::*;
