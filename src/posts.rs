use std::{error::Error, sync::Arc};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use warp::{http::StatusCode, Rejection, Reply};

use crate::{
    error::ApiError,
    ownership::{self, OwnershipError},
    types::{AuthenticatedUser, Post, PostID, UserID},
};

pub type SharedPostDatabase = Arc<Mutex<dyn PostDatabase>>;

#[async_trait]
pub trait PostDatabase: Send + Sync + 'static {
    /// Store a new post owned by `author` and return it with its assigned id.
    async fn create_post(
        &mut self,
        author: &AuthenticatedUser,
        title: &str,
        content: &str,
    ) -> Result<Post, Box<dyn Error + Send + Sync>>;

    async fn get_post(&self, id: PostID) -> Result<Option<Post>, Box<dyn Error + Send + Sync>>;

    /// Newest first.
    async fn list_posts(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Post>, Box<dyn Error + Send + Sync>>;

    async fn list_posts_by_owner(
        &self,
        owner: UserID,
    ) -> Result<Vec<Post>, Box<dyn Error + Send + Sync>>;

    /// The id of the user who created the post, if the post exists.
    async fn find_post_owner(
        &self,
        id: PostID,
    ) -> Result<Option<UserID>, Box<dyn Error + Send + Sync>>;

    /// Replace title and content. Returns `None` if the post no longer exists.
    async fn update_post(
        &mut self,
        id: PostID,
        title: &str,
        content: &str,
    ) -> Result<Option<Post>, Box<dyn Error + Send + Sync>>;

    /// Returns whether a post was removed.
    async fn delete_post(&mut self, id: PostID) -> Result<bool, Box<dyn Error + Send + Sync>>;
}

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;
const MIN_TITLE_LEN: usize = 3;
const MAX_TITLE_LEN: usize = 255;

#[derive(Debug, Deserialize)]
pub struct PostInput {
    pub title: String,
    pub content: String,
}

impl PostInput {
    fn validate(&self) -> Result<(), ApiError> {
        let title_len = self.title.chars().count();
        if !(MIN_TITLE_LEN..=MAX_TITLE_LEN).contains(&title_len) {
            return Err(ApiError::InvalidInput(format!(
                "title must be between {MIN_TITLE_LEN} and {MAX_TITLE_LEN} characters"
            )));
        }
        if self.content.is_empty() {
            return Err(ApiError::InvalidInput("content is required".into()));
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT.into()
}

impl ListPostsQuery {
    fn bounds(&self) -> Result<(u32, u32), ApiError> {
        let limit = u32::try_from(self.limit)
            .ok()
            .filter(|limit| (1..=MAX_LIMIT).contains(limit))
            .ok_or_else(|| {
                ApiError::InvalidInput(format!("limit must be between 1 and {MAX_LIMIT}"))
            })?;
        let offset = u32::try_from(self.offset)
            .map_err(|_| ApiError::InvalidInput("offset must not be negative".into()))?;

        Ok((limit, offset))
    }
}

pub(crate) async fn create_post(
    user: AuthenticatedUser,
    input: PostInput,
    posts: SharedPostDatabase,
) -> Result<impl Reply, Rejection> {
    input.validate()?;

    let post = posts
        .lock()
        .await
        .create_post(&user, &input.title, &input.content)
        .await
        .map_err(ApiError::from)?;

    info!(post_id = %post.id, user_id = %user.id, "post created");

    Ok(warp::reply::with_status(
        warp::reply::json(&post),
        StatusCode::CREATED,
    ))
}

pub(crate) async fn get_post(id: PostID, posts: SharedPostDatabase) -> Result<impl Reply, Rejection> {
    let post = posts
        .lock()
        .await
        .get_post(id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::PostNotFound)?;

    Ok(warp::reply::json(&post))
}

pub(crate) async fn list_posts(
    query: ListPostsQuery,
    posts: SharedPostDatabase,
) -> Result<impl Reply, Rejection> {
    let (limit, offset) = query.bounds()?;

    let page = posts
        .lock()
        .await
        .list_posts(limit, offset)
        .await
        .map_err(ApiError::from)?;

    Ok(warp::reply::json(&page))
}

pub(crate) async fn list_my_posts(
    user: AuthenticatedUser,
    posts: SharedPostDatabase,
) -> Result<impl Reply, Rejection> {
    let mine = posts
        .lock()
        .await
        .list_posts_by_owner(user.id)
        .await
        .map_err(ApiError::from)?;

    Ok(warp::reply::json(&mine))
}

pub(crate) async fn update_post(
    id: PostID,
    user: AuthenticatedUser,
    input: PostInput,
    posts: SharedPostDatabase,
) -> Result<impl Reply, Rejection> {
    input.validate()?;

    let mut db = posts.lock().await;
    check_owner(&*db, id, &user).await?;

    let post = db
        .update_post(id, &input.title, &input.content)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::PostNotModifiable {
            post_id: id,
            reason: OwnershipError::NotFound,
        })?;

    info!(post_id = %id, user_id = %user.id, "post updated");

    Ok(warp::reply::json(&post))
}

pub(crate) async fn delete_post(
    id: PostID,
    user: AuthenticatedUser,
    posts: SharedPostDatabase,
) -> Result<impl Reply, Rejection> {
    let mut db = posts.lock().await;
    check_owner(&*db, id, &user).await?;

    if !db.delete_post(id).await.map_err(ApiError::from)? {
        Err(ApiError::PostNotModifiable {
            post_id: id,
            reason: OwnershipError::NotFound,
        })?;
    }

    info!(post_id = %id, user_id = %user.id, "post deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn check_owner(
    db: &dyn PostDatabase,
    id: PostID,
    user: &AuthenticatedUser,
) -> Result<(), ApiError> {
    let owner = db.find_post_owner(id).await?;

    ownership::authorize_lookup(user.id, owner).map_err(|reason| {
        debug!(post_id = %id, user_id = %user.id, %reason, "mutation refused");
        ApiError::PostNotModifiable { post_id: id, reason }
    })
}
