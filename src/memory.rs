//! In-process stores for the two database traits.
//!
//! Used by the `plog` binary and the tests. Nothing survives a restart.

use std::{
    collections::{BTreeMap, HashMap},
    error::Error,
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    auth::UserDatabase,
    posts::PostDatabase,
    types::{AuthenticatedUser, Credential, HashedPassword, Post, PostID, User, UserID, Username},
};

#[derive(Default)]
pub struct MemoryUserDatabase {
    storage: HashMap<Username, Credential>,
    last_id: i32,
}

impl MemoryUserDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDatabase for MemoryUserDatabase {
    async fn create_user_if_not_exists(
        &mut self,
        username: &Username,
        hashed_password: &HashedPassword,
    ) -> Result<Option<User>, Box<dyn Error + Send + Sync>> {
        if self.storage.contains_key(username) {
            return Ok(None);
        }

        self.last_id = self.last_id.checked_add(1).ok_or("user id space exhausted")?;

        let user = User {
            id: UserID(self.last_id),
            username: username.clone(),
            created_at: Utc::now(),
        };
        self.storage.insert(
            username.clone(),
            Credential {
                user: user.clone(),
                hashed_password: hashed_password.clone(),
            },
        );

        Ok(Some(user))
    }

    async fn find_credential_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Credential>, Box<dyn Error + Send + Sync>> {
        Ok(self.storage.get(username).cloned())
    }
}

#[derive(Default)]
pub struct MemoryPostDatabase {
    storage: BTreeMap<PostID, Post>,
    last_id: i32,
}

impl MemoryPostDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostDatabase for MemoryPostDatabase {
    async fn create_post(
        &mut self,
        author: &AuthenticatedUser,
        title: &str,
        content: &str,
    ) -> Result<Post, Box<dyn Error + Send + Sync>> {
        self.last_id = self.last_id.checked_add(1).ok_or("post id space exhausted")?;

        let now = Utc::now();
        let post = Post {
            id: PostID(self.last_id),
            user_id: author.id,
            author_username: author.username.clone(),
            title: title.to_owned(),
            content: content.to_owned(),
            created_at: now,
            updated_at: now,
        };
        self.storage.insert(post.id, post.clone());

        Ok(post)
    }

    async fn get_post(&self, id: PostID) -> Result<Option<Post>, Box<dyn Error + Send + Sync>> {
        Ok(self.storage.get(&id).cloned())
    }

    async fn list_posts(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Post>, Box<dyn Error + Send + Sync>> {
        Ok(self
            .storage
            .values()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_posts_by_owner(
        &self,
        owner: UserID,
    ) -> Result<Vec<Post>, Box<dyn Error + Send + Sync>> {
        Ok(self
            .storage
            .values()
            .rev()
            .filter(|post| post.user_id == owner)
            .cloned()
            .collect())
    }

    async fn find_post_owner(
        &self,
        id: PostID,
    ) -> Result<Option<UserID>, Box<dyn Error + Send + Sync>> {
        Ok(self.storage.get(&id).map(|post| post.user_id))
    }

    async fn update_post(
        &mut self,
        id: PostID,
        title: &str,
        content: &str,
    ) -> Result<Option<Post>, Box<dyn Error + Send + Sync>> {
        let Some(post) = self.storage.get_mut(&id) else {
            return Ok(None);
        };

        post.title = title.to_owned();
        post.content = content.to_owned();
        post.updated_at = Utc::now();

        Ok(Some(post.clone()))
    }

    async fn delete_post(&mut self, id: PostID) -> Result<bool, Box<dyn Error + Send + Sync>> {
        Ok(self.storage.remove(&id).is_some())
    }
}
