//! Domain records persisted by the store and their outward-facing
//! projections. `User` carries the password hash and is never serialized to
//! a client directly; handlers go through `SafeUser`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PROFILE_PIC: &str = "default.jpg";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    pub email: String,
    /// Argon2 PHC string. Stays inside the store documents.
    pub password_hash: String,
    pub profile_pic: String,
    /// Identifiers of posts owned by this user. Order is irrelevant.
    #[serde(default)]
    pub posts: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    /// Owner identity; immutable once set.
    pub owner: Uuid,
    pub content: String,
    /// Identities that currently like this post. Each id appears at most
    /// once; mutated only through the store's toggle operation.
    #[serde(default)]
    pub likes: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-visible projection of a `User` with the password hash stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeUser {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    pub email: String,
    pub profile_pic: String,
    pub posts: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for SafeUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            name: u.name.clone(),
            age: u.age,
            email: u.email.clone(),
            profile_pic: u.profile_pic.clone(),
            posts: u.posts.clone(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}
