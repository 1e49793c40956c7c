//!
//! miniboard document store
//! ------------------------
//! On-disk store for users and posts using one JSON document per entity:
//! `<root>/users/<id>.json` and `<root>/posts/<id>.json`. Uploaded profile
//! pictures live under `<root>/public/images/uploads/` and are referenced by
//! filename from the owning user document.
//!
//! Key responsibilities:
//! - User creation with a uniqueness check on the login email.
//! - Post creation and owner-only content updates.
//! - The like toggle, performed entirely inside a per-post write lock so the
//!   fetch-flip-persist sequence is one critical section. Concurrent toggles
//!   on the same post serialize; operations on different posts proceed in
//!   parallel.
//!
//! The public API centers around `Store`, usually wrapped in a thread-safe
//! `SharedStore` (`Arc<Store>`) elsewhere in the codebase. Each mutation
//! writes the affected document back to disk before releasing the entity
//! lock, so the persisted state always reflects a serialized history.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fs, io};

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Post, User, DEFAULT_PROFILE_PIC};

/// Fields supplied by the registration handler. The password arrives here
/// already hashed; the store never sees a plaintext password.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub age: Option<u32>,
    pub email: String,
    pub password_hash: String,
}

pub struct Store {
    root: PathBuf,
    users: RwLock<HashMap<Uuid, Arc<RwLock<User>>>>,
    posts: RwLock<HashMap<Uuid, Arc<RwLock<Post>>>>,
    /// Login email -> user id. The write lock on this index is held across
    /// the existence check and the insert, which serializes duplicate
    /// registrations for the same email.
    email_index: RwLock<HashMap<String, Uuid>>,
}

/// Cheaply clonable handle shared across request handlers.
#[derive(Clone)]
pub struct SharedStore(pub Arc<Store>);

impl SharedStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        Ok(Self(Arc::new(Store::open(root)?)))
    }
}

impl std::ops::Deref for SharedStore {
    type Target = Store;
    fn deref(&self) -> &Store {
        &self.0
    }
}

impl Store {
    /// Open a store rooted at the given path, creating the directory layout
    /// if needed and loading any existing documents.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("users"))
            .with_context(|| format!("creating users dir under {}", root.display()))?;
        fs::create_dir_all(root.join("posts"))
            .with_context(|| format!("creating posts dir under {}", root.display()))?;
        fs::create_dir_all(root.join("public").join("images").join("uploads"))
            .with_context(|| format!("creating uploads dir under {}", root.display()))?;

        let store = Self {
            root,
            users: RwLock::new(HashMap::new()),
            posts: RwLock::new(HashMap::new()),
            email_index: RwLock::new(HashMap::new()),
        };
        store.load_existing()?;
        Ok(store)
    }

    fn load_existing(&self) -> Result<()> {
        let mut users = self.users.write();
        let mut index = self.email_index.write();
        for doc in read_documents::<User>(&self.root.join("users"))? {
            index.insert(doc.email.clone(), doc.id);
            users.insert(doc.id, Arc::new(RwLock::new(doc)));
        }
        let mut posts = self.posts.write();
        for doc in read_documents::<Post>(&self.root.join("posts"))? {
            posts.insert(doc.id, Arc::new(RwLock::new(doc)));
        }
        debug!(users = users.len(), posts = posts.len(), "store loaded");
        Ok(())
    }

    /// Directory where uploaded profile pictures are written, and from which
    /// they are served back under `/public/images/uploads`.
    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("public").join("images").join("uploads")
    }

    /// Directory served statically under `/public`.
    pub fn public_dir(&self) -> PathBuf {
        self.root.join("public")
    }

    fn user_path(&self, id: Uuid) -> PathBuf {
        self.root.join("users").join(format!("{id}.json"))
    }

    fn post_path(&self, id: Uuid) -> PathBuf {
        self.root.join("posts").join(format!("{id}.json"))
    }

    fn persist_user(&self, user: &User) -> AppResult<()> {
        write_document(&self.user_path(user.id), user)
    }

    fn persist_post(&self, post: &Post) -> AppResult<()> {
        write_document(&self.post_path(post.id), post)
    }

    // --- Users ---

    /// Create a user, rejecting a login email that is already taken.
    pub fn create_user(&self, new: NewUser) -> AppResult<User> {
        let mut index = self.email_index.write();
        if index.contains_key(&new.email) {
            return Err(AppError::already_exists("User already exists"));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            name: new.name,
            age: new.age,
            email: new.email,
            password_hash: new.password_hash,
            profile_pic: DEFAULT_PROFILE_PIC.to_string(),
            posts: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.persist_user(&user)?;
        index.insert(user.email.clone(), user.id);
        self.users
            .write()
            .insert(user.id, Arc::new(RwLock::new(user.clone())));
        debug!(user = %user.id, "user created");
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        let id = *self.email_index.read().get(email)?;
        self.get_user(id)
    }

    pub fn get_user(&self, id: Uuid) -> Option<User> {
        let handle = self.users.read().get(&id).cloned()?;
        let user = handle.read().clone();
        Some(user)
    }

    fn user_handle(&self, id: Uuid) -> AppResult<Arc<RwLock<User>>> {
        self.users
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    /// Record an uploaded profile picture filename on the user.
    pub fn set_profile_pic(&self, user_id: Uuid, filename: &str) -> AppResult<User> {
        let handle = self.user_handle(user_id)?;
        let mut user = handle.write();
        user.profile_pic = filename.to_string();
        user.updated_at = Utc::now();
        self.persist_user(&user)?;
        Ok(user.clone())
    }

    // --- Posts ---

    /// Create a post owned by `owner` and append its id to the owner's post
    /// list. The two writes are sequential document updates; a crash between
    /// them leaves a post that no profile lists, which is the accepted
    /// bounded inconsistency for this store.
    pub fn create_post(&self, owner: Uuid, content: String) -> AppResult<Post> {
        let owner_handle = self.user_handle(owner)?;
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            owner,
            content,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.persist_post(&post)?;
        self.posts
            .write()
            .insert(post.id, Arc::new(RwLock::new(post.clone())));
        {
            let mut user = owner_handle.write();
            user.posts.push(post.id);
            user.updated_at = now;
            self.persist_user(&user)?;
        }
        debug!(post = %post.id, owner = %owner, "post created");
        Ok(post)
    }

    pub fn get_post(&self, id: Uuid) -> Option<Post> {
        let handle = self.posts.read().get(&id).cloned()?;
        let post = handle.read().clone();
        Some(post)
    }

    fn post_handle(&self, id: Uuid) -> AppResult<Arc<RwLock<Post>>> {
        self.posts
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Post not found"))
    }

    /// All posts owned by the user, newest first.
    pub fn posts_for_user(&self, user_id: Uuid) -> AppResult<Vec<Post>> {
        let user = self
            .get_user(user_id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        let mut posts: Vec<Post> = user
            .posts
            .iter()
            .filter_map(|id| self.get_post(*id))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    /// Replace a post's content. Ownership must already have been checked by
    /// the caller; the owner field itself never changes here.
    pub fn update_content(&self, post_id: Uuid, content: String) -> AppResult<Post> {
        let handle = self.post_handle(post_id)?;
        let mut post = handle.write();
        post.content = content;
        post.updated_at = Utc::now();
        self.persist_post(&post)?;
        Ok(post.clone())
    }

    /// Flip the actor's membership in the post's like set: add if absent,
    /// remove if present. The membership test, the flip and the persist all
    /// happen under the post's write lock, so concurrent toggles serialize
    /// and the set never holds a duplicate entry.
    pub fn toggle_like(&self, post_id: Uuid, actor: Uuid) -> AppResult<Post> {
        let handle = self.post_handle(post_id)?;
        let mut post = handle.write();
        match post.likes.iter().position(|id| *id == actor) {
            Some(idx) => {
                post.likes.remove(idx);
            }
            None => post.likes.push(actor),
        }
        post.updated_at = Utc::now();
        self.persist_post(&post)?;
        debug!(post = %post_id, actor = %actor, likes = post.likes.len(), "like toggled");
        Ok(post.clone())
    }
}

fn read_documents<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        match serde_json::from_slice::<T>(&bytes) {
            Ok(doc) => out.push(doc),
            Err(e) => {
                // Skip unreadable documents instead of refusing to start.
                tracing::warn!(path = %path.display(), error = %e, "skipping malformed document");
            }
        }
    }
    Ok(out)
}

/// Write a document atomically: serialize to a sibling temp file, then
/// rename over the target so readers never observe a torn write.
fn write_document<T: serde::Serialize>(path: &Path, doc: &T) -> AppResult<()> {
    let bytes = serde_json::to_vec_pretty(doc).map_err(|e| AppError::server(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    let write = |tmp: &Path| -> io::Result<()> {
        fs::write(tmp, &bytes)?;
        fs::rename(tmp, path)
    };
    write(&tmp).map_err(|e| AppError::server(e.to_string()))
}
