//! Persistence seam.
//!
//! Handlers only see these traits. Every task lookup is scoped by owner, so a
//! handler cannot fetch or mutate another user's task by id alone.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use crate::models::{NewUser, Task, TaskPatch, User, UserChanges};
use crate::query::TaskFilter;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write. Carries the field name.
    DuplicateKey(String),
    /// Any other backend failure.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::DuplicateKey(field) => write!(f, "duplicate value for {}", field),
            StoreError::Backend(msg) => write!(f, "store failure: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore {
    /// Inserts the user together with its first session token in one write.
    async fn create_user(&self, user: NewUser, first_token: &str) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Returns the user only if `token` is one of its active tokens.
    async fn find_user_by_token(&self, id: Uuid, token: &str) -> StoreResult<Option<User>>;

    /// Adds a token without touching the others. Concurrent pushes are all kept.
    async fn push_token(&self, id: Uuid, token: &str) -> StoreResult<()>;

    async fn remove_token(&self, id: Uuid, token: &str) -> StoreResult<()>;

    async fn clear_tokens(&self, id: Uuid) -> StoreResult<()>;

    /// Active tokens in issue order.
    async fn active_tokens(&self, id: Uuid) -> StoreResult<Vec<String>>;

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>>;

    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> StoreResult<()>;

    async fn avatar(&self, id: Uuid) -> StoreResult<Option<Vec<u8>>>;

    /// Removes the user and every task it owns as one unit.
    async fn delete_user(&self, id: Uuid) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait TaskStore {
    async fn create_task(&self, task: Task) -> StoreResult<Task>;

    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    async fn find_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>>;

    async fn update_task(&self, id: Uuid, owner: Uuid, patch: &TaskPatch)
        -> StoreResult<Option<Task>>;

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>>;
}

/// Everything the HTTP layer needs from a backend.
pub trait Store: UserStore + TaskStore + Send + Sync {
    fn backend_name(&self) -> &'static str;
}
