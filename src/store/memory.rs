//! In-process backend with the same semantics as [`PgStore`](super::PgStore).
//!
//! All state lives behind one `RwLock`, so each operation (including the
//! cascading user delete) is atomic with respect to every other.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, TaskStore, UserStore};
use crate::models::{NewUser, Task, TaskPatch, User, UserChanges};
use crate::query::TaskFilter;

#[derive(Debug)]
struct UserRecord {
    user: User,
    tokens: Vec<String>,
    avatar: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, UserRecord>,
    /// Kept in insertion order; that is the default listing order.
    tasks: Vec<Task>,
}

impl Inner {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|record| record.user.email == email && Some(record.user.id) != except)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new_user: NewUser, first_token: &str) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(&new_user.email, None) {
            return Err(StoreError::DuplicateKey("email".into()));
        }
        let now = Utc::now();
        let user = User {
            id: new_user.id,
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            age: new_user.age,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                tokens: vec![first_token.to_string()],
                avatar: None,
            },
        );
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).map(|record| record.user.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|record| record.user.email == email)
            .map(|record| record.user.clone()))
    }

    async fn find_user_by_token(&self, id: Uuid, token: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .get(&id)
            .filter(|record| record.tokens.iter().any(|t| t == token))
            .map(|record| record.user.clone()))
    }

    async fn push_token(&self, id: Uuid, token: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.users.get_mut(&id) {
            if !record.tokens.iter().any(|t| t == token) {
                record.tokens.push(token.to_string());
            }
        }
        Ok(())
    }

    async fn remove_token(&self, id: Uuid, token: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.users.get_mut(&id) {
            record.tokens.retain(|t| t != token);
        }
        Ok(())
    }

    async fn clear_tokens(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.users.get_mut(&id) {
            record.tokens.clear();
        }
        Ok(())
    }

    async fn active_tokens(&self, id: Uuid) -> StoreResult<Vec<String>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .get(&id)
            .map(|record| record.tokens.clone())
            .unwrap_or_default())
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;
        if let Some(email) = &changes.email {
            if inner.email_taken(email, Some(id)) {
                return Err(StoreError::DuplicateKey("email".into()));
            }
        }
        let record = match inner.users.get_mut(&id) {
            Some(record) => record,
            None => return Ok(None),
        };
        let user = &mut record.user;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(age) = changes.age {
            user.age = age;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.users.get_mut(&id) {
            record.avatar = avatar;
        }
        Ok(())
    }

    async fn avatar(&self, id: Uuid) -> StoreResult<Option<Vec<u8>>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).and_then(|record| record.avatar.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;
        let removed = inner.users.remove(&id);
        if removed.is_some() {
            inner.tasks.retain(|task| task.owner != id);
        }
        Ok(removed.map(|record| record.user))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, task: Task) -> StoreResult<Task> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&task.owner) {
            return Err(StoreError::Backend(format!(
                "task owner {} does not exist",
                task.owner
            )));
        }
        inner.tasks.push(task.clone());
        Ok(task)
    }

    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let inner = self.inner.read().await;
        let mut tasks: Vec<Task> = inner
            .tasks
            .iter()
            .filter(|task| task.owner == owner && filter.matches(task))
            .cloned()
            .collect();
        if let Some(sort) = filter.sort {
            tasks.sort_by(|a, b| sort.compare(a, b));
        }
        let skip = filter
            .skip
            .map_or(0, |skip| usize::try_from(skip).unwrap_or(usize::MAX));
        let limit = filter
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(tasks.into_iter().skip(skip).take(limit).collect())
    }

    async fn find_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tasks
            .iter()
            .find(|task| task.id == id && task.owner == owner)
            .cloned())
    }

    async fn update_task(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: &TaskPatch,
    ) -> StoreResult<Option<Task>> {
        let mut inner = self.inner.write().await;
        match inner
            .tasks
            .iter_mut()
            .find(|task| task.id == id && task.owner == owner)
        {
            Some(task) => {
                task.apply(patch);
                Ok(Some(task.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>> {
        let mut inner = self.inner.write().await;
        match inner
            .tasks
            .iter()
            .position(|task| task.id == id && task.owner == owner)
        {
            Some(index) => Ok(Some(inner.tasks.remove(index))),
            None => Ok(None),
        }
    }
}

impl Store for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
