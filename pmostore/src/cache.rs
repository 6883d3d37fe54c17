//! Cache mémoire des noms d'utilisateurs

use std::collections::HashMap;
use std::sync::Arc;

use pmoqueue::UserId;
use tokio::sync::RwLock;

/// `user_id -> username` cache, shared by cloning.
///
/// The cache never talks to the store itself; callers fill it on a miss.
#[derive(Debug, Clone, Default)]
pub struct UserCache {
    users: Arc<RwLock<HashMap<UserId, String>>>,
}

impl UserCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lookup(&self, user_id: UserId) -> Option<String> {
        self.users.read().await.get(&user_id).cloned()
    }

    /// Insère ou remplace le nom associé à `user_id`
    pub async fn insert(&self, user_id: UserId, username: impl Into<String>) {
        self.users.write().await.insert(user_id, username.into());
    }

    pub async fn remove(&self, user_id: UserId) -> Option<String> {
        self.users.write().await.remove(&user_id)
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}
