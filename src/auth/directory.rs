use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::error::AppError;

/// Account records held by the identity provider.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn user_id_by_email(&self, email: &str) -> Result<Option<String>, AppError>;

    /// Fails with `NotFound` for an unknown account.
    async fn delete_user(&self, user_id: &str) -> Result<(), AppError>;
}

/// In-process directory mapping user ids to emails.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    accounts: RwLock<IndexMap<String, String>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, user_id: &str, email: &str) {
        self.accounts
            .write()
            .await
            .insert(user_id.to_string(), email.to_string());
    }

    pub async fn contains(&self, user_id: &str) -> bool {
        self.accounts.read().await.contains_key(user_id)
    }
}

#[async_trait]
impl IdentityDirectory for MemoryDirectory {
    async fn user_id_by_email(&self, email: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .accounts
            .read()
            .await
            .iter()
            .find(|(_, e)| e.as_str() == email)
            .map(|(id, _)| id.clone()))
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        match self.accounts.write().await.shift_remove(user_id) {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("account {} not found", user_id))),
        }
    }
}
