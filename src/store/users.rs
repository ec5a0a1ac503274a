use std::sync::Arc;

use super::document::{from_document, to_document, DocPath, DocumentStore};
use crate::error::AppError;
use crate::models::UserProfile;

pub const PROFILES_COLLECTION: &str = "profiles";

/// Profile documents keyed by user id.
pub struct UserStore {
    docs: Arc<dyn DocumentStore>,
}

fn profile_path(user_id: &str) -> DocPath {
    DocPath::new(PROFILES_COLLECTION, user_id)
}

impl UserStore {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    pub async fn find(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        if user_id.trim().is_empty() {
            return Err(AppError::InvalidArgument("user id must not be empty".into()));
        }
        match self.docs.get(&profile_path(user_id)).await? {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn get(&self, user_id: &str) -> Result<UserProfile, AppError> {
        self.find(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {} not found", user_id)))
    }

    /// Replaces the profile stored under `profile.user_id`.
    pub async fn put(&self, profile: UserProfile) -> Result<UserProfile, AppError> {
        if profile.user_id.trim().is_empty() {
            return Err(AppError::InvalidArgument("user id must not be empty".into()));
        }
        self.docs
            .set(&profile_path(&profile.user_id), to_document(&profile)?)
            .await?;
        Ok(profile)
    }

    pub async fn delete(&self, user_id: &str) -> Result<(), AppError> {
        Ok(self.docs.delete(&profile_path(user_id)).await?)
    }
}
