use log::info;
use std::sync::Arc;
use validator::Validate;

use crate::auth::{IdentityContext, IdentityDirectory};
use crate::error::AppError;
use crate::models::UserProfile;
use crate::store::UserStore;

/// Profile operations. The account itself belongs to the identity directory;
/// this service only keeps the application-side profile in step with it.
pub struct UserService {
    profiles: Arc<UserStore>,
    directory: Arc<dyn IdentityDirectory>,
}

impl UserService {
    pub fn new(profiles: Arc<UserStore>, directory: Arc<dyn IdentityDirectory>) -> Self {
        Self {
            profiles,
            directory,
        }
    }

    pub async fn get_user(
        &self,
        identity: &IdentityContext,
        user_id: &str,
    ) -> Result<UserProfile, AppError> {
        identity.authorize_owner(user_id)?;
        self.profiles.get(user_id).await
    }

    /// Creates or replaces the profile of the account registered under
    /// `profile.email`.
    pub async fn update_user(
        &self,
        identity: &IdentityContext,
        mut profile: UserProfile,
    ) -> Result<UserProfile, AppError> {
        profile.validate()?;
        identity.authorize_email(&profile.email)?;

        let user_id = if profile.email == identity.email {
            identity.subject_id.clone()
        } else {
            self.directory
                .user_id_by_email(&profile.email)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("no account registered for {}", profile.email))
                })?
        };
        profile.user_id = user_id;
        self.profiles.put(profile).await
    }

    /// Removes the account, then its profile. Admin only.
    pub async fn delete_user(
        &self,
        identity: &IdentityContext,
        user_id: &str,
    ) -> Result<(), AppError> {
        identity.require_admin()?;
        if user_id.trim().is_empty() {
            return Err(AppError::InvalidArgument("user id must not be empty".into()));
        }
        self.directory.delete_user(user_id).await?;
        self.profiles.delete(user_id).await?;
        info!("{} deleted user {}", identity.subject_id, user_id);
        Ok(())
    }
}
