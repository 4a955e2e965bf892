//! Self-service profile management and admin user administration.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};

use crate::application::auth::Principal;
use crate::application::categories::require_admin;
use crate::application::error::AppError;
use crate::application::repos::{
    CategoryArticleCount, CreateUserParams, RepoError, UpdateProfileParams, UserSummary,
    UsersRepo, UsersWriteRepo,
};
use crate::cache::{CacheEvent, CacheLayer};
use crate::domain::entities::UserRecord;
use crate::infra::security::PasswordHashing;
use crate::infra::uploads::{USER_IMAGE_DIR, UploadStorage};

pub const OLD_PASSWORD_MISMATCH: &str = "The old password does not match";
pub const SELF_DELETE: &str = "Please do not delete yourself";
pub const USER_HAS_ARTICLES: &str = "The user could not be deleted because they have articles";
const USER_NOT_FOUND: &str = "User not found";

#[derive(Debug, Clone)]
pub struct ProfileCommand {
    pub name: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct NewUserCommand {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
}

/// A user as seen by an admin, with article counts per category.
#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    pub name: String,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub image: Option<String>,
    pub articles: Vec<CategoryArticleCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageUpdated {
    pub image_url: String,
}

#[derive(Clone)]
pub struct UserService {
    reader: Arc<dyn UsersRepo>,
    writer: Arc<dyn UsersWriteRepo>,
    passwords: PasswordHashing,
    uploads: Arc<UploadStorage>,
    cache: CacheLayer,
}

impl UserService {
    pub fn new(
        reader: Arc<dyn UsersRepo>,
        writer: Arc<dyn UsersWriteRepo>,
        passwords: PasswordHashing,
        uploads: Arc<UploadStorage>,
        cache: CacheLayer,
    ) -> Self {
        Self {
            reader,
            writer,
            passwords,
            uploads,
            cache,
        }
    }

    pub async fn profile(&self, principal: &Principal) -> Result<UserRecord, AppError> {
        self.by_id(principal.user_id).await
    }

    pub async fn update_profile(
        &self,
        principal: &Principal,
        command: ProfileCommand,
    ) -> Result<UserRecord, AppError> {
        self.apply_profile(principal.user_id, command).await
    }

    pub async fn update_password(
        &self,
        principal: &Principal,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), AppError> {
        if new_password != confirm_password {
            return Err(AppError::validation(
                "confirm_new_password",
                "The confirm new password and new password must match",
            ));
        }

        let user = self.by_id(principal.user_id).await?;
        let matches = self
            .passwords
            .verify(old_password, &user.password_hash)
            .map_err(|err| AppError::unexpected(err.to_string()))?;
        if !matches {
            return Err(AppError::bad_request(OLD_PASSWORD_MISMATCH));
        }

        self.store_password(user.id, new_password).await?;
        info!(user_id = user.id, "password changed");
        Ok(())
    }

    /// Replaces the caller's profile picture. The previous file is removed
    /// only after the new path is committed.
    pub async fn update_image(
        &self,
        principal: &Principal,
        data: Bytes,
    ) -> Result<ImageUpdated, AppError> {
        let stored = self.uploads.store_image(USER_IMAGE_DIR, data).await?;

        let previous = match self
            .writer
            .update_image(principal.user_id, Some(&stored.stored_path))
            .await
        {
            Ok(previous) => previous,
            Err(err) => {
                self.remove_file(&stored.stored_path).await;
                return Err(err.into());
            }
        };

        self.cache.invalidator.invalidate(CacheEvent::UserChanged).await;

        if let Some(old) = previous.filter(|old| *old != stored.stored_path) {
            self.remove_file(&old).await;
        }

        info!(user_id = principal.user_id, path = %stored.stored_path, "profile image updated");
        Ok(ImageUpdated {
            image_url: self.uploads.public_url(&stored.stored_path),
        })
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<UserSummary>, AppError> {
        require_admin(principal)?;
        Ok(self.reader.list_users(principal.user_id).await?)
    }

    pub async fn get(&self, principal: &Principal, username: &str) -> Result<UserDetail, AppError> {
        require_admin(principal)?;
        let user = self.by_username(username).await?;
        let articles = self.reader.user_category_counts(user.id).await?;

        Ok(UserDetail {
            name: user.name,
            username: user.username,
            email: user.email,
            is_admin: user.is_admin,
            image: user.image,
            articles,
        })
    }

    pub async fn create(
        &self,
        principal: &Principal,
        command: NewUserCommand,
    ) -> Result<UserRecord, AppError> {
        require_admin(principal)?;
        self.ensure_unique(&command.username, &command.email, None)
            .await?;

        let password_hash = self.hash(&command.password)?;
        let user = self
            .writer
            .create_user(CreateUserParams {
                name: command.name,
                username: command.username,
                email: command.email,
                password_hash,
                is_admin: command.is_admin,
            })
            .await
            .map_err(unique_violation)?;

        info!(user_id = user.id, username = %user.username, "user created");
        Ok(user)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        username: &str,
        command: ProfileCommand,
    ) -> Result<UserRecord, AppError> {
        require_admin(principal)?;
        let user = self.by_username(username).await?;
        self.apply_profile(user.id, command).await
    }

    pub async fn set_password(
        &self,
        principal: &Principal,
        username: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        require_admin(principal)?;
        let user = self.by_username(username).await?;
        self.store_password(user.id, new_password).await?;
        info!(user_id = user.id, admin_id = principal.user_id, "password reset by admin");
        Ok(())
    }

    pub async fn delete(&self, principal: &Principal, username: &str) -> Result<(), AppError> {
        require_admin(principal)?;
        let user = self.by_username(username).await?;
        if user.id == principal.user_id {
            return Err(AppError::bad_request(SELF_DELETE));
        }

        match self.writer.delete_user(user.id).await {
            Ok(()) => {}
            Err(RepoError::Integrity { .. }) => {
                return Err(AppError::bad_request(USER_HAS_ARTICLES));
            }
            Err(err) => return Err(err.into()),
        }

        self.cache.invalidator.invalidate(CacheEvent::UserChanged).await;

        if let Some(image) = user.image.as_deref() {
            self.remove_file(image).await;
        }

        info!(user_id = user.id, username = %user.username, "user deleted");
        Ok(())
    }

    async fn apply_profile(&self, id: i64, command: ProfileCommand) -> Result<UserRecord, AppError> {
        self.ensure_unique(&command.username, &command.email, Some(id))
            .await?;

        let user = self
            .writer
            .update_profile(UpdateProfileParams {
                id,
                name: command.name,
                username: command.username,
                email: command.email,
            })
            .await
            .map_err(unique_violation)?;

        self.cache.invalidator.invalidate(CacheEvent::UserChanged).await;

        info!(user_id = user.id, "profile updated");
        Ok(user)
    }

    async fn ensure_unique(
        &self,
        username: &str,
        email: &str,
        except: Option<i64>,
    ) -> Result<(), AppError> {
        if self.reader.username_taken(username, except).await? {
            return Err(AppError::validation("username", "The username has already been taken"));
        }
        if self.reader.email_taken(email, except).await? {
            return Err(AppError::validation("email", "The email has already been taken"));
        }
        Ok(())
    }

    async fn store_password(&self, id: i64, password: &str) -> Result<(), AppError> {
        let hash = self.hash(password)?;
        self.writer.update_password(id, &hash).await?;
        Ok(())
    }

    fn hash(&self, password: &str) -> Result<String, AppError> {
        self.passwords
            .hash(password)
            .map_err(|err| AppError::unexpected(err.to_string()))
    }

    async fn by_id(&self, id: i64) -> Result<UserRecord, AppError> {
        self.reader
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))
    }

    async fn by_username(&self, username: &str) -> Result<UserRecord, AppError> {
        self.reader
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))
    }

    async fn remove_file(&self, path: &str) {
        if let Err(err) = self.uploads.delete(path).await {
            warn!(path, error = %err, "failed to remove profile image");
        }
    }
}

/// A unique index firing after the pre-check lost a race.
fn unique_violation(err: RepoError) -> AppError {
    match err {
        RepoError::Duplicate { constraint } if constraint.contains("email") => {
            AppError::validation("email", "The email has already been taken")
        }
        RepoError::Duplicate { .. } => {
            AppError::validation("username", "The username has already been taken")
        }
        other => other.into(),
    }
}
