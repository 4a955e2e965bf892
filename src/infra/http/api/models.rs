//! Request payloads accepted by the JSON API.
//!
//! Shape rules (presence, length, format) live here; uniqueness and
//! ownership are enforced by the services.

use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::application::articles::ArticleCommand;
use crate::application::users::{NewUserCommand, ProfileCommand};

fn no_whitespace(value: &str) -> Result<(), ValidationError> {
    if value.chars().any(char::is_whitespace) {
        return Err(ValidationError::new("no_whitespace"));
    }
    Ok(())
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_blank"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "The password field is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(length(min = 3, max = 64, message = "The name must be between 3 and 64 characters"))]
    pub name: String,
    #[validate(length(min = 3, max = 12, message = "The username must be between 3 and 12 characters"))]
    #[validate(custom(function = "no_whitespace", message = "The username must not contain spaces"))]
    pub username: String,
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: String,
}

impl From<ProfileRequest> for ProfileCommand {
    fn from(request: ProfileRequest) -> Self {
        Self {
            name: request.name,
            username: request.username,
            email: request.email,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordChangeRequest {
    #[validate(length(min = 1, message = "The old password field is required"))]
    pub old_password: String,
    #[validate(length(min = 8, max = 64, message = "The new password must be between 8 and 64 characters"))]
    #[validate(custom(function = "no_whitespace", message = "The new password must not contain spaces"))]
    pub new_password: String,
    #[validate(must_match(
        other = "new_password",
        message = "The confirm new password and new password must match"
    ))]
    pub confirm_new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(length(min = 8, max = 64, message = "The new password must be between 8 and 64 characters"))]
    #[validate(custom(function = "no_whitespace", message = "The new password must not contain spaces"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserCreateRequest {
    #[validate(length(min = 3, max = 64, message = "The name must be between 3 and 64 characters"))]
    pub name: String,
    #[validate(length(min = 3, max = 12, message = "The username must be between 3 and 12 characters"))]
    #[validate(custom(function = "no_whitespace", message = "The username must not contain spaces"))]
    pub username: String,
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 32, message = "The password must be between 8 and 32 characters"))]
    #[validate(custom(function = "no_whitespace", message = "The password must not contain spaces"))]
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl From<UserCreateRequest> for NewUserCommand {
    fn from(request: UserCreateRequest) -> Self {
        Self {
            name: request.name,
            username: request.username,
            email: request.email,
            password: request.password,
            is_admin: request.is_admin,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 64, message = "The name must be between 1 and 64 characters"))]
    #[validate(custom(function = "not_blank", message = "The name field is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ArticleRequest {
    #[validate(length(min = 1, max = 255, message = "The title must be between 1 and 255 characters"))]
    #[validate(custom(function = "not_blank", message = "The title field is required"))]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "The body field is required"))]
    pub body: String,
    #[validate(length(max = 500, message = "The excerpt may not be greater than 500 characters"))]
    pub excerpt: Option<String>,
    pub img_thumbnail: Option<String>,
    #[serde(default)]
    pub is_draft: bool,
    #[validate(length(min = 1, message = "The category field is required"))]
    pub category: String,
    pub lang_id: Option<i64>,
}

impl From<ArticleRequest> for ArticleCommand {
    fn from(request: ArticleRequest) -> Self {
        Self {
            title: request.title,
            body: request.body,
            excerpt: request.excerpt.filter(|excerpt| !excerpt.trim().is_empty()),
            img_thumbnail: request
                .img_thumbnail
                .filter(|thumbnail| !thumbnail.trim().is_empty()),
            is_draft: request.is_draft,
            category: request.category,
            lang_id: request.lang_id,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SlugPreviewRequest {
    #[validate(custom(function = "not_blank", message = "The title field is required"))]
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardListQuery {
    pub is_draft: Option<String>,
}
