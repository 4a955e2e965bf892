//! Shared domain enumerations.

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Which partition of an author's articles a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Draft,
    Published,
}

impl Visibility {
    pub fn from_is_draft(is_draft: bool) -> Self {
        if is_draft {
            Visibility::Draft
        } else {
            Visibility::Published
        }
    }

    pub fn is_draft(self) -> bool {
        matches!(self, Visibility::Draft)
    }

    /// Segment used in dashboard cache keys.
    pub fn key_segment(self) -> &'static str {
        match self {
            Visibility::Draft => "draft",
            Visibility::Published => "publish",
        }
    }
}

/// Role carried by an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn from_is_admin(is_admin: bool) -> Self {
        if is_admin { Role::Admin } else { Role::Member }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

/// Parses a textual boolean as accepted by query strings and form fields.
///
/// Accepts `true`/`false`/`1`/`0` (case-insensitive, surrounding whitespace ignored).
pub fn parse_flag(raw: &str) -> Result<bool, DomainError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(DomainError::InvalidFlag {
            value: raw.trim().to_string(),
        }),
    }
}
