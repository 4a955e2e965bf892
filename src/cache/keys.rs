//! Cache key construction.
//!
//! Keys are plain `:`-joined strings such as `public:articles:category:rust:2`.
//! Every variable segment is checked for the separator so two different
//! inputs can never collapse onto the same key.

use std::fmt;

use thiserror::Error;

use super::config::CacheNamespace;
use crate::domain::types::Visibility;

const SEPARATOR: char = ':';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("cache key segment `{segment}` is empty or contains `:`")]
    InvalidSegment { segment: String },
}

/// A fully built cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds every key the application reads or invalidates.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    dashboard: String,
    public: String,
}

impl KeyBuilder {
    pub fn new(namespace: &CacheNamespace) -> Result<Self, KeyError> {
        Ok(Self {
            dashboard: checked(&namespace.dashboard)?.to_string(),
            public: checked(&namespace.public)?.to_string(),
        })
    }

    /// `dashboard:article:{id}`
    pub fn dashboard_article(&self, article_id: i64) -> CacheKey {
        self.join(&self.dashboard, &["article", &article_id.to_string()])
    }

    /// `dashboard:articles:draft:{user_id}`
    pub fn dashboard_drafts(&self, user_id: i64) -> CacheKey {
        self.dashboard_list(user_id, Visibility::Draft)
    }

    /// `dashboard:articles:publish:{user_id}`
    pub fn dashboard_published(&self, user_id: i64) -> CacheKey {
        self.dashboard_list(user_id, Visibility::Published)
    }

    pub fn dashboard_list(&self, user_id: i64, visibility: Visibility) -> CacheKey {
        self.join(
            &self.dashboard,
            &["articles", visibility.key_segment(), &user_id.to_string()],
        )
    }

    /// `public:article:{slug}`
    pub fn public_article(&self, slug: &str) -> Result<CacheKey, KeyError> {
        Ok(self.join(&self.public, &["article", checked(slug)?]))
    }

    /// `public:articles:page:{page}`
    pub fn public_page(&self, page: u32) -> CacheKey {
        self.join(&self.public, &["articles", "page", &page.to_string()])
    }

    /// `public:articles:category:{slug}:{page}`
    pub fn public_category_page(&self, category_slug: &str, page: u32) -> Result<CacheKey, KeyError> {
        Ok(self.join(
            &self.public,
            &["articles", "category", checked(category_slug)?, &page.to_string()],
        ))
    }

    /// `public:articles:author:{username}:{page}`
    pub fn public_author_page(&self, username: &str, page: u32) -> Result<CacheKey, KeyError> {
        Ok(self.join(
            &self.public,
            &["articles", "author", checked(username)?, &page.to_string()],
        ))
    }

    /// `public:articles:all`
    pub fn public_all(&self) -> CacheKey {
        self.join(&self.public, &["articles", "all"])
    }

    /// `public:articles:home`
    pub fn public_home(&self) -> CacheKey {
        self.join(&self.public, &["articles", "home"])
    }

    /// Prefix shared by every dashboard key, separator included.
    pub fn dashboard_prefix(&self) -> String {
        format!("{}{SEPARATOR}", self.dashboard)
    }

    /// Prefix shared by every public key, separator included.
    pub fn public_prefix(&self) -> String {
        format!("{}{SEPARATOR}", self.public)
    }

    fn join(&self, namespace: &str, segments: &[&str]) -> CacheKey {
        let mut key = String::from(namespace);
        for segment in segments {
            key.push(SEPARATOR);
            key.push_str(segment);
        }
        CacheKey(key)
    }
}

fn checked(segment: &str) -> Result<&str, KeyError> {
    if segment.is_empty() || segment.contains(SEPARATOR) {
        return Err(KeyError::InvalidSegment {
            segment: segment.to_string(),
        });
    }
    Ok(segment)
}
