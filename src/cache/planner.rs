//! Invalidation planning.
//!
//! Turns a committed mutation into the set of cache entries that may now be
//! stale, according to the configured [`InvalidationPolicy`].

use std::collections::BTreeSet;
use std::fmt;

use super::config::InvalidationPolicy;
use super::keys::{CacheKey, KeyBuilder};
use crate::domain::types::Visibility;

/// A committed write that may have made cached reads stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    ArticleCreated {
        article_id: i64,
        owner_id: i64,
        is_draft: bool,
    },
    ArticleUpdated {
        article_id: i64,
        owner_id: i64,
        slug: String,
        was_draft: bool,
        is_draft: bool,
    },
    ArticleDeleted {
        article_id: i64,
        owner_id: i64,
        slug: String,
        was_draft: bool,
    },
    /// A category was renamed or removed.
    CategoryChanged,
    /// A user's public-facing fields (name, username, image) changed or the user was removed.
    UserChanged,
    FlushRequested,
}

impl CacheEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            CacheEvent::ArticleCreated { .. } => "article_created",
            CacheEvent::ArticleUpdated { .. } => "article_updated",
            CacheEvent::ArticleDeleted { .. } => "article_deleted",
            CacheEvent::CategoryChanged => "category_changed",
            CacheEvent::UserChanged => "user_changed",
            CacheEvent::FlushRequested => "flush_requested",
        }
    }
}

/// Entries to drop after a mutation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub keys: BTreeSet<CacheKey>,
    pub prefixes: BTreeSet<String>,
    pub flush_all: bool,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ keys: {}, prefixes: {}, flush_all: {} }}",
            self.keys.len(),
            self.prefixes.len(),
            self.flush_all
        )
    }
}

impl InvalidationPlan {
    pub fn flush() -> Self {
        Self {
            flush_all: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.flush_all && self.keys.is_empty() && self.prefixes.is_empty()
    }

    pub fn for_event(event: &CacheEvent, policy: InvalidationPolicy, keys: &KeyBuilder) -> Self {
        if policy == InvalidationPolicy::Flush {
            return Self::flush();
        }

        match event {
            CacheEvent::ArticleCreated {
                article_id,
                owner_id,
                is_draft,
            } => {
                let mut plan = Self::default();
                plan.article(keys, *article_id, *owner_id, &[*is_draft], None);
                plan
            }
            CacheEvent::ArticleUpdated {
                article_id,
                owner_id,
                slug,
                was_draft,
                is_draft,
            } => {
                let mut plan = Self::default();
                plan.article(
                    keys,
                    *article_id,
                    *owner_id,
                    &[*was_draft, *is_draft],
                    Some(slug),
                );
                plan
            }
            CacheEvent::ArticleDeleted {
                article_id,
                owner_id,
                slug,
                was_draft,
            } => {
                let mut plan = Self::default();
                plan.article(keys, *article_id, *owner_id, &[*was_draft], Some(slug));
                plan
            }
            // embedded names appear in every listing, so the affected set is unbounded
            CacheEvent::CategoryChanged | CacheEvent::UserChanged | CacheEvent::FlushRequested => {
                Self::flush()
            }
        }
    }

    fn article(
        &mut self,
        keys: &KeyBuilder,
        article_id: i64,
        owner_id: i64,
        draft_states: &[bool],
        slug: Option<&str>,
    ) {
        self.keys.insert(keys.dashboard_article(article_id));

        for is_draft in draft_states {
            self.keys
                .insert(keys.dashboard_list(owner_id, Visibility::from_is_draft(*is_draft)));
        }

        let touches_public = draft_states.iter().any(|is_draft| !is_draft);
        if touches_public {
            if let Some(key) = slug.and_then(|slug| keys.public_article(slug).ok()) {
                self.keys.insert(key);
            }
            self.prefixes.insert(keys.public_prefix());
        }
    }
}
