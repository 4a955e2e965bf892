//! Offset pagination helpers and the `{items, meta}` list envelope.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const DEFAULT_PER_PAGE: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page `{0}` is not a positive integer")]
    InvalidPage(String),
    #[error("page size must be at least 1")]
    InvalidPageSize,
}

/// A 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::InvalidPage(page.to_string()));
        }
        if per_page == 0 {
            return Err(PaginationError::InvalidPageSize);
        }
        Ok(Self { page, per_page })
    }

    /// Parses the raw `page` query value. A missing value means the first page.
    pub fn parse(raw: Option<&str>, per_page: u32) -> Result<Self, PaginationError> {
        let page = match raw {
            None => 1,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| PaginationError::InvalidPage(raw.to_string()))?,
        };
        Self::new(page, per_page)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// One page of rows plus the total row count, as returned by repositories.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }
}

/// Drops fields that must not leave the service (foreign keys and the like).
pub trait StripInternal {
    type Public;

    fn strip_internal(self) -> Self::Public;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub next_page_url: Option<String>,
    pub prev_page_url: Option<String>,
    pub item_per_page: u32,
    pub total_items: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedPage<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> PaginatedPage<T> {
    /// Shapes a repository page into the list envelope.
    ///
    /// A page past the end yields no items but keeps the real total.
    pub fn format<R>(page: Page<R>, request: PageRequest, links: &PageLinks) -> Self
    where
        R: StripInternal<Public = T>,
    {
        let current = request.page();
        let per_page = u64::from(request.per_page());
        let last_page = page.total.div_ceil(per_page).max(1);

        let next_page_url = (u64::from(current) < last_page).then(|| links.url_for(current + 1));
        let prev_page_url = (current > 1).then(|| links.url_for(current - 1));

        Self {
            items: page
                .items
                .into_iter()
                .map(StripInternal::strip_internal)
                .collect(),
            meta: PageMeta {
                current_page: current,
                next_page_url,
                prev_page_url,
                item_per_page: request.per_page(),
                total_items: page.total,
            },
        }
    }
}

/// Builds `?…&page=N` links, carrying the active filters along.
#[derive(Debug, Clone)]
pub struct PageLinks {
    base: Url,
    filters: Vec<(&'static str, String)>,
}

impl PageLinks {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.filters.push((name, value.into()));
        self
    }

    pub fn url_for(&self, page: u32) -> String {
        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.clear();
            for (name, value) in &self.filters {
                query.append_pair(name, value);
            }
            query.append_pair("page", &page.to_string());
        }
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        title: &'static str,
        category_id: i64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct PublicRow {
        title: &'static str,
    }

    impl StripInternal for Row {
        type Public = PublicRow;

        fn strip_internal(self) -> PublicRow {
            PublicRow { title: self.title }
        }
    }

    fn links() -> PageLinks {
        PageLinks::new(Url::parse("http://localhost:3000/articles/public").unwrap())
    }

    fn rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| Row {
                title: if i % 2 == 0 { "even" } else { "odd" },
                category_id: 1,
            })
            .collect()
    }

    #[test]
    fn parse_rejects_non_positive_and_garbage() {
        assert_eq!(PageRequest::parse(None, 10).unwrap().page(), 1);
        assert_eq!(PageRequest::parse(Some("3"), 10).unwrap().offset(), 20);
        assert!(PageRequest::parse(Some("0"), 10).is_err());
        assert!(PageRequest::parse(Some("-1"), 10).is_err());
        assert!(PageRequest::parse(Some("two"), 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
    }

    #[test]
    fn middle_page_links_both_ways() {
        let request = PageRequest::new(2, 10).unwrap();
        let page = PaginatedPage::format(Page::new(rows(10), 25), request, &links());

        assert_eq!(page.items.len(), 10);
        assert_eq!(page.meta.current_page, 2);
        assert_eq!(page.meta.item_per_page, 10);
        assert_eq!(page.meta.total_items, 25);
        assert_eq!(
            page.meta.next_page_url.as_deref(),
            Some("http://localhost:3000/articles/public?page=3")
        );
        assert_eq!(
            page.meta.prev_page_url.as_deref(),
            Some("http://localhost:3000/articles/public?page=1")
        );
    }

    #[test]
    fn out_of_range_page_is_empty_with_accurate_total() {
        let request = PageRequest::new(9, 10).unwrap();
        let page = PaginatedPage::format(Page::<Row>::new(Vec::new(), 25), request, &links());

        assert!(page.items.is_empty());
        assert_eq!(page.meta.total_items, 25);
        assert_eq!(page.meta.next_page_url, None);
        assert!(page.meta.prev_page_url.is_some());
    }

    #[test]
    fn single_page_has_no_links() {
        let request = PageRequest::new(1, 10).unwrap();
        let page = PaginatedPage::format(Page::new(rows(3), 3), request, &links());
        assert_eq!(page.meta.next_page_url, None);
        assert_eq!(page.meta.prev_page_url, None);
    }

    #[test]
    fn links_keep_filters() {
        let request = PageRequest::new(1, 10).unwrap();
        let links = links().with_filter("category", "rust lang");
        let page = PaginatedPage::format(Page::new(rows(10), 11), request, &links);
        assert_eq!(
            page.meta.next_page_url.as_deref(),
            Some("http://localhost:3000/articles/public?category=rust+lang&page=2")
        );
    }

    #[test]
    fn internal_fields_are_stripped() {
        let request = PageRequest::new(1, 10).unwrap();
        let page = PaginatedPage::format(Page::new(rows(1), 1), request, &links());
        let json = serde_json::to_value(&page).unwrap();
        assert!(json["items"][0].get("category_id").is_none());
        assert_eq!(json["items"][0]["title"], "even");
        assert_eq!(json["meta"]["total_items"], 1);
    }
}
