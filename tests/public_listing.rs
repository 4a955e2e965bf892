mod support;

use inkpost::application::error::AppError;
use inkpost::application::public_articles::PublicListQuery;
use inkpost::cache::InvalidationPolicy;

use support::{Harness, PER_PAGE};

fn query(pairs: &[(&str, &str)]) -> PublicListQuery {
    let mut query = PublicListQuery::default();
    for (name, value) in pairs {
        let value = Some(value.to_string());
        match *name {
            "page" => query.page = value,
            "category" => query.category = value,
            "username" => query.username = value,
            "search" => query.search = value,
            other => panic!("unknown filter {other}"),
        }
    }
    query
}

/// Two authors, two categories, five published articles and one draft.
fn seeded() -> Harness {
    let h = Harness::new(InvalidationPolicy::Surgical);
    let ana = h.user("ana", false);
    let budi = h.user("budi", false);
    let rust = h.repos.seed_category("Rust", "rust");
    let go = h.repos.seed_category("Go", "go");

    h.repos.seed_article(&ana, &rust, "ownership", false);
    h.repos.seed_article(&ana, &rust, "lifetimes", false);
    h.repos.seed_article(&ana, &go, "goroutines", false);
    h.repos.seed_article(&budi, &rust, "traits", false);
    h.repos.seed_article(&budi, &go, "channels", false);
    h.repos.seed_article(&budi, &rust, "unfinished", true);
    h
}

#[tokio::test]
async fn bare_request_is_rejected() {
    let h = seeded();
    let err = h.public.list(&query(&[])).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref message) if message == "Query was not found"));
}

#[tokio::test]
async fn filters_without_a_page_are_rejected() {
    let h = seeded();
    for filter in ["category", "username", "search"] {
        let value = match filter {
            "category" => "rust",
            "username" => "ana",
            _ => "traits",
        };
        let err = h.public.list(&query(&[(filter, value)])).await.unwrap_err();
        assert!(
            matches!(err, AppError::NotFound(ref message) if message == "Query was not found"),
            "{filter} without page"
        );
    }
}

#[tokio::test]
async fn search_matches_words_in_the_body() {
    let h = seeded();
    h.repos
        .rewrite_body_silently("channels", "Buffered sends can still deadlock.");

    let page = h
        .public
        .list(&query(&[("search", "DEADLOCK"), ("page", "1")]))
        .await
        .unwrap();

    assert_eq!(page.meta.total_items, 1);
    assert_eq!(page.items[0].slug, "channels");
}

#[tokio::test]
async fn plain_pages_walk_newest_first() {
    let h = seeded();

    let first = h.public.list(&query(&[("page", "1")])).await.unwrap();
    assert_eq!(first.meta.total_items, 5);
    assert_eq!(first.meta.item_per_page, PER_PAGE);
    let slugs: Vec<_> = first.items.iter().map(|item| item.slug.as_str()).collect();
    assert_eq!(slugs, ["channels", "traits"]);
    assert_eq!(
        first.meta.next_page_url.as_deref(),
        Some("http://localhost:3000/articles/public?page=2")
    );
    assert_eq!(first.meta.prev_page_url, None);

    let last = h.public.list(&query(&[("page", "3")])).await.unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].slug, "ownership");
    assert_eq!(last.meta.next_page_url, None);
}

#[tokio::test]
async fn category_filter_wins_over_username() {
    let h = seeded();

    let page = h
        .public
        .list(&query(&[("category", "go"), ("username", "ana"), ("page", "1")]))
        .await
        .unwrap();

    assert_eq!(page.meta.total_items, 2);
    assert!(page.items.iter().all(|item| item.category.slug == "go"));
}

#[tokio::test]
async fn filtered_links_keep_the_filter() {
    let h = seeded();

    let page = h
        .public
        .list(&query(&[("category", "rust"), ("page", "1")]))
        .await
        .unwrap();

    assert_eq!(page.meta.total_items, 3);
    assert_eq!(
        page.meta.next_page_url.as_deref(),
        Some("http://localhost:3000/articles/public?category=rust&page=2")
    );
}

#[tokio::test]
async fn author_listing_excludes_drafts() {
    let h = seeded();

    let page = h.public.list(&query(&[("username", "budi"), ("page", "1")])).await.unwrap();

    assert_eq!(page.meta.total_items, 2);
    assert!(page.items.iter().all(|item| item.author.username == "budi"));
    assert!(page.items.iter().all(|item| item.slug != "unfinished"));
}

#[tokio::test]
async fn unknown_category_or_author_is_not_found() {
    let h = seeded();

    let err = h
        .public
        .list(&query(&[("category", "cobol"), ("page", "1")]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref message) if message != "Query was not found"));

    let err = h
        .public
        .list(&query(&[("username", "nobody"), ("page", "1")]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref message) if message != "Query was not found"));
}

#[tokio::test]
async fn malformed_page_is_rejected() {
    let h = seeded();
    for raw in ["0", "-2", "two"] {
        let err = h.public.list(&query(&[("page", raw)])).await.unwrap_err();
        assert!(matches!(err, AppError::Pagination(_)), "page={raw}");
    }
}

#[tokio::test]
async fn search_results_are_never_cached() {
    let h = seeded();

    let page = h
        .public
        .list(&query(&[("search", "traits"), ("page", "1")]))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);

    h.repos.retitle_silently("traits", "Title of traits, revised");

    let page = h
        .public
        .list(&query(&[("search", "revised"), ("page", "1")]))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].slug, "traits");
}

#[tokio::test]
async fn article_view_carries_related_and_newest() {
    let h = seeded();

    let view = h.public.get("ownership").await.unwrap();

    assert_eq!(view.article.slug, "ownership");
    let related: Vec<_> = view
        .related_articles
        .iter()
        .map(|item| item.slug.as_str())
        .collect();
    assert_eq!(related, ["traits", "lifetimes"]);
    assert_eq!(view.newest_articles.len(), 3);
    assert_eq!(view.newest_articles[0].slug, "channels");
}

#[tokio::test]
async fn drafts_are_not_publicly_readable() {
    let h = seeded();
    let err = h.public.get("unfinished").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn home_and_all_cover_published_articles() {
    let h = seeded();

    let home = h.public.home().await.unwrap();
    assert_eq!(home.articles.items.len(), PER_PAGE as usize);
    assert_eq!(home.articles.meta.total_items, 5);
    assert_eq!(home.categories.len(), 2);

    let all = h.public.all().await.unwrap();
    assert_eq!(all.len(), 5);
    assert!(all.iter().all(|link| link.slug != "unfinished"));
}
