pub mod envelope;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use state::AppState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};

/// Routes of the JSON API. Login and the public reads sit behind the
/// client-key check; bearer tokens are checked by the handler extractors.
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let login = Router::new()
        .route(
            "/authentications",
            // Layers added to a method router only wrap the methods registered before them.
            post(handlers::login)
                .route_layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::login_rate_limit,
                ))
                .route_layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::require_client_key,
                ))
                .delete(handlers::logout),
        )
        .route("/authentications/check", get(handlers::check_token));

    let public = Router::new()
        .route("/articles/public", get(handlers::list_public_articles))
        .route("/articles/public/home", get(handlers::public_home))
        .route("/articles/public/all", get(handlers::public_all))
        .route("/articles/public/{slug}", get(handlers::get_public_article))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_client_key,
        ));

    let users = Router::new()
        .route(
            "/users/my/profile",
            get(handlers::get_my_profile).put(handlers::update_my_profile),
        )
        .route("/users/my/password", put(handlers::update_my_password))
        .route("/users/my/image", post(handlers::update_my_image))
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/{username}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route(
            "/users/{username}/password",
            put(handlers::reset_user_password),
        );

    let categories = Router::new()
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/categories/{slug}",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        );

    let articles = Router::new()
        .route(
            "/articles",
            get(handlers::list_articles).post(handlers::create_article),
        )
        .route("/articles/generate-slug", post(handlers::generate_slug))
        .route("/articles/upload-image", post(handlers::upload_article_image))
        .route("/articles/stats", get(handlers::article_stats))
        .route("/articles/slugs", get(handlers::article_slugs))
        .route("/articles/cache/flush", get(handlers::flush_cache))
        .route(
            "/articles/{slug}",
            get(handlers::get_article)
                .put(handlers::update_article)
                .delete(handlers::delete_article),
        );

    Router::new()
        .merge(login)
        .merge(public)
        .merge(users)
        .merge(categories)
        .merge(articles)
        .route("/languages", get(handlers::list_languages))
        .route("/images/{*path}", get(handlers::serve_image))
}
