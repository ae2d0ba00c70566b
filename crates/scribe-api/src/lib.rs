pub mod auth;
pub mod comments;
pub mod error;
pub mod middleware;
pub mod policy;
pub mod posts;
mod responses;
pub mod users;
pub mod validate;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};

pub use auth::{AppState, AppStateInner};

/// Assemble the versioned API surface. Rate limiting, CORS, and request
/// tracing are layered on top by the binary.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/login", post(auth::login))
        .route("/users", post(users::create_user))
        .route("/posts/{post_id}/comments", get(comments::list_comments))
        .with_state(state.clone());

    let optional = Router::new()
        .route("/posts", get(posts::list_posts))
        .route("/posts/{post_id}", get(posts::get_post))
        .layer(from_fn_with_state(state.clone(), middleware::identify))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/users", get(users::list_users))
        .route(
            "/users/{user_id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/posts", post(posts::create_post))
        .route(
            "/posts/{post_id}",
            put(posts::update_post).delete(posts::delete_post),
        )
        .route("/posts/{post_id}/comments", post(comments::create_comment))
        .route(
            "/posts/{post_id}/comments/{comment_id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state);

    Router::new().nest("/v1", public.merge(optional).merge(protected))
}
