//! HTTP endpoints.

mod admin;
mod auth;
mod polls;

use axum::{Router, response::Redirect, routing::get};
use polls_common::{AppError, AppResult};
use polls_db::entities::user;
use tera::Context;

use crate::middleware::AppState;

/// Create the application router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::permanent("/polls/") }))
        .merge(polls::router())
        .merge(auth::router())
        .nest("/admin", admin::router())
}

/// Template context shared by every page.
fn page_context(user: Option<&user::Model>) -> Context {
    let mut context = Context::new();
    if let Some(user) = user {
        context.insert("user", user);
    }
    context
}

/// Parse a numeric path segment. Anything else matches no resource.
fn parse_id(raw: &str) -> AppResult<i32> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("No resource at {raw}")))
}
