//! HTTP layer for polls-rs.
//!
//! - **Pages**: server-rendered poll index, detail, results and graph views
//! - **Accounts**: session login and logout
//! - **Admin**: JSON endpoints for managing questions and choices
//! - **Extractors**: session user, admin user, client IP
//!
//! Built on Axum 0.8 with Tera templates.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod templates;

use axum::Router;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
pub use templates::Templates;

/// The full application: all routes behind the session middleware.
pub fn app(state: AppState) -> Router {
    router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
