//! Application state and session middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use polls_common::config::AuthConfig;
use polls_core::{AdminService, QuestionService, UserService, VoteService};

use crate::templates::Templates;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub question_service: QuestionService,
    pub vote_service: VoteService,
    pub user_service: UserService,
    pub admin_service: AdminService,
    pub templates: Templates,
    pub auth: AuthConfig,
}

/// Session middleware.
///
/// Resolves the session token from `Authorization: Bearer` or the session
/// cookie and stores the matching user in the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = session_token(&req, &state.auth.session_cookie) {
        match state.user_service.authenticate_by_token(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(err) if err.is_server_error() => {
                tracing::warn!(error = %err, "Session lookup failed");
            }
            Err(_) => tracing::debug!("Ignoring unknown session token"),
        }
    }

    next.run(req).await
}

fn session_token(req: &Request<Body>, cookie_name: &str) -> Option<String> {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    CookieJar::from_headers(req.headers())
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}
