//! Session endpoints: login and logout.

use axum::{
    Form, Router,
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use polls_common::AppError;
use serde::Deserialize;

use super::page_context;
use crate::{
    extractors::MaybeUser,
    middleware::AppState,
    response::{PageResult, found},
};

const LOGIN_FAILED_MESSAGE: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Where to land after signing in without a usable `next`.
const DEFAULT_REDIRECT: &str = "/polls/";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accounts/login/", get(login_form).post(login))
        .route("/accounts/logout/", post(logout))
}

#[derive(Debug, Deserialize)]
struct LoginQuery {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
    next: Option<String>,
}

/// Only same-site absolute paths are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => DEFAULT_REDIRECT,
    }
}

async fn login_form(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<LoginQuery>,
) -> PageResult<Response> {
    let mut context = page_context(user.as_ref());
    context.insert("next", query.next.as_deref().unwrap_or_default());

    Ok(state
        .templates
        .page(StatusCode::OK, "registration/login.html", &context)?)
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> PageResult<(CookieJar, Response)> {
    match state.user_service.login(&form.username, &form.password).await {
        Ok((_, token)) => {
            let cookie = Cookie::build((state.auth.session_cookie.clone(), token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            Ok((
                jar.add(cookie),
                found(safe_next(form.next.as_deref())),
            ))
        }
        Err(AppError::Unauthorized) => {
            tracing::debug!(username = %form.username, "Login failed");
            let mut context = page_context(None);
            context.insert("error_message", LOGIN_FAILED_MESSAGE);
            context.insert("username", &form.username);
            context.insert("next", form.next.as_deref().unwrap_or_default());

            let page = state
                .templates
                .page(StatusCode::OK, "registration/login.html", &context)?;
            Ok((jar, page))
        }
        Err(err) => Err(err.into()),
    }
}

async fn logout(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
) -> PageResult<(CookieJar, Response)> {
    if let Some(user) = user {
        state.user_service.logout(&user.id).await?;
    }

    let jar = jar.remove(Cookie::build((state.auth.session_cookie.clone(), "")).path("/"));
    Ok((jar, found(DEFAULT_REDIRECT)))
}
