//! Request extractors.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
    response::Response,
};
use polls_common::AppError;
use polls_db::entities::user;

use crate::{middleware::AppState, response::found};

/// Signed-in user for pages that require a session.
///
/// Anonymous requests are redirected to the login page with the requested
/// path in `next`.
#[derive(Debug, Clone)]
pub struct SessionUser(pub user::Model);

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<user::Model>() {
            return Ok(Self(user.clone()));
        }

        let next = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path(), |pq| pq.as_str());
        Err(found(&login_redirect(&state.auth.login_url, next)))
    }
}

/// Login URL that returns to `next` afterwards.
#[must_use]
pub fn login_redirect(login_url: &str, next: &str) -> String {
    format!("{login_url}?next={}", urlencoding::encode(next))
}

/// Optional signed-in user.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<user::Model>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<user::Model>().cloned()))
    }
}

/// Signed-in administrator for the admin endpoints.
#[derive(Debug, Clone)]
pub struct AdminUser(pub user::Model);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .ok_or(AppError::Unauthorized)?;

        if !user.is_admin {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(Self(user))
    }
}

/// Address of the client a request came from.
///
/// The first `X-Forwarded-For` entry wins over the socket peer address when
/// it parses as an IP address. Stored in canonical textual form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(forwarded) = parts.headers.get("x-forwarded-for")
            && let Ok(value) = forwarded.to_str()
            && let Some(first) = value.split(',').next().map(str::trim)
            && let Ok(ip) = first.parse::<IpAddr>()
        {
            return Ok(Self(ip.to_string()));
        }

        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| Self(addr.ip().to_string()))
            .ok_or_else(|| AppError::BadRequest("Client address unavailable".to_string()))
    }
}
