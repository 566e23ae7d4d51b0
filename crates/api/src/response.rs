//! Response helpers.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use polls_common::AppError;
use serde::Serialize;

/// JSON success envelope of the admin endpoints.
///
/// Failures use the `{"error": {...}}` envelope produced by `AppError`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Payload.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response.
    pub const fn ok(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Empty success response.
#[must_use]
pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// `302 Found` redirect to `location`.
#[must_use]
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Failure of an HTML page handler.
///
/// Keeps the status and logging of the wrapped [`AppError`] but answers with a
/// small HTML page instead of the JSON envelope.
#[derive(Debug)]
pub struct PageError(pub AppError);

/// Result type of HTML page handlers.
pub type PageResult<T> = Result<T, PageError>;

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let message = self.0.public_message();
        let status = self.0.into_response().status();
        let title = status.canonical_reason().unwrap_or("Error");

        let body = format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head><title>{title}</title></head>\n\
             <body>\n<h1>{title}</h1>\n<p>{}</p>\n</body>\n</html>\n",
            tera::escape_html(&message)
        );
        (status, Html(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_found_sets_location() {
        let response = found("/polls/1/results/");

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).map(|v| v.as_bytes()),
            Some(b"/polls/1/results/".as_slice())
        );
    }

    #[tokio::test]
    async fn test_page_error_renders_html() {
        let response = PageError(AppError::QuestionNotFound(3)).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("text/html"))
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("<h1>Not Found</h1>"), "{body}");
    }

    #[tokio::test]
    async fn test_page_error_escapes_message() {
        let response = PageError(AppError::BadRequest("<b>bad</b>".to_string())).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("&lt;b&gt;bad&lt;&#x2F;b&gt;"), "{body}");
        assert!(!body.contains("<b>"), "{body}");
    }
}
