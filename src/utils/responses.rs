//! JSON error responses
//!
//! Every error body has the same shape:
//! `{"error": "<code>", "error_description": "<message>"}`.

use crate::login::LoginError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    error_description: &'a str,
}

/// Entry point for building error responses
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// `400 Bad Request`
    #[must_use]
    pub fn bad_request() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(StatusCode::BAD_REQUEST, "invalid_request")
    }

    /// `401 Unauthorized`
    #[must_use]
    pub fn unauthorized() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    /// `500 Internal Server Error`
    #[must_use]
    pub fn internal_server_error() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(StatusCode::INTERNAL_SERVER_ERROR, "server_error")
    }

    #[must_use]
    pub fn missing_field(field_name: &str) -> HttpResponse {
        Self::bad_request()
            .with_error_code("missing_field")
            .with_message(&format!("Missing required field: {field_name}"))
            .build()
    }

    /// The refresh cookie is absent or its token does not verify
    #[must_use]
    pub fn invalid_token() -> HttpResponse {
        Self::unauthorized()
            .with_error_code("invalid_token")
            .with_message("The provided token is invalid or has expired")
            .build()
    }
}

/// Fluent builder for a single JSON error response
pub struct ErrorResponseBuilder {
    status: StatusCode,
    error_code: String,
    message: Option<String>,
}

impl ErrorResponseBuilder {
    fn new(status: StatusCode, default_code: &str) -> Self {
        Self {
            status,
            error_code: default_code.to_string(),
            message: None,
        }
    }

    #[must_use]
    pub fn with_error_code(mut self, code: &str) -> Self {
        self.error_code = code.to_string();
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    #[must_use]
    pub fn build(self) -> HttpResponse {
        let description = self
            .message
            .as_deref()
            .or_else(|| self.status.canonical_reason())
            .unwrap_or("Request failed");
        HttpResponse::build(self.status).json(ErrorBody {
            error: &self.error_code,
            error_description: description,
        })
    }
}

/// Client-facing messages stay generic; details are in the server log
impl ResponseError for LoginError {
    fn status_code(&self) -> StatusCode {
        match self {
            LoginError::UpstreamAuth(_) | LoginError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            LoginError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            LoginError::UpstreamAuth(_) => "GitHub did not accept the login",
            LoginError::InvalidToken(_) => "The provided token is invalid or has expired",
            LoginError::Configuration(_) => "An internal server error occurred",
        };
        ErrorResponseBuilder::new(self.status_code(), self.code())
            .with_message(message)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::TokenError;
    use actix_web::body::to_bytes;

    async fn body_json(response: HttpResponse) -> serde_json::Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_web::test]
    async fn test_missing_field_body() {
        let response = ResponseBuilder::missing_field("code");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "missing_field");
        assert_eq!(body["error_description"], "Missing required field: code");
    }

    #[actix_web::test]
    async fn test_default_message_is_reason_phrase() {
        let response = ResponseBuilder::internal_server_error().build();
        let body = body_json(response).await;
        assert_eq!(body["error"], "server_error");
        assert_eq!(body["error_description"], "Internal Server Error");
    }

    #[actix_web::test]
    async fn test_login_error_mapping() {
        let upstream = LoginError::UpstreamAuth("bad_verification_code".to_string());
        assert_eq!(upstream.status_code(), StatusCode::UNAUTHORIZED);

        let body = body_json(upstream.error_response()).await;
        assert_eq!(body["error"], "upstream_auth_failed");
        assert!(!body.to_string().contains("bad_verification_code"));

        let config = LoginError::Configuration("signing secret missing".to_string());
        assert_eq!(config.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let invalid = LoginError::from(TokenError::Expired);
        assert_eq!(invalid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(invalid.error_response()).await["error"], "invalid_token");
    }
}
