// Authentication handlers: authorize redirect, login, refresh and logout
use crate::login::{LoginError, LoginService};
use crate::oauth::LoginRequest;
use crate::tokens::{AccessToken, CookieDescriptor, REFRESH_COOKIE_NAME};
use crate::utils::responses::ResponseBuilder;
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use log::debug;
use serde::Serialize;

/// Body returned whenever a new access token is issued
///
/// Carries no refresh token; that one only travels in the cookie.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Unix timestamp (seconds)
    pub expires_at: i64,
}

impl From<&AccessToken> for TokenResponse {
    fn from(token: &AccessToken) -> Self {
        Self {
            access_token: token.as_str().to_string(),
            token_type: "Bearer",
            expires_at: token.expires_at().timestamp(),
        }
    }
}

/// Redirect the browser to GitHub's consent page
pub async fn github_authorize(service: web::Data<LoginService>) -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, service.authorize_url()))
        .finish()
}

/// Exchange the authorization code GitHub handed back for platform tokens
///
/// # Errors
///
/// Returns a `LoginError`, rendered as a JSON error response, if either
/// GitHub exchange fails or the tokens cannot be signed.
pub async fn login(
    body: web::Json<LoginRequest>,
    service: web::Data<LoginService>,
) -> Result<HttpResponse, LoginError> {
    let Some(code) = body.code.as_deref() else {
        debug!("Login request without code");
        return Ok(ResponseBuilder::missing_field("code"));
    };

    let result = service.login(code).await?;
    Ok(HttpResponse::Ok()
        .cookie(result.refresh_cookie().to_cookie())
        .json(TokenResponse::from(result.access_token())))
}

/// Mint a new access token from the refresh cookie
///
/// # Errors
///
/// Returns `LoginError::InvalidToken` if the refresh token does not verify.
pub async fn refresh(
    req: HttpRequest,
    service: web::Data<LoginService>,
) -> Result<HttpResponse, LoginError> {
    let Some(cookie) = req.cookie(REFRESH_COOKIE_NAME) else {
        debug!("Refresh request without refresh cookie");
        return Ok(ResponseBuilder::invalid_token());
    };

    let access_token = service.refresh(cookie.value())?;
    Ok(HttpResponse::Ok().json(TokenResponse::from(&access_token)))
}

/// Drop the refresh cookie from the browser
///
/// Tokens are stateless, so an already-copied refresh token stays valid
/// until it expires.
pub async fn logout() -> HttpResponse {
    HttpResponse::NoContent()
        .cookie(CookieDescriptor::expired_refresh_token().to_cookie())
        .finish()
}
