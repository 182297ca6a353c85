use actix_web::cookie::{time::Duration, Cookie, SameSite};
use std::fmt;

/// Name of the cookie carrying the refresh token
pub const REFRESH_COOKIE_NAME: &str = "refresh-token";

/// How the refresh token is transported to and stored by the browser
///
/// `HttpOnly`, `Secure`, `Path=/` and a bounded `Max-Age` are fixed by the
/// constructors; there is no way to build a relaxed descriptor.
#[derive(Clone, PartialEq, Eq)]
pub struct CookieDescriptor {
    name: String,
    value: String,
    http_only: bool,
    secure: bool,
    path: String,
    max_age_seconds: i64,
    same_site: SameSite,
}

impl CookieDescriptor {
    /// Descriptor for a freshly minted refresh token
    #[must_use]
    pub fn refresh_token(value: &str, max_age_seconds: i64) -> Self {
        Self {
            name: REFRESH_COOKIE_NAME.to_string(),
            value: value.to_string(),
            http_only: true,
            secure: true,
            path: "/".to_string(),
            max_age_seconds,
            same_site: SameSite::Lax,
        }
    }

    /// Descriptor that makes the browser drop the refresh cookie
    #[must_use]
    pub fn expired_refresh_token() -> Self {
        Self::refresh_token("", 0)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn http_only(&self) -> bool {
        self.http_only
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn max_age_seconds(&self) -> i64 {
        self.max_age_seconds
    }

    #[must_use]
    pub fn same_site(&self) -> SameSite {
        self.same_site
    }

    /// Build the `Set-Cookie` value for an HTTP response
    #[must_use]
    pub fn to_cookie(&self) -> Cookie<'static> {
        Cookie::build(self.name.clone(), self.value.clone())
            .http_only(self.http_only)
            .secure(self.secure)
            .same_site(self.same_site)
            .path(self.path.clone())
            .max_age(Duration::seconds(self.max_age_seconds))
            .finish()
    }
}

impl fmt::Debug for CookieDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieDescriptor")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("http_only", &self.http_only)
            .field("secure", &self.secure)
            .field("path", &self.path)
            .field("max_age_seconds", &self.max_age_seconds)
            .field("same_site", &self.same_site)
            .finish()
    }
}
