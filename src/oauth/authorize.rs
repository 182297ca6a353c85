// Redirect helper for starting the GitHub consent flow
use url::form_urlencoded;

/// Build the URL the browser is sent to for GitHub consent
///
/// Deterministic concatenation: no network call and no failure mode. The
/// configured redirect URI is appended when present.
#[must_use]
pub fn build_authorize_url(authorize_url: &str, client_id: &str, redirect_uri: &str) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("client_id", client_id);
    if !redirect_uri.is_empty() {
        query.append_pair("redirect_uri", redirect_uri);
    }
    let separator = if authorize_url.contains('?') { '&' } else { '?' };
    format!("{authorize_url}{separator}{}", query.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::GITHUB_AUTHORIZE_URL;

    #[test]
    fn test_client_id_only() {
        assert_eq!(
            build_authorize_url(GITHUB_AUTHORIZE_URL, "62a8bd9f", ""),
            "https://github.com/login/oauth/authorize?client_id=62a8bd9f"
        );
    }

    #[test]
    fn test_redirect_uri_is_encoded() {
        assert_eq!(
            build_authorize_url(
                GITHUB_AUTHORIZE_URL,
                "client",
                "https://app.example.com/login-process"
            ),
            "https://github.com/login/oauth/authorize?client_id=client&redirect_uri=https%3A%2F%2Fapp.example.com%2Flogin-process"
        );
    }

    #[test]
    fn test_existing_query_is_extended() {
        assert_eq!(
            build_authorize_url("https://idp.example/authorize?tenant=1", "abc", ""),
            "https://idp.example/authorize?tenant=1&client_id=abc"
        );
    }
}
