use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{
        header::{AUTHORIZATION, COOKIE, InvalidHeaderValue},
        request::Parts,
        HeaderMap, HeaderValue,
    },
};
use tracing::warn;

use crate::{
    auth::jwt::{TokenKeys, TokenKind},
    error::ApiError,
    state::AppState,
    users::{repo, repo_types::User},
};

pub const SESSION_COOKIE_NAME: &str = "taskhub_session";

/// The authenticated caller: the loaded user plus the exact token string the
/// request presented. Logout needs that string to remove the right row.
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(&parts.headers).ok_or(ApiError::Unauthenticated)?;

        let keys = TokenKeys::from_ref(state);
        let user_id = keys
            .verify(TokenKind::Session, &token)
            .map_err(|_| ApiError::Unauthenticated)?;

        // A logged-out token still carries a valid signature; it only
        // authenticates while it appears in the user's stored token list.
        let user = repo::find_by_id_and_session_token(&state.db, user_id, &token)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %user_id, "session token not in store");
                ApiError::Unauthenticated
            })?;

        Ok(AuthSession { user, token })
    }
}

/// Bearer header first, session cookie as fallback.
fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = bearer_token(headers) {
        return Some(token);
    }
    cookie_token(headers)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .trim()
        .strip_prefix("Bearer ")
        .or_else(|| value.trim().strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(COOKIE)?.to_str().ok()?;
    for pair in value.split(';') {
        if let Some((key, val)) = pair.trim().split_once('=') {
            if key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty() {
                return Some(val.trim().to_string());
            }
        }
    }
    None
}

/// `HttpOnly` cookie mirroring the body token on login/activate responses.
/// No Max-Age: session tokens live until revoked.
pub fn session_cookie(token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(name: axum::http::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, value.parse().unwrap());
        headers
    }

    #[test]
    fn reads_bearer_token() {
        let headers = headers_with(AUTHORIZATION, "Bearer abc.def.ghi");
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn rejects_non_bearer_scheme() {
        let headers = headers_with(AUTHORIZATION, "Basic abc");
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn falls_back_to_session_cookie() {
        let headers = headers_with(COOKIE, "theme=dark; taskhub_session=tok123; lang=en");
        assert_eq!(extract_session_token(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn skips_malformed_cookie_pairs() {
        let headers = headers_with(COOKIE, "junk; taskhub_session=tok123");
        assert_eq!(extract_session_token(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer from-header".parse().unwrap());
        headers.insert(COOKIE, "taskhub_session=from-cookie".parse().unwrap());
        assert_eq!(
            extract_session_token(&headers).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn absent_credentials_yield_none() {
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
        let headers = headers_with(COOKIE, "theme=dark");
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn session_cookie_is_http_only() {
        let value = session_cookie("tok").expect("header value");
        let s = value.to_str().unwrap();
        assert!(s.starts_with("taskhub_session=tok"));
        assert!(s.contains("HttpOnly"));
    }
}
