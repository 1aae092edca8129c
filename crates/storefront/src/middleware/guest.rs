//! Guest session identification.
//!
//! A guest is identified by the `np_guest` cookie or, for clients that cannot
//! hold cookies, the `x-guest-session` header. The cookie wins when both are
//! present. Values that are not valid session ids are ignored.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{COOKIE, SET_COOKIE},
        request::Parts,
    },
    response::AppendHeaders,
};
use basket_core::SessionId;
use cookie::{Cookie, SameSite, time::Duration};

use crate::error::AppError;
use crate::services::{SessionService, keys};
use crate::state::AppState;

/// Name of the guest session cookie.
pub const GUEST_COOKIE: &str = "np_guest";

/// Header carrying the guest session for cookie-less clients.
pub const GUEST_HEADER: &str = "x-guest-session";

/// A `Set-Cookie` response part.
pub type SetCookie = AppendHeaders<[(HeaderName, HeaderValue); 1]>;

/// Extractor for the caller's guest session, if any.
///
/// Extraction never fails. When a session id is present its activity is
/// refreshed; a store outage only logs a warning.
///
/// # Example
///
/// ```rust,ignore
/// async fn count(GuestSession(session): GuestSession) -> impl IntoResponse {
///     session.map_or_else(|| "anonymous".to_owned(), |id| id.to_string())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct GuestSession(pub Option<SessionId>);

impl FromRequestParts<AppState> for GuestSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session_id = session_from_headers(&parts.headers);

        if let Some(id) = &session_id {
            tracing::Span::current().record("session_id", id.as_str());
            if let Err(e) = SessionService::new(state.kv())
                .update_session_activity(id)
                .await
            {
                tracing::warn!(session_id = %id, error = %e, "Failed to touch guest session");
            }
        }

        Ok(Self(session_id))
    }
}

impl GuestSession {
    /// Return the current session, starting one if the caller has none.
    ///
    /// The second element is the cookie to send back when a session was
    /// started.
    ///
    /// # Errors
    ///
    /// Returns an error if a new session record cannot be written.
    pub async fn ensure(self, state: &AppState) -> Result<(SessionId, Option<SetCookie>), AppError> {
        if let Some(id) = self.0 {
            return Ok((id, None));
        }
        let id = SessionService::new(state.kv()).start_session().await?;
        let cookie = session_cookie(&id, state.config().secure_cookies())?;
        Ok((id, Some(cookie)))
    }
}

/// Read a guest session id from the cookie or header.
#[must_use]
pub fn session_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == GUEST_COOKIE)
        .and_then(|cookie| SessionId::parse(cookie.value()).ok());

    from_cookie.or_else(|| {
        headers
            .get(GUEST_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| SessionId::parse(value.trim()).ok())
    })
}

/// Cookie carrying `session_id` for the lifetime of a session record.
///
/// # Errors
///
/// Returns `AppError::Internal` if the cookie is not a valid header value.
pub fn session_cookie(session_id: &SessionId, secure: bool) -> Result<SetCookie, AppError> {
    let max_age = Duration::try_from(keys::SESSION_TTL).unwrap_or(Duration::WEEK);
    let cookie = Cookie::build((GUEST_COOKIE, session_id.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .secure(secure)
        .build();
    set_cookie(&cookie)
}

/// Cookie that removes the guest session cookie from the browser.
///
/// # Errors
///
/// Returns `AppError::Internal` if the cookie is not a valid header value.
pub fn expired_cookie(secure: bool) -> Result<SetCookie, AppError> {
    let mut cookie = Cookie::build((GUEST_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .build();
    cookie.make_removal();
    set_cookie(&cookie)
}

fn set_cookie(cookie: &Cookie<'_>) -> Result<SetCookie, AppError> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| AppError::Internal(format!("invalid cookie header: {e}")))?;
    Ok(AppendHeaders([(SET_COOKIE, value)]))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_session_from_cookie() {
        let map = headers(&[("cookie", "theme=dark; np_guest=guest_abc_1; other=1")]);
        assert_eq!(
            session_from_headers(&map).unwrap().as_str(),
            "guest_abc_1"
        );
    }

    #[test]
    fn test_session_from_header() {
        let map = headers(&[("x-guest-session", "guest_xyz_2")]);
        assert_eq!(
            session_from_headers(&map).unwrap().as_str(),
            "guest_xyz_2"
        );
    }

    #[test]
    fn test_cookie_wins_over_header() {
        let map = headers(&[
            ("cookie", "np_guest=guest_abc_1"),
            ("x-guest-session", "guest_xyz_2"),
        ]);
        assert_eq!(
            session_from_headers(&map).unwrap().as_str(),
            "guest_abc_1"
        );
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        assert!(session_from_headers(&headers(&[("cookie", "np_guest=a*b")])).is_none());
        assert!(session_from_headers(&headers(&[("x-guest-session", "")])).is_none());
        assert!(session_from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let id = SessionId::parse("guest_abc_1").unwrap();
        let AppendHeaders([(name, value)]) = session_cookie(&id, true).unwrap();
        assert_eq!(name, SET_COOKIE);
        let value = value.to_str().unwrap();
        assert!(value.starts_with("np_guest=guest_abc_1"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains("Path=/"));
        assert!(value.contains("Secure"));
        assert!(value.contains("Max-Age=604800"));
    }

    #[test]
    fn test_insecure_cookie_for_http() {
        let id = SessionId::parse("guest_abc_1").unwrap();
        let AppendHeaders([(_, value)]) = session_cookie(&id, false).unwrap();
        assert!(!value.to_str().unwrap().contains("Secure"));
    }

    #[test]
    fn test_expired_cookie() {
        let AppendHeaders([(_, value)]) = expired_cookie(false).unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("np_guest=;"));
        assert!(value.contains("Max-Age=0"));
    }
}
