//! Middleware used for checking user authentication/authorisation.
use std::sync::LazyLock;

use crate::{
    constants::sessions::{CSRF_HEADER, SESSION_COOKIE},
    services::sessions::{GenericAuthenticatedSession, SessionTrait},
    state::AppState,
    utils::httperror::HttpError,
};
use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use tracing::warn;

/// The status code used for a CSRF failure. 419 is non-standard but
///  it's what Laravel does.
#[expect(clippy::unwrap_used, reason = "This will never panic")]
static STATUS_CODE_BAD_CSRF: LazyLock<StatusCode> =
    LazyLock::new(|| StatusCode::from_u16(419).unwrap());

/// Requests with these methods must not change state, so skip the CSRF check.
fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Check the CSRF header of a state changing request against the session.
fn check_csrf<T: SessionTrait>(req: &Request, session: &T) -> Result<(), HttpError> {
    if is_safe_method(req.method()) {
        return Ok(());
    }
    let csrf_token = req
        .headers()
        .get(CSRF_HEADER)
        .ok_or_else(|| {
            warn!(user_id = %session.user_id(), "Request is missing {CSRF_HEADER}");
            HttpError::with_message(*STATUS_CODE_BAD_CSRF, "CSRF token missing")
        })?
        .to_str()
        .map_err(|_err| {
            warn!("CSRF token contains non-ASCII.");
            HttpError::from(StatusCode::BAD_REQUEST)
        })?;
    if csrf_token != session.csrf_token() {
        warn!(user_id = %session.user_id(), "Incorrect {CSRF_HEADER} in request");
        return Err(HttpError::with_message(
            *STATUS_CODE_BAD_CSRF,
            "CSRF token mismatch",
        ));
    }
    Ok(())
}

/// Resolve the session cookie, if any, into a session of type `T`.
async fn load_session<T: SessionTrait>(
    state: &AppState,
    cookie_jar: &CookieJar,
) -> Result<Option<T>, HttpError> {
    let Some(cookie) = cookie_jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    Ok(T::get(cookie.value(), &mut state.session_store.clone()).await?)
}

/// Middleware to parse a session cookie and identify the associated user.
/// Requests without a valid session of type `T` are rejected.
pub async fn session_middleware<T: SessionTrait + 'static>(
    State(state): State<AppState>,
    cookie_jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let session = load_session::<T>(&state, &cookie_jar)
        .await?
        .ok_or_else(|| {
            warn!(path = %req.uri().path(), "Missing or invalid session");
            HttpError::with_message(StatusCode::UNAUTHORIZED, "Authentication required")
        })?;
    check_csrf(&req, &session)?;
    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// Like `session_middleware`, but lets anonymous requests through. Handlers
/// receive an `Option<GenericAuthenticatedSession>`.
pub async fn optional_session_middleware(
    State(state): State<AppState>,
    cookie_jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let session = load_session::<GenericAuthenticatedSession>(&state, &cookie_jar).await?;
    if let Some(ref session) = session {
        check_csrf(&req, session)?;
    }
    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_reads_skip_csrf() {
        assert!(is_safe_method(&Method::GET));
        assert!(is_safe_method(&Method::HEAD));
        assert!(!is_safe_method(&Method::POST));
        assert!(!is_safe_method(&Method::PATCH));
        assert!(!is_safe_method(&Method::DELETE));
    }

    #[test]
    fn csrf_status_is_419() {
        assert_eq!(STATUS_CODE_BAD_CSRF.as_u16(), 419);
    }
}
