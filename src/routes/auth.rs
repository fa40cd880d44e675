//! Routes under /auth handling login, logout and session inspection.
use crate::{
    constants::sessions::{CSRF_COOKIE, SESSION_COOKIE},
    db::models::appuser::AppUserRole,
    middleware::session::{optional_session_middleware, session_middleware},
    services::{
        auth,
        sessions::{GenericAuthenticatedSession, SessionTrait as _},
    },
    state::AppState,
    utils::{httperror::HttpError, mobile::MobileNumber},
};
use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

/// Create a router for the /auth route.
pub fn create_router(state: &AppState) -> Router<AppState> {
    let authenticated = Router::new()
        .route("/whoami", get(whoami))
        .layer(from_fn_with_state(
            state.clone(),
            session_middleware::<GenericAuthenticatedSession>,
        ));
    let optional = Router::new()
        .route("/logout", post(logout))
        .layer(from_fn_with_state(state.clone(), optional_session_middleware));
    Router::new()
        .route("/login", post(login))
        .merge(authenticated)
        .merge(optional)
}

/// Attach the cookies identifying `session` to the jar. The CSRF cookie is
/// readable by scripts so they can echo it back in a header.
pub fn add_session_cookies(cookies: CookieJar, session: &GenericAuthenticatedSession) -> CookieJar {
    cookies
        .add(
            Cookie::build((SESSION_COOKIE, session.token()))
                .http_only(true)
                .same_site(SameSite::Strict)
                .path("/"),
        )
        .add(
            Cookie::build((CSRF_COOKIE, session.csrf_token()))
                .same_site(SameSite::Strict)
                .path("/"),
        )
}

/// Remove the session cookies from the jar.
pub fn remove_session_cookies(cookies: CookieJar) -> CookieJar {
    cookies
        .remove(Cookie::build(SESSION_COOKIE).path("/"))
        .remove(Cookie::build(CSRF_COOKIE).path("/"))
}

#[derive(Deserialize)]
/// A request to /auth/login.
struct LoginRequest {
    mobile_number: String,
    password: String,
}

#[derive(Serialize)]
/// A response to a successful login or registration.
pub struct SessionResponse {
    pub message: &'static str,
    pub user_id: Uuid,
    pub role: AppUserRole,
    pub csrf_token: String,
}

impl SessionResponse {
    pub fn new(message: &'static str, session: &GenericAuthenticatedSession) -> Self {
        Self {
            message,
            user_id: session.user_id(),
            role: session.role(),
            csrf_token: session.csrf_token(),
        }
    }
}

async fn login(
    cookies: CookieJar,
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), HttpError> {
    let invalid = || HttpError::with_message(StatusCode::UNAUTHORIZED, "Invalid mobile or password");
    let Ok(mobile) = MobileNumber::try_from(body.mobile_number.as_str()) else {
        warn!("Login attempted with a malformed mobile number");
        return Err(invalid());
    };
    let mut session_store = state.session_store.clone();
    let (_, session) = auth::authenticate(&mobile, &body.password, &state.db, &mut session_store)
        .await?
        .ok_or_else(|| {
            warn!("Failed login attempt");
            invalid()
        })?;
    Ok((
        add_session_cookies(cookies, &session),
        Json(SessionResponse::new("Login successful", &session)),
    ))
}

/// Log out. Succeeds whether or not there was a session to end.
async fn logout(
    cookies: CookieJar,
    State(state): State<AppState>,
    Extension(session): Extension<Option<GenericAuthenticatedSession>>,
) -> Result<(CookieJar, Json<Value>), HttpError> {
    if let Some(session) = session {
        auth::logout(session, &mut state.session_store.clone()).await?;
    }
    Ok((
        remove_session_cookies(cookies),
        Json(json!({"message": "Logged out successfully"})),
    ))
}

#[derive(Serialize)]
/// A response to /auth/whoami
struct WhoamiResponse {
    user_id: Uuid,
    role: AppUserRole,
}

/// Get the currently authenticated user.
async fn whoami(Extension(session): Extension<GenericAuthenticatedSession>) -> Json<WhoamiResponse> {
    Json(WhoamiResponse {
        user_id: session.user_id(),
        role: session.role(),
    })
}
