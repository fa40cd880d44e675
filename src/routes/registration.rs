//! Routes for onboarding and user registration.
use crate::{
    constants::passwords::{PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH},
    db::models::appuser::AppUser,
    routes::auth::{add_session_cookies, SessionResponse},
    services::registration::{
        self,
        errors::{PasswordPolicyViolation, RegistrationError},
    },
    state::AppState,
    utils::httperror::HttpError,
};
use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::post,
    Router,
};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use tracing::warn;

/// Create a router for the /register route.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/", post(register))
}

#[derive(Serialize)]
struct RegistrationResponse {
    #[serde(flatten)]
    session: SessionResponse,
    user: AppUser,
}

/// Create an account and log the new user in.
async fn register(
    cookies: CookieJar,
    State(state): State<AppState>,
    Json(body): Json<registration::Registration>,
) -> Result<(StatusCode, CookieJar, Json<RegistrationResponse>), HttpError> {
    let mut session_store = state.session_store.clone();
    let (user, session) = registration::register(body, &state.db, &mut session_store).await?;
    Ok((
        StatusCode::CREATED,
        add_session_cookies(cookies, &session),
        Json(RegistrationResponse {
            session: SessionResponse::new("Registration successful", &session),
            user,
        }),
    ))
}

impl From<PasswordPolicyViolation> for HttpError {
    fn from(value: PasswordPolicyViolation) -> Self {
        let message = match value {
            PasswordPolicyViolation::TooShort => {
                format!("Password is below the minimum length of {PASSWORD_MIN_LENGTH}")
            }
            PasswordPolicyViolation::TooLong => {
                format!("Password is above the maximum length of {PASSWORD_MAX_LENGTH}")
            }
        };
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, Some(message))
    }
}

impl From<RegistrationError> for HttpError {
    fn from(value: RegistrationError) -> Self {
        match value {
            RegistrationError::StorageError(err) => err.into(),
            RegistrationError::WeakPassword(err) => err.into(),
            RegistrationError::DuplicateMobile => {
                warn!("Attempt to sign up with an already registered mobile number.");
                Self::with_message(StatusCode::CONFLICT, "Mobile already registered")
            }
            err @ (RegistrationError::PasswordMismatch
            | RegistrationError::NameMissing
            | RegistrationError::InvalidMobile
            | RegistrationError::InvalidEmail) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, Some(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_errors_map_to_statuses() {
        assert_eq!(
            HttpError::from(RegistrationError::DuplicateMobile).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            HttpError::from(RegistrationError::PasswordMismatch).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            HttpError::from(RegistrationError::WeakPassword(PasswordPolicyViolation::TooShort))
                .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
