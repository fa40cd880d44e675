//! Routes under /users: a user's own profile, and user administration.
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    constants::media::MAX_PHOTO_SIZE,
    db::models::appuser::{AppUser, AppUserSearchParameters},
    middleware::session::session_middleware,
    routes::auth::remove_session_cookies,
    services::{
        auth,
        media::errors::{LoadImageError, StoreImageError},
        sessions::{AdministratorSession, GenericAuthenticatedSession, SessionTrait as _},
        users,
    },
    state::AppState,
    utils::httperror::HttpError,
};

/// Name of the multipart field carrying a profile photo.
const PHOTO_FIELD: &str = "photo";

pub fn create_router(state: &AppState) -> Router<AppState> {
    let authenticated = Router::new()
        .route(
            "/self",
            get(retrieve_self).put(update_self).delete(delete_self),
        )
        .route("/self/credential", put(update_credential))
        .route(
            "/self/photo",
            get(retrieve_photo)
                .put(upload_photo)
                // Leave room for the multipart framing around the image.
                .layer(DefaultBodyLimit::max(MAX_PHOTO_SIZE + 64 * 1024)),
        )
        .layer(from_fn_with_state(
            state.clone(),
            session_middleware::<GenericAuthenticatedSession>,
        ));
    let administrator = Router::new()
        .route("/", get(search_users))
        .route("/{user_id}", get(retrieve_user))
        .route("/{user_id}/promote", post(promote_user))
        .layer(from_fn_with_state(
            state.clone(),
            session_middleware::<AdministratorSession>,
        ));
    authenticated.merge(administrator)
}

async fn retrieve_user(
    State(state): State<AppState>,
    Extension(session): Extension<AdministratorSession>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<AppUser>, HttpError> {
    let user = users::retrieve_user(user_id, &state.db)
        .await?
        .ok_or_else(|| {
            warn!(
                admin_id = %session.user_id(),
                %user_id,
                "Administrator attempted to retrieve a user who does not exist"
            );
            HttpError::with_message(StatusCode::NOT_FOUND, "User not found")
        })?;
    Ok(Json(user))
}

async fn retrieve_self(
    State(state): State<AppState>,
    Extension(session): Extension<GenericAuthenticatedSession>,
) -> Result<Json<AppUser>, HttpError> {
    Ok(Json(
        users::retrieve_user(session.user_id(), &state.db)
            .await?
            .ok_or_else(|| {
                // The account was deleted while the session lived on.
                warn!(user_id = %session.user_id(), "Session refers to a missing user");
                StatusCode::UNAUTHORIZED
            })?,
    ))
}

async fn update_self(
    State(state): State<AppState>,
    Extension(session): Extension<GenericAuthenticatedSession>,
    Json(body): Json<users::AppUserUpdate>,
) -> Result<Json<AppUser>, HttpError> {
    Ok(Json(
        users::update_user(session.user_id(), body, &state.db).await?,
    ))
}

async fn update_credential(
    State(state): State<AppState>,
    Extension(session): Extension<GenericAuthenticatedSession>,
    Json(body): Json<users::PasswordChange>,
) -> Result<Json<Value>, HttpError> {
    users::update_credential(session.user_id(), body, &state.db).await?;
    Ok(Json(json!({"message": "Password updated"})))
}

/// Accept a multipart upload whose `photo` field holds the new profile photo.
async fn upload_photo(
    State(state): State<AppState>,
    Extension(session): Extension<GenericAuthenticatedSession>,
    mut multipart: Multipart,
) -> Result<Json<AppUser>, HttpError> {
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        warn!("Malformed photo upload: {err}");
        HttpError::new(err.status(), Some(err.body_text()))
    })? {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let image = field.bytes().await.map_err(|err| {
            warn!("Failed reading uploaded photo: {err}");
            HttpError::new(err.status(), Some(err.body_text()))
        })?;
        let user =
            users::set_photo(session.user_id(), image.to_vec(), &state.db, &state.media_store)
                .await?;
        return Ok(Json(user));
    }
    Err(HttpError::with_message(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Missing photo field",
    ))
}

async fn retrieve_photo(
    State(state): State<AppState>,
    Extension(session): Extension<GenericAuthenticatedSession>,
) -> Result<impl IntoResponse, HttpError> {
    let (file_type, bytes) =
        users::retrieve_photo(session.user_id(), &state.db, &state.media_store).await?;
    Ok(([(header::CONTENT_TYPE, file_type.content_type())], bytes))
}

#[derive(Serialize)]
struct UserSearchResponse {
    users: Vec<AppUser>,
}

async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<AppUserSearchParameters>,
) -> Result<Json<UserSearchResponse>, HttpError> {
    Ok(Json(UserSearchResponse {
        users: users::search_users(params, &state.db).await?,
    }))
}

async fn promote_user(
    State(state): State<AppState>,
    Extension(session): Extension<AdministratorSession>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<AppUser>, HttpError> {
    let user = users::promote_user(user_id, &state.db).await?;
    info!(admin_id = %session.user_id(), %user_id, "User promoted by administrator");
    Ok(Json(user))
}

/// Delete the caller's own account and end their session.
async fn delete_self(
    cookies: CookieJar,
    State(state): State<AppState>,
    Extension(session): Extension<GenericAuthenticatedSession>,
) -> Result<(CookieJar, Json<Value>), HttpError> {
    users::delete_user(session.user_id(), &state.db).await?;
    auth::logout(session, &mut state.session_store.clone()).await?;
    Ok((
        remove_session_cookies(cookies),
        Json(json!({"message": "Account deleted"})),
    ))
}

impl From<users::errors::CredentialUpdateError> for HttpError {
    fn from(error: users::errors::CredentialUpdateError) -> Self {
        match error {
            users::errors::CredentialUpdateError::DatabaseError(err) => err.into(),
            users::errors::CredentialUpdateError::WeakPassword(err) => err.into(),
            users::errors::CredentialUpdateError::UserNonExistent(user_id) => {
                warn!(%user_id, "Password change for a user without a password");
                StatusCode::UNAUTHORIZED.into()
            }
            users::errors::CredentialUpdateError::IncorrectPassword(user_id) => {
                warn!(%user_id, "Password change with an incorrect current password");
                Self::with_message(StatusCode::FORBIDDEN, "Current password is incorrect")
            }
        }
    }
}

impl From<users::errors::UserPromotionError> for HttpError {
    fn from(error: users::errors::UserPromotionError) -> Self {
        match error {
            users::errors::UserPromotionError::DatabaseError(err) => err.into(),
            users::errors::UserPromotionError::UserNonExistent(user_id) => {
                warn!(%user_id, "Attempted to promote non-existent user");
                Self::with_message(StatusCode::NOT_FOUND, "User not found")
            }
            users::errors::UserPromotionError::AlreadyAdministrator(user_id) => {
                warn!(%user_id, "Attempted to promote a user who is already an administrator");
                Self::with_message(StatusCode::CONFLICT, "User is already an administrator")
            }
        }
    }
}

impl From<users::errors::UserDeletionError> for HttpError {
    fn from(error: users::errors::UserDeletionError) -> Self {
        match error {
            users::errors::UserDeletionError::DatabaseError(err) => err.into(),
            users::errors::UserDeletionError::UserNonExistent(user_id) => {
                warn!(%user_id, "Attempted to delete non-existent user");
                Self::with_message(StatusCode::NOT_FOUND, "User not found")
            }
            users::errors::UserDeletionError::SoleAdministrator(user_id) => {
                warn!(%user_id, "Sole administrator attempted to delete their account");
                Self::with_message(
                    StatusCode::FORBIDDEN,
                    "Cannot delete account until another administrator is promoted.",
                )
            }
        }
    }
}

impl From<users::errors::UserUpdateError> for HttpError {
    fn from(error: users::errors::UserUpdateError) -> Self {
        match error {
            users::errors::UserUpdateError::DatabaseError(err) => err.into(),
            users::errors::UserUpdateError::UserNonExistent(user_id) => {
                warn!(%user_id, "Attempted to update non-existent user");
                Self::with_message(StatusCode::NOT_FOUND, "User not found")
            }
            users::errors::UserUpdateError::NameMissing => {
                Self::with_message(StatusCode::UNPROCESSABLE_ENTITY, "Name is required")
            }
        }
    }
}

impl From<users::errors::PhotoUpdateError> for HttpError {
    fn from(error: users::errors::PhotoUpdateError) -> Self {
        match error {
            users::errors::PhotoUpdateError::DatabaseError(err) => err.into(),
            users::errors::PhotoUpdateError::UserNonExistent(_) => StatusCode::UNAUTHORIZED.into(),
            users::errors::PhotoUpdateError::ImageError(StoreImageError::InvalidFileType) => {
                Self::with_message(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Photo must be a PNG, JPEG, GIF or WEBP image",
                )
            }
            users::errors::PhotoUpdateError::ImageError(StoreImageError::TooLarge) => {
                Self::with_message(StatusCode::PAYLOAD_TOO_LARGE, "Photo is too large")
            }
            users::errors::PhotoUpdateError::ImageError(StoreImageError::StorageError(err)) => {
                err.into()
            }
        }
    }
}

impl From<users::errors::PhotoRetrievalError> for HttpError {
    fn from(error: users::errors::PhotoRetrievalError) -> Self {
        match error {
            users::errors::PhotoRetrievalError::DatabaseError(err) => err.into(),
            users::errors::PhotoRetrievalError::NoPhoto(_)
            | users::errors::PhotoRetrievalError::ImageError(LoadImageError::NotFound) => {
                Self::with_message(StatusCode::NOT_FOUND, "No profile photo")
            }
            users::errors::PhotoRetrievalError::ImageError(LoadImageError::NotAnImage) => {
                StatusCode::INTERNAL_SERVER_ERROR.into()
            }
            users::errors::PhotoRetrievalError::ImageError(LoadImageError::StorageError(err)) => {
                err.into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_errors_map_to_statuses() {
        assert_eq!(
            HttpError::from(users::errors::PhotoUpdateError::ImageError(
                StoreImageError::TooLarge
            ))
            .status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            HttpError::from(users::errors::PhotoUpdateError::ImageError(
                StoreImageError::InvalidFileType
            ))
            .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            HttpError::from(users::errors::PhotoRetrievalError::NoPhoto(Uuid::new_v4())).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn sole_administrator_cannot_leave() {
        let err = HttpError::from(users::errors::UserDeletionError::SoleAdministrator(
            Uuid::new_v4(),
        ));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn wrong_current_password_is_forbidden() {
        let err = HttpError::from(users::errors::CredentialUpdateError::IncorrectPassword(
            Uuid::new_v4(),
        ));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
