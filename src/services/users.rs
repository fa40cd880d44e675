use core::fmt;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    db::{
        self,
        models::{
            appuser::{AppUser, AppUserRole, AppUserSearchParameters},
            password::Password,
        },
    },
    services::{
        media::{self, ImageFileType, MediaStore},
        registration::check_password_policy,
    },
    utils::{email::EmailAddress, mobile::MobileNumber},
};

pub async fn retrieve_user(
    user_id: Uuid,
    db_conn: &db::ConnectionPool,
) -> Result<Option<AppUser>, db::errors::DatabaseError> {
    AppUser::select_one(user_id, db_conn).await
}

pub async fn search_users(
    params: AppUserSearchParameters,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<AppUser>, db::errors::DatabaseError> {
    AppUser::search(params, db_conn).await
}

/// Delete a user. Their credentials and cart go with them; their orders are
/// kept without an owner. The last administrator cannot be deleted.
pub async fn delete_user(
    user_id: Uuid,
    db_conn: &db::ConnectionPool,
) -> Result<(), errors::UserDeletionError> {
    let user = AppUser::select_one(user_id, db_conn)
        .await?
        .ok_or(errors::UserDeletionError::UserNonExistent(user_id))?;
    if user.role == AppUserRole::Administrator
        && AppUser::count_with_role(AppUserRole::Administrator, db_conn).await? <= 1
    {
        return Err(errors::UserDeletionError::SoleAdministrator(user_id));
    }
    user.delete(db_conn).await?;
    info!(%user_id, "User deleted");
    Ok(())
}

#[derive(Deserialize, Default)]
pub struct AppUserUpdate {
    email: Option<EmailAddress>,
    name: Option<String>,
    address: Option<String>,
}

impl fmt::Display for AppUserUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.email.is_some() {
            write!(f, "email=[REDACTED] ")?;
        }
        if self.name.is_some() {
            write!(f, "name=[REDACTED] ")?;
        }
        if self.address.is_some() {
            write!(f, "address=[REDACTED] ")?;
        }
        Ok(())
    }
}

pub async fn update_user(
    user_id: Uuid,
    data: AppUserUpdate,
    db_conn: &db::ConnectionPool,
) -> Result<AppUser, errors::UserUpdateError> {
    let mut user = AppUser::select_one(user_id, db_conn)
        .await?
        .ok_or(errors::UserUpdateError::UserNonExistent(user_id))?;
    info!(%user_id, changes = %data, "Updating user profile");
    if let Some(email) = data.email {
        user.set_email(email);
    }
    if let Some(name) = data.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(errors::UserUpdateError::NameMissing);
        }
        name.clone_into(&mut user.name);
    }
    if let Some(address) = data.address {
        address.trim().clone_into(&mut user.address);
    }
    user.update_profile(db_conn).await?;
    Ok(user)
}

#[derive(Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Replace a user's password after checking their current one.
pub async fn update_credential(
    user_id: Uuid,
    change: PasswordChange,
    db_conn: &db::ConnectionPool,
) -> Result<(), errors::CredentialUpdateError> {
    let mut existing = Password::select(user_id, db_conn)
        .await?
        .ok_or(errors::CredentialUpdateError::UserNonExistent(user_id))?;
    if !existing.verify(&change.current_password) {
        return Err(errors::CredentialUpdateError::IncorrectPassword(user_id));
    }
    check_password_policy(&change.new_password)?;
    existing.set_password(&change.new_password);
    existing.update(db_conn).await?;
    info!(%user_id, "Password changed");
    Ok(())
}

/// Store a new profile photo and record it on the user.
pub async fn set_photo(
    user_id: Uuid,
    image: Vec<u8>,
    db_conn: &db::ConnectionPool,
    media_store: &MediaStore,
) -> Result<AppUser, errors::PhotoUpdateError> {
    let mut user = AppUser::select_one(user_id, db_conn)
        .await?
        .ok_or(errors::PhotoUpdateError::UserNonExistent(user_id))?;
    let path = media::store_image(media_store, image).await?;
    info!(%user_id, %path, "Profile photo stored");
    user.set_photo(path, db_conn).await?;
    Ok(user)
}

/// Load a user's profile photo.
pub async fn retrieve_photo(
    user_id: Uuid,
    db_conn: &db::ConnectionPool,
    media_store: &MediaStore,
) -> Result<(ImageFileType, Vec<u8>), errors::PhotoRetrievalError> {
    let path = AppUser::select_one(user_id, db_conn)
        .await?
        .and_then(|user| user.photo)
        .ok_or(errors::PhotoRetrievalError::NoPhoto(user_id))?;
    Ok(media::load_image(media_store, &path).await?)
}

pub async fn promote_user(
    user_id: Uuid,
    db_conn: &db::ConnectionPool,
) -> Result<AppUser, errors::UserPromotionError> {
    let mut user = AppUser::select_one(user_id, db_conn)
        .await?
        .ok_or(errors::UserPromotionError::UserNonExistent(user_id))?;
    if user.promote(db_conn).await? {
        info!(%user_id, "User promoted to administrator");
        Ok(user)
    } else {
        Err(errors::UserPromotionError::AlreadyAdministrator(user_id))
    }
}

/// Promote the user registered with `mobile`, if there is one. Used at
/// startup to seed the first administrator.
pub async fn bootstrap_administrator(
    mobile: &MobileNumber,
    db_conn: &db::ConnectionPool,
) -> Result<bool, errors::UserPromotionError> {
    let Some(user) = AppUser::select_by_mobile(mobile, db_conn).await? else {
        return Ok(false);
    };
    match promote_user(user.id(), db_conn).await {
        Ok(_) | Err(errors::UserPromotionError::AlreadyAdministrator(_)) => Ok(true),
        Err(err) => Err(err),
    }
}

pub mod errors {
    use thiserror::Error;
    use uuid::Uuid;

    use crate::{
        db::errors::DatabaseError,
        services::{
            media::errors::{LoadImageError, StoreImageError},
            registration::errors::PasswordPolicyViolation,
        },
    };

    #[derive(Debug, Error)]
    pub enum UserDeletionError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("The user being deleted does not exist")]
        UserNonExistent(Uuid),
        #[error("The only administrator cannot be deleted")]
        SoleAdministrator(Uuid),
    }
    #[derive(Debug, Error)]
    pub enum UserUpdateError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("The user being updated does not exist")]
        UserNonExistent(Uuid),
        #[error("Name is required")]
        NameMissing,
    }
    #[derive(Debug, Error)]
    pub enum CredentialUpdateError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("The user has no password set")]
        UserNonExistent(Uuid),
        #[error("Current password is incorrect")]
        IncorrectPassword(Uuid),
        #[error(transparent)]
        WeakPassword(#[from] PasswordPolicyViolation),
    }
    #[derive(Debug, Error)]
    pub enum PhotoUpdateError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("The user does not exist")]
        UserNonExistent(Uuid),
        #[error(transparent)]
        ImageError(#[from] StoreImageError),
    }
    #[derive(Debug, Error)]
    pub enum PhotoRetrievalError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("No profile photo")]
        NoPhoto(Uuid),
        #[error(transparent)]
        ImageError(#[from] LoadImageError),
    }
    #[derive(Debug, Error)]
    pub enum UserPromotionError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("The user being promoted does not exist")]
        UserNonExistent(Uuid),
        #[error("The user is already an administrator")]
        AlreadyAdministrator(Uuid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;
    use object_store::memory::InMemory;
    use std::sync::Arc;

    #[test]
    fn update_display_redacts_personal_data() {
        let update: AppUserUpdate = serde_json::from_str(
            r#"{"email": "buddy@bite.me", "address": "12 Curry Lane"}"#,
        )
        .unwrap();
        let shown = update.to_string();
        assert_eq!(shown, "email=[REDACTED] address=[REDACTED] ");
        assert!(!shown.contains("Curry"));
    }

    #[test]
    fn update_rejects_invalid_email() {
        assert!(serde_json::from_str::<AppUserUpdate>(r#"{"email": "nope"}"#).is_err());
    }

    #[tokio::test]
    async fn photo_upload_after_promotion_keeps_the_role() {
        let Some(pool) = testing::test_pool().await else {
            return;
        };
        let media: MediaStore = Arc::new(InMemory::new());
        let user = testing::customer(&pool).await;
        promote_user(user.id(), &pool).await.unwrap();
        assert!(matches!(
            promote_user(user.id(), &pool).await,
            Err(errors::UserPromotionError::AlreadyAdministrator(_))
        ));

        let mut png = vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];
        png.extend_from_slice(b"not really pixels");
        let updated = set_photo(user.id(), png, &pool, &media).await.unwrap();
        assert_eq!(updated.role, AppUserRole::Administrator);

        let stored = retrieve_user(user.id(), &pool).await.unwrap().unwrap();
        assert_eq!(stored.role, AppUserRole::Administrator);
        assert!(stored.photo.is_some());
    }
}
