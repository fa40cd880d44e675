//! Services which manage authentication.
use crate::{
    db::{
        self,
        models::{appuser::AppUser, password::Password},
    },
    services::sessions::{self, GenericAuthenticatedSession, SessionTrait as _},
    utils::mobile::MobileNumber,
};
use tracing::info;

/// Check a user's password.
async fn do_password_authentication(
    user: &AppUser,
    password: &str,
    db_conn: &db::ConnectionPool,
) -> Result<bool, db::errors::DatabaseError> {
    Ok(Password::select(user.id(), db_conn)
        .await?
        .is_some_and(|fetched| fetched.verify(password)))
}

/// Authenticate with a mobile number and password, and open a session if
/// successful. Returns `None` when the user is unknown or the password is
/// wrong; the two cases are deliberately indistinguishable to callers.
pub async fn authenticate(
    mobile: &MobileNumber,
    password: &str,
    db_conn: &db::ConnectionPool,
    session_store_conn: &mut sessions::store::Connection,
) -> Result<Option<(AppUser, GenericAuthenticatedSession)>, super::errors::StorageError> {
    let Some(user) = AppUser::select_by_mobile(mobile, db_conn).await? else {
        return Ok(None);
    };
    if !do_password_authentication(&user, password, db_conn).await? {
        return Ok(None);
    }
    let session =
        GenericAuthenticatedSession::create(user.id(), user.role, session_store_conn).await?;
    info!(user_id = %user.id(), role = ?user.role, "User logged in");
    Ok(Some((user, session)))
}

/// Revoke a session.
pub async fn logout(
    session: GenericAuthenticatedSession,
    session_store_conn: &mut sessions::store::Connection,
) -> Result<(), sessions::errors::SessionStorageError> {
    let user_id = session.user_id();
    session.delete(session_store_conn).await?;
    info!(%user_id, "User logged out");
    Ok(())
}
