//! Logic for session handling. Creating, managing and revoking session tokens.
use crate::{
    constants::sessions::{ADMIN_SESSION_TIMEOUT, SESSION_TIMEOUT},
    db::models::appuser::AppUserRole,
};
pub mod store;
use core::{fmt::Write as _, future::Future};
use store::{Connection, SessionInfo};
use uuid::Uuid;

/// Generates a new 24-byte token using a CSPRNG, hex encoded.
fn generate_token() -> String {
    let mut token_buf: [u8; 24] = [0; 24];
    getrandom::fill(&mut token_buf).expect("Error getting OS random. Critical, aborting.");
    token_buf
        .into_iter()
        .fold(String::with_capacity(48), |mut acc: String, x: u8| {
            let _ = write!(acc, "{x:02x}");
            acc
        })
}

#[derive(Clone)]
/// A session, associating a session token with a given user.
pub struct BaseSession {
    /// The session token used to identify this session.
    token: String,
    /// The information stored in this session.
    session_info: SessionInfo,
}

pub trait SessionTrait: Send + Sync + Clone + Sized {
    /// Get an instance of this session type given the corresponding session token.
    fn get(
        token: &str,
        session_store_conn: &mut Connection,
    ) -> impl Future<Output = Result<Option<Self>, errors::SessionStorageError>> + Send;
    /// Get the session token which identifies this session.
    fn token(&self) -> String;
    /// Get this session's CSRF token.
    fn csrf_token(&self) -> String;
    /// Get the ID of the user this session authenticates.
    fn user_id(&self) -> Uuid;
    /// Delete this session, immediately invalidating it.
    fn delete(
        self,
        session_store_conn: &mut Connection,
    ) -> impl Future<Output = Result<(), errors::SessionStorageError>> + Send {
        let token = self.token();
        async move { session_store_conn.delete(&token).await }
    }
}

/// A session belonging to a customer.
#[derive(Clone)]
pub struct CustomerSession {
    /// The inner session used to interact with the session store.
    session: BaseSession,
}

/// A session which has been fully authenticated and authorized to have
/// administrative access. Note that this is mutally exclusive with
/// having regular customer access.
#[derive(Clone)]
pub struct AdministratorSession {
    /// The inner session used to interact with the session store.
    session: BaseSession,
}

/// A generic authenticated session, which may either be a customer
/// or administrator session.
#[derive(Clone)]
pub enum GenericAuthenticatedSession {
    /// A customer session.
    Customer(CustomerSession),
    /// An administrator session.
    Administrator(AdministratorSession),
}

impl GenericAuthenticatedSession {
    /// Open a new session for a user who has just proven their identity. The
    /// kind of session follows the user's role.
    pub async fn create(
        user_id: Uuid,
        role: AppUserRole,
        session_store_conn: &mut Connection,
    ) -> Result<Self, errors::SessionStorageError> {
        let admin = role == AppUserRole::Administrator;
        let timeout = if admin {
            ADMIN_SESSION_TIMEOUT
        } else {
            SESSION_TIMEOUT
        };
        let session = BaseSession::create(
            SessionInfo {
                user_id,
                admin,
                csrf: generate_token(),
            },
            timeout,
            session_store_conn,
        )
        .await?;
        Ok(Self::from(session))
    }

    /// The role the session was granted.
    pub const fn role(&self) -> AppUserRole {
        match *self {
            Self::Customer(_) => AppUserRole::Customer,
            Self::Administrator(_) => AppUserRole::Administrator,
        }
    }

    /// Whether the session grants administrative access.
    pub const fn is_admin(&self) -> bool {
        matches!(*self, Self::Administrator(_))
    }

    const fn base(&self) -> &BaseSession {
        match *self {
            Self::Customer(CustomerSession { ref session })
            | Self::Administrator(AdministratorSession { ref session }) => session,
        }
    }
}

impl From<BaseSession> for GenericAuthenticatedSession {
    fn from(session: BaseSession) -> Self {
        if session.session_info.admin {
            Self::Administrator(AdministratorSession { session })
        } else {
            Self::Customer(CustomerSession { session })
        }
    }
}

impl SessionTrait for GenericAuthenticatedSession {
    async fn get(
        token: &str,
        session_store_conn: &mut Connection,
    ) -> Result<Option<Self>, errors::SessionStorageError> {
        Ok(BaseSession::get(token, session_store_conn)
            .await?
            .map(Self::from))
    }
    fn token(&self) -> String {
        self.base().token.clone()
    }
    fn csrf_token(&self) -> String {
        self.base().session_info.csrf.clone()
    }
    fn user_id(&self) -> Uuid {
        self.base().session_info.user_id
    }
}

impl SessionTrait for AdministratorSession {
    async fn get(
        token: &str,
        session_store_conn: &mut Connection,
    ) -> Result<Option<Self>, errors::SessionStorageError> {
        Ok(BaseSession::get(token, session_store_conn)
            .await?
            .filter(|session| session.session_info.admin)
            .map(|session| Self { session }))
    }
    fn token(&self) -> String {
        self.session.token.clone()
    }
    fn csrf_token(&self) -> String {
        self.session.session_info.csrf.clone()
    }
    fn user_id(&self) -> Uuid {
        self.session.session_info.user_id
    }
}

impl SessionTrait for CustomerSession {
    async fn get(
        token: &str,
        session_store_conn: &mut Connection,
    ) -> Result<Option<Self>, errors::SessionStorageError> {
        Ok(BaseSession::get(token, session_store_conn)
            .await?
            .filter(|session| !session.session_info.admin)
            .map(|session| Self { session }))
    }
    fn token(&self) -> String {
        self.session.token.clone()
    }
    fn csrf_token(&self) -> String {
        self.session.session_info.csrf.clone()
    }
    fn user_id(&self) -> Uuid {
        self.session.session_info.user_id
    }
}

impl BaseSession {
    /// Create a new generic `BaseSession`.
    async fn create(
        session_info: SessionInfo,
        timeout: u32,
        session_store_conn: &mut Connection,
    ) -> Result<Self, errors::SessionStorageError> {
        let token = loop {
            // Loop until a fresh token is stored.
            let candidate = generate_token();
            match session_store_conn
                .create(&candidate, &session_info, timeout)
                .await
            {
                Ok(()) => break candidate,
                Err(err) => match err {
                    store::errors::SessionCreationError::StorageError(error) => return Err(error),
                    store::errors::SessionCreationError::Duplicate => {}
                },
            }
        };
        Ok(Self {
            token,
            session_info,
        })
    }

    /// Get a session given its token.
    async fn get(
        token: &str,
        session_store_conn: &mut Connection,
    ) -> Result<Option<Self>, errors::SessionStorageError> {
        Ok(session_store_conn
            .get_info(token)
            .await?
            .map(|session_info| Self {
                token: token.to_owned(),
                session_info,
            }))
    }
}

/// Errors returned by function within this module.
pub mod errors {
    pub use super::store::errors::SessionStorageError;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_session(admin: bool) -> BaseSession {
        BaseSession {
            token: generate_token(),
            session_info: SessionInfo {
                user_id: Uuid::new_v4(),
                admin,
                csrf: generate_token(),
            },
        }
    }

    #[test]
    fn tokens_are_48_hex_characters() {
        let token = generate_token();
        assert_eq!(token.len(), 48);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn generic_session_follows_admin_flag() {
        let admin = GenericAuthenticatedSession::from(base_session(true));
        assert!(admin.is_admin());
        assert_eq!(admin.role(), AppUserRole::Administrator);

        let customer = GenericAuthenticatedSession::from(base_session(false));
        assert!(!customer.is_admin());
        assert_eq!(customer.role(), AppUserRole::Customer);
    }

    #[test]
    fn generic_session_exposes_inner_data() {
        let base = base_session(false);
        let expected_user = base.session_info.user_id;
        let expected_csrf = base.session_info.csrf.clone();
        let expected_token = base.token.clone();
        let session = GenericAuthenticatedSession::from(base);
        assert_eq!(session.user_id(), expected_user);
        assert_eq!(session.csrf_token(), expected_csrf);
        assert_eq!(session.token(), expected_token);
    }
}
