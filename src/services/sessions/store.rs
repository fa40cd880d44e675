//! Provides an abstracted interface to the underlying session store. Accessible only
//! within the session service, since no other part of the code should ever access
//! the session store.
use crate::constants::redis as constants;
use redis::{aio::MultiplexedConnection, AsyncCommands as _, Script};
use std::sync::LazyLock;
use uuid::Uuid;

/// Writes a whole session and its expiry in one step, unless the key is taken.
static CREATE_SESSION: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('HSETNX', KEYS[1], 'user_id', ARGV[1]) == 0 then
            return 0
        end
        redis.call('HSET', KEYS[1], 'admin', ARGV[2], 'csrf', ARGV[3])
        redis.call('EXPIRE', KEYS[1], ARGV[4])
        return 1
        ",
    )
});

#[derive(Clone)]
/// A connection to the session store. Guaranteed to be safe to clone and share
/// between threads.
pub struct Connection(MultiplexedConnection);

/// Information stored under a given session token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    /// The user this session authenticates.
    pub user_id: Uuid,
    /// Whether the session grants administrative access.
    pub admin: bool,
    /// The CSRF token requests made with this session must present.
    pub csrf: String,
}

/// The store key holding the session identified by `token`.
fn session_key(token: &str) -> String {
    format!("sessions:authenticated:{token}")
}

impl Connection {
    /// Initiate a new (multiplexed) connection to the session store.
    /// This connection can be cloned and is safe share between threads.
    pub async fn connect() -> Result<Self, errors::SessionStorageError> {
        Ok(Self(
            redis::Client::open(constants::REDIS_URL.clone())?
                .get_multiplexed_async_connection()
                .await?,
        ))
    }

    /// Store a new session under `token`, expiring after `seconds`.
    pub(super) async fn create(
        &mut self,
        token: &str,
        info: &SessionInfo,
        seconds: u32,
    ) -> Result<(), errors::SessionCreationError> {
        let created: bool = CREATE_SESSION
            .key(session_key(token))
            .arg(info.user_id)
            .arg(info.admin)
            .arg(&info.csrf)
            .arg(seconds)
            .invoke_async(&mut self.0)
            .await?;
        if created {
            Ok(())
        } else {
            Err(errors::SessionCreationError::Duplicate)
        }
    }

    /// Delete a token and all associated data from the store.
    pub(super) async fn delete(&mut self, token: &str) -> Result<(), errors::SessionStorageError> {
        let _: () = self.0.del(session_key(token)).await?;
        Ok(())
    }

    /// Get stored session info associated with a given token. Partially
    /// written sessions are treated as absent.
    pub(super) async fn get_info(
        &mut self,
        token: &str,
    ) -> Result<Option<SessionInfo>, errors::SessionStorageError> {
        let (user_id, admin, csrf): (Option<Uuid>, Option<bool>, Option<String>) = self
            .0
            .hget(session_key(token), &["user_id", "admin", "csrf"])
            .await?;
        Ok(match (user_id, admin, csrf) {
            (Some(user_id), Some(admin), Some(csrf)) => Some(SessionInfo {
                user_id,
                admin,
                csrf,
            }),
            _ => None,
        })
    }
}

/// Errors returned by functions in this module.
pub mod errors {
    use redis::RedisError;
    use thiserror::Error;

    /// An error returned by the underlying storage layer.
    #[derive(Error, Debug)]
    #[error(transparent)]
    pub struct SessionStorageError(#[from] RedisError);

    /// Errors which can be thrown when creating a new session in the store.
    #[derive(Error, Debug)]
    pub enum SessionCreationError {
        /// There is already a session with the same token.
        #[error("Attempted to store a session token which already exists.")]
        Duplicate,
        /// There was an error while writing to/reading from the store.
        #[error(transparent)]
        StorageError(#[from] SessionStorageError),
    }

    impl From<RedisError> for SessionCreationError {
        fn from(err: RedisError) -> Self {
            Self::from(SessionStorageError::from(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{errors::SessionCreationError, session_key, Connection, SessionInfo};
    use redis::AsyncCommands as _;
    use uuid::Uuid;

    #[test]
    fn sessions_are_namespaced() {
        assert_eq!(session_key("abc123"), "sessions:authenticated:abc123");
    }

    /// Runs only when a redis instance is configured through `REDIS_URL`.
    async fn test_connection() -> Option<Connection> {
        if std::env::var("REDIS_URL").is_err() {
            eprintln!("REDIS_URL not set, skipping session store test");
            return None;
        }
        Some(Connection::connect().await.expect("redis connection"))
    }

    #[tokio::test]
    async fn created_sessions_always_expire() {
        let Some(mut conn) = test_connection().await else {
            return;
        };
        let token = Uuid::new_v4().simple().to_string();
        let info = SessionInfo {
            user_id: Uuid::new_v4(),
            admin: true,
            csrf: "csrf-token".to_owned(),
        };
        conn.create(&token, &info, 60).await.expect("session created");

        let ttl: i64 = conn.0.ttl(session_key(&token)).await.expect("ttl");
        assert!(ttl > 0 && ttl <= 60, "unexpected ttl {ttl}");
        assert_eq!(conn.get_info(&token).await.expect("lookup"), Some(info.clone()));

        let other = SessionInfo {
            user_id: Uuid::new_v4(),
            ..info.clone()
        };
        assert!(matches!(
            conn.create(&token, &other, 60).await,
            Err(SessionCreationError::Duplicate)
        ));
        assert_eq!(conn.get_info(&token).await.expect("lookup"), Some(info));

        conn.delete(&token).await.expect("session deleted");
        assert_eq!(conn.get_info(&token).await.expect("lookup"), None);
    }
}
