//! Contains database models and interaction code.
pub mod models;
#[cfg(test)]
pub mod testing;
use crate::constants::db as constants;

/// An alias for the underlying DBMS specific pool type.
pub type ConnectionPool = sqlx::PgPool;

/// Initiate a pooled connection to the database.
pub async fn connect() -> Result<ConnectionPool, errors::DatabaseError> {
    Ok(sqlx::PgPool::connect(&constants::DB_URL).await?)
}

/// Bring the schema up to date. Every migration is idempotent, so this is
/// safe to run on each boot.
pub async fn migrate(db_conn: &ConnectionPool) -> Result<(), errors::MigrationError> {
    Ok(sqlx::migrate!("./migrations").run(db_conn).await?)
}

/// Check the database is reachable.
pub async fn ping(db_conn: &ConnectionPool) -> Result<(), errors::DatabaseError> {
    sqlx::query("SELECT 1").execute(db_conn).await?;
    Ok(())
}

pub mod errors {
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error(transparent)]
    pub struct DatabaseError(#[from] sqlx::Error);

    impl DatabaseError {
        /// Whether the underlying error is a unique constraint violation.
        pub fn is_unique_violation(&self) -> bool {
            self.0
                .as_database_error()
                .is_some_and(|err| err.is_unique_violation())
        }
    }

    #[derive(Error, Debug)]
    #[error(transparent)]
    pub struct MigrationError(#[from] sqlx::migrate::MigrateError);
}
