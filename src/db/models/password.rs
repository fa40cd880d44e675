//! Models mapping to the password database table. Represents a password-based
//! credential used by a user.
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use sqlx::{query, query_as, PgExecutor};
use uuid::Uuid;

use crate::db::{errors::DatabaseError, ConnectionPool};

/// INSERT model for a `Password`. Used ONLY when adding a new credential.
pub struct PasswordInsert {
    /// The ID of the user who uses this credential.
    user_id: Uuid,
    /// The hashed password string.
    password: String,
}

/// A `Password` which is stored in the database. Can only be constructed
/// by reading it from the database.
#[derive(sqlx::FromRow)]
pub struct Password {
    /// The ID of the user who uses this credential.
    user_id: Uuid,
    /// The hashed password string.
    password: String,
}

/// Instantiate an Argon2 context with the standard parameters.
fn create_argon2<'a>() -> Argon2<'a> {
    Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        Params::new(12288, 3, 1, None).expect("Invalid Argon2id parameters"),
    )
}

/// Convert a raw password string into a hashed representation.
fn hash_password(password: &str) -> String {
    let argon2 = create_argon2();
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .expect("Argon2id error while hashing password");
    hash.to_string()
}

/// Check a plaintext password against a stored PHC hash string. A malformed
/// hash never verifies.
fn verify_hash(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    create_argon2()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

impl PasswordInsert {
    /// Construct a new password INSERT model.
    pub fn new(user_id: Uuid, password: &str) -> Self {
        Self {
            user_id,
            password: hash_password(password),
        }
    }
    /// Store this INSERT model in the database and return a complete `Password` model.
    pub async fn store<'e>(
        &self,
        executor: impl PgExecutor<'e>,
    ) -> Result<Password, DatabaseError> {
        Ok(query_as::<_, Password>(
            "INSERT INTO password (user_id, password) VALUES ($1, $2) RETURNING *",
        )
        .bind(self.user_id)
        .bind(&self.password)
        .fetch_one(executor)
        .await?)
    }
}

impl Password {
    /// Verify that a given plaintext password matches this credential.
    pub fn verify(&self, password: &str) -> bool {
        verify_hash(password, &self.password)
    }
    /// Update the password stored in this credential.
    pub fn set_password(&mut self, password: &str) {
        self.password = hash_password(password);
    }
    /// Select a password credential from the database by the corresponding user's ID.
    pub async fn select(
        user_id: Uuid,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(
            query_as::<_, Self>("SELECT * FROM password WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(db_client)
                .await?,
        )
    }
    /// Update the database record to match the model's internal state.
    pub async fn update(&self, db_client: &ConnectionPool) -> Result<(), DatabaseError> {
        query("UPDATE password SET password = $1 WHERE user_id = $2")
            .bind(&self.password)
            .bind(self.user_id)
            .execute(db_client)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_original_password_only() {
        let hash = hash_password("correct horse battery");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_hash("correct horse battery", &hash));
        assert!(!verify_hash("correct horse battery!", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(hash_password("samosa123"), hash_password("samosa123"));
    }

    #[test]
    fn malformed_hash_does_not_verify() {
        assert!(!verify_hash("anything", "not-a-phc-string"));
    }

    #[test]
    fn set_password_rehashes() {
        let mut credential = Password {
            user_id: Uuid::new_v4(),
            password: hash_password("old password"),
        };
        credential.set_password("new password");
        assert!(credential.verify("new password"));
        assert!(!credential.verify("old password"));
    }
}
