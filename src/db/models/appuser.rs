//! Models mapping to the appuser database table. Represents a user and their
//! associated information. Name, email and address are encrypted at rest.
use crate::{
    constants::db::DB_ENCRYPTION_KEY,
    db::{errors::DatabaseError, ConnectionPool},
    utils::{email::EmailAddress, mobile::MobileNumber},
};
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, PgExecutor};
use time::OffsetDateTime;
use uuid::Uuid;

/// Columns selected for a full `AppUser`, decrypting personal data with `$1`.
const APPUSER_COLUMNS: &str = "id, mobile, pgp_sym_decrypt(name, $1) AS name, \
    pgp_sym_decrypt(email, $1) AS email, pgp_sym_decrypt(address, $1) AS address, \
    photo, role, created_at";

/// INSERT model for an `AppUser`. Used ONLY when creating a new user.
#[derive(Clone)]
pub struct AppUserInsert {
    /// The user's mobile number, used to log in.
    mobile: MobileNumber,
    /// The user's display name.
    pub name: String,
    /// The user's email address. Private to enforce validity.
    email: EmailAddress,
    /// The user's default delivery address.
    pub address: String,
}

#[derive(sqlx::Type, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[sqlx(type_name = "app_user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppUserRole {
    /// A regular customer, able to order food.
    Customer,
    /// An administrator, able to manage the catalog and orders.
    Administrator,
}

/// An `AppUser` which is stored in the database. Can only be constructed by
/// reading it from the database.
#[derive(sqlx::FromRow, Serialize)]
pub struct AppUser {
    /// The user's ID primary key.
    id: Uuid,
    /// The user's mobile number. Private to enforce validity.
    mobile: String,
    /// The user's display name.
    pub name: String,
    /// The user's email address. Private to enforce validity.
    email: String,
    /// The user's default delivery address.
    pub address: String,
    /// Path of the user's profile photo within the media store.
    pub photo: Option<String>,
    /// The user's role (customer or admin).
    pub role: AppUserRole,
    /// When the user registered.
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

/// Filters for searching users. Every filter is optional.
#[derive(Deserialize, Default)]
pub struct AppUserSearchParameters {
    pub role: Option<AppUserRole>,
    pub mobile: Option<String>,
}

impl AppUserInsert {
    /// Construct a new `AppUser` INSERT model.
    pub fn new(mobile: MobileNumber, name: &str, email: EmailAddress, address: &str) -> Self {
        Self {
            mobile,
            name: name.trim().to_owned(),
            email,
            address: address.trim().to_owned(),
        }
    }

    /// Store this INSERT model in the database and return a complete `AppUser` model.
    pub async fn store<'e>(
        self,
        role: AppUserRole,
        executor: impl PgExecutor<'e>,
    ) -> Result<AppUser, DatabaseError> {
        let sql = format!(
            "INSERT INTO appuser (mobile, name, email, address, role) \
            VALUES ($2, pgp_sym_encrypt($3, $1), pgp_sym_encrypt($4, $1), pgp_sym_encrypt($5, $1), $6) \
            RETURNING {APPUSER_COLUMNS}"
        );
        Ok(query_as::<_, AppUser>(&sql)
            .bind(&*DB_ENCRYPTION_KEY)
            .bind(String::from(self.mobile))
            .bind(self.name)
            .bind(String::from(self.email))
            .bind(self.address)
            .bind(role)
            .fetch_one(executor)
            .await?)
    }

    /// Return the mobile number to store.
    pub const fn mobile(&self) -> &MobileNumber {
        &self.mobile
    }
}

impl AppUser {
    /// Get the `AppUser`'s ID primary key.
    pub const fn id(&self) -> Uuid {
        self.id
    }
    /// Replace the user's email address.
    pub fn set_email(&mut self, email: EmailAddress) {
        self.email = email.into();
    }
    /// Select an `AppUser` from the database by ID.
    pub async fn select_one(
        id: Uuid,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        let sql = format!("SELECT {APPUSER_COLUMNS} FROM appuser WHERE id = $2");
        Ok(query_as::<_, Self>(&sql)
            .bind(&*DB_ENCRYPTION_KEY)
            .bind(id)
            .fetch_optional(db_client)
            .await?)
    }
    /// Select an `AppUser` from the database by mobile number.
    pub async fn select_by_mobile(
        mobile: &MobileNumber,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        let sql = format!("SELECT {APPUSER_COLUMNS} FROM appuser WHERE mobile = $2");
        Ok(query_as::<_, Self>(&sql)
            .bind(&*DB_ENCRYPTION_KEY)
            .bind(mobile.as_str())
            .fetch_optional(db_client)
            .await?)
    }
    /// Search for users matching every supplied filter.
    pub async fn search(
        params: AppUserSearchParameters,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        let sql = format!(
            "SELECT {APPUSER_COLUMNS} FROM appuser \
            WHERE ($2::app_user_role IS NULL OR role = $2) \
            AND ($3::text IS NULL OR mobile = $3) \
            ORDER BY created_at"
        );
        Ok(query_as::<_, Self>(&sql)
            .bind(&*DB_ENCRYPTION_KEY)
            .bind(params.role)
            .bind(params.mobile.map(|raw| {
                // Match however the number was typed; invalid input matches nothing.
                MobileNumber::try_from(raw.as_str()).map_or(raw, String::from)
            }))
            .fetch_all(db_client)
            .await?)
    }
    /// Count users holding a given role.
    pub async fn count_with_role(
        role: AppUserRole,
        db_client: &ConnectionPool,
    ) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM appuser WHERE role = $1")
            .bind(role)
            .fetch_one(db_client)
            .await?;
        Ok(count)
    }
    /// Persist the user's name, email and address. Role and photo are
    /// written by their own methods so concurrent changes don't clobber them.
    pub async fn update_profile(&self, db_client: &ConnectionPool) -> Result<(), DatabaseError> {
        query(
            "UPDATE appuser SET name = pgp_sym_encrypt($2, $1), email = pgp_sym_encrypt($3, $1), \
            address = pgp_sym_encrypt($4, $1) WHERE id = $5",
        )
        .bind(&*DB_ENCRYPTION_KEY)
        .bind(&self.name)
        .bind(&self.email)
        .bind(&self.address)
        .bind(self.id)
        .execute(db_client)
        .await?;
        Ok(())
    }
    /// Record a new profile photo path.
    pub async fn set_photo(
        &mut self,
        path: String,
        db_client: &ConnectionPool,
    ) -> Result<(), DatabaseError> {
        query("UPDATE appuser SET photo = $1 WHERE id = $2")
            .bind(&path)
            .bind(self.id)
            .execute(db_client)
            .await?;
        self.photo = Some(path);
        Ok(())
    }
    /// Make the user an administrator. Returns `false` if they already were.
    pub async fn promote(&mut self, db_client: &ConnectionPool) -> Result<bool, DatabaseError> {
        let promoted = query(
            "UPDATE appuser SET role = 'administrator' WHERE id = $1 AND role <> 'administrator'",
        )
        .bind(self.id)
        .execute(db_client)
        .await?
        .rows_affected()
            == 1;
        self.role = AppUserRole::Administrator;
        Ok(promoted)
    }
    /// Delete the corresponding record from the database. Also consumes the
    /// model itself for consistency.
    pub async fn delete(self, db_client: &ConnectionPool) -> Result<(), DatabaseError> {
        query("DELETE FROM appuser WHERE id = $1")
            .bind(self.id)
            .execute(db_client)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppUser, AppUserRole, AppUserSearchParameters};
    use crate::db::testing;

    #[tokio::test]
    async fn writes_from_stale_copies_keep_other_columns() {
        let Some(pool) = testing::test_pool().await else {
            return;
        };
        let mut stale = testing::customer(&pool).await;
        let mut fresh = AppUser::select_one(stale.id(), &pool).await.unwrap().unwrap();
        assert!(fresh.promote(&pool).await.unwrap());
        assert!(!fresh.promote(&pool).await.unwrap());

        stale
            .set_photo("media/3f2a.png".to_owned(), &pool)
            .await
            .unwrap();
        "Renamed Customer".clone_into(&mut stale.name);
        stale.update_profile(&pool).await.unwrap();

        let stored = AppUser::select_one(stale.id(), &pool).await.unwrap().unwrap();
        assert_eq!(stored.role, AppUserRole::Administrator);
        assert_eq!(stored.photo.as_deref(), Some("media/3f2a.png"));
        assert_eq!(stored.name, "Renamed Customer");
    }

    #[tokio::test]
    async fn mobile_filter_ignores_formatting() {
        let Some(pool) = testing::test_pool().await else {
            return;
        };
        let mobile = testing::unique_mobile();
        let user = testing::customer_with(&mobile, "", &pool).await;
        let typed = format!("{} {}-{}", &mobile[..3], &mobile[3..8], &mobile[8..]);

        let found = AppUser::search(
            AppUserSearchParameters {
                role: None,
                mobile: Some(typed),
            },
            &pool,
        )
        .await
        .unwrap();
        assert_eq!(found.iter().map(AppUser::id).collect::<Vec<_>>(), vec![user.id()]);

        let nothing = AppUser::search(
            AppUserSearchParameters {
                role: None,
                mobile: Some("not a number".to_owned()),
            },
            &pool,
        )
        .await
        .unwrap();
        assert!(nothing.is_empty());
    }
}
