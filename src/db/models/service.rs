//! Models mapping to the service table. A service is a top level catalog
//! entry (a kitchen, a shop) offering a menu of items.
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{errors::DatabaseError, ConnectionPool};

/// INSERT model for a `Service`. Used ONLY when adding a new service.
#[derive(Deserialize)]
pub struct ServiceInsert {
    /// The name of the service.
    pub name: String,
    /// A description of the service.
    #[serde(default)]
    pub description: String,
    /// An image (URI) representing the service.
    pub image: Option<String>,
    /// Whether customers can see the service.
    #[serde(default = "listed_by_default")]
    pub listed: bool,
}

const fn listed_by_default() -> bool {
    true
}

/// A `Service` which is stored in the database.
#[derive(sqlx::FromRow, Serialize)]
pub struct Service {
    /// The service's ID primary key.
    id: Uuid,
    /// The name of the service.
    pub name: String,
    /// A description of the service.
    pub description: String,
    /// An image (URI) representing the service.
    pub image: Option<String>,
    /// Whether customers can see the service.
    pub listed: bool,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl ServiceInsert {
    /// Store this INSERT model in the database and return a complete `Service` model.
    pub async fn store(self, db_client: &ConnectionPool) -> Result<Service, DatabaseError> {
        Ok(query_as::<_, Service>(
            "INSERT INTO service (name, description, image, listed) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(self.name)
        .bind(self.description)
        .bind(self.image)
        .bind(self.listed)
        .fetch_one(db_client)
        .await?)
    }
}

impl Service {
    /// Get this service's ID primary key.
    pub const fn id(&self) -> Uuid {
        self.id
    }
    /// Select a `Service` by its ID.
    pub async fn select_one(
        id: Uuid,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM service WHERE id = $1")
            .bind(id)
            .fetch_optional(db_client)
            .await?)
    }
    /// Retrieve all services, optionally skipping unlisted ones.
    pub async fn select_all(
        include_unlisted: bool,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(
            query_as::<_, Self>("SELECT * FROM service WHERE listed OR $1 ORDER BY name")
                .bind(include_unlisted)
                .fetch_all(db_client)
                .await?,
        )
    }
    /// Update the corresponding database record to match this model's state.
    pub async fn update(&self, db_client: &ConnectionPool) -> Result<(), DatabaseError> {
        query("UPDATE service SET name = $1, description = $2, image = $3, listed = $4 WHERE id = $5")
            .bind(&self.name)
            .bind(&self.description)
            .bind(&self.image)
            .bind(self.listed)
            .bind(self.id)
            .execute(db_client)
            .await?;
        Ok(())
    }
    /// Delete the service along with its menu.
    pub async fn delete(self, db_client: &ConnectionPool) -> Result<(), DatabaseError> {
        query("DELETE FROM service WHERE id = $1")
            .bind(self.id)
            .execute(db_client)
            .await?;
        Ok(())
    }
}
