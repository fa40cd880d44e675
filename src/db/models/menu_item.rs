//! Models mapping to the `menu_item` table. Represents a purchasable item
//! offered by a service.
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{errors::DatabaseError, ConnectionPool};

/// INSERT model for a `MenuItem`. Used ONLY when adding a new item.
pub struct MenuItemInsert {
    /// The service offering this item.
    service_id: Uuid,
    /// The name of the item.
    pub name: String,
    /// A description of the item.
    pub description: String,
    /// The price of the item in paise.
    price: i64, // i64s are used internally to match Postgres BIGINT types
    /// Percentage knocked off the price, 0 to 100.
    discount_percent: i16,
    /// Whether the item can currently be ordered.
    pub available: bool,
}

/// A `MenuItem` which is stored in the database. Can only be constructed by
/// reading it from the database.
#[derive(sqlx::FromRow, Serialize, Clone)]
pub struct MenuItem {
    /// The item's ID primary key.
    id: Uuid,
    /// The service offering this item.
    service_id: Uuid,
    /// The name of the item.
    pub name: String,
    /// A description of the item.
    pub description: String,
    /// The price of the item in paise.
    price: i64,
    /// Percentage knocked off the price, 0 to 100.
    discount_percent: i16,
    /// Whether the item can currently be ordered.
    pub available: bool,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

/// Filters for searching the menu. Every filter is optional.
#[derive(Deserialize, Default)]
pub struct MenuSearchParameters {
    pub service_id: Option<Uuid>,
    /// Case insensitive prefix of the item name.
    pub name: Option<String>,
    pub price_min: Option<u32>,
    pub price_max: Option<u32>,
    #[serde(default)]
    pub available_only: bool,
}

impl MenuItemInsert {
    /// Construct a new menu item INSERT model.
    pub fn new(
        service_id: Uuid,
        name: &str,
        description: &str,
        price: u32,
        discount_percent: u8,
        available: bool,
    ) -> Self {
        Self {
            service_id,
            name: name.trim().to_owned(),
            description: description.to_owned(),
            price: i64::from(price),
            discount_percent: i16::from(discount_percent),
            available,
        }
    }
    /// Store this INSERT model in the database and return a complete `MenuItem` model.
    pub async fn store(self, db_client: &ConnectionPool) -> Result<MenuItem, DatabaseError> {
        Ok(query_as::<_, MenuItem>(
            "INSERT INTO menu_item (service_id, name, description, price, discount_percent, available) \
            VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(self.service_id)
        .bind(self.name)
        .bind(self.description)
        .bind(self.price)
        .bind(self.discount_percent)
        .bind(self.available)
        .fetch_one(db_client)
        .await?)
    }
}

impl MenuItem {
    /// Get this item's ID primary key.
    pub const fn id(&self) -> Uuid {
        self.id
    }
    /// Get the ID of the service offering this item.
    pub const fn service_id(&self) -> Uuid {
        self.service_id
    }
    /// Set the price of this item in paise.
    pub fn set_price(&mut self, price: u32) {
        self.price = i64::from(price);
    }
    /// Set the discount percentage. Callers validate the 0 to 100 range.
    pub fn set_discount_percent(&mut self, discount_percent: u8) {
        self.discount_percent = i16::from(discount_percent);
    }
    /// Select a `MenuItem` by its ID.
    pub async fn select_one(
        id: Uuid,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM menu_item WHERE id = $1")
            .bind(id)
            .fetch_optional(db_client)
            .await?)
    }
    /// Select every item offered by a service.
    pub async fn select_for_service(
        service_id: Uuid,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(
            query_as::<_, Self>("SELECT * FROM menu_item WHERE service_id = $1 ORDER BY name")
                .bind(service_id)
                .fetch_all(db_client)
                .await?,
        )
    }
    /// Search the menu. Items of unlisted services are only returned when
    /// `include_unlisted` is set.
    pub async fn search(
        params: &MenuSearchParameters,
        include_unlisted: bool,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT menu_item.* FROM menu_item JOIN service ON service.id = menu_item.service_id \
            WHERE (service.listed OR $1) \
            AND ($2::uuid IS NULL OR menu_item.service_id = $2) \
            AND ($3::text IS NULL OR menu_item.name ILIKE $3 || '%') \
            AND ($4::bigint IS NULL OR menu_item.price >= $4) \
            AND ($5::bigint IS NULL OR menu_item.price <= $5) \
            AND (NOT $6 OR menu_item.available) \
            ORDER BY menu_item.name",
        )
        .bind(include_unlisted)
        .bind(params.service_id)
        .bind(params.name.as_deref().map(escape_like))
        .bind(params.price_min.map(i64::from))
        .bind(params.price_max.map(i64::from))
        .bind(params.available_only)
        .fetch_all(db_client)
        .await?)
    }
    /// Update the corresponding database record to match this model's state.
    pub async fn update(&self, db_client: &ConnectionPool) -> Result<(), DatabaseError> {
        query(
            "UPDATE menu_item SET name = $1, description = $2, price = $3, discount_percent = $4, \
            available = $5 WHERE id = $6",
        )
        .bind(&self.name)
        .bind(&self.description)
        .bind(self.price)
        .bind(self.discount_percent)
        .bind(self.available)
        .bind(self.id)
        .execute(db_client)
        .await?;
        Ok(())
    }
    /// Delete the corresponding record from the database. Also consumes the
    /// model for the sake of consistency.
    pub async fn delete(self, db_client: &ConnectionPool) -> Result<(), DatabaseError> {
        query("DELETE FROM menu_item WHERE id = $1")
            .bind(self.id)
            .execute(db_client)
            .await?;
        Ok(())
    }
}

/// Escape LIKE wildcards so user input only ever matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_pure\\"), "100\\%\\_pure\\\\");
        assert_eq!(escape_like("paneer"), "paneer");
    }
}
