//! The public catalog of services and their menus, and its administration.
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::db::{
    self,
    models::{
        menu_item::{MenuItem, MenuItemInsert, MenuSearchParameters},
        service::{Service, ServiceInsert},
    },
};

/// A service together with its menu.
#[derive(Serialize)]
pub struct ServiceWithMenu {
    #[serde(flatten)]
    pub service: Service,
    pub menu: Vec<MenuItem>,
}

/// List services. Unlisted services are only visible to administrators.
pub async fn list_services(
    include_unlisted: bool,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<Service>, db::errors::DatabaseError> {
    Service::select_all(include_unlisted, db_conn).await
}

/// Retrieve a service along with its menu. Unavailable items are included
/// so customers can see what is usually offered.
pub async fn retrieve_service(
    id: Uuid,
    include_unlisted: bool,
    db_conn: &db::ConnectionPool,
) -> Result<Option<ServiceWithMenu>, db::errors::DatabaseError> {
    let Some(service) = Service::select_one(id, db_conn)
        .await?
        .filter(|service| service.listed || include_unlisted)
    else {
        return Ok(None);
    };
    let menu = MenuItem::select_for_service(service.id(), db_conn).await?;
    Ok(Some(ServiceWithMenu { service, menu }))
}

pub async fn search_menu(
    params: &MenuSearchParameters,
    include_unlisted: bool,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<MenuItem>, db::errors::DatabaseError> {
    MenuItem::search(params, include_unlisted, db_conn).await
}

/// Retrieve a single menu item, hiding items of unlisted services unless
/// `include_unlisted` is set.
pub async fn retrieve_menu_item(
    id: Uuid,
    include_unlisted: bool,
    db_conn: &db::ConnectionPool,
) -> Result<Option<MenuItem>, db::errors::DatabaseError> {
    let Some(item) = MenuItem::select_one(id, db_conn).await? else {
        return Ok(None);
    };
    if include_unlisted {
        return Ok(Some(item));
    }
    let listed = Service::select_one(item.service_id(), db_conn)
        .await?
        .is_some_and(|service| service.listed);
    Ok(listed.then_some(item))
}

pub async fn create_service(
    data: ServiceInsert,
    db_conn: &db::ConnectionPool,
) -> Result<Service, errors::CatalogUpdateError> {
    if data.name.trim().is_empty() {
        return Err(errors::CatalogUpdateError::NameMissing);
    }
    let service = data.store(db_conn).await?;
    info!(service_id = %service.id(), "Service created");
    Ok(service)
}

#[derive(Deserialize, Default)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` clears the image.
    #[serde(default, with = "double_option")]
    pub image: Option<Option<String>>,
    pub listed: Option<bool>,
}

pub async fn update_service(
    id: Uuid,
    data: ServiceUpdate,
    db_conn: &db::ConnectionPool,
) -> Result<Service, errors::CatalogUpdateError> {
    let mut service = Service::select_one(id, db_conn)
        .await?
        .ok_or(errors::CatalogUpdateError::NonExistent(id))?;
    if let Some(name) = data.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(errors::CatalogUpdateError::NameMissing);
        }
        name.clone_into(&mut service.name);
    }
    if let Some(description) = data.description {
        service.description = description;
    }
    if let Some(image) = data.image {
        service.image = image;
    }
    if let Some(listed) = data.listed {
        service.listed = listed;
    }
    service.update(db_conn).await?;
    Ok(service)
}

/// Delete a service and, with it, its menu.
pub async fn delete_service(
    id: Uuid,
    db_conn: &db::ConnectionPool,
) -> Result<(), errors::CatalogUpdateError> {
    Service::select_one(id, db_conn)
        .await?
        .ok_or(errors::CatalogUpdateError::NonExistent(id))?
        .delete(db_conn)
        .await?;
    info!(service_id = %id, "Service deleted");
    Ok(())
}

#[derive(Deserialize)]
pub struct NewMenuItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: u32,
    #[serde(default)]
    pub discount_percent: u8,
    #[serde(default = "available_by_default")]
    pub available: bool,
}

const fn available_by_default() -> bool {
    true
}

fn check_discount(discount_percent: u8) -> Result<(), errors::CatalogUpdateError> {
    if discount_percent > 100 {
        Err(errors::CatalogUpdateError::InvalidDiscount(discount_percent))
    } else {
        Ok(())
    }
}

/// Add an item to a service's menu.
pub async fn create_menu_item(
    service_id: Uuid,
    data: NewMenuItem,
    db_conn: &db::ConnectionPool,
) -> Result<MenuItem, errors::CatalogUpdateError> {
    if data.name.trim().is_empty() {
        return Err(errors::CatalogUpdateError::NameMissing);
    }
    check_discount(data.discount_percent)?;
    Service::select_one(service_id, db_conn)
        .await?
        .ok_or(errors::CatalogUpdateError::NonExistent(service_id))?;
    let item = MenuItemInsert::new(
        service_id,
        &data.name,
        &data.description,
        data.price,
        data.discount_percent,
        data.available,
    )
    .store(db_conn)
    .await?;
    info!(%service_id, menu_item_id = %item.id(), "Menu item created");
    Ok(item)
}

#[derive(Deserialize, Default)]
pub struct MenuItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<u32>,
    pub discount_percent: Option<u8>,
    pub available: Option<bool>,
}

pub async fn update_menu_item(
    id: Uuid,
    data: MenuItemUpdate,
    db_conn: &db::ConnectionPool,
) -> Result<MenuItem, errors::CatalogUpdateError> {
    let mut item = MenuItem::select_one(id, db_conn)
        .await?
        .ok_or(errors::CatalogUpdateError::NonExistent(id))?;
    if let Some(name) = data.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(errors::CatalogUpdateError::NameMissing);
        }
        name.clone_into(&mut item.name);
    }
    if let Some(description) = data.description {
        item.description = description;
    }
    if let Some(price) = data.price {
        item.set_price(price);
    }
    if let Some(discount_percent) = data.discount_percent {
        check_discount(discount_percent)?;
        item.set_discount_percent(discount_percent);
    }
    if let Some(available) = data.available {
        item.available = available;
    }
    item.update(db_conn).await?;
    Ok(item)
}

/// Remove an item from the menu. Past orders keep their own copy.
pub async fn delete_menu_item(
    id: Uuid,
    db_conn: &db::ConnectionPool,
) -> Result<(), errors::CatalogUpdateError> {
    MenuItem::select_one(id, db_conn)
        .await?
        .ok_or(errors::CatalogUpdateError::NonExistent(id))?
        .delete(db_conn)
        .await?;
    info!(menu_item_id = %id, "Menu item deleted");
    Ok(())
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

pub mod errors {
    use crate::db::errors::DatabaseError;
    use thiserror::Error;
    use uuid::Uuid;

    #[derive(Error, Debug)]
    pub enum CatalogUpdateError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("The catalog entry does not exist")]
        NonExistent(Uuid),
        #[error("A name is required")]
        NameMissing,
        #[error("Discount must be between 0 and 100 percent")]
        InvalidDiscount(u8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discounts_above_one_hundred_are_rejected() {
        assert!(check_discount(0).is_ok());
        assert!(check_discount(100).is_ok());
        assert!(matches!(
            check_discount(101),
            Err(errors::CatalogUpdateError::InvalidDiscount(101))
        ));
    }

    #[test]
    fn service_update_distinguishes_null_image() {
        let cleared: ServiceUpdate = serde_json::from_str(r#"{"image": null}"#).unwrap();
        assert_eq!(cleared.image, Some(None));
        let untouched: ServiceUpdate = serde_json::from_str(r#"{"listed": false}"#).unwrap();
        assert_eq!(untouched.image, None);
        assert_eq!(untouched.listed, Some(false));
    }

    #[test]
    fn new_menu_items_default_to_available() {
        let item: NewMenuItem =
            serde_json::from_str(r#"{"name": "Idli", "price": 6000}"#).unwrap();
        assert!(item.available);
        assert_eq!(item.discount_percent, 0);
        assert_eq!(item.description, "");
    }
}
