//! Fixtures for tests that run against a live Postgres. A test calls
//! [`test_pool`] first and returns early when no database is configured, so
//! the suite still passes on machines without one.
use std::env::var;

use uuid::Uuid;

use super::{
    models::{
        appuser::{AppUser, AppUserInsert, AppUserRole},
        menu_item::{MenuItem, MenuItemInsert},
        service::{Service, ServiceInsert},
    },
    ConnectionPool,
};
use crate::{
    constants,
    utils::{email::EmailAddress, mobile::MobileNumber},
};

/// Connect to `DATABASE_URL` with the schema applied, or `None` if unset.
pub async fn test_pool() -> Option<ConnectionPool> {
    if var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    }
    constants::db::use_test_encryption_key();
    let pool = super::connect().await.expect("database connection");
    super::migrate(&pool).await.expect("database migrations");
    Some(pool)
}

/// A mobile number no other test will pick.
pub fn unique_mobile() -> String {
    format!("+91{:010}", Uuid::new_v4().as_u128() % 10_000_000_000)
}

pub async fn customer_with(mobile: &str, address: &str, pool: &ConnectionPool) -> AppUser {
    AppUserInsert::new(
        MobileNumber::try_from(mobile).expect("valid mobile"),
        "Test Customer",
        EmailAddress::try_from("customer@example.com").expect("valid email"),
        address,
    )
    .store(AppUserRole::Customer, pool)
    .await
    .expect("customer stored")
}

pub async fn customer(pool: &ConnectionPool) -> AppUser {
    customer_with(&unique_mobile(), "12 Lake Road, Pune", pool).await
}

pub async fn listed_service(pool: &ConnectionPool) -> Service {
    ServiceInsert {
        name: format!("Test Kitchen {}", Uuid::new_v4().simple()),
        description: String::new(),
        image: None,
        listed: true,
    }
    .store(pool)
    .await
    .expect("service stored")
}

pub async fn menu_item(
    service: &Service,
    name: &str,
    price: u32,
    discount_percent: u8,
    pool: &ConnectionPool,
) -> MenuItem {
    MenuItemInsert::new(service.id(), name, "", price, discount_percent, true)
        .store(pool)
        .await
        .expect("menu item stored")
}
