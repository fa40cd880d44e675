//! Constants (primary environment variables/secrets) used across the application.
pub mod api;
pub mod db;
pub mod media;
pub mod orders;
pub mod passwords;
pub mod redis;
mod secrets;
pub mod sessions;

use std::sync::LazyLock;

/// Read the settings that are otherwise first used while serving a request,
/// so that missing or malformed values stop the server at boot.
pub fn load() {
    LazyLock::force(&db::DB_ENCRYPTION_KEY);
    LazyLock::force(&orders::DELIVERY_FEE);
    LazyLock::force(&orders::FREE_DELIVERY_THRESHOLD);
}

#[cfg(test)]
mod tests {
    use super::{db, load, orders};

    #[test]
    fn request_time_settings_are_available_after_load() {
        db::use_test_encryption_key();
        load();
        assert!(!db::DB_ENCRYPTION_KEY.is_empty());
        assert!(std::env::var("DELIVERY_FEE").is_ok() || *orders::DELIVERY_FEE == 4000);
    }
}
