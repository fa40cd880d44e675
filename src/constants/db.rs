//! Database connection related constants.
use super::secrets::{read_secret, var_or_secret};
use std::{env::var, sync::LazyLock};

pub static DB_HOST: LazyLock<String> = LazyLock::new(|| {
    var("DB_HOST").expect("Neither DATABASE_URL nor DB_HOST provided in environment variables")
});

pub static DB_USERNAME: LazyLock<String> = LazyLock::new(|| {
    var("DB_USERNAME").expect("DB_USERNAME not provided in environment variables")
});

pub static DB_DATABASE: LazyLock<String> = LazyLock::new(|| {
    var("DB_DATABASE").expect("DB_DATABASE not provided in environment variables")
});

pub static DB_PASSWORD: LazyLock<String> = LazyLock::new(|| {
    var("DB_PASSWORD").unwrap_or_else(|_| {
        let secret_path = var("DB_PASSWORD_DOCKER_SECRET").expect(
            "Neither DB_PASSWORD nor DB_PASSWORD_DOCKER_SECRET provided in environment variables",
        );
        read_secret(&secret_path).expect("Failed to read DB_PASSWORD docker secret")
    })
});

/// The full connection URL. `DATABASE_URL` wins over the individual parts.
pub static DB_URL: LazyLock<String> = LazyLock::new(|| {
    var("DATABASE_URL").unwrap_or_else(|_| {
        format!(
            "postgres://{}:{}@{}/{}",
            DB_USERNAME.clone(),
            DB_PASSWORD.clone(),
            DB_HOST.clone(),
            DB_DATABASE.clone()
        )
    })
});

/// Key used by pgcrypto to encrypt personal data at rest.
pub static DB_ENCRYPTION_KEY: LazyLock<String> = LazyLock::new(|| {
    var_or_secret("DB_ENCRYPTION_KEY").expect(
        "Neither DB_ENCRYPTION_KEY nor DB_ENCRYPTION_KEY_DOCKER_SECRET provided in environment variables",
    )
});

/// Give tests a pgcrypto key when the environment does not provide one.
#[cfg(test)]
pub fn use_test_encryption_key() {
    if var("DB_ENCRYPTION_KEY").is_err() && var("DB_ENCRYPTION_KEY_DOCKER_SECRET").is_err() {
        std::env::set_var("DB_ENCRYPTION_KEY", "bite-me-buddy-test-key");
    }
}
