//! Redis connection related constants.
use std::env::var;
use std::sync::LazyLock;

/// The hostname where the Redis session store can be found.
pub static REDIS_HOST: LazyLock<String> = LazyLock::new(|| {
    var("REDIS_HOST").expect("Neither REDIS_URL nor REDIS_HOST provided in environment variables")
});

/// The URL used to connect to the session store.
pub static REDIS_URL: LazyLock<String> = LazyLock::new(|| {
    var("REDIS_URL").unwrap_or_else(|_| format!("redis://{}/", REDIS_HOST.clone()))
});
