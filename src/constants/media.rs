//! Media storage related constants. Media goes to an S3-compatible bucket when
//! `S3_HOST` is set, and to a local directory otherwise.
use std::{env::var, sync::LazyLock};

use super::secrets::{parse_or_default, var_or_secret};

/// The directory uploaded media is written to when no S3 host is configured.
pub static MEDIA_ROOT: LazyLock<String> =
    LazyLock::new(|| var("MEDIA_ROOT").unwrap_or_else(|_| String::from("./media")));

/// The hostname where the S3-compatible storage service can be accessed, if any.
pub static S3_HOST: LazyLock<Option<String>> =
    LazyLock::new(|| var("S3_HOST").ok().filter(|host| !host.is_empty()));

/// The port where the S3-compatible storage service can be accessed.
pub static S3_PORT: LazyLock<u16> = LazyLock::new(|| parse_or_default("S3_PORT", 9000));

/// The bucket where application media data is stored.
pub static S3_BUCKET: LazyLock<String> =
    LazyLock::new(|| var("S3_BUCKET").expect("S3_HOST is set but S3_BUCKET is not"));

/// The access key (user) to authenticate to the store with.
pub static S3_ACCESS_KEY: LazyLock<String> = LazyLock::new(|| {
    var_or_secret("S3_ACCESS_KEY").expect(
        "Neither S3_ACCESS_KEY nor S3_ACCESS_KEY_DOCKER_SECRET provided in environment variables",
    )
});

/// The secret key (password) to authenticate to the store with.
pub static S3_SECRET_KEY: LazyLock<String> = LazyLock::new(|| {
    var_or_secret("S3_SECRET_KEY").expect(
        "Neither S3_SECRET_KEY nor S3_SECRET_KEY_DOCKER_SECRET provided in environment variables",
    )
});

/// Largest profile photo accepted, in bytes.
pub const MAX_PHOTO_SIZE: usize = 5 * 1024 * 1024;
