//! Constants related to the general configuration of the entire API and its deployment.

use std::{env::var, sync::LazyLock};

use super::secrets::parse_or_default;

/// A prefix to prepend to any API paths to make them externally accessible.
pub static API_URI_PREFIX: LazyLock<String> =
    LazyLock::new(|| var("API_URI_PREFIX").unwrap_or(String::from("/")));

/// The port the API listens on. Always bound on all interfaces.
pub static PORT: LazyLock<u16> = LazyLock::new(|| parse_or_default("PORT", 5000));

/// The mobile number of a user to promote to administrator at startup, if any.
pub static BOOTSTRAP_ADMIN_MOBILE: LazyLock<Option<String>> =
    LazyLock::new(|| var("BOOTSTRAP_ADMIN_MOBILE").ok().filter(|mobile| !mobile.is_empty()));

/// Emit logs as JSON rather than human readable lines.
pub static LOG_JSON: LazyLock<bool> =
    LazyLock::new(|| var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")));
