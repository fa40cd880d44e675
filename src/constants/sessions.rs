//! Constants related to authentication and session handling.

/// Timeout for customer sessions in seconds.
pub const SESSION_TIMEOUT: u32 = 7 * 24 * 60 * 60;
/// Timeout for administrator sessions in seconds.
pub const ADMIN_SESSION_TIMEOUT: u32 = 60 * 60;
/// Name of the cookie holding the session token.
pub const SESSION_COOKIE: &str = "session";
/// Name of the (script readable) cookie holding the CSRF token.
pub const CSRF_COOKIE: &str = "session_csrf";
/// Header state changing requests must echo the CSRF token in.
pub const CSRF_HEADER: &str = "X-CSRF-Token";
