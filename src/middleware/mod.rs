//! Axum middleware shared across routers.
pub mod session;
