//! Defines the state shared across the Axum application.
use crate::{
    db,
    services::{media::MediaStore, sessions},
};

#[derive(Clone)]
/// The state struct shared across routers.
pub struct AppState {
    /// A database connection pool for getting new database connections.
    pub db: db::ConnectionPool,
    /// A multiplexed connection for getting new session store connections.
    pub session_store: sessions::store::Connection,
    /// Where uploaded media is kept.
    pub media_store: MediaStore,
}
