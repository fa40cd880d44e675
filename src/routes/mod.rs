//! API routes within the application. Mainly exposes sub-routers which should
//! be nested with the main Axum router.
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod health;
pub mod orders;
pub mod registration;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Assemble every sub-router into the application router.
pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::create_router())
        .nest("/auth", auth::create_router(state))
        .nest("/register", registration::create_router())
        .nest("/users", users::create_router(state))
        .nest("/services", catalog::create_services_router(state))
        .nest("/menu", catalog::create_menu_router(state))
        .nest("/cart", cart::create_router(state))
        .nest("/orders", orders::create_router(state))
}
