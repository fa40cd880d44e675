//! Services which correspond to routes and define core business logic.
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod errors;
pub mod media;
pub mod orders;
pub mod registration;
pub mod sessions;
pub mod users;
