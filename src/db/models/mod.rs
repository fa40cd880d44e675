//! Defines data models (structs) which map directly to rows in the database.
pub mod apporder;
pub mod appuser;
pub mod cart_item;
pub mod menu_item;
pub mod order_item;
pub mod password;
pub mod service;
