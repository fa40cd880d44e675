//! Small shared helpers: validated value types and HTTP error rendering.
pub mod email;
pub mod httperror;
pub mod mobile;
