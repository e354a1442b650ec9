//! Minuta API Library
//!
//! HTTP API: auth gate middleware, route handlers, application state, and
//! setup. The binary in main.rs wires configuration into [`setup`].

mod api_doc;
mod handlers;

// Public modules
pub mod auth;
pub mod constants;
pub mod error;
pub mod setup;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
