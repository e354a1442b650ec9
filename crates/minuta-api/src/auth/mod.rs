//! Request authentication: session context and the auth gate middleware.

pub mod middleware;
pub mod models;

pub use middleware::{auth_gate, AuthChallenge};
pub use models::SessionContext;
