//! Minuta Identity Library
//!
//! Client for the upstream identity/session provider plus the token
//! lifecycle manager that rotates the access/refresh pair through cookies.

pub mod client;
pub mod error;
pub mod tokens;

// Re-export commonly used types
pub use client::{HttpIdentityClient, IdentityService};
pub use error::IdentityError;
pub use tokens::{
    TokenExtraction, TokenLifecycleManager, REFRESH_TOKEN_COOKIE, SESSION_COOKIE,
};
