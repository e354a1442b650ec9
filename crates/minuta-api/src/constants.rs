//! API-wide constants.

/// API version segment used in route paths.
pub const API_VERSION: &str = "v1";

/// Path prefix all API routes are nested under.
pub const API_PREFIX: &str = "/api/v1";
