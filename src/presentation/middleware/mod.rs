//! Middleware
//!
//! Tower layers and `from_fn` middleware applied by the router.

pub mod auth;
pub mod cors;
pub mod errors;
pub mod logging;
pub mod rate_limit;
pub mod security;

pub use auth::{
    require_permissions, validate_api_key, verify_firebase_token, verify_internal_jwt, AuthUser, ServiceCaller,
};
pub use cors::create_cors_layer;
pub use errors::{expose_error_details, ErrorDetailsPolicy};
pub use logging::{create_trace_layer, track_metrics};
pub use rate_limit::{rate_limit, RateLimitInfo, RateLimiter};
pub use security::{create_security_headers_layer, SecurityHeadersConfig, SecurityHeadersLayer};
