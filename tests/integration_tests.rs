//! Integration Tests Entry Point
//!
//! Tests are organized by module:
//! - `api/` - HTTP endpoint tests against the full router
//! - `common/` - Shared test utilities

mod api;
mod common;
