//! HTTP surface: routing, request extractors and handlers.

pub mod extractors;
pub mod handlers;
pub mod routes;
