//! Application Layer
//!
//! Services coordinating the provider ports, plus the request/response DTOs
//! the HTTP layer validates and renders.

pub mod dto;
pub mod services;
