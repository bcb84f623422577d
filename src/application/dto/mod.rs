//! Data Transfer Objects
//!
//! Request bodies/queries and response payloads of the HTTP API.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;
