//! Shared Utilities
//!
//! Response envelopes, the application error type and validation helpers.

pub mod error;
pub mod response;
pub mod validation;
