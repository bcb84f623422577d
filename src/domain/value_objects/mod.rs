//! # Domain Value Objects
//!
//! - **channel_id**: direct-message and group channel identifiers

mod channel_id;

pub use channel_id::*;
