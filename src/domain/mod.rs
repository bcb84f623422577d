//! # Domain Layer
//!
//! Documents, identifiers and rules of the chat backend, plus the provider
//! ports the rest of the crate is written against.
//!
//! - **entities**: stored documents (profiles, channels, categories, events)
//! - **value_objects**: channel identifiers
//! - **services**: channel policy
//! - **providers**: identity, document store and chat provider traits

pub mod entities;
pub mod providers;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use value_objects::*;
