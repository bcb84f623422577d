//! # Provider Ports
//!
//! Traits for the three managed services the backend sits between. Adapters
//! live in `infrastructure`; handles are built once at start-up and shared as
//! `Arc<dyn Trait>`.
//!
//! - **IdentityProvider**: ID-token verification and account lookup
//! - **DocumentStore**: profile, channel, category and event documents
//! - **ChatProvider**: chat users, channels, members and messages

mod chat;
mod document_store;
mod identity;

pub use chat::*;
pub use document_store::*;
pub use identity::*;
