//! In-process provider fakes used by `providers.mode = "memory"` and tests.

mod chat;
mod document_store;
mod identity;

pub use chat::MemoryChatProvider;
pub use document_store::MemoryDocumentStore;
pub use identity::{MemoryIdentityProvider, MEMORY_TOKEN_PREFIX};
