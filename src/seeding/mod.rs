//! # Reference Data
//!
//! Operations behind `ovo-admin`: the event category taxonomy, sample
//! events for existing users, a data overview, and first-run setup of the
//! document store and default administrator.
//!
//! Everything here runs against the provider ports, so the same code seeds
//! Firestore in production and the in-memory store in tests.

mod categories;
mod events;
mod setup;
mod verify;

pub use categories::{catalog, cleanup_categories, seed_categories, verify_categories, CategorySummary};
pub use events::{
    cleanup_events, event_templates, generate_location, seed_events, EventSeedReport, EventTemplate, SeedUser,
    UserLocation,
};
pub use setup::{
    check_connections, cleanup_structure, create_default_admin, setup_collections, AdminOutcome, ConnectionReport,
};
pub use verify::{overview, EventSample, SeedOverview};

use crate::domain::providers::{
    ChatProviderError, DocumentStore, DocumentStoreError, IdentityError, Query, WriteOp, MAX_BATCH_WRITES,
};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Bundled seed data is invalid: {0}")]
    Data(#[from] serde_json::Error),

    #[error("No active categories found. Run `ovo-admin categories seed` first")]
    NoCategories,

    #[error(transparent)]
    Store(#[from] DocumentStoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Chat(#[from] ChatProviderError),
}

/// Commit `writes` in chunks the store accepts; returns the number of batches.
async fn commit_in_batches(store: &dyn DocumentStore, writes: Vec<WriteOp>) -> Result<usize, DocumentStoreError> {
    let mut batches = 0;
    let mut pending = writes.into_iter().peekable();
    while pending.peek().is_some() {
        let batch: Vec<WriteOp> = pending.by_ref().take(MAX_BATCH_WRITES).collect();
        let size = batch.len();
        store.commit(batch).await?;
        batches += 1;
        tracing::debug!(batch = batches, size, "Committed batch");
    }
    Ok(batches)
}

/// Delete every document in `collection`; returns how many were removed.
async fn clear_collection(store: &dyn DocumentStore, collection: &str) -> Result<usize, DocumentStoreError> {
    let docs = store.query(&Query::collection(collection)).await?;
    let count = docs.len();
    let deletes = docs
        .into_iter()
        .map(|doc| WriteOp::Delete {
            collection: collection.to_owned(),
            id: doc.id,
        })
        .collect();
    commit_in_batches(store, deletes).await?;
    Ok(count)
}
