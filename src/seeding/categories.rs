//! Event category taxonomy seeding.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{clear_collection, commit_in_batches, SeedError};
use crate::domain::providers::{into_document, timestamp_value, DocumentStore, Query, WriteOp};
use crate::domain::{Category, CATEGORIES_COLLECTION};

const CATEGORIES_JSON: &str = include_str!("data/categories.json");

/// The bundled category catalog.
pub fn catalog() -> Result<Vec<Category>, SeedError> {
    Ok(serde_json::from_str(CATEGORIES_JSON)?)
}

/// One stored category as listed by `categories verify`.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub subcategories: Vec<String>,
}

/// Upsert every catalog category under its own id. Existing documents keep
/// fields the catalog does not set.
pub async fn seed_categories(store: &dyn DocumentStore, now: DateTime<Utc>) -> Result<Vec<Category>, SeedError> {
    let categories = catalog()?;

    let existing = store.query(&Query::collection(CATEGORIES_COLLECTION)).await?;
    if !existing.is_empty() {
        tracing::warn!(
            existing = existing.len(),
            "Categories already present; adding new and updating existing ones"
        );
    }

    let writes = categories
        .iter()
        .map(|category| {
            let mut data = into_document(serde_json::to_value(category)?);
            data.insert("createdAt".into(), timestamp_value(now));
            data.insert("updatedAt".into(), timestamp_value(now));
            Ok(WriteOp::Set {
                collection: CATEGORIES_COLLECTION.to_owned(),
                id: category.id.clone(),
                data,
                merge: true,
            })
        })
        .collect::<Result<Vec<_>, SeedError>>()?;

    commit_in_batches(store, writes).await?;
    tracing::info!(count = categories.len(), "Categories seeded");
    Ok(categories)
}

/// List what is stored, in id order.
pub async fn verify_categories(store: &dyn DocumentStore) -> Result<Vec<CategorySummary>, SeedError> {
    let docs = store.query(&Query::collection(CATEGORIES_COLLECTION)).await?;

    Ok(docs
        .into_iter()
        .map(|doc| {
            let text = |field: &str| doc.data.get(field).and_then(Value::as_str).map(str::to_owned);
            let subcategories = doc
                .data
                .get("subcategories")
                .and_then(Value::as_array)
                .map(|subs| {
                    subs.iter()
                        .filter_map(|s| s.get("name").and_then(Value::as_str))
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default();
            CategorySummary {
                name: text("name").unwrap_or_else(|| doc.id.clone()),
                is_active: doc.data.get("isActive").and_then(Value::as_bool).unwrap_or(false),
                subcategories,
                id: doc.id,
            }
        })
        .collect())
}

pub async fn cleanup_categories(store: &dyn DocumentStore) -> Result<usize, SeedError> {
    let removed = clear_collection(store, CATEGORIES_COLLECTION).await?;
    tracing::info!(removed, "Categories cleaned up");
    Ok(removed)
}

/// Active categories as stored, for event generation.
pub(super) async fn active_categories(store: &dyn DocumentStore) -> Result<Vec<Category>, SeedError> {
    let docs = store
        .query(&Query::collection(CATEGORIES_COLLECTION).where_eq("isActive", true))
        .await?;

    let categories: Vec<Category> = docs
        .into_iter()
        .filter_map(|doc| {
            let mut data = doc.data;
            data.entry("id").or_insert_with(|| Value::String(doc.id.clone()));
            match serde_json::from_value::<Category>(Value::Object(data)) {
                Ok(category) => Some(category),
                Err(err) => {
                    tracing::warn!(id = %doc.id, error = %err, "Skipping malformed category");
                    None
                }
            }
        })
        .collect();

    if categories.is_empty() {
        return Err(SeedError::NoCategories);
    }
    Ok(categories)
}
