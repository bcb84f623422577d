//! In-process document store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::providers::{
    validate_document_path, Document, DocumentStore, DocumentStoreError, Query, StoredDocument, WriteOp,
    MAX_BATCH_WRITES,
};

type Collection = BTreeMap<String, Document>;

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful write operations, batch members included.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or_default()
    }

    fn apply(collections: &mut HashMap<String, Collection>, write: WriteOp) {
        match write {
            WriteOp::Set {
                collection,
                id,
                data,
                merge,
            } => {
                let docs = collections.entry(collection).or_default();
                match docs.get_mut(&id) {
                    Some(existing) if merge => existing.extend(data),
                    _ => {
                        docs.insert(id, data);
                    }
                }
            }
            WriteOp::Update { collection, id, data } => {
                if let Some(existing) = collections.get_mut(&collection).and_then(|docs| docs.get_mut(&id)) {
                    existing.extend(data);
                }
            }
            WriteOp::Delete { collection, id } => {
                if let Some(docs) = collections.get_mut(&collection) {
                    docs.remove(&id);
                }
            }
        }
    }

    fn exists(collections: &HashMap<String, Collection>, collection: &str, id: &str) -> bool {
        collections
            .get(collection)
            .is_some_and(|docs| docs.contains_key(id))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentStoreError> {
        validate_document_path(collection, id)?;
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn set(&self, collection: &str, id: &str, data: Document, merge: bool) -> Result<(), DocumentStoreError> {
        self.commit(vec![WriteOp::Set {
            collection: collection.to_owned(),
            id: id.to_owned(),
            data,
            merge,
        }])
        .await
    }

    async fn update(&self, collection: &str, id: &str, data: Document) -> Result<(), DocumentStoreError> {
        self.commit(vec![WriteOp::Update {
            collection: collection.to_owned(),
            id: id.to_owned(),
            data,
        }])
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), DocumentStoreError> {
        self.commit(vec![WriteOp::Delete {
            collection: collection.to_owned(),
            id: id.to_owned(),
        }])
        .await
    }

    async fn add(&self, collection: &str, data: Document) -> Result<String, DocumentStoreError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.set(collection, &id, data, false).await?;
        Ok(id)
    }

    async fn query(&self, query: &Query) -> Result<Vec<StoredDocument>, DocumentStoreError> {
        let collections = self.collections.read();
        let Some(docs) = collections.get(&query.collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(_, data)| query.matches(data))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|(id, data)| StoredDocument {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn commit(&self, writes: Vec<WriteOp>) -> Result<(), DocumentStoreError> {
        if writes.len() > MAX_BATCH_WRITES {
            return Err(DocumentStoreError::InvalidBatch(format!(
                "{} writes exceeds the limit of {}",
                writes.len(),
                MAX_BATCH_WRITES
            )));
        }

        for write in &writes {
            let (collection, id) = write.target();
            validate_document_path(collection, id)?;
        }

        let mut collections = self.collections.write();
        for write in &writes {
            if let WriteOp::Update { collection, id, .. } = write {
                if !Self::exists(&collections, collection, id) {
                    return Err(DocumentStoreError::NotFound {
                        collection: collection.clone(),
                        id: id.clone(),
                    });
                }
            }
        }

        let count = writes.len();
        for write in writes {
            Self::apply(&mut collections, write);
        }
        self.writes.fetch_add(count, Ordering::Relaxed);
        Ok(())
    }
}
