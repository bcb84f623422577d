//! Cloud Firestore over the REST v1 API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::codec::{decode_fields, encode_fields, encode_value, field_path};
use super::credentials::AccessTokenSource;
use crate::config::FirebaseSettings;
use crate::domain::providers::{
    validate_document_path, Document, DocumentStore, DocumentStoreError, FilterOp, Query, StoredDocument, WriteOp,
    MAX_BATCH_WRITES, MAX_IN_VALUES,
};
use crate::infrastructure::upstream::{google_error, observe};

const PROVIDER: &str = "firestore";

#[derive(Debug, Deserialize)]
struct RestDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<RestDocument>,
}

pub struct FirestoreDocumentStore {
    http: reqwest::Client,
    tokens: Arc<AccessTokenSource>,
    /// `projects/{p}/databases/(default)/documents`
    root: String,
    base_url: String,
}

impl FirestoreDocumentStore {
    pub fn new(http: reqwest::Client, tokens: Arc<AccessTokenSource>, settings: &FirebaseSettings) -> Self {
        let root = format!("projects/{}/databases/(default)/documents", tokens.project_id());
        Self {
            http,
            tokens,
            root,
            base_url: settings.firestore_base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Resource name used inside commit bodies.
    fn document_name(&self, collection: &str, id: &str) -> Result<String, DocumentStoreError> {
        validate_document_path(collection, id)?;
        Ok(format!("{}/{}/{}", self.root, collection, id))
    }

    /// `{base}/v1/{root}{suffix}` followed by percent-encoded `segments`.
    fn url(&self, suffix: &str, segments: &[&str]) -> Result<Url, DocumentStoreError> {
        let mut url = Url::parse(&format!("{}/v1/{}{}", self.base_url, self.root, suffix))
            .map_err(|e| DocumentStoreError::Transport(e.to_string()))?;
        if !segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| DocumentStoreError::Transport("Firestore base URL cannot hold a path".into()))?
                .extend(segments);
        }
        Ok(url)
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, DocumentStoreError> {
        validate_document_path(collection, id)?;
        self.url("", &[collection, id])
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<reqwest::Response, DocumentStoreError> {
        let token = self
            .tokens
            .token()
            .await
            .map_err(|e| DocumentStoreError::Credentials(e.to_string()))?;
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(token)
            .query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }
        request
            .send()
            .await
            .map_err(|e| DocumentStoreError::Transport(e.to_string()))
    }

    async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, DocumentStoreError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let (status, message) = google_error(response).await;
        Err(DocumentStoreError::Provider { status, message })
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        data: &Document,
        mask: bool,
        must_exist: bool,
    ) -> Result<reqwest::Response, DocumentStoreError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if mask {
            query.extend(data.keys().map(|k| ("updateMask.fieldPaths", field_path(k))));
        }
        if must_exist {
            query.push(("currentDocument.exists", "true".into()));
        }
        let body = json!({ "fields": encode_fields(data) });
        self.send(Method::PATCH, self.document_url(collection, id)?, &query, Some(body))
            .await
    }

    fn encode_write(&self, write: &WriteOp) -> Result<Value, DocumentStoreError> {
        let (collection, id) = write.target();
        let name = self.document_name(collection, id)?;
        Ok(match write {
            WriteOp::Set { data, merge, .. } => {
                let mut encoded = json!({
                    "update": { "name": name, "fields": encode_fields(data) }
                });
                if *merge {
                    encoded["updateMask"] = json!({ "fieldPaths": mask_paths(data) });
                }
                encoded
            }
            WriteOp::Update { data, .. } => json!({
                "update": { "name": name, "fields": encode_fields(data) },
                "updateMask": { "fieldPaths": mask_paths(data) },
                "currentDocument": { "exists": true }
            }),
            WriteOp::Delete { .. } => json!({ "delete": name }),
        })
    }
}

fn mask_paths(data: &Document) -> Vec<String> {
    data.keys().map(|k| field_path(k)).collect()
}

fn last_segment(name: &str) -> String {
    name.rsplit('/').next().unwrap_or_default().to_owned()
}

/// `structuredQuery` body for `:runQuery`.
pub fn structured_query(query: &Query) -> Result<Value, DocumentStoreError> {
    let mut filters = Vec::with_capacity(query.filters.len());
    for filter in &query.filters {
        let (op, value) = match filter.op {
            FilterOp::Equal => ("EQUAL", encode_value(&filter.value)),
            FilterOp::In => {
                let len = filter.value.as_array().map(Vec::len).unwrap_or_default();
                if len == 0 || len > MAX_IN_VALUES {
                    return Err(DocumentStoreError::InvalidBatch(format!(
                        "'in' filter on {} needs 1..={} values, got {}",
                        filter.field, MAX_IN_VALUES, len
                    )));
                }
                ("IN", encode_value(&filter.value))
            }
        };
        filters.push(json!({
            "fieldFilter": {
                "field": { "fieldPath": field_path(&filter.field) },
                "op": op,
                "value": value
            }
        }));
    }

    let mut structured = json!({ "from": [{ "collectionId": query.collection }] });
    match filters.len() {
        0 => {}
        1 => structured["where"] = filters.remove(0),
        _ => structured["where"] = json!({ "compositeFilter": { "op": "AND", "filters": filters } }),
    }
    if let Some(limit) = query.limit {
        structured["limit"] = json!(limit);
    }
    Ok(json!({ "structuredQuery": structured }))
}

#[async_trait]
impl DocumentStore for FirestoreDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentStoreError> {
        observe(PROVIDER, "get", async {
            let response = self
                .send(Method::GET, self.document_url(collection, id)?, &[], None)
                .await?;
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let doc: RestDocument = Self::expect_success(response)
                .await?
                .json()
                .await
                .map_err(|e| DocumentStoreError::Codec(e.to_string()))?;
            decode_fields(&doc.fields).map(Some)
        })
        .await
    }

    async fn set(&self, collection: &str, id: &str, data: Document, merge: bool) -> Result<(), DocumentStoreError> {
        observe(PROVIDER, "set", async {
            let response = self.patch(collection, id, &data, merge, false).await?;
            Self::expect_success(response).await.map(|_| ())
        })
        .await
    }

    async fn update(&self, collection: &str, id: &str, data: Document) -> Result<(), DocumentStoreError> {
        observe(PROVIDER, "update", async {
            let response = self.patch(collection, id, &data, true, true).await?;
            if response.status() == StatusCode::NOT_FOUND {
                return Err(DocumentStoreError::NotFound {
                    collection: collection.to_owned(),
                    id: id.to_owned(),
                });
            }
            Self::expect_success(response).await.map(|_| ())
        })
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), DocumentStoreError> {
        observe(PROVIDER, "delete", async {
            let response = self
                .send(Method::DELETE, self.document_url(collection, id)?, &[], None)
                .await?;
            Self::expect_success(response).await.map(|_| ())
        })
        .await
    }

    async fn add(&self, collection: &str, data: Document) -> Result<String, DocumentStoreError> {
        observe(PROVIDER, "add", async {
            let body = json!({ "fields": encode_fields(&data) });
            let response = self.send(Method::POST, self.url("", &[collection])?, &[], Some(body)).await?;
            let doc: RestDocument = Self::expect_success(response)
                .await?
                .json()
                .await
                .map_err(|e| DocumentStoreError::Codec(e.to_string()))?;
            Ok(last_segment(&doc.name))
        })
        .await
    }

    async fn query(&self, query: &Query) -> Result<Vec<StoredDocument>, DocumentStoreError> {
        observe(PROVIDER, "query", async {
            let body = structured_query(query)?;
            let response = self.send(Method::POST, self.url(":runQuery", &[])?, &[], Some(body)).await?;
            let items: Vec<RunQueryItem> = Self::expect_success(response)
                .await?
                .json()
                .await
                .map_err(|e| DocumentStoreError::Codec(e.to_string()))?;

            items
                .into_iter()
                .filter_map(|item| item.document)
                .map(|doc| {
                    Ok(StoredDocument {
                        id: last_segment(&doc.name),
                        data: decode_fields(&doc.fields)?,
                    })
                })
                .collect()
        })
        .await
    }

    async fn commit(&self, writes: Vec<WriteOp>) -> Result<(), DocumentStoreError> {
        if writes.is_empty() {
            return Ok(());
        }
        if writes.len() > MAX_BATCH_WRITES {
            return Err(DocumentStoreError::InvalidBatch(format!(
                "{} writes exceeds the limit of {}",
                writes.len(),
                MAX_BATCH_WRITES
            )));
        }
        observe(PROVIDER, "commit", async {
            let encoded = writes
                .iter()
                .map(|w| self.encode_write(w))
                .collect::<Result<Vec<Value>, _>>()?;
            let response = self
                .send(Method::POST, self.url(":commit", &[])?, &[], Some(json!({ "writes": encoded })))
                .await?;
            Self::expect_success(response).await.map(|_| ())
        })
        .await
    }
}
