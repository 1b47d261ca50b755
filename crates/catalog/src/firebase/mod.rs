//! Firestore and Cloud Storage REST adapter.
//!
//! # Architecture
//!
//! - Product records come from the Firestore REST API (`documents` list with
//!   page tokens); typed values are unwrapped by [`values`]
//! - Vote updates use a `commit` with a server-side `increment` field
//!   transform, never a read-modify-write
//! - Images are listed from Cloud Storage under `<namespace>/<productID>/`,
//!   and each object's download URL is resolved from its metadata token
//! - Live mode polls the collection and emits only when the document set
//!   changed (the REST API has no push listener)

pub mod values;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use boutique_core::{DocumentId, ProductKey};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument, warn};

use crate::config::FirebaseConfig;
use crate::store::{BlobRef, ChangeStream, ProductDocument, ProductStore, StoreError};

const PAGE_SIZE: u32 = 300;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    /// Full resource name; the document id is the last path segment.
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListObjectsResponse {
    #[serde(default)]
    items: Vec<StorageObject>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StorageObject {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    download_tokens: Option<String>,
}

// =============================================================================
// FirestoreStore
// =============================================================================

/// [`ProductStore`] backed by the Firestore and Cloud Storage REST APIs.
#[derive(Clone)]
pub struct FirestoreStore {
    inner: Arc<FirestoreStoreInner>,
}

struct FirestoreStoreInner {
    client: reqwest::Client,
    /// `.../v1/projects/{project}/databases/(default)/documents`
    documents_url: String,
    /// `projects/{project}/databases/(default)/documents`
    documents_path: String,
    /// `.../v0/b/{bucket}/o`
    objects_url: String,
    collection: String,
    image_namespace: String,
    api_key: Option<SecretString>,
    poll_interval: Duration,
}

impl FirestoreStore {
    /// Create a new REST adapter.
    #[must_use]
    pub fn new(config: &FirebaseConfig, poll_interval: Duration) -> Self {
        let documents_path = format!(
            "projects/{}/databases/(default)/documents",
            config.project_id
        );

        Self {
            inner: Arc::new(FirestoreStoreInner {
                client: reqwest::Client::new(),
                documents_url: format!("{}/v1/{documents_path}", config.firestore_url),
                documents_path,
                objects_url: format!("{}/v0/b/{}/o", config.storage_url, config.storage_bucket),
                collection: config.collection.clone(),
                image_namespace: config.image_namespace.trim_matches('/').to_string(),
                api_key: config.api_key.clone(),
                poll_interval,
            }),
        }
    }

    /// Attach the API key (if any) to a request.
    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.inner.api_key {
            Some(key) => request.query(&[("key", key.expose_secret())]),
            None => request,
        }
    }

    /// Send a request and decode a JSON response body.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, StoreError> {
        let response = self.with_key(request).send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let excerpt: String = body.chars().take(200).collect();
            tracing::error!(status = %status, body = %excerpt, "Firebase returned non-success status");
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(StoreError::NotFound(excerpt));
            }
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: excerpt,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse Firebase response"
            );
            StoreError::Parse(e)
        })
    }

    fn image_prefix(&self, product_key: &ProductKey) -> String {
        format!("{}/{}/", self.inner.image_namespace, product_key)
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.objects_url, urlencoding::encode(path))
    }
}

/// Extract the document id from a full resource name.
fn document_id_from_name(name: &str) -> DocumentId {
    DocumentId::new(name.rsplit('/').next().unwrap_or(name))
}

/// Build the commit body for an atomic `votes` increment.
fn increment_votes_body(document_name: &str, delta: i64) -> Value {
    json!({
        "writes": [{
            "transform": {
                "document": document_name,
                "fieldTransforms": [{
                    "fieldPath": "votes",
                    "increment": values::integer_value(delta),
                }],
            },
            "currentDocument": { "exists": true },
        }],
    })
}

/// Public download URL for an object, using the first download token if any.
fn download_url(object_url: &str, tokens: Option<&str>) -> String {
    match tokens.and_then(|t| t.split(',').map(str::trim).find(|t| !t.is_empty())) {
        Some(token) => format!("{object_url}?alt=media&token={token}"),
        None => format!("{object_url}?alt=media"),
    }
}

#[async_trait]
impl ProductStore for FirestoreStore {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<ProductDocument>, StoreError> {
        let url = format!("{}/{}", self.inner.documents_url, self.inner.collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .inner
                .client
                .get(&url)
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: ListDocumentsResponse = self.execute(request).await?;
            documents.extend(page.documents.into_iter().map(|doc| {
                ProductDocument::new(
                    document_id_from_name(&doc.name),
                    values::decode_fields(&doc.fields),
                )
            }));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = documents.len(), "Listed product documents");
        Ok(documents)
    }

    #[instrument(skip(self), fields(product_key = %product_key))]
    async fn list_images(&self, product_key: &ProductKey) -> Result<Vec<BlobRef>, StoreError> {
        let prefix = self.image_prefix(product_key);
        let mut blobs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .inner
                .client
                .get(&self.inner.objects_url)
                .query(&[("prefix", prefix.as_str()), ("delimiter", "/")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: ListObjectsResponse = self.execute(request).await?;
            blobs.extend(page.items.into_iter().map(|item| BlobRef::new(item.name)));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(blobs)
    }

    #[instrument(skip(self), fields(path = %blob.path))]
    async fn resolve_image_url(&self, blob: &BlobRef) -> Result<String, StoreError> {
        let object_url = self.object_url(&blob.path);
        let metadata: ObjectMetadata = self
            .execute(self.inner.client.get(&object_url))
            .await?;
        Ok(download_url(&object_url, metadata.download_tokens.as_deref()))
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn increment_votes(&self, id: &DocumentId, delta: i64) -> Result<(), StoreError> {
        let document_name = format!(
            "{}/{}/{}",
            self.inner.documents_path, self.inner.collection, id
        );
        let url = format!("{}:commit", self.inner.documents_url);

        let _: Value = self
            .execute(
                self.inner
                    .client
                    .post(&url)
                    .json(&increment_votes_body(&document_name, delta)),
            )
            .await?;
        Ok(())
    }

    fn watch_products(&self) -> ChangeStream {
        let store = self.clone();

        Box::pin(async_stream::stream! {
            let mut ticker = tokio::time::interval(store.inner.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut last: Option<Vec<ProductDocument>> = None;

            loop {
                ticker.tick().await;
                match store.list_products().await {
                    Ok(documents) => {
                        if last.as_ref() != Some(&documents) {
                            last = Some(documents.clone());
                            yield Ok(documents);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Polling product collection failed");
                        yield Err(e);
                    }
                }
            }
        })
    }
}
