//! Remote object-store backend.
//!
//! Speaks plain HTTP PUT/GET against an S3-compatible endpoint:
//!
//! ```text
//! PUT {endpoint}/{bucket}/embeddings/{identity}.json
//! PUT {endpoint}/{bucket}/images/{identity}/{n}.jpg
//! ```
//!
//! Every request carries a bounded timeout; failures surface as
//! [`StoreError`] instead of hanging. Enumeration is not implemented —
//! verification requires the local backend until an identity manifest
//! exists.

use crate::{FaceStore, StoreError, StoredRecord};
use async_trait::async_trait;
use mien_core::{Embedding, IdentityKey};
use reqwest::StatusCode;
use std::time::Duration;

pub struct RemoteStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    timeout: Duration,
}

impl RemoteStore {
    pub fn new(endpoint: &str, bucket: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            bucket: bucket.to_owned(),
            timeout,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }

    fn wrap(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(self.timeout)
        } else {
            StoreError::Backend(e.to_string())
        }
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &'static str,
    ) -> Result<String, StoreError> {
        let response = self
            .client
            .put(self.object_url(key))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| self.wrap(e))?;

        if !response.status().is_success() {
            return Err(StoreError::Backend(format!(
                "put {key}: unexpected status {}",
                response.status()
            )));
        }
        Ok(key.to_owned())
    }
}

#[async_trait]
impl FaceStore for RemoteStore {
    async fn save_embedding(
        &self,
        identity: &IdentityKey,
        embedding: &Embedding,
    ) -> Result<String, StoreError> {
        let key = format!("embeddings/{identity}.json");
        let record = StoredRecord::new(embedding.clone());
        let body = serde_json::to_vec(&record)?;
        let stored = self.put_object(&key, body, "application/json").await?;
        tracing::debug!(identity = %identity, key, "embedding stored remotely");
        Ok(stored)
    }

    async fn load_embedding(&self, identity: &IdentityKey) -> Result<Embedding, StoreError> {
        let key = format!("embeddings/{identity}.json");
        let response = self
            .client
            .get(self.object_url(&key))
            .send()
            .await
            .map_err(|e| self.wrap(e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(identity.clone()));
        }
        if !response.status().is_success() {
            return Err(StoreError::Backend(format!(
                "get {key}: unexpected status {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await.map_err(|e| self.wrap(e))?;
        let record: StoredRecord = serde_json::from_slice(&bytes)?;
        Ok(record.embedding)
    }

    async fn save_image(
        &self,
        identity: &IdentityKey,
        jpeg: &[u8],
        index: u32,
    ) -> Result<String, StoreError> {
        let key = format!("images/{identity}/{index}.jpg");
        self.put_object(&key, jpeg.to_vec(), "image/jpeg").await
    }

    async fn list_identities(&self) -> Result<Vec<IdentityKey>, StoreError> {
        Err(StoreError::Unsupported)
    }
}
