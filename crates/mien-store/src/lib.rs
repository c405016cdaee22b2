//! mien-store — Persistence for enrolled face records.
//!
//! One embedding per identity with last-write-wins overwrite semantics,
//! behind a backend trait with local-filesystem and remote object-store
//! implementations. The backend is chosen once at construction time;
//! business logic never branches on it.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mien_core::{Embedding, IdentityKey};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use local::LocalStore;
pub use remote::RemoteStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no stored embedding for identity {0}")]
    NotFound(IdentityKey),
    #[error("storage backend cannot enumerate identities")]
    Unsupported,
    #[error("storage request timed out after {0:?}")]
    Timeout(Duration),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("backend: {0}")]
    Backend(String),
}

/// Serialized form of one enrolled embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub embedding: Embedding,
    pub enrolled_at: DateTime<Utc>,
}

impl StoredRecord {
    pub fn new(embedding: Embedding) -> Self {
        Self { embedding, enrolled_at: Utc::now() }
    }
}

/// Backend-independent store contract.
///
/// Writes overwrite any existing record for the same identity and are
/// atomic from a reader's perspective: a concurrent load observes either
/// the old or the new record, never a torn one.
#[async_trait]
pub trait FaceStore: Send + Sync {
    /// Persist an embedding, returning the stored location.
    async fn save_embedding(
        &self,
        identity: &IdentityKey,
        embedding: &Embedding,
    ) -> Result<String, StoreError>;

    /// Load the embedding stored for an identity.
    async fn load_embedding(&self, identity: &IdentityKey) -> Result<Embedding, StoreError>;

    /// Persist an enrollment photo (raw JPEG bytes) at the given index.
    async fn save_image(
        &self,
        identity: &IdentityKey,
        jpeg: &[u8],
        index: u32,
    ) -> Result<String, StoreError>;

    /// Enumerate enrolled identities. `Err(Unsupported)` on backends that
    /// cannot list.
    async fn list_identities(&self) -> Result<Vec<IdentityKey>, StoreError>;

    /// Load the full gallery for matching. A record that vanishes between
    /// listing and loading (concurrent overwrite) is skipped, not an error.
    async fn load_gallery(&self) -> Result<Vec<(IdentityKey, Embedding)>, StoreError> {
        let mut gallery = Vec::new();
        for identity in self.list_identities().await? {
            match self.load_embedding(&identity).await {
                Ok(embedding) => gallery.push((identity, embedding)),
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(gallery)
    }
}
