//! Local filesystem backend.
//!
//! Layout under the root directory:
//!
//! ```text
//! <identity>.json       serialized embedding record
//! <identity>/<n>.jpg    enrollment photo(s)
//! ```
//!
//! Writes land in a uniquely-named temp file in the same directory and are
//! renamed into place, so a concurrent reader observes either the old or
//! the new record and a crash leaves no half-written file under a live name.

use crate::{FaceStore, StoreError, StoredRecord};
use async_trait::async_trait;
use mien_core::{Embedding, IdentityKey};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open (creating if necessary) a store rooted at the given directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn embedding_path(&self, identity: &IdentityKey) -> PathBuf {
        self.root.join(format!("{identity}.json"))
    }

    fn image_path(&self, identity: &IdentityKey, index: u32) -> PathBuf {
        self.root.join(identity.as_str()).join(format!("{index}.jpg"))
    }

    async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_file_name(format!("{file_name}.tmp{seq}"));

        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl FaceStore for LocalStore {
    async fn save_embedding(
        &self,
        identity: &IdentityKey,
        embedding: &Embedding,
    ) -> Result<String, StoreError> {
        let path = self.embedding_path(identity);
        let record = StoredRecord::new(embedding.clone());
        let bytes = serde_json::to_vec(&record)?;
        Self::write_atomic(&path, &bytes).await?;
        tracing::debug!(identity = %identity, path = %path.display(), "embedding stored");
        Ok(path.display().to_string())
    }

    async fn load_embedding(&self, identity: &IdentityKey) -> Result<Embedding, StoreError> {
        let path = self.embedding_path(identity);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(identity.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        let record: StoredRecord = serde_json::from_slice(&bytes)?;
        Ok(record.embedding)
    }

    async fn save_image(
        &self,
        identity: &IdentityKey,
        jpeg: &[u8],
        index: u32,
    ) -> Result<String, StoreError> {
        let path = self.image_path(identity, index);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Self::write_atomic(&path, jpeg).await?;
        Ok(path.display().to_string())
    }

    async fn list_identities(&self) -> Result<Vec<IdentityKey>, StoreError> {
        let mut identities = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match IdentityKey::parse(stem) {
                Ok(identity) => identities.push(identity),
                Err(_) => {
                    tracing::warn!(path = %path.display(), "skipping record with malformed identity name");
                }
            }
        }

        Ok(identities)
    }
}
