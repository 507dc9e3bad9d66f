//! Persistent vector store backed by `sled`.
//!
//! One sled database lives at the persist directory; each collection is a
//! separate tree named `collection/<name>`, holding bincode-encoded passages
//! keyed by id. Similarity search is a full scan with cosine scoring, which is
//! fine for the document sizes this crate targets.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bincode::Options;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sled::{Batch, Config, Db, Tree};
use tracing::debug;

use crate::document::{CollectionHandle, Passage, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, check_parallel, cosine_similarity, first_repeated, rank};

const BACKEND: &str = "sled";
const TREE_PREFIX: &str = "collection/";

#[derive(Serialize, Deserialize)]
struct StoredPassage {
    text: String,
    embedding: Vec<f32>,
}

/// A durable [`VectorStore`] rooted at a directory.
///
/// Writes are applied as one sled batch and flushed before
/// [`add`](VectorStore::add) returns. A process-local mutex serialises the
/// duplicate check with the write; sled's file lock keeps other processes out.
/// Ties in similarity keep key (id) order.
pub struct SledVectorStore {
    db: Db,
    persist_dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl SledVectorStore {
    /// Open (or create) the store rooted at `persist_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`] if the directory cannot be created or
    /// the database is locked by another process.
    pub fn open(persist_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = persist_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|err| {
            storage(format!("failed to create data directory {}", dir.display()), err)
        })?;

        let db = Config::default()
            .path(&dir)
            .mode(sled::Mode::HighThroughput)
            .open()
            .map_err(|err| storage(format!("failed to open store at {}", dir.display()), err))?;

        debug!(persist_dir = %dir.display(), "opened sled vector store");
        Ok(Self { db, persist_dir: dir, write_lock: Arc::new(Mutex::new(())) })
    }

    /// The directory this store persists to.
    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    fn tree(db: &Db, name: &str) -> Result<Tree> {
        db.open_tree(tree_name(name))
            .map_err(|err| storage(format!("failed to open collection '{name}'"), err))
    }
}

fn tree_name(collection: &str) -> String {
    format!("{TREE_PREFIX}{collection}")
}

fn storage(context: impl AsRef<str>, err: impl std::fmt::Display) -> RagError {
    RagError::vector_store(BACKEND, format!("{}: {err}", context.as_ref()))
}

fn codec() -> impl Options {
    bincode::options().with_fixint_encoding().allow_trailing_bytes()
}

fn encode(record: &StoredPassage) -> Result<Vec<u8>> {
    codec().serialize(record).map_err(|err| storage("serialization error", err))
}

fn decode(bytes: &[u8]) -> Result<StoredPassage> {
    codec().deserialize(bytes).map_err(|err| storage("deserialization error", err))
}

/// Run sled work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| storage("blocking task failed", err))?
}

#[async_trait::async_trait]
impl VectorStore for SledVectorStore {
    async fn open_or_create(&self, name: &str) -> Result<CollectionHandle> {
        let db = self.db.clone();
        let owned = name.to_string();
        blocking(move || {
            Self::tree(&db, &owned)?;
            db.flush().map_err(|err| storage("failed to flush store", err))?;
            Ok(())
        })
        .await?;
        Ok(CollectionHandle::new(name))
    }

    async fn add(
        &self,
        handle: &CollectionHandle,
        ids: &[String],
        texts: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<()> {
        check_parallel(BACKEND, ids, texts, embeddings)?;
        if ids.is_empty() {
            return Ok(());
        }

        let collection = handle.name().to_string();
        if let Some(id) = first_repeated(ids) {
            return Err(RagError::DuplicateId { collection, id: id.clone() });
        }

        let mut records = Vec::with_capacity(ids.len());
        for ((id, text), embedding) in ids.iter().zip(texts).zip(embeddings) {
            let record = StoredPassage { text: text.clone(), embedding: embedding.clone() };
            let bytes = encode(&record)?;
            records.push((id.clone(), bytes));
        }

        let db = self.db.clone();
        let write_lock = Arc::clone(&self.write_lock);
        blocking(move || {
            let tree = Self::tree(&db, &collection)?;
            let _guard = write_lock.lock();

            let mut batch = Batch::default();
            for (id, bytes) in &records {
                let exists = tree
                    .contains_key(id.as_bytes())
                    .map_err(|err| storage("failed to read collection", err))?;
                if exists {
                    return Err(RagError::DuplicateId { collection, id: id.clone() });
                }
                batch.insert(id.as_bytes(), bytes.as_slice());
            }

            tree.apply_batch(batch).map_err(|err| storage("failed to write passages", err))?;
            tree.flush().map_err(|err| storage("failed to flush passages", err))?;
            debug!(collection = %collection, count = records.len(), "passages persisted");
            Ok(())
        })
        .await
    }

    async fn query(
        &self,
        handle: &CollectionHandle,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let db = self.db.clone();
        let collection = handle.name().to_string();
        let query = embedding.to_vec();

        blocking(move || {
            let tree = Self::tree(&db, &collection)?;
            let mut scored = Vec::new();

            for entry in tree.iter() {
                let (key, value) =
                    entry.map_err(|err| storage("failed to read passage record", err))?;
                let record = decode(&value)?;
                let score = cosine_similarity(BACKEND, &query, &record.embedding)?;
                scored.push(SearchResult {
                    passage: Passage {
                        id: String::from_utf8_lossy(&key).into_owned(),
                        text: record.text,
                        embedding: record.embedding,
                        collection: collection.clone(),
                    },
                    score,
                });
            }

            Ok(rank(scored, top_k))
        })
        .await
    }

    async fn count(&self, handle: &CollectionHandle) -> Result<usize> {
        let db = self.db.clone();
        let collection = handle.name().to_string();
        blocking(move || Ok(Self::tree(&db, &collection)?.len())).await
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .db
            .tree_names()
            .into_iter()
            .filter_map(|raw| {
                std::str::from_utf8(&raw)
                    .ok()
                    .and_then(|name| name.strip_prefix(TREE_PREFIX))
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let db = self.db.clone();
        let owned = name.to_string();
        blocking(move || {
            let dropped = db
                .drop_tree(tree_name(&owned))
                .map_err(|err| storage(format!("failed to delete collection '{owned}'"), err))?;
            db.flush().map_err(|err| storage("failed to flush store", err))?;
            debug!(collection = %owned, dropped, "collection deleted");
            Ok(())
        })
        .await
    }
}
