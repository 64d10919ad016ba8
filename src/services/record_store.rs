//! src/services/record_store.rs
//!
//! RecordStore: whole-collection load/save over flat JSON files in the data
//! directory. Every collection is a single JSON array; there is no index and
//! no partial update. Mutations go through a single async mutex so that
//! load → modify → save sequences never interleave within one process.

use serde::{Serialize, de::DeserializeOwned};
use std::{
    fmt,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs,
    sync::{Mutex, MutexGuard},
};
use tracing::{debug, info};

/// The named collections persisted by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Externally seeded student records. Never written.
    Students,
    /// Lecture records owned by this service.
    Lectures,
}

impl Collection {
    /// File name of the collection inside the data directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Collection::Students => "students.json",
            Collection::Lectures => "lectures.json",
        }
    }

    fn is_read_only(self) -> bool {
        matches!(self, Collection::Students)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Students => write!(f, "students"),
            Collection::Lectures => write!(f, "lectures"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("collection `{0}` not found")]
    CollectionNotFound(Collection),
    #[error("collection `{collection}` contains invalid data: {source}")]
    CorruptData {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },
    #[error("collection `{collection}` could not be encoded: {source}")]
    Encode {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },
    #[error("collection `{0}` is read-only")]
    ReadOnlyCollection(Collection),
    #[error("student `{0}` not found")]
    StudentNotFound(String),
    #[error("lecture `{0}` not found")]
    LectureNotFound(String),
    #[error("file `{0}` not found")]
    AssetNotFound(String),
    #[error("invalid file name")]
    InvalidFileName,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Anything stored in a collection that can be looked up by id.
pub trait Record {
    fn id(&self) -> &str;
}

/// Linear lookup by identifier.
pub fn find_by_id<'a, T: Record>(records: &'a [T], id: &str) -> Option<&'a T> {
    records.iter().find(|record| record.id() == id)
}

/// RecordStore owns the on-disk representation of every collection.
///
/// Cloning is cheap; clones share the same write lock.
#[derive(Clone)]
pub struct RecordStore {
    /// Directory holding `students.json` and `lectures.json`.
    pub data_dir: PathBuf,

    write_lock: Arc<Mutex<()>>,
}

impl RecordStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Full path of a collection's backing file.
    pub fn collection_path(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(collection.file_name())
    }

    /// Create the collection file with an empty array if it does not exist yet.
    pub async fn ensure_collection(&self, collection: Collection) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.collection_path(collection);
        if fs::try_exists(&path).await? {
            return Ok(());
        }
        fs::create_dir_all(&self.data_dir).await?;
        fs::write(&path, b"[]").await?;
        info!("Initialized empty {} collection at {}", collection, path.display());
        Ok(())
    }

    /// Read and parse the entire collection.
    pub async fn load_collection<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> StoreResult<Vec<T>> {
        read_collection(&self.collection_path(collection), collection).await
    }

    /// Replace the entire collection with `records`.
    pub async fn save_collection<T: Serialize>(
        &self,
        collection: Collection,
        records: &[T],
    ) -> StoreResult<()> {
        self.begin_write().await.save(collection, records).await
    }

    /// Acquire the single-writer lock.
    ///
    /// The returned writer keeps the lock until dropped, so loads and saves
    /// made through it form one uninterrupted sequence.
    pub async fn begin_write(&self) -> CollectionWriter<'_> {
        let guard = self.write_lock.lock().await;
        CollectionWriter {
            store: self,
            _guard: guard,
        }
    }

    /// Load, mutate and save a collection while holding the write lock.
    pub async fn update_collection<T, R, F>(&self, collection: Collection, f: F) -> StoreResult<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> StoreResult<R>,
    {
        let writer = self.begin_write().await;
        let mut records = writer.load(collection).await?;
        let result = f(&mut records)?;
        writer.save(collection, &records).await?;
        Ok(result)
    }
}

/// Exclusive access to the collections for one load-modify-save sequence.
pub struct CollectionWriter<'a> {
    store: &'a RecordStore,
    _guard: MutexGuard<'a, ()>,
}

impl CollectionWriter<'_> {
    pub async fn load<T: DeserializeOwned>(&self, collection: Collection) -> StoreResult<Vec<T>> {
        self.store.load_collection(collection).await
    }

    /// Overwrite the collection file in one write.
    ///
    /// Not crash-atomic: an interrupted write can leave a truncated file.
    pub async fn save<T: Serialize>(&self, collection: Collection, records: &[T]) -> StoreResult<()> {
        if collection.is_read_only() {
            return Err(StoreError::ReadOnlyCollection(collection));
        }
        let data = serde_json::to_vec_pretty(records)
            .map_err(|source| StoreError::Encode { collection, source })?;
        let path = self.store.collection_path(collection);
        fs::write(&path, data).await?;
        debug!("saved {} records to {}", records.len(), path.display());
        Ok(())
    }
}

async fn read_collection<T: DeserializeOwned>(
    path: &Path,
    collection: Collection,
) -> StoreResult<Vec<T>> {
    let bytes = fs::read(path).await.map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            StoreError::CollectionNotFound(collection)
        } else {
            StoreError::Io(err)
        }
    })?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::CorruptData { collection, source })
}
