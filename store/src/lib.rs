pub mod mem;

#[cfg(feature = "sql")]
pub mod sql;

use std::collections::BTreeMap;

use thiserror::Error;
use time::OffsetDateTime;

use gcore::id::ObjectId;

/// Opaque failure of the backing store, the session layer never looks inside.
#[derive(Error, Debug)]
pub enum StoreError {
    #[cfg(feature = "sql")]
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
    #[cfg(feature = "sql")]
    #[error(transparent)]
    Codec(#[from] bincode::Error),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("{0}")]
    Other(String),
}

/// One record of the `<root>.files` collection.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub id: ObjectId,
    pub root: String,
    pub filename: Option<String>,
    pub length: u64,
    pub chunk_size: u32,
    pub checksum: String,
    pub upload_date: OffsetDateTime,
    pub content_type: Option<String>,
    pub aliases: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl FileMetadata {
    /// Number of chunks the content is split into.
    pub fn chunk_count(&self) -> u64 {
        if self.chunk_size == 0 {
            return 0;
        }
        self.length.div_ceil(self.chunk_size as u64)
    }
}

/// Lookup for `find_metadata`, unset fields match anything within `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria {
    pub root: String,
    pub id: Option<ObjectId>,
    pub filename: Option<String>,
}

impl Criteria {
    pub fn all(root: &str) -> Self {
        Criteria {
            root: root.to_string(),
            id: None,
            filename: None,
        }
    }

    pub fn by_id(root: &str, id: ObjectId) -> Self {
        Criteria {
            id: Some(id),
            ..Criteria::all(root)
        }
    }

    pub fn by_filename(root: &str, filename: &str) -> Self {
        Criteria {
            filename: Some(filename.to_string()),
            ..Criteria::all(root)
        }
    }

    pub fn matches(&self, file: &FileMetadata) -> bool {
        file.root == self.root
            && self.id.map_or(true, |id| id == file.id)
            && self
                .filename
                .as_deref()
                .map_or(true, |name| file.filename.as_deref() == Some(name))
    }
}

// Chunks are keyed by (root, files_id, n), metadata by (root, id)
pub trait ChunkStore {
    fn put_chunk(&self, root: &str, files_id: &ObjectId, n: u32, data: &[u8])
        -> Result<(), StoreError>;
    fn get_chunk(&self, root: &str, files_id: &ObjectId, n: u32)
        -> Result<Option<Vec<u8>>, StoreError>;

    // Replaces any record with the same root + id, last writer wins
    fn put_metadata(&self, record: &FileMetadata) -> Result<(), StoreError>;
    fn find_metadata(&self, criteria: &Criteria) -> Result<Vec<FileMetadata>, StoreError>;

    fn delete_chunks(&self, root: &str, files_id: &ObjectId) -> Result<(), StoreError>;
    fn delete_metadata(&self, root: &str, files_id: &ObjectId) -> Result<bool, StoreError>;
}
