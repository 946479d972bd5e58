//! Streaming access to files kept as fixed-size chunks in a document store.
//!
//! A file lives in two collections of a root namespace: `<root>.files` holds one
//! [`FileMetadata`] record per file, `<root>.chunks` holds the content split into
//! `chunk_size` pieces numbered from 0. [`WriteSession`] turns a byte stream into chunks and
//! only writes the metadata record once every chunk is stored, so a file is either complete
//! or absent. [`ReadSession`] resolves a record and streams any byte range of it back.
//!
//! The store itself sits behind [`ChunkStore`], see `store::mem` and `store::sql`.
pub mod cache;
pub mod chunker;
pub mod config;
pub mod error;
pub mod grid;
pub mod read;
pub mod write;

#[cfg(test)]
mod testing;

pub use crate::config::{ReadOptions, StoreConfig, WriteOptions};
pub use crate::error::Error;
pub use crate::grid::Grid;
pub use crate::read::ReadSession;
pub use crate::write::{AbortReport, WriteSession};

pub use gcore::id::{IdInput, ObjectId};
pub use store::{ChunkStore, Criteria, FileMetadata, StoreError};
