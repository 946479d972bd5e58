use http::HeaderMap;
use log::info;

use store::{ChunkStore, FileMetadata};

use crate::cache::{self, CacheResponse};
use crate::config::{validate_root, ReadOptions, StoreConfig, WriteOptions};
use crate::error::Error;
use crate::read::{self, ReadSession};
use crate::write::WriteSession;

/// A store handle bound to one immutable configuration.
pub struct Grid<'a, S: ChunkStore + ?Sized> {
    store: &'a S,
    config: StoreConfig,
}

impl<'a, S: ChunkStore + ?Sized> Grid<'a, S> {
    pub fn new(store: &'a S, config: StoreConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Grid { store, config })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn create_write(&self, options: WriteOptions) -> Result<WriteSession<'a, S>, Error> {
        WriteSession::open(self.store, &self.config, options)
    }

    pub fn create_read(&self, options: &ReadOptions) -> Result<ReadSession<'a, S>, Error> {
        ReadSession::open(self.store, &self.config, options)
    }

    pub fn find_one(&self, options: &ReadOptions) -> Result<Option<FileMetadata>, Error> {
        read::resolve(self.store, &self.config, options)
    }

    pub fn exist(&self, options: &ReadOptions) -> Result<bool, Error> {
        Ok(self.find_one(options)?.is_some())
    }

    /// Every record in a root, oldest id first.
    pub fn list(&self, root: Option<&str>) -> Result<Vec<FileMetadata>, Error> {
        let root = root.unwrap_or(&self.config.root);
        validate_root(root)?;
        Ok(self.store.find_metadata(&store::Criteria::all(root))?)
    }

    /// Drops the metadata record first so the file turns unreadable, then its chunks.
    pub fn remove(&self, options: &ReadOptions) -> Result<bool, Error> {
        let file = match self.find_one(options)? {
            Some(file) => file,
            None => return Ok(false),
        };

        let removed = self.store.delete_metadata(&file.root, &file.id)?;
        self.store.delete_chunks(&file.root, &file.id)?;

        info!("removed {}/{}", file.root, file.id);
        Ok(removed)
    }

    pub fn cache_response(
        &self,
        options: &ReadOptions,
        request: &HeaderMap,
    ) -> Result<CacheResponse, Error> {
        let file = self.find_one(options)?.ok_or(Error::NotFound)?;
        cache::evaluate(&file, request)
    }
}
