use std::collections::BTreeMap;

use serde::Deserialize;

use gcore::id::IdInput;

use crate::error::Error;

pub const DEFAULT_ROOT: &str = "fs";

// 255 KiB, keeps a full chunk plus record overhead under 256 KiB
pub const DEFAULT_CHUNK_SIZE: u32 = 255 * 1024;

/// Store wide defaults, handed to every session at construction.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub root: String,
    pub chunk_size: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            root: DEFAULT_ROOT.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl StoreConfig {
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        let config: StoreConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        validate_root(&self.root)?;
        validate_chunk_size(self.chunk_size)
    }
}

pub(crate) fn validate_root(root: &str) -> Result<(), Error> {
    if root.is_empty() {
        return Err(Error::InvalidArgument("root must not be empty".to_string()));
    }
    Ok(())
}

pub(crate) fn validate_chunk_size(chunk_size: u32) -> Result<(), Error> {
    if chunk_size == 0 {
        return Err(Error::InvalidArgument(
            "chunk size must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

/// Options recognized when opening a write session.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WriteOptions {
    pub id: Option<IdInput>,
    pub filename: Option<String>,
    pub root: Option<String>,
    pub chunk_size: Option<u32>,
    pub content_type: Option<String>,
    pub aliases: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl WriteOptions {
    pub fn new() -> Self {
        WriteOptions::default()
    }

    pub fn id(mut self, id: impl Into<IdInput>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn filename(mut self, filename: &str) -> Self {
        self.filename = Some(filename.to_string());
        self
    }

    pub fn root(mut self, root: &str) -> Self {
        self.root = Some(root.to_string());
        self
    }

    pub fn chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// Options recognized when opening a read session. The range is `[range_start, range_end)`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReadOptions {
    pub id: Option<IdInput>,
    pub filename: Option<String>,
    pub root: Option<String>,
    pub range_start: Option<u64>,
    pub range_end: Option<u64>,
}

impl ReadOptions {
    pub fn by_id(id: impl Into<IdInput>) -> Self {
        ReadOptions {
            id: Some(id.into()),
            ..ReadOptions::default()
        }
    }

    pub fn by_filename(filename: &str) -> Self {
        ReadOptions {
            filename: Some(filename.to_string()),
            ..ReadOptions::default()
        }
    }

    pub fn root(mut self, root: &str) -> Self {
        self.root = Some(root.to_string());
        self
    }

    pub fn range(mut self, start: u64, end: u64) -> Self {
        self.range_start = Some(start);
        self.range_end = Some(end);
        self
    }
}
