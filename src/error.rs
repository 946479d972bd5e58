use std::io;

use thiserror::Error;

use gcore::id::{IdError, ObjectId};
use store::StoreError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("file not found")]
    NotFound,
    #[error("invalid range {start}..{end} for a file of {length} bytes")]
    InvalidRange { start: u64, end: u64, length: u64 },
    #[error("chunk {n} of file {id} is missing")]
    MissingChunk { id: ObjectId, n: u32 },
    #[error("chunk {n} of file {id} holds {actual} bytes, expected {expected}")]
    CorruptChunk {
        id: ObjectId,
        n: u32,
        expected: u64,
        actual: u64,
    },
    #[error("session is not open")]
    WriteAfterClose,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Format(#[from] time::error::Format),
}

impl From<IdError> for Error {
    fn from(err: IdError) -> Self {
        Error::InvalidArgument(err.to_string())
    }
}

// For the std::io adapters on the sessions
impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::NotFound | Error::MissingChunk { .. } => io::Error::new(io::ErrorKind::NotFound, err),
            Error::InvalidArgument(_) | Error::InvalidRange { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            Error::CorruptChunk { .. } => io::Error::new(io::ErrorKind::InvalidData, err),
            e => io::Error::other(e),
        }
    }
}
