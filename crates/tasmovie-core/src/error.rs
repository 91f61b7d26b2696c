use thiserror::Error;

use crate::port::PortKind;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown port type: {0}")]
    UnknownPortType(String),

    #[error("port type {0} is already registered")]
    DuplicatePortType(String),

    #[error("port type {kind} is not legal on port {port}")]
    IllegalPortType { port: usize, kind: PortKind },

    #[error("controller frame type mismatch")]
    TypeMismatch,

    #[error("{what} index {index} out of range (limit {limit})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        limit: usize,
    },

    #[error("bad serialization: {0}")]
    BadSerialization(String),

    #[error("poll counter block has {actual} entries, expected {expected}")]
    BadSaveStateSize { expected: usize, actual: usize },

    #[error("input polled before the first frame of the movie")]
    BeforeMovieStart,

    #[error("invalid control index {0}")]
    InvalidControlIndex(usize),

    #[error("movie desync: {0}")]
    MovieDesync(String),

    #[error("failed to allocate {pages} frame page(s)")]
    AllocationFailed { pages: usize },

    #[error("controller frame of {size} bytes exceeds capacity of {capacity} bytes")]
    FrameTooLarge { size: usize, capacity: usize },

    #[error("backing buffer holds {actual} bytes, frame needs {needed}")]
    BackingTooSmall { needed: usize, actual: usize },

    #[error("rerecord count {0:?} is not a decimal number")]
    BadRerecordCount(String),

    #[error("first subframe of the movie must have the sync flag set")]
    MissingInitialSync,

    #[cfg(feature = "savestate-postcard")]
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn out_of_range(what: &'static str, index: usize, limit: usize) -> Self {
        Self::IndexOutOfRange { what, index, limit }
    }
}
