use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] tasmovie_core::Error),

    #[error("Invalid input track at line {line}: {reason}")]
    InvalidTrack { line: usize, reason: String },

    #[error("Unknown header key {key:?} at line {line}")]
    UnknownHeaderKey { line: usize, key: String },
}
