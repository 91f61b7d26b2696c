pub mod error;
pub mod track;

pub use error::SupportError as Error;
pub use track::{MovieDocument, read_track, write_track};
