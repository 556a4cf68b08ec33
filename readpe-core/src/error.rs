use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to copy a field's bytes out of the image buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer too short: {width} bytes at offset 0x{offset:x} exceed buffer length {len}")]
    BufferTooShort {
        offset: usize,
        width: usize,
        len: usize,
    },
}

/// Failure to bring the image into memory.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("Failed to open the file: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read the file: {}", .path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A header whose structural checks did not pass.
///
/// The display text is the diagnostic printed to the report.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The DOS header is invalid")]
    DosHeader,

    #[error("The COFF header is invalid")]
    CoffHeader,

    #[error("A section header is invalid")]
    SectionHeader(usize),
}

/// Everything that can stop the decode pipeline once the image is loaded.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to write report: {0}")]
    Output(#[from] io::Error),
}
