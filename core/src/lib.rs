pub mod filter;
pub mod render;
pub mod report;
pub mod scan;
pub mod stream;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure modes of a report scan
#[derive(Error, Debug)]
pub enum ScanError {
    /// Input path does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Input path exists but could not be opened
    #[error("Cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Structural parse failure, e.g. a file truncated mid-write
    #[error("XML parse error (file may be incomplete while writing): {0}")]
    Malformed(String),
    /// Failure writing rendered matches to the output stream
    #[error("Cannot write output: {0}")]
    Output(#[from] io::Error),
}
