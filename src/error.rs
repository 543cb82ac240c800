use std::path::PathBuf;

/// Failures in the plumbing around the analysis core.
///
/// Parsing, indexing and validation never fail; everything wrong with a
/// script is reported as a diagnostic instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not a file URI: {0}")]
    InvalidUri(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
